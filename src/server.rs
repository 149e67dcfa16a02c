use crate::app::census_use_case::{CensusReport, CensusUseCase};
use crate::error::CensusError;
use crate::infra::slack_client::SlackClient;
use crate::types::CensusEvent;
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::Local;
use hyper::Server;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub use_case: Arc<CensusUseCase>,
    pub chat_api_base: String,
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "census-quoter",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn status_for(err: &CensusError) -> StatusCode {
    match err {
        CensusError::Parse(_) | CensusError::EmptyInput => StatusCode::UNPROCESSABLE_ENTITY,
        CensusError::Fetch(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Census event intake: one request runs one census end to end
async fn census_event(State(state): State<AppState>, Json(event): Json<CensusEvent>) -> axum::response::Response {
    let chat = SlackClient::new(&state.chat_api_base, &event.token);
    let today = Local::now().date_naive();
    match state.use_case.handle_event(&chat, &event, today).await {
        Ok(report) => Json::<CensusReport>(report).into_response(),
        Err(e) => {
            error!(stage = e.stage(), "Census event failed: {}", e);
            let body = serde_json::json!({ "stage": e.stage(), "error": e.to_string() });
            (status_for(&e), Json(body)).into_response()
        }
    }
}

pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/events", post(census_event))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_server(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("HTTP server running on http://localhost:{port}");
    info!("Census events: POST http://localhost:{port}/events");

    Server::bind(&addr).serve(app.into_make_service()).await?;
    Ok(())
}
