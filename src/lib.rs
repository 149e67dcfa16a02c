pub mod batch;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod quote;
pub mod server;
pub mod types;

// Application use cases and the ports they depend on
pub mod app;
// Concrete collaborators behind those ports
pub mod infra;
