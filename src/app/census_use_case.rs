use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::app::ports::{ChatPort, RecordParserPort, RecordStorePort, RendererPort};
use crate::error::{CensusError, Result};
use crate::metrics::{AdapterMetrics, QuoteMetrics};
use crate::pipeline::{Ingestion, IngestionPipeline};
use crate::quote::{compute_age_band_stats, multipliers_from_stats, quote_from_multipliers};
use crate::types::{AgeBandStats, CensusEvent, CensusId, ImageBuffer, QuoteTable, RateMultiplier};

const QUOTE_ARTIFACT: &str = "quote table";
const CHART_ARTIFACT: &str = "age distribution chart";

/// An ingested census together with its derived quote
#[derive(Debug, Clone, Serialize)]
pub struct QuotedCensus {
    pub ingestion: Ingestion,
    pub stats: AgeBandStats,
    pub multipliers: RateMultiplier,
    pub quote: QuoteTable,
}

/// What a chat-triggered request produced
#[derive(Debug, Clone, Serialize)]
pub struct CensusReport {
    pub census_id: CensusId,
    pub rows: usize,
    pub batches_committed: usize,
    pub stats: AgeBandStats,
    pub quote: QuoteTable,
    pub quote_permalink: Option<String>,
    pub chart_permalink: Option<String>,
    pub adapter_errors: Vec<String>,
    pub announced: bool,
}

/// Use case for turning a chat-delivered census file into persisted records and a posted quote
pub struct CensusUseCase {
    pipeline: IngestionPipeline,
    renderer: Arc<dyn RendererPort>,
    channel: String,
}

impl CensusUseCase {
    pub fn new(
        store: Arc<dyn RecordStorePort>,
        parser: Arc<dyn RecordParserPort>,
        renderer: Arc<dyn RendererPort>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            pipeline: IngestionPipeline::new(store, parser),
            renderer,
            channel: channel.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Ingest the census and quote from the in-memory rows
    pub async fn ingest_and_quote(&self, source: &str, file_ref: &str, today: NaiveDate) -> Result<QuotedCensus> {
        let ingestion = self.pipeline.ingest_rows(source, file_ref).await?;
        let (_, stats) = compute_age_band_stats(&ingestion.rows, today)?;
        let multipliers = multipliers_from_stats(&stats);
        let quote = quote_from_multipliers(&multipliers);
        QuoteMetrics::record_quote_computed(ingestion.rows.len());
        info!(census_id = %ingestion.census_id, "Computed quote");

        Ok(QuotedCensus {
            ingestion,
            stats,
            multipliers,
            quote,
        })
    }

    /// Handle one census event end to end.
    ///
    /// Fatal failures are reported to the thread and returned. Rendering and
    /// upload failures are collected on the report; a message is still posted
    /// with whatever artifacts were delivered.
    #[instrument(skip(self, chat, event), fields(file_id = %event.file_id))]
    pub async fn handle_event(&self, chat: &dyn ChatPort, event: &CensusEvent, today: NaiveDate) -> Result<CensusReport> {
        let thread = event.thread_ts.as_deref();

        let quoted = match self.fetch_and_quote(chat, event, today).await {
            Ok(q) => q,
            Err(e) => {
                let text = format!("Census processing failed during {}: {}", e.stage(), e);
                if let Err(post_err) = chat.post_message(&self.channel, &text, thread).await {
                    error!("Failed to report census failure: {:#}", post_err);
                }
                return Err(e);
            }
        };

        let mut adapter_errors = Vec::new();
        let quote_image = self
            .renderer
            .render_quote_table(&quoted.quote)
            .map_err(|e| adapter_error(QUOTE_ARTIFACT, e));
        let quote_permalink = collect(self.upload_and_announce(chat, QUOTE_ARTIFACT, quote_image).await, &mut adapter_errors);

        let chart_image = self
            .renderer
            .render_distribution_chart(&quoted.stats)
            .map_err(|e| adapter_error(CHART_ARTIFACT, e));
        let chart_permalink = collect(self.upload_and_announce(chat, CHART_ARTIFACT, chart_image).await, &mut adapter_errors);

        let text = summary_message(&quoted, quote_permalink.as_deref(), chart_permalink.as_deref());
        let announced = match chat.post_message(&self.channel, &text, thread).await {
            Ok(()) => true,
            Err(e) => {
                let err = adapter_error("summary message", e);
                warn!("{}", err);
                adapter_errors.push(err.to_string());
                false
            }
        };

        Ok(CensusReport {
            census_id: quoted.ingestion.census_id,
            rows: quoted.ingestion.rows.len(),
            batches_committed: quoted.ingestion.batches_committed,
            stats: quoted.stats,
            quote: quoted.quote,
            quote_permalink,
            chart_permalink,
            adapter_errors,
            announced,
        })
    }

    async fn fetch_and_quote(&self, chat: &dyn ChatPort, event: &CensusEvent, today: NaiveDate) -> Result<QuotedCensus> {
        let source = chat
            .file_content(&event.file_id)
            .await
            .map_err(|e| CensusError::Fetch(format!("{e:#}")))?;
        self.ingest_and_quote(&source, &event.file_id, today).await
    }

    /// Upload one rendered artifact and return its permalink
    pub async fn upload_and_announce(
        &self,
        chat: &dyn ChatPort,
        artifact: &'static str,
        image: Result<ImageBuffer>,
    ) -> Result<String> {
        let outcome = match image {
            Ok(image) => chat.upload_file(image).await.map_err(|e| adapter_error(artifact, e)),
            Err(e) => Err(e),
        };
        match &outcome {
            Ok(link) => {
                AdapterMetrics::record_delivered(artifact);
                info!("Uploaded {} to {}", artifact, link);
            }
            Err(e) => {
                AdapterMetrics::record_failed(artifact);
                warn!("{}", e);
            }
        }
        outcome
    }
}

fn adapter_error(artifact: &str, cause: anyhow::Error) -> CensusError {
    CensusError::Adapter {
        artifact: artifact.to_string(),
        cause: format!("{cause:#}"),
    }
}

fn collect(result: Result<String>, errors: &mut Vec<String>) -> Option<String> {
    match result {
        Ok(link) => Some(link),
        Err(e) => {
            errors.push(e.to_string());
            None
        }
    }
}

pub fn summary_message(quoted: &QuotedCensus, quote_link: Option<&str>, chart_link: Option<&str>) -> String {
    let mut lines = vec![format!(
        "Census {} processed: {} people in {} batch(es).",
        quoted.ingestion.census_id,
        quoted.ingestion.rows.len(),
        quoted.ingestion.batches_committed
    )];
    match quote_link {
        Some(link) => lines.push(format!("Quote: {link}")),
        None => lines.push("Quote image unavailable.".to_string()),
    }
    match chart_link {
        Some(link) => lines.push(format!("Age distribution: {link}")),
        None => lines.push("Age distribution chart unavailable.".to_string()),
    }
    lines.join("\n")
}
