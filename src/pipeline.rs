use crate::app::ports::{RecordParserPort, RecordStorePort};
use crate::batch::build_batches;
use crate::constants::CENSUS_ENTITY;
use crate::error::{CensusError, Result};
use crate::metrics::IngestMetrics;
use crate::types::{Census, CensusId, Fields, PersonRow};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Where an ingestion currently stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IngestStage {
    Created,
    Parsing,
    Batching,
    Committing(usize),
    Done,
    Failed { stage: String, cause: String },
}

impl IngestStage {
    pub fn name(&self) -> &'static str {
        match self {
            IngestStage::Created => "created",
            IngestStage::Parsing => "parsing",
            IngestStage::Batching => "batching",
            IngestStage::Committing(_) => "committing",
            IngestStage::Done => "done",
            IngestStage::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, IngestStage::Done | IngestStage::Failed { .. })
    }

    fn can_advance_to(&self, next: &IngestStage) -> bool {
        use IngestStage::*;
        match (self, next) {
            (Done, _) | (Failed { .. }, _) => false,
            (_, Failed { .. }) => true,
            (Created, Parsing) => true,
            (Parsing, Batching) => true,
            (Batching, Committing(0)) => true,
            (Committing(i), Committing(j)) => *j == i + 1,
            (Committing(_), Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestStage::Committing(i) => write!(f, "committing({i})"),
            IngestStage::Failed { stage, cause } => write!(f, "failed({stage}: {cause})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Per-invocation state tracker; every transition is logged.
#[derive(Debug)]
struct StageTracker {
    current: IngestStage,
    history: Vec<IngestStage>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            current: IngestStage::Created,
            history: vec![IngestStage::Created],
        }
    }

    fn advance(&mut self, next: IngestStage) {
        debug_assert!(
            self.current.can_advance_to(&next),
            "illegal ingest transition {} -> {}",
            self.current,
            next
        );
        debug!(from = %self.current, to = %next, "Ingest stage transition");
        self.current = next.clone();
        self.history.push(next);
    }

    /// Record the failure against the stage that was active and hand the error back.
    fn fail(&mut self, err: CensusError) -> CensusError {
        let stage = self.current.name().to_string();
        error!(stage = %stage, error = %err, "Ingestion failed");
        IngestMetrics::record_failure(err.stage());
        self.advance(IngestStage::Failed {
            stage,
            cause: err.to_string(),
        });
        err
    }
}

/// Result of a successful ingestion, keeping the in-memory rows for quoting
#[derive(Debug, Clone, Serialize)]
pub struct Ingestion {
    pub census_id: CensusId,
    pub rows: Vec<PersonRow>,
    pub batches_committed: usize,
    pub stages: Vec<IngestStage>,
}

pub struct IngestionPipeline {
    store: Arc<dyn RecordStorePort>,
    parser: Arc<dyn RecordParserPort>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn RecordStorePort>, parser: Arc<dyn RecordParserPort>) -> Self {
        Self { store, parser }
    }

    /// Ingest a census file and return the identifier of its parent record
    pub async fn ingest(&self, source_blob: &str, file_ref: &str) -> Result<CensusId> {
        Ok(self.ingest_rows(source_blob, file_ref).await?.census_id)
    }

    /// Create the parent, parse, batch, and commit every batch in order.
    ///
    /// The first failing stage aborts the run. Anything already committed stays
    /// persisted; nothing is retried or compensated.
    #[instrument(skip(self, source_blob, file_ref), fields(file_ref = %file_ref, bytes = source_blob.len()))]
    pub async fn ingest_rows(&self, source_blob: &str, file_ref: &str) -> Result<Ingestion> {
        let mut tracker = StageTracker::new();

        let census = match self.create_census(source_blob, file_ref).await {
            Ok(census) => census,
            Err(e) => return Err(tracker.fail(e)),
        };
        let census_id = census.id.clone();
        info!(census_id = %census_id, "Created census record");
        IngestMetrics::record_census_created();

        tracker.advance(IngestStage::Parsing);
        let rows = match self.parser.parse(source_blob) {
            Ok(rows) => rows,
            Err(e) => return Err(tracker.fail(CensusError::Parse(format!("{e:#}")))),
        };
        info!(census_id = %census_id, rows = rows.len(), "Parsed census rows");
        IngestMetrics::record_rows_parsed(rows.len());

        tracker.advance(IngestStage::Batching);
        let batches = build_batches(&census_id, &rows);
        let total = batches.len();
        info!(census_id = %census_id, batches = total, "Built commit batches");

        for (index, batch) in batches.into_iter().enumerate() {
            tracker.advance(IngestStage::Committing(index));
            let size = batch.len();
            let started = std::time::Instant::now();
            match self.store.commit_unit_of_work(batch).await {
                Ok(receipt) => {
                    IngestMetrics::record_batch_committed(size, started.elapsed().as_secs_f64());
                    debug!(
                        census_id = %census_id,
                        batch = index,
                        created = receipt.created_ids.len(),
                        "Committed batch {}/{}",
                        index + 1,
                        total
                    );
                }
                Err(e) => {
                    return Err(tracker.fail(CensusError::Commit {
                        batch_index: index,
                        cause: format!("{e:#}"),
                    }))
                }
            }
        }

        tracker.advance(IngestStage::Done);
        info!(census_id = %census_id, batches = total, "Census ingestion complete");

        Ok(Ingestion {
            census_id,
            rows,
            batches_committed: total,
            stages: tracker.history,
        })
    }

    async fn create_census(&self, source_blob: &str, file_ref: &str) -> Result<Census> {
        let source_sha256 = hex::encode(Sha256::digest(source_blob.as_bytes()));

        let mut fields = Fields::new();
        fields.insert("source_blob".to_string(), source_blob.into());
        fields.insert("file_ref".to_string(), file_ref.into());
        fields.insert("source_sha256".to_string(), source_sha256.clone().into());

        let id = self
            .store
            .create(CENSUS_ENTITY, fields)
            .await
            .map_err(|e| CensusError::RecordStore(format!("{e:#}")))?;

        Ok(Census {
            id: CensusId(id),
            source_blob: source_blob.to_string(),
            file_ref: file_ref.to_string(),
            source_sha256,
        })
    }
}
