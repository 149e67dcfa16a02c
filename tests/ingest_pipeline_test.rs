use anyhow::{anyhow, Result};
use async_trait::async_trait;
use census_quoter::app::ports::{CommitReceipt, RecordParserPort, RecordStorePort};
use census_quoter::batch::{build_batches, UnitOfWork};
use census_quoter::constants::{CENSUS_ENTITY, CENSUS_LINE_ENTITY};
use census_quoter::error::CensusError;
use census_quoter::infra::csv_parser::CsvRecordParser;
use census_quoter::infra::in_memory_store::InMemoryRecordStore;
use census_quoter::pipeline::{IngestStage, IngestionPipeline};
use census_quoter::types::{CensusId, Fields, PersonRow};
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;

const HEADER: &str = "first_name,last_name,email,gender,dob,state";

fn census_csv(n: usize) -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 0..n {
        csv.push_str(&format!("First{i},Last{i},p{i}@example.com,F,1980-05-0{},WA\n", i % 9 + 1));
    }
    csv
}

fn person_rows(n: usize) -> Vec<PersonRow> {
    (0..n)
        .map(|i| PersonRow {
            first_name: format!("First{i}"),
            last_name: format!("Last{i}"),
            email: format!("p{i}@example.com"),
            gender: "M".to_string(),
            dob: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
            state: "CA".to_string(),
        })
        .collect()
}

/// Store that records every call and can be told to fail
#[derive(Default)]
struct RecordingStore {
    fail_create: bool,
    fail_commit_at: Option<usize>,
    creates: Mutex<Vec<String>>,
    // Batch sizes and first email of each commit attempt, in call order
    commit_attempts: Mutex<Vec<(usize, Option<String>)>>,
}

#[async_trait]
impl RecordStorePort for RecordingStore {
    async fn create(&self, entity: &str, _fields: Fields) -> Result<String> {
        if self.fail_create {
            return Err(anyhow!("store unavailable"));
        }
        self.creates.lock().await.push(entity.to_string());
        Ok("cen-001".to_string())
    }

    async fn commit_unit_of_work(&self, uow: UnitOfWork) -> Result<CommitReceipt> {
        let mut attempts = self.commit_attempts.lock().await;
        let index = attempts.len();
        let first = uow
            .operations()
            .first()
            .and_then(|op| op.fields["email"].as_str().map(str::to_string));
        attempts.push((uow.len(), first));
        if self.fail_commit_at == Some(index) {
            return Err(anyhow!("lock timeout"));
        }
        Ok(CommitReceipt {
            created_ids: (0..uow.len()).map(|i| format!("line-{index}-{i}")).collect(),
        })
    }
}

fn pipeline(store: Arc<dyn RecordStorePort>) -> IngestionPipeline {
    IngestionPipeline::new(store, Arc::new(CsvRecordParser::new()))
}

#[test]
fn twelve_hundred_rows_make_three_batches() {
    let batches = build_batches(&CensusId("c".to_string()), &person_rows(1200));
    let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![500, 500, 200]);
}

#[test]
fn batch_count_is_ceiling_and_order_is_preserved() {
    for n in [1usize, 499, 500, 501, 999, 1000, 1001, 2500] {
        let rows = person_rows(n);
        let batches = build_batches(&CensusId("c".to_string()), &rows);
        assert_eq!(batches.len(), (n + 499) / 500, "n = {n}");
        assert!(batches.iter().all(|b| b.len() <= 500));

        let emails: Vec<String> = batches
            .iter()
            .flat_map(|b| b.operations().iter())
            .map(|op| op.fields["email"].as_str().unwrap().to_string())
            .collect();
        let expected: Vec<String> = rows.iter().map(|r| r.email.clone()).collect();
        assert_eq!(emails, expected, "n = {n}");
    }
}

#[tokio::test]
async fn commits_every_batch_in_order() {
    let store = Arc::new(RecordingStore::default());
    let ingestion = pipeline(store.clone()).ingest_rows(&census_csv(1200), "F1").await.unwrap();

    assert_eq!(ingestion.census_id, CensusId("cen-001".to_string()));
    assert_eq!(ingestion.batches_committed, 3);
    assert_eq!(ingestion.rows.len(), 1200);

    let attempts = store.commit_attempts.lock().await;
    assert_eq!(
        *attempts,
        vec![
            (500, Some("p0@example.com".to_string())),
            (500, Some("p500@example.com".to_string())),
            (200, Some("p1000@example.com".to_string())),
        ]
    );
    assert_eq!(*store.creates.lock().await, vec![CENSUS_ENTITY.to_string()]);

    assert_eq!(
        ingestion.stages,
        vec![
            IngestStage::Created,
            IngestStage::Parsing,
            IngestStage::Batching,
            IngestStage::Committing(0),
            IngestStage::Committing(1),
            IngestStage::Committing(2),
            IngestStage::Done,
        ]
    );
}

#[tokio::test]
async fn failed_commit_stops_later_batches() {
    let store = Arc::new(RecordingStore {
        fail_commit_at: Some(1),
        ..Default::default()
    });
    let err = pipeline(store.clone()).ingest(&census_csv(1200), "F1").await.unwrap_err();

    match err {
        CensusError::Commit { batch_index, cause } => {
            assert_eq!(batch_index, 1);
            assert!(cause.contains("lock timeout"));
        }
        other => panic!("expected commit error, got {other:?}"),
    }
    // Batch 2 is never attempted
    assert_eq!(store.commit_attempts.lock().await.len(), 2);
}

#[tokio::test]
async fn parent_creation_failure_is_fatal_before_parsing() {
    let store = Arc::new(RecordingStore {
        fail_create: true,
        ..Default::default()
    });
    let err = pipeline(store.clone()).ingest(&census_csv(3), "F1").await.unwrap_err();
    assert!(matches!(err, CensusError::RecordStore(_)));
    assert_eq!(err.stage(), "created");
    assert!(store.commit_attempts.lock().await.is_empty());
}

#[tokio::test]
async fn empty_source_fails_before_any_line_is_created() {
    let store = Arc::new(InMemoryRecordStore::new());
    let err = pipeline(store.clone()).ingest("", "F-empty").await.unwrap_err();

    assert!(matches!(err, CensusError::Parse(_)));
    // The parent exists; no lines and no commits
    assert_eq!(store.records_of(CENSUS_ENTITY).len(), 1);
    assert!(store.records_of(CENSUS_LINE_ENTITY).is_empty());
    assert_eq!(store.commit_count(), 0);
}

#[tokio::test]
async fn persisted_lines_reference_their_census() {
    let store = Arc::new(InMemoryRecordStore::new());
    let census_id = pipeline(store.clone()).ingest(&census_csv(7), "F7").await.unwrap();

    let parents = store.records_of(CENSUS_ENTITY);
    assert_eq!(parents.len(), 1);
    assert_eq!(parents[0].id, census_id.0);
    assert_eq!(parents[0].fields["file_ref"], "F7");
    assert_eq!(parents[0].fields["source_sha256"].as_str().unwrap().len(), 64);

    let lines = store.records_of(CENSUS_LINE_ENTITY);
    assert_eq!(lines.len(), 7);
    assert!(lines.iter().all(|l| l.fields["census_id"] == census_id.0.as_str()));
}

/// Parser stub that hands back a fixed row set
struct FixedParser(Vec<PersonRow>);

impl RecordParserPort for FixedParser {
    fn parse(&self, _source: &str) -> Result<Vec<PersonRow>> {
        Ok(self.0.clone())
    }
}

#[tokio::test]
async fn zero_parsed_rows_commit_one_empty_batch() {
    let store = Arc::new(RecordingStore::default());
    let pipeline = IngestionPipeline::new(store.clone(), Arc::new(FixedParser(Vec::new())));
    let ingestion = pipeline.ingest_rows("ignored", "F0").await.unwrap();

    assert_eq!(ingestion.batches_committed, 1);
    assert_eq!(*store.commit_attempts.lock().await, vec![(0, None)]);
}
