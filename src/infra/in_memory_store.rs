use crate::app::ports::{CommitReceipt, RecordStorePort};
use crate::batch::UnitOfWork;
use crate::types::Fields;
use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: String,
    pub entity: String,
    pub fields: Fields,
}

/// In-memory record store for local runs and tests
pub struct InMemoryRecordStore {
    records: Arc<Mutex<Vec<StoredRecord>>>,
    commits: Arc<Mutex<usize>>,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            commits: Arc::new(Mutex::new(0)),
        }
    }

    /// Records of one entity type, in insertion order
    pub fn records_of(&self, entity: &str) -> Vec<StoredRecord> {
        self.records
            .lock()
            .map(|records| records.iter().filter(|r| r.entity == entity).cloned().collect())
            .unwrap_or_default()
    }

    pub fn commit_count(&self) -> usize {
        self.commits.lock().map(|c| *c).unwrap_or(0)
    }

    fn insert(&self, entity: &str, fields: Fields) -> anyhow::Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow!("record store lock poisoned"))?;
        records.push(StoredRecord {
            id: id.clone(),
            entity: entity.to_string(),
            fields,
        });
        Ok(id)
    }
}

#[async_trait]
impl RecordStorePort for InMemoryRecordStore {
    async fn create(&self, entity: &str, fields: Fields) -> anyhow::Result<String> {
        let id = self.insert(entity, fields)?;
        debug!("Created {} with id {}", entity, id);
        Ok(id)
    }

    async fn commit_unit_of_work(&self, uow: UnitOfWork) -> anyhow::Result<CommitReceipt> {
        let census_id = uow.census_id().clone();
        let staged: Vec<StoredRecord> = uow
            .into_operations()
            .into_iter()
            .map(|op| StoredRecord {
                id: Uuid::new_v4().to_string(),
                entity: op.entity,
                fields: op.fields,
            })
            .collect();
        let created_ids: Vec<String> = staged.iter().map(|r| r.id.clone()).collect();

        {
            let mut records = self
                .records
                .lock()
                .map_err(|_| anyhow!("record store lock poisoned"))?;
            let mut commits = self
                .commits
                .lock()
                .map_err(|_| anyhow!("record store lock poisoned"))?;
            records.extend(staged);
            *commits += 1;
        }

        debug!(
            "Committed unit of work for census {} ({} creates)",
            census_id,
            created_ids.len()
        );
        Ok(CommitReceipt { created_ids })
    }
}
