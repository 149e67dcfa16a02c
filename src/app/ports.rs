use async_trait::async_trait;

use crate::batch::UnitOfWork;
use crate::types::{AgeBandStats, Fields, ImageBuffer, PersonRow, QuoteTable};

/// Outcome of committing one unit of work
#[derive(Clone, Debug, Default)]
pub struct CommitReceipt {
    pub created_ids: Vec<String>,
}

// Record-store side
#[async_trait]
pub trait RecordStorePort: Send + Sync {
    /// Create a single record immediately and return its identifier
    async fn create(&self, entity: &str, fields: Fields) -> anyhow::Result<String>;
    async fn commit_unit_of_work(&self, uow: UnitOfWork) -> anyhow::Result<CommitReceipt>;
}

pub trait RecordParserPort: Send + Sync {
    fn parse(&self, source: &str) -> anyhow::Result<Vec<PersonRow>>;
}

// Presentation side
pub trait RendererPort: Send + Sync {
    fn render_quote_table(&self, table: &QuoteTable) -> anyhow::Result<ImageBuffer>;
    fn render_distribution_chart(&self, stats: &AgeBandStats) -> anyhow::Result<ImageBuffer>;
}

#[async_trait]
pub trait ChatPort: Send + Sync {
    /// Download the text content of a shared file
    async fn file_content(&self, file_id: &str) -> anyhow::Result<String>;
    /// Upload an image and return its permalink
    async fn upload_file(&self, image: ImageBuffer) -> anyhow::Result<String>;
    async fn post_message(&self, channel: &str, text: &str, thread_ts: Option<&str>) -> anyhow::Result<()>;
}
