use thiserror::Error;

#[derive(Error, Debug)]
pub enum CensusError {
    #[error("Failed to fetch census file: {0}")]
    Fetch(String),

    #[error("Census parse failed: {0}")]
    Parse(String),

    #[error("Quote engine received no census rows")]
    EmptyInput,

    #[error("Record store rejected census creation: {0}")]
    RecordStore(String),

    #[error("Commit of batch {batch_index} failed: {cause}")]
    Commit { batch_index: usize, cause: String },

    #[error("Failed to deliver {artifact}: {cause}")]
    Adapter { artifact: String, cause: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CensusError {
    /// Name of the processing stage that produced this error.
    pub fn stage(&self) -> &'static str {
        match self {
            CensusError::RecordStore(_) => "created",
            CensusError::Parse(_) => "parsing",
            CensusError::Commit { .. } => "committing",
            CensusError::EmptyInput => "quoting",
            CensusError::Adapter { .. } => "announcing",
            CensusError::Fetch(_) | CensusError::Http(_) | CensusError::Json(_) => "fetching",
            CensusError::Toml(_) | CensusError::Io(_) | CensusError::Config(_) => "setup",
        }
    }

    /// Ingestion-stage failures abort the whole request; adapter failures only degrade it.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CensusError::Adapter { .. })
    }
}

pub type Result<T> = std::result::Result<T, CensusError>;
