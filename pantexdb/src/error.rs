use thiserror::Error;

#[derive(Error, Debug)]
pub enum PantexError {
    /// A lookup by identifier or query came back empty.
    #[error("Document not found: {collection}/{target}")]
    NotFound { collection: String, target: String },

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The collection handle outlived a database teardown.
    #[error("Collection '{collection}' is closed")]
    Closed { collection: String },

    #[error("Duplicate identifier collision: {collection}/{id}")]
    DuplicateIdentifier { collection: String, id: String },

    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

impl PantexError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PantexError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, PantexError>;
