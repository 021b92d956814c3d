use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("index error: {0}")]
    Index(#[from] SearchError),

    #[error("index upload incomplete: {failed} of {attempted} batches failed")]
    IncompleteIndex { failed: usize, attempted: usize },

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("worker pool: {0}")]
    WorkerPool(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("search request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive object not found: {0}")]
    NotFound(String),

    #[error("invalid archive path: {0}")]
    InvalidPath(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive backend failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("input of {len} characters exceeds the model limit of {max}")]
    InputTooLong { len: usize, max: usize },

    #[error("embedding model unavailable: {0}")]
    Unavailable(String),

    #[error("embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
