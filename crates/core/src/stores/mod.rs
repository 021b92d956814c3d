pub mod filesystem;
pub mod opensearch;

pub use filesystem::LocalArchive;
pub use opensearch::OpenSearchIndex;
