pub mod catalog;
pub mod chunking;
pub mod deletion;
pub mod dossier;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod indexer;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod pool;
pub mod stores;
pub mod traits;

#[cfg(test)]
mod test_support;

pub use catalog::{fetch_file, list_files, FetchedFile};
pub use chunking::{chunk_text, ChunkingConfig, Chunks};
pub use deletion::{DeletionManager, DeletionScope};
pub use dossier::extract_dossier_units;
pub use embeddings::{
    embed_text, CharacterNgramEmbedder, Embedder, EmbeddingResponse, HttpEmbedder,
    HttpEmbedderConfig, DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{ArchiveError, EmbeddingError, IngestError, SearchError};
pub use extractor::{extract_pdf_units, LopdfExtractor, PageText, PdfExtractor};
pub use indexer::{upload_in_batches, BatchConfig, BatchReport};
pub use ingest::{discover_upload_files, prepare_file, ChunkDraft};
pub use models::{
    DeletionReport, ExtractedUnit, IndexEntry, IngestRecord, IngestionOptions, Organization,
    SourceKind, UploadOutcome, UploadedFile,
};
pub use orchestrator::{FileOutcome, IngestionPipeline};
pub use pool::WorkerPool;
pub use stores::{LocalArchive, OpenSearchIndex};
pub use traits::{ArchiveStore, SearchIndex};
