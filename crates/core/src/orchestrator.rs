use crate::chunking::ChunkingConfig;
use crate::embeddings::Embedder;
use crate::error::IngestError;
use crate::indexer::{upload_in_batches, BatchConfig, BatchReport};
use crate::ingest::{prepare_file, ChunkDraft};
use crate::models::{IngestRecord, IngestionOptions, Organization, UploadOutcome, UploadedFile};
use crate::pool::WorkerPool;
use crate::traits::{ArchiveStore, SearchIndex};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Processed(String),
    Skipped(String),
}

enum Disposition {
    Indexed { chunks: usize },
    AlreadyArchived,
}

/// Drives one upload from bytes to archive: existence check, conversion, embedding,
/// batched indexing, archive write. A file is archived only when every batch was accepted.
pub struct IngestionPipeline<A, I>
where
    A: ArchiveStore,
    I: SearchIndex,
{
    archive: A,
    index: I,
    embedder: Arc<dyn Embedder>,
    pool: WorkerPool,
    options: IngestionOptions,
    chunking: ChunkingConfig,
}

impl<A, I> IngestionPipeline<A, I>
where
    A: ArchiveStore,
    I: SearchIndex,
{
    pub fn new(
        archive: A,
        index: I,
        embedder: Arc<dyn Embedder>,
        pool: WorkerPool,
        options: IngestionOptions,
    ) -> Result<Self, IngestError> {
        let chunking = ChunkingConfig::try_from(&options)?;
        Ok(Self {
            archive,
            index,
            embedder,
            pool,
            options,
            chunking,
        })
    }

    pub fn archive(&self) -> &A {
        &self.archive
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Files are handled one after another; a failing file never affects the others.
    pub async fn ingest_many(
        &self,
        files: Vec<UploadedFile>,
        organization: &Organization,
    ) -> UploadOutcome {
        let mut outcome = UploadOutcome::default();

        for file in files {
            match self.ingest_one(file, organization).await {
                FileOutcome::Processed(name) => outcome.processed_files.push(name),
                FileOutcome::Skipped(name) => outcome.skipped_files.push(name),
            }
        }

        info!(
            organization = %organization,
            processed = outcome.processed_files.len(),
            skipped = outcome.skipped_files.len(),
            "upload finished"
        );
        outcome
    }

    pub async fn ingest_one(&self, file: UploadedFile, organization: &Organization) -> FileOutcome {
        let name = file.name.clone();

        match self.try_ingest(file, organization).await {
            Ok(Disposition::Indexed { chunks }) => {
                info!(file = %name, organization = %organization, chunks, "file ingested");
                FileOutcome::Processed(name)
            }
            Ok(Disposition::AlreadyArchived) => {
                info!(file = %name, organization = %organization, "file already archived, skipping");
                FileOutcome::Skipped(name)
            }
            Err(error) => {
                warn!(file = %name, organization = %organization, %error, "file skipped");
                FileOutcome::Skipped(name)
            }
        }
    }

    async fn try_ingest(
        &self,
        file: UploadedFile,
        organization: &Organization,
    ) -> Result<Disposition, IngestError> {
        if organization.is_empty() {
            return Err(IngestError::InvalidArgument(
                "organization must not be empty".to_string(),
            ));
        }

        let UploadedFile { name, bytes } = file;
        let path = organization.archive_path(&name);

        if self.archive.exists(&path).await? {
            return Ok(Disposition::AlreadyArchived);
        }
        if bytes.is_empty() {
            return Err(IngestError::InvalidArgument(format!("{name} is empty")));
        }

        let bytes = Arc::new(bytes);
        let drafts = {
            let bytes = Arc::clone(&bytes);
            let file_name = name.clone();
            let chunking = self.chunking;
            self.pool
                .run(move || prepare_file(&file_name, &bytes, chunking))
                .await??
        };

        let records = self.embed_drafts(drafts, organization).await?;
        let chunks = records.len();
        let report = upload_in_batches(&self.index, &records, BatchConfig::from(&self.options)).await;
        // Vectors are not needed past this point.
        drop(records);

        if !report.is_complete() {
            self.roll_back(&name, &report).await;
            return Err(IngestError::IncompleteIndex {
                failed: report.failed,
                attempted: report.attempted,
            });
        }

        if let Err(error) = self.archive.write(&path, &bytes).await {
            self.roll_back(&name, &report).await;
            return Err(error.into());
        }

        Ok(Disposition::Indexed { chunks })
    }

    async fn embed_drafts(
        &self,
        drafts: Vec<ChunkDraft>,
        organization: &Organization,
    ) -> Result<Vec<IngestRecord>, IngestError> {
        let mut records = Vec::with_capacity(drafts.len());

        for draft in drafts {
            let ChunkDraft {
                title,
                file,
                page,
                total_pages,
                content,
            } = draft;
            let embedder = Arc::clone(&self.embedder);

            let (content, vector) = self
                .pool
                .run(move || {
                    let vector = embedder.encode(&content);
                    (content, vector)
                })
                .await?;

            records.push(IngestRecord {
                id: Uuid::new_v4().to_string(),
                organization: organization.clone(),
                title,
                page,
                total_pages,
                file,
                content,
                content_vector: vector?,
                keywords: Vec::new(),
            });
        }

        Ok(records)
    }

    async fn roll_back(&self, file_name: &str, report: &BatchReport) {
        if !self.options.rollback_on_failure || report.indexed_ids.is_empty() {
            return;
        }

        match self.index.delete_by_ids(&report.indexed_ids).await {
            Ok(()) => warn!(
                file = %file_name,
                removed = report.indexed_ids.len(),
                "rolled back partially indexed file"
            ),
            Err(rollback_error) => error!(
                file = %file_name,
                orphaned = report.indexed_ids.len(),
                %rollback_error,
                "rollback failed, index entries left behind"
            ),
        }
    }
}
