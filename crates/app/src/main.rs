use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use dossier_ingest_core::{
    discover_upload_files, embed_text, fetch_file, list_files, CharacterNgramEmbedder,
    DeletionManager, DeletionScope, Embedder, HttpEmbedder, HttpEmbedderConfig, IngestionOptions,
    IngestionPipeline, LocalArchive, OpenSearchIndex, Organization, UploadedFile, WorkerPool,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dossier-ingest", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding archived originals
    #[arg(long, env = "ARCHIVE_DIR", default_value = "./archive")]
    archive_dir: PathBuf,

    /// OpenSearch base URL
    #[arg(long, env = "OPENSEARCH_URL", default_value = "http://localhost:9200")]
    opensearch_url: String,

    /// OpenSearch index name
    #[arg(long, env = "OPENSEARCH_INDEX", default_value = "documents")]
    opensearch_index: String,

    /// OpenAI-compatible embeddings endpoint; the local trigram embedder is used when unset.
    #[arg(long, env = "EMBEDDING_ENDPOINT")]
    embedding_endpoint: Option<String>,

    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    #[arg(long, env = "EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Upper bound on concurrent conversion and embedding tasks
    #[arg(long, env = "THREAD_POOL_MAX_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Target chunk size in characters
    #[arg(long, env = "CHUNK_SIZE", default_value_t = 5_000)]
    chunk_size: usize,

    #[arg(long, env = "INDEX_BATCH_SIZE", default_value_t = 5)]
    batch_size: usize,

    /// Pause between index batches, in milliseconds
    #[arg(long, env = "INDEX_BATCH_PACE_MS", default_value_t = 500)]
    batch_pace_ms: u64,

    /// Stop uploading a file's remaining batches after the first rejected one.
    #[arg(long, default_value_t = false)]
    abort_on_batch_failure: bool,

    /// Keep partially indexed records when a file fails.
    #[arg(long, default_value_t = false)]
    no_rollback: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest files for one organization and print the outcome as JSON.
    Upload {
        #[arg(long)]
        organization: String,
        /// Also ingest every .pdf and .xml below this folder.
        #[arg(long)]
        folder: Option<PathBuf>,
        files: Vec<PathBuf>,
    },
    /// Delete one archived file (`organization/file_name`) and its index entries.
    DeleteFile { path: String },
    /// Delete everything for an organization, or everything with `--organization-filter all`.
    DeleteAll {
        #[arg(long)]
        organization_filter: Option<String>,
        /// Takes precedence over the organization filter.
        #[arg(long)]
        company_claim: Option<String>,
    },
    /// List archived files.
    List {
        #[arg(long)]
        company: Option<String>,
    },
    /// Write an archived file to `--output` or stdout.
    Fetch {
        name: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Embed a text and print `{"data":[{"embedding":[...]}]}`.
    Embed { text: String },
    /// Create the search index with its vector mapping if missing.
    EnsureIndex,
}

impl Cli {
    fn options(&self) -> IngestionOptions {
        IngestionOptions {
            chunk_size: self.chunk_size,
            batch_size: self.batch_size,
            batch_pace: Duration::from_millis(self.batch_pace_ms),
            abort_on_batch_failure: self.abort_on_batch_failure,
            rollback_on_failure: !self.no_rollback,
        }
    }

    fn embedder(&self) -> Arc<dyn Embedder> {
        match &self.embedding_endpoint {
            Some(endpoint) => Arc::new(HttpEmbedder::new(HttpEmbedderConfig {
                endpoint: endpoint.clone(),
                api_key: self.embedding_api_key.clone(),
                model: self.embedding_model.clone(),
                dimensions: self.embedding_dimensions,
            })),
            None => Arc::new(CharacterNgramEmbedder::new(self.embedding_dimensions)),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "dossier-ingest boot"
    );

    let pool = WorkerPool::new(cli.workers);
    let result = run(&cli, &pool).await;
    pool.shutdown();
    result
}

async fn run(cli: &Cli, pool: &WorkerPool) -> anyhow::Result<()> {
    let archive = Arc::new(LocalArchive::new(&cli.archive_dir).with_context(|| {
        format!("unable to open archive at {}", cli.archive_dir.display())
    })?);
    let embedder = cli.embedder();
    let index = Arc::new(OpenSearchIndex::new(
        &cli.opensearch_url,
        cli.opensearch_index.as_str(),
        embedder.dimensions(),
    )?);

    match &cli.command {
        Command::Upload {
            organization,
            folder,
            files,
        } => {
            let organization = Organization::required(organization)?;
            let mut paths = files.clone();
            if let Some(folder) = folder {
                paths.extend(discover_upload_files(folder));
            }

            let uploads = read_uploads(&paths).await?;
            let pipeline =
                IngestionPipeline::new(archive, index, embedder, pool.clone(), cli.options())?;
            let outcome = pipeline.ingest_many(uploads, &organization).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::DeleteFile { path } => {
            let report = DeletionManager::new(archive, index).delete_file(path).await?;
            if !report.archive_found {
                warn!(path = %path, "no archived file at path");
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::DeleteAll {
            organization_filter,
            company_claim,
        } => {
            let scope =
                DeletionScope::from_fields(organization_filter.as_deref(), company_claim.as_deref())?;
            let report = DeletionManager::new(archive, index).delete_scope(&scope).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::List { company } => {
            for path in list_files(archive.as_ref(), company.as_deref()).await? {
                println!("{path}");
            }
        }
        Command::Fetch { name, output } => {
            let fetched = fetch_file(archive.as_ref(), name).await?;
            match output {
                Some(output) => {
                    tokio::fs::write(output, &fetched.bytes)
                        .await
                        .with_context(|| format!("unable to write {}", output.display()))?;
                    info!(path = %fetched.path, output = %output.display(), bytes = fetched.bytes.len(), "file fetched");
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&fetched.bytes).await?;
                    stdout.flush().await?;
                }
            }
        }
        Command::Embed { text } => {
            let response = embed_text(pool, embedder, text.clone()).await?;
            println!("{}", serde_json::to_string(&response)?);
        }
        Command::EnsureIndex => {
            index.ensure_index().await?;
            println!(
                "index {} ready at {}",
                index.index_name(),
                Utc::now().to_rfc3339()
            );
        }
    }

    Ok(())
}

async fn read_uploads(paths: &[PathBuf]) -> anyhow::Result<Vec<UploadedFile>> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("unable to read {}", path.display()))?;
        uploads.push(UploadedFile::new(upload_name(path), bytes));
    }
    Ok(uploads)
}

fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
