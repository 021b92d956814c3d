use crate::error::{ArchiveError, IngestError};
use crate::models::{DeletionReport, IndexEntry, Organization};
use crate::traits::{ArchiveStore, SearchIndex};
use tracing::{info, warn};

const WILDCARD: &str = "all";

/// What a bulk deletion covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionScope {
    All,
    Organization(Organization),
}

impl DeletionScope {
    /// Resolves the request fields. A company claim wins over the organization filter;
    /// a filter of exactly `all` selects everything.
    pub fn from_fields(
        organization_filter: Option<&str>,
        company_claim: Option<&str>,
    ) -> Result<Self, IngestError> {
        let claim = company_claim.map(str::trim).filter(|value| !value.is_empty());
        let filter = organization_filter
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match (claim, filter) {
            (Some(claim), _) => Organization::required(claim).map(Self::Organization),
            (None, Some(_)) if organization_filter == Some(WILDCARD) => Ok(Self::All),
            (None, Some(filter)) => Organization::required(filter).map(Self::Organization),
            (None, None) => Err(IngestError::InvalidArgument(
                "either an organization filter or a company claim is required".to_string(),
            )),
        }
    }

    fn covers(&self, entry: &IndexEntry) -> bool {
        match self {
            Self::All => true,
            Self::Organization(organization) => {
                Organization::normalize(&entry.organization) == *organization
            }
        }
    }
}

/// Removes archives and their index entries. Archive and index are cleaned independently.
pub struct DeletionManager<A, I>
where
    A: ArchiveStore,
    I: SearchIndex,
{
    archive: A,
    index: I,
}

impl<A, I> DeletionManager<A, I>
where
    A: ArchiveStore,
    I: SearchIndex,
{
    pub fn new(archive: A, index: I) -> Self {
        Self { archive, index }
    }

    /// Deletes `organization/file_name` from the archive and every index entry with the same
    /// organization and base name. A missing archive object is not an error.
    pub async fn delete_file(&self, path: &str) -> Result<DeletionReport, IngestError> {
        let (leading, file_name) = split_archive_path(path)?;
        let organization = Organization::required(leading)?;

        let archive_result = match self.archive.delete(path).await {
            Ok(()) => Ok(true),
            Err(ArchiveError::NotFound(_)) => {
                info!(path, "archive object not found, cleaning index only");
                Ok(false)
            }
            Err(error) => {
                warn!(path, %error, "archive delete failed, cleaning index anyway");
                Err(error)
            }
        };

        let index_entries_deleted = self
            .purge_index(|entry| {
                entry.file == file_name && Organization::normalize(&entry.organization) == organization
            })
            .await?;

        let archive_found = archive_result?;
        let report = DeletionReport {
            archives_deleted: usize::from(archive_found),
            index_entries_deleted,
            archive_found,
        };
        info!(path, ?report, "file deleted");
        Ok(report)
    }

    pub async fn delete_scope(&self, scope: &DeletionScope) -> Result<DeletionReport, IngestError> {
        let prefix = match scope {
            DeletionScope::All => None,
            DeletionScope::Organization(organization) => Some(organization.archive_prefix()),
        };

        let mut first_error: Option<ArchiveError> = None;
        let paths = match self.archive.list(prefix.as_deref()).await {
            Ok(paths) => paths,
            Err(error) => {
                warn!(?scope, %error, "archive listing failed, cleaning index anyway");
                first_error = Some(error);
                Vec::new()
            }
        };

        let archive_found = !paths.is_empty();
        let mut archives_deleted = 0;
        let mut archive_failures = 0;
        for path in &paths {
            match self.archive.delete(path).await {
                Ok(()) => archives_deleted += 1,
                Err(ArchiveError::NotFound(_)) => {}
                Err(error) => {
                    archive_failures += 1;
                    warn!(path = %path, %error, "archive delete failed, continuing");
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        let index_entries_deleted = self.purge_index(|entry| scope.covers(entry)).await?;

        if let Some(error) = first_error {
            warn!(
                ?scope,
                archives_deleted,
                archive_failures,
                index_entries_deleted,
                "scope deleted with archive failures"
            );
            return Err(error.into());
        }

        let report = DeletionReport {
            archives_deleted,
            index_entries_deleted,
            archive_found,
        };
        info!(?scope, ?report, "scope deleted");
        Ok(report)
    }

    async fn purge_index<F>(&self, matches: F) -> Result<usize, IngestError>
    where
        F: Fn(&IndexEntry) -> bool,
    {
        let ids = self
            .index
            .scan_all()
            .await?
            .into_iter()
            .filter(|entry| matches(entry))
            .map(|entry| entry.id)
            .collect::<Vec<_>>();

        if ids.is_empty() {
            return Ok(0);
        }

        self.index.delete_by_ids(&ids).await?;
        Ok(ids.len())
    }
}

/// Splits `organization/.../file_name` into its leading segment and base name.
fn split_archive_path(path: &str) -> Result<(&str, &str), IngestError> {
    let trimmed = path.trim_matches('/');
    match (trimmed.split_once('/'), trimmed.rsplit_once('/')) {
        (Some((leading, _)), Some((_, file_name))) if !leading.is_empty() && !file_name.is_empty() => {
            Ok((leading, file_name))
        }
        _ => Err(IngestError::InvalidArgument(format!(
            "expected <organization>/<file name>, got {path:?}"
        ))),
    }
}
