use crate::error::{ArchiveError, IngestError};
use crate::models::Organization;
use crate::traits::ArchiveStore;

/// An archived object read back for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFile {
    pub path: String,
    pub bytes: Vec<u8>,
}

/// Archive paths, restricted to one company when given.
pub async fn list_files<A>(archive: &A, company: Option<&str>) -> Result<Vec<String>, IngestError>
where
    A: ArchiveStore + ?Sized,
{
    let prefix = company
        .map(Organization::normalize)
        .filter(|organization| !organization.is_empty())
        .map(|organization| organization.archive_prefix());

    Ok(archive.list(prefix.as_deref()).await?)
}

/// Reads `name` from the archive. A name containing `/` is taken as a full path; a bare
/// file name resolves to the first archived object with that base name.
pub async fn fetch_file<A>(archive: &A, name: &str) -> Result<FetchedFile, IngestError>
where
    A: ArchiveStore + ?Sized,
{
    let path = if name.contains('/') {
        name.to_string()
    } else {
        archive
            .list(None)
            .await?
            .into_iter()
            .find(|path| base_name(path) == name)
            .ok_or_else(|| ArchiveError::NotFound(name.to_string()))?
    };

    let bytes = archive.read(&path).await?;
    Ok(FetchedFile { path, bytes })
}

fn base_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, file_name)| file_name)
}
