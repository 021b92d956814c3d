use crate::error::ArchiveError;
use crate::traits::ArchiveStore;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Archive kept on the local filesystem; `organization/file_name` maps to a file below `root`.
#[derive(Debug, Clone)]
pub struct LocalArchive {
    root: PathBuf,
}

impl LocalArchive {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ArchiveError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, ArchiveError> {
        let relative = Path::new(path);
        let plain = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !plain {
            return Err(ArchiveError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

fn not_found(path: &str, error: std::io::Error) -> ArchiveError {
    if error.kind() == ErrorKind::NotFound {
        ArchiveError::NotFound(path.to_string())
    } else {
        ArchiveError::Io(error)
    }
}

#[async_trait]
impl ArchiveStore for LocalArchive {
    async fn exists(&self, path: &str) -> Result<bool, ArchiveError> {
        let target = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&target).await?)
    }

    async fn write(&self, path: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, ArchiveError> {
        let target = self.resolve(path)?;
        tokio::fs::read(&target)
            .await
            .map_err(|error| not_found(path, error))
    }

    async fn delete(&self, path: &str) -> Result<(), ArchiveError> {
        let target = self.resolve(path)?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(|error| not_found(path, error))
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>, ArchiveError> {
        let root = self.root.clone();
        let prefix = prefix.map(str::to_string);

        tokio::task::spawn_blocking(move || {
            let mut paths = WalkDir::new(&root)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| {
                    let relative = entry.path().strip_prefix(&root).ok()?;
                    let parts = relative
                        .components()
                        .map(|component| component.as_os_str().to_str())
                        .collect::<Option<Vec<_>>>()?;
                    Some(parts.join("/"))
                })
                .filter(|path| prefix.as_deref().map_or(true, |prefix| path.starts_with(prefix)))
                .collect::<Vec<_>>();
            paths.sort_unstable();
            paths
        })
        .await
        .map_err(|error| ArchiveError::Backend(format!("archive listing failed: {error}")))
    }
}
