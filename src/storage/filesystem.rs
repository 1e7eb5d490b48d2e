//! Filesystem-backed storage for local development and tests.
//!
//! Objects are plain files under the container root; nested names map to
//! subdirectories.

use std::fs;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::AppError;
use crate::storage::ObjectStore;

pub struct FilesystemStore {
    root_dir: PathBuf,
}

impl FilesystemStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root_dir = root_dir.into();
        fs::create_dir_all(&root_dir)?;
        Ok(Self { root_dir })
    }

    /// Resolve a name below the container root, rejecting anything that
    /// could escape it.
    fn object_path(&self, name: &str) -> Result<PathBuf, AppError> {
        if name.is_empty() {
            return Err(AppError::InvalidObjectName(name.to_string()));
        }
        let relative = Path::new(name);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(AppError::InvalidObjectName(name.to_string()));
        }
        Ok(self.root_dir.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn list_objects(&self) -> Result<Vec<String>, AppError> {
        fn collect_names(
            dir: &Path,
            root: &Path,
            names: &mut Vec<String>,
        ) -> Result<(), std::io::Error> {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();

                if path.is_file() {
                    let relative = path.strip_prefix(root).map_err(std::io::Error::other)?;
                    names.push(relative.to_string_lossy().to_string());
                } else if path.is_dir() {
                    collect_names(&path, root, names)?;
                }
            }
            Ok(())
        }

        let mut names = Vec::new();
        collect_names(&self.root_dir, &self.root_dir, &mut names)?;
        names.sort();
        debug!(count = names.len(), "Listed objects");
        Ok(names)
    }

    async fn get_object(&self, name: &str) -> Result<Vec<u8>, AppError> {
        let file_path = self.object_path(name)?;
        debug!(filename = %name, path = ?file_path, "Reading object");

        match async_fs::read(&file_path).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::ObjectNotFound(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn put_object(&self, name: &str, content: &[u8]) -> Result<(), AppError> {
        let file_path = self.object_path(name)?;
        debug!(filename = %name, path = ?file_path, size = content.len(), "Writing object");

        if let Some(parent) = file_path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        // Write to a temp file and rename so readers never see partial content
        let temp_path = file_path.with_extension("tmp");
        let mut file = async_fs::File::create(&temp_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        drop(file);

        async_fs::rename(&temp_path, &file_path).await?;
        Ok(())
    }

    async fn delete_object(&self, name: &str) -> Result<(), AppError> {
        let file_path = self.object_path(name)?;
        debug!(filename = %name, path = ?file_path, "Deleting object");

        if !file_path.is_file() {
            return Err(AppError::ObjectNotFound(name.to_string()));
        }

        async_fs::remove_file(&file_path).await?;
        Ok(())
    }
}
