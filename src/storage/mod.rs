//! Object-storage backends.
//!
//! Handlers talk to storage through the [`ObjectStore`] trait; the backend
//! is chosen once at startup from configuration.

pub mod filesystem;
pub mod s3;

pub use filesystem::FilesystemStore;
pub use s3::S3ObjectStore;

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::AppError;

/// Capability set the app needs from a storage backend.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// All object names in the container, sorted.
    async fn list_objects(&self) -> Result<Vec<String>, AppError>;

    /// Full content of a named object.
    async fn get_object(&self, name: &str) -> Result<Vec<u8>, AppError>;

    /// Store content under a name, replacing any existing object.
    async fn put_object(&self, name: &str, content: &[u8]) -> Result<(), AppError>;

    /// Remove a named object; removing a missing object is an error.
    async fn delete_object(&self, name: &str) -> Result<(), AppError>;
}

/// Outcome of deleting a single object.
#[derive(Debug)]
pub struct DeletionOutcome {
    pub name: String,
    pub error: Option<AppError>,
}

/// Per-item results of a multi-object deletion.
#[derive(Debug, Default)]
pub struct DeletionReport {
    pub outcomes: Vec<DeletionOutcome>,
}

impl DeletionReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn deleted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_none()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeletionOutcome> {
        self.outcomes.iter().filter(|o| o.error.is_some())
    }
}

/// Delete each named object independently; a failure on one name is
/// recorded and the remaining names are still attempted.
pub async fn delete_objects(store: &dyn ObjectStore, names: &[String]) -> DeletionReport {
    let mut report = DeletionReport::default();
    for name in names {
        let error = match store.delete_object(name).await {
            Ok(()) => {
                info!(filename = %name, "Deleted object");
                None
            }
            Err(err) => {
                error!(filename = %name, error = %err, "Failed to delete object");
                Some(err)
            }
        };
        report.outcomes.push(DeletionOutcome {
            name: name.clone(),
            error,
        });
    }
    report
}
