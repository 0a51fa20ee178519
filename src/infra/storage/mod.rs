//! Storage backends behind the [`ObjectStore`] port.

mod gcs;
mod local;

use std::sync::Arc;

use tracing::info;

pub use gcs::{DEFAULT_GCS_ENDPOINT, DEFAULT_METADATA_ENDPOINT, GcsOptions, GcsStore};
pub use local::LocalStore;

use crate::application::storage::ObjectStore;
use crate::config::StorageSettings;
use crate::infra::error::InfraError;

/// Select the backend: a configured bucket wins, otherwise the local directory.
pub fn build_store(settings: &StorageSettings) -> Result<Arc<dyn ObjectStore>, InfraError> {
    match &settings.gcs {
        Some(gcs) => {
            let store = GcsStore::new(GcsOptions {
                bucket: gcs.bucket.clone(),
                endpoint: gcs.endpoint.clone(),
                token: gcs.token.clone(),
                metadata_endpoint: gcs.metadata_endpoint.clone(),
            })?;
            info!(
                target = "gazette::storage",
                bucket = %gcs.bucket,
                "using cloud storage backend"
            );
            Ok(Arc::new(store))
        }
        None => {
            let store = LocalStore::new(settings.local_root.clone())?;
            info!(
                target = "gazette::storage",
                root = %settings.local_root.display(),
                "using local storage backend"
            );
            Ok(Arc::new(store))
        }
    }
}
