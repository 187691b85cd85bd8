use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as StoragePath;
use object_store::{ObjectStore, PutMode, PutOptions, PutPayload};
use tracing::{debug, info};

use super::naming::{next_candidate, sanitize};
use super::{Result, UploadError, is_image_name};

/// Upper bound on `name (n).ext` probes for a single upload
const MAX_NAME_ATTEMPTS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
}

/// Flat upload directory behind an object store
#[derive(Clone)]
pub struct UploadStore {
    store: Arc<dyn ObjectStore>,
}

impl UploadStore {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Local directory, created if missing
    pub fn local(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|source| UploadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let store = LocalFileSystem::new_with_prefix(dir)?;
        Ok(Self::new(Arc::new(store)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// Image files at the top level, sorted by name
    pub async fn list_images(&self) -> Result<Vec<StoredFile>> {
        let listing = self.store.list_with_delimiter(None).await?;

        let mut files: Vec<StoredFile> = listing
            .objects
            .into_iter()
            .filter_map(|meta| {
                let name = meta.location.filename()?.to_string();
                is_image_name(&name).then_some(StoredFile {
                    name,
                    size: meta.size,
                })
            })
            .collect();

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Store `data` under `client_name` or the first free `name (n).ext`
    ///
    /// Each attempt is a create-if-absent put, so concurrent uploads of the
    /// same name end up in distinct files.
    pub async fn store(&self, client_name: &str, data: Bytes) -> Result<StoredFile> {
        let mut name =
            sanitize(client_name).ok_or_else(|| UploadError::InvalidName(client_name.to_string()))?;
        let size = data.len() as u64;
        let payload = PutPayload::from(data);

        for _ in 0..MAX_NAME_ATTEMPTS {
            let location = StoragePath::from(name.as_str());
            let options = PutOptions {
                mode: PutMode::Create,
                ..Default::default()
            };

            match self.store.put_opts(&location, payload.clone(), options).await {
                Ok(_) => {
                    info!(name = %name, size, "Stored upload");
                    return Ok(StoredFile { name, size });
                }
                Err(object_store::Error::AlreadyExists { .. }) => {
                    debug!(name = %name, "Upload name taken");
                    name = next_candidate(&name);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(UploadError::NoFreeName {
            name: client_name.to_string(),
            attempts: MAX_NAME_ATTEMPTS,
        })
    }

    /// Cheap liveness probe for the health endpoint
    pub async fn check(&self) -> Result<()> {
        self.store.list_with_delimiter(None).await?;
        Ok(())
    }
}
