//! Directory-backed vector store: one JSON snapshot per collection.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::in_memory_store::PointSet;
use crate::vector_store::{BoxFuture, ScoredVectorPoint, VectorPoint, VectorStore, VectorStoreError};

/// Persists collections under a directory so indexed records survive between
/// process runs.
///
/// Every read-modify-write of a collection holds an exclusive lock on a
/// sibling `.{collection}.lock` file, so several processes sharing one
/// directory serialize their writes. New snapshots are written to a uniquely
/// named temporary file and renamed over the old one; readers never observe a
/// half-written collection.
pub struct LocalVectorStore {
    root: PathBuf,
}

impl std::fmt::Debug for LocalVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalVectorStore")
            .field("root", &self.root)
            .finish()
    }
}

impl LocalVectorStore {
    /// The directory is created lazily on the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, collection: &str) -> Result<PathBuf, VectorStoreError> {
        validate_name(collection)?;
        Ok(self.root.join(format!("{collection}.json")))
    }

    async fn load(&self, collection: &str) -> Result<Option<PointSet>, VectorStoreError> {
        let path = self.collection_path(collection)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => parse_snapshot(&path, &bytes).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Run `op` on the blocking pool while holding the collection's file lock.
    async fn with_lock<T, F>(&self, collection: &str, op: F) -> Result<T, VectorStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&CollectionFiles) -> Result<T, VectorStoreError> + Send + 'static,
    {
        validate_name(collection)?;
        let files = CollectionFiles::new(&self.root, collection);
        tokio::task::spawn_blocking(move || {
            let _lock = files.lock()?;
            op(&files)
        })
        .await
        .map_err(|e| VectorStoreError::Io(std::io::Error::other(e)))?
    }
}

fn validate_name(collection: &str) -> Result<(), VectorStoreError> {
    if collection.is_empty() || collection.contains(['/', '\\']) || collection.starts_with('.') {
        return Err(VectorStoreError::Collection(format!(
            "invalid collection name: {collection:?}"
        )));
    }
    Ok(())
}

fn parse_snapshot(path: &Path, bytes: &[u8]) -> Result<PointSet, VectorStoreError> {
    serde_json::from_slice(bytes)
        .map_err(|e| VectorStoreError::Serialization(format!("{}: {e}", path.display())))
}

/// Paths of one collection's snapshot and lock file.
struct CollectionFiles {
    root: PathBuf,
    snapshot: PathBuf,
    lock: PathBuf,
}

impl CollectionFiles {
    fn new(root: &Path, collection: &str) -> Self {
        Self {
            root: root.to_path_buf(),
            snapshot: root.join(format!("{collection}.json")),
            lock: root.join(format!(".{collection}.lock")),
        }
    }

    /// Blocks until this process holds the exclusive lock. Released on drop.
    fn lock(&self) -> Result<File, VectorStoreError> {
        std::fs::create_dir_all(&self.root)?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock)?;
        file.lock()?;
        Ok(file)
    }

    fn read(&self) -> Result<Option<PointSet>, VectorStoreError> {
        match std::fs::read(&self.snapshot) {
            Ok(bytes) => parse_snapshot(&self.snapshot, &bytes).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, set: &PointSet) -> Result<(), VectorStoreError> {
        let bytes =
            serde_json::to_vec(set).map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.snapshot).map_err(|e| e.error)?;
        Ok(())
    }
}

impl VectorStore for LocalVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        vector_size: u64,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let created = self
                .with_lock(&collection, move |files| {
                    if files.read()?.is_some() {
                        return Ok(false);
                    }
                    files.write(&PointSet::new(vector_size))?;
                    Ok(true)
                })
                .await?;
            if created {
                tracing::debug!(collection = %collection, vector_size, root = %self.root.display(), "created collection");
            }
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let path = self.collection_path(&collection)?;
            Ok(tokio::fs::try_exists(&path).await?)
        })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if !self.collection_exists(&collection).await? {
                return Ok(());
            }
            self.with_lock(&collection, |files| {
                match std::fs::remove_file(&files.snapshot) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e.into()),
                }
            })
            .await
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let name = collection.clone();
            self.with_lock(&collection, move |files| {
                let mut set = files.read()?.ok_or_else(|| {
                    VectorStoreError::Upsert(format!("collection {name} not found"))
                })?;
                set.upsert(points)?;
                files.write(&set)
            })
            .await
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let set = self.load(&collection).await?.ok_or_else(|| {
                VectorStoreError::Search(format!("collection {collection} not found"))
            })?;
            Ok(set.search(&vector, limit))
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<usize, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            Ok(self
                .load(&collection)
                .await?
                .map_or(0, |set| set.points.len()))
        })
    }
}
