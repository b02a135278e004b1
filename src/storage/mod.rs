//! Object storage access for source FITS objects and CSV outputs
//! Uses Apache Arrow object_store crate

mod scratch;

pub use scratch::Scratch;

use bytes::Bytes;
use futures::StreamExt;
use object_store::aws::AmazonS3Builder;
use object_store::memory::InMemory;
use object_store::{ObjectStore, path::Path as StoragePath};
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::config::{StorageConfig, StorageProvider};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Object {key} is {size} bytes, over the {limit} byte scratch limit")]
    TooLarge { key: String, size: u64, limit: u64 },

    #[error("Scratch I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Bytes buffered from the object stream before each scratch write
pub const STAGING_BATCH_BYTES: usize = 8 * 1024 * 1024;

/// Metadata returned after upload
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub bucket: String,
    pub key: String,
    pub etag: Option<String>,
    pub size: usize,
}

/// Maps a bucket name to the store that serves it
pub trait BucketResolver: Send + Sync {
    fn store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>>;

    /// Drop any cached handles
    fn clear(&self) {}
}

/// S3 buckets, credentials and region taken from the `AWS_*` environment
pub struct S3Buckets {
    region: Option<String>,
    endpoint: Option<String>,
    allow_http: bool,
    cache: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl S3Buckets {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            region: config.region.clone(),
            endpoint: config.endpoint.clone(),
            allow_http: config.allow_http,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

impl BucketResolver for S3Buckets {
    fn store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(store) = cache.get(bucket) {
            return Ok(store.clone());
        }

        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_allow_http(self.allow_http);
        if let Some(region) = &self.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        let store: Arc<dyn ObjectStore> = Arc::new(builder.build()?);
        tracing::debug!(bucket, "Created S3 store");
        cache.insert(bucket.to_string(), store.clone());
        Ok(store)
    }

    fn clear(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// In-process buckets, created on first use
#[derive(Default)]
pub struct InMemoryBuckets {
    stores: Mutex<HashMap<String, Arc<InMemory>>>,
}

impl BucketResolver for InMemoryBuckets {
    fn store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        let mut stores = self.stores.lock().unwrap_or_else(|e| e.into_inner());
        let store = stores
            .entry(bucket.to_string())
            .or_insert_with(|| Arc::new(InMemory::new()))
            .clone();
        Ok(store)
    }

    fn clear(&self) {
        self.stores.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// Storage client wrapping object_store, addressed by bucket and key
#[derive(Clone)]
pub struct StorageClient {
    resolver: Arc<dyn BucketResolver>,
}

impl StorageClient {
    /// Create new storage client with any bucket resolver
    pub fn new(resolver: Arc<dyn BucketResolver>) -> Self {
        Self { resolver }
    }

    /// Create in-memory storage for testing/local replay
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBuckets::default()))
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        match config.provider {
            StorageProvider::S3 => Self::new(Arc::new(S3Buckets::new(config))),
            StorageProvider::Memory => Self::in_memory(),
        }
    }

    /// Forget cached per-bucket handles; the next call rebuilds them
    pub fn reset(&self) {
        self.resolver.clear();
    }

    /// Upload bytes to storage, replacing any existing object
    pub async fn upload(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<UploadMetadata> {
        let store = self.resolver.store(bucket)?;
        let path = StoragePath::from(key);
        let size = data.len();

        let put_result = store.put(&path, data.into()).await?;

        tracing::info!(bucket, key, size, "Uploaded to storage");

        Ok(UploadMetadata {
            bucket: bucket.to_string(),
            key: key.to_string(),
            etag: put_result.e_tag,
            size,
        })
    }

    /// Download a whole object into memory
    pub async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let store = self.resolver.store(bucket)?;
        let path = StoragePath::from(key);

        let result = store.get(&path).await.map_err(|e| not_found(e, bucket, key))?;
        let bytes = result.bytes().await?;

        tracing::info!(bucket, key, size = bytes.len(), "Downloaded from storage");

        Ok(bytes.to_vec())
    }

    /// Stream an object into `scratch`, refusing anything over `limit` bytes.
    ///
    /// Writes to the scratch area run on the blocking pool in batches of
    /// [`STAGING_BATCH_BYTES`]. The scratch area is handed back rewound to
    /// the start; on error it is dropped, which releases any temp file.
    pub async fn download_into(
        &self,
        bucket: &str,
        key: &str,
        mut scratch: Scratch,
        limit: u64,
    ) -> Result<Scratch> {
        let store = self.resolver.store(bucket)?;
        let path = StoragePath::from(key);

        let result = store.get(&path).await.map_err(|e| not_found(e, bucket, key))?;

        let reported = result.meta.size;
        if reported > limit {
            return Err(StorageError::TooLarge {
                key: key.to_string(),
                size: reported,
                limit,
            });
        }

        let mut stream = result.into_stream();
        let mut received: u64 = 0;
        let mut pending: Vec<Bytes> = Vec::new();
        let mut pending_bytes = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            received += chunk.len() as u64;
            if received > limit {
                return Err(StorageError::TooLarge {
                    key: key.to_string(),
                    size: received,
                    limit,
                });
            }
            pending_bytes += chunk.len();
            pending.push(chunk);

            if pending_bytes >= STAGING_BATCH_BYTES {
                scratch = stage(scratch, std::mem::take(&mut pending)).await?;
                pending_bytes = 0;
            }
        }
        scratch = stage(scratch, pending).await?;
        scratch.rewind()?;

        tracing::info!(bucket, key, size = received, "Downloaded to scratch");

        Ok(scratch)
    }

    /// Delete an object. A missing object counts as deleted.
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let store = self.resolver.store(bucket)?;
        let path = StoragePath::from(key);

        match store.delete(&path).await {
            Ok(()) => {}
            Err(object_store::Error::NotFound { .. }) => {
                tracing::debug!(bucket, key, "Delete of missing object");
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(bucket, key, "Deleted from storage");
        Ok(())
    }

    /// Check if key exists
    pub async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let store = self.resolver.store(bucket)?;
        let path = StoragePath::from(key);

        match store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Append `chunks` to `scratch` off the async executor
async fn stage(mut scratch: Scratch, chunks: Vec<Bytes>) -> Result<Scratch> {
    tokio::task::spawn_blocking(move || -> Result<Scratch> {
        for chunk in &chunks {
            scratch.write_all(chunk)?;
        }
        scratch.flush()?;
        Ok(scratch)
    })
    .await
    .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
}

fn not_found(e: object_store::Error, bucket: &str, key: &str) -> StorageError {
    match e {
        object_store::Error::NotFound { .. } => StorageError::NotFound(format!("{bucket}/{key}")),
        other => other.into(),
    }
}
