//! Object storage publishing (S3, R2, GCS, Azure, local)

use crate::error::{Error, Result};
use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::azure::MicrosoftAzureBuilder;
use object_store::buffered::BufWriter;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Destination key of one table's artifact
///
/// Format: `{prefix}/{table}.csv`, e.g. `Gestion/producto.csv`. Not versioned;
/// each run overwrites the previous object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteKey(String);

impl RemoteKey {
    /// Derive the key for a table under a prefix
    pub fn new(prefix: &str, table: &str) -> Self {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            Self(format!("{table}.csv"))
        } else {
            Self(format!("{prefix}/{table}.csv"))
        }
    }

    /// The key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Uploads a local artifact to a remote key
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Transfer the file at `artifact` to `key`, replacing any prior object
    ///
    /// Returns the fully-qualified remote location.
    async fn publish(&self, artifact: &Path, key: &RemoteKey) -> Result<String>;
}

/// Object store destination parsed from a bucket URL
#[derive(Debug, Clone)]
pub struct ObjectPublisher {
    /// The object store implementation
    store: Arc<dyn ObjectStore>,
    /// Bucket or container name (empty for local)
    bucket: String,
    /// URL scheme for logging
    scheme: String,
}

impl ObjectPublisher {
    /// Wrap an existing object store
    pub fn new(store: Arc<dyn ObjectStore>, scheme: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            scheme: scheme.into(),
        }
    }

    /// Parse a destination URL and create the matching object store
    ///
    /// Supported formats:
    /// - `s3://bucket` - AWS S3
    /// - `r2://bucket` - Cloudflare R2 (S3-compatible)
    /// - `gs://bucket` - Google Cloud Storage
    /// - `az://container` - Azure Blob Storage
    /// - `/local/path` or `file:///local/path` - Local filesystem
    ///
    /// Credentials are read from the standard environment variables of each
    /// provider. Key prefixes belong in the export config, not in the URL.
    pub fn parse(url: &str) -> Result<Self> {
        if let Some(rest) = url.strip_prefix("s3://") {
            Self::parse_s3(rest, false)
        } else if let Some(rest) = url.strip_prefix("r2://") {
            Self::parse_s3(rest, true)
        } else if let Some(rest) = url.strip_prefix("gs://") {
            let bucket = bucket_name(rest, "gs")?;
            let store = GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(bucket)
                .build()
                .map_err(|e| Error::config(format!("Failed to create GCS client: {e}")))?;
            Ok(Self::new(Arc::new(store), "gs", bucket))
        } else if let Some(rest) = url.strip_prefix("az://") {
            let container = bucket_name(rest, "az")?;
            let store = MicrosoftAzureBuilder::from_env()
                .with_container_name(container)
                .build()
                .map_err(|e| Error::config(format!("Failed to create Azure client: {e}")))?;
            Ok(Self::new(Arc::new(store), "az", container))
        } else {
            Self::parse_local(url)
        }
    }

    /// Parse S3 or R2 bucket
    fn parse_s3(rest: &str, is_r2: bool) -> Result<Self> {
        let scheme = if is_r2 { "r2" } else { "s3" };
        let bucket = bucket_name(rest, scheme)?;

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);

        // R2 endpoint: https://<account_id>.r2.cloudflarestorage.com
        if is_r2 {
            if let Ok(endpoint) = std::env::var("R2_ENDPOINT_URL") {
                builder = builder.with_endpoint(endpoint);
            }
        }

        let store = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to create {scheme} client: {e}")))?;

        Ok(Self::new(Arc::new(store), scheme, bucket))
    }

    /// Parse local filesystem path
    fn parse_local(path: &str) -> Result<Self> {
        let path = path.strip_prefix("file://").unwrap_or(path);

        std::fs::create_dir_all(path)
            .map_err(|e| Error::config(format!("Failed to create directory {path}: {e}")))?;

        let store = LocalFileSystem::new_with_prefix(path)
            .map_err(|e| Error::config(format!("Failed to create local store: {e}")))?;

        Ok(Self::new(Arc::new(store), "file", path.trim_end_matches('/')))
    }

    /// Fully-qualified location of a key, for logging
    pub fn location(&self, key: &RemoteKey) -> String {
        format!("{}://{}/{key}", self.scheme, self.bucket)
    }

    /// Stream a local file to `key`, in parts when it is large
    async fn upload(&self, artifact: &Path, key: &RemoteKey) -> std::io::Result<()> {
        let mut file = tokio::fs::File::open(artifact).await?;
        let mut writer = BufWriter::new(Arc::clone(&self.store), ObjectPath::from(key.as_str()));

        let copied = tokio::io::copy(&mut file, &mut writer).await;
        match copied {
            Ok(bytes) => {
                writer.shutdown().await?;
                tracing::debug!("Streamed {} bytes to {}", bytes, key);
                Ok(())
            }
            Err(e) => {
                if let Err(abort) = writer.abort().await {
                    tracing::warn!("Failed to abort upload of {}: {}", key, abort);
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Publisher for ObjectPublisher {
    async fn publish(&self, artifact: &Path, key: &RemoteKey) -> Result<String> {
        self.upload(artifact, key).await.map_err(|e| {
            Error::publish(
                key.as_str(),
                format!("Failed to upload {}: {e}", artifact.display()),
            )
        })?;

        let location = self.location(key);
        tracing::info!("Uploaded {}", location);
        Ok(location)
    }
}

/// Extract the bucket from `bucket[/]`, rejecting embedded paths
fn bucket_name<'a>(rest: &'a str, scheme: &str) -> Result<&'a str> {
    let bucket = rest.trim_end_matches('/');
    if bucket.is_empty() {
        return Err(Error::config(format!("Missing bucket in {scheme}:// URL")));
    }
    if bucket.contains('/') {
        return Err(Error::config(format!(
            "Destination URL {scheme}://{rest} must name only the bucket; set `prefix` for the key path"
        )));
    }
    Ok(bucket)
}
