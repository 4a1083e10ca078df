//! Blob store service implementation using Apache OpenDAL.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use opendal::{ErrorKind, Operator, services};
use tracing::error;
use uuid::Uuid;

use super::config::BlobProvider;
use super::error::BlobError;

/// Metadata about a stored object.
#[derive(Debug, Clone)]
pub struct ObjectStat {
    /// Object size in bytes.
    pub size: u64,
    /// Content type, if the backend records one.
    pub content_type: Option<String>,
    /// Last-modified timestamp, if the backend records one.
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// A named object returned by prefix listing.
#[derive(Debug, Clone)]
pub struct ListedObject {
    /// Object name relative to the listed prefix.
    pub name: String,
    /// Object metadata.
    pub stat: ObjectStat,
}

/// Blob store for feedback content and attachment payloads.
#[derive(Clone)]
pub struct BlobStore {
    operator: Operator,
    provider_name: &'static str,
    bucket: String,
}

impl BlobStore {
    /// Create a new blob store from a provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_provider(provider: &BlobProvider) -> Result<Self, BlobError> {
        let operator = Self::create_operator(provider)?;
        Ok(Self {
            operator,
            provider_name: provider.name(),
            bucket: provider.bucket().to_string(),
        })
    }

    /// Create an OpenDAL operator from provider config.
    fn create_operator(provider: &BlobProvider) -> Result<Operator, BlobError> {
        match provider {
            BlobProvider::S3 {
                endpoint,
                bucket,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let builder = services::S3::default()
                    .endpoint(endpoint)
                    .bucket(bucket)
                    .access_key_id(access_key_id)
                    .secret_access_key(secret_access_key)
                    .region(region);

                Ok(Operator::new(builder)
                    .map_err(|e| BlobError::configuration(e.to_string()))?
                    .finish())
            }
            BlobProvider::AzureBlob {
                account,
                access_key,
                container,
            } => {
                let builder = services::Azblob::default()
                    .account_name(account)
                    .account_key(access_key)
                    .container(container);

                Ok(Operator::new(builder)
                    .map_err(|e| BlobError::configuration(e.to_string()))?
                    .finish())
            }
            BlobProvider::LocalFs { root } => {
                let builder = services::Fs::default().root(
                    root.to_str()
                        .ok_or_else(|| BlobError::configuration("invalid path"))?,
                );

                Ok(Operator::new(builder)
                    .map_err(|e| BlobError::configuration(e.to_string()))?
                    .finish())
            }
        }
    }

    /// Write a whole object in one call.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), BlobError> {
        self.operator
            .write_with(key, data)
            .content_type(content_type)
            .await
            .map_err(BlobError::from)?;
        Ok(())
    }

    /// Open a streaming writer for an object.
    ///
    /// The object becomes visible only once the writer is closed; a writer
    /// that is dropped without close leaves nothing readable behind (any
    /// backend residue is cleared with [`BlobStore::discard`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the writer cannot be opened.
    pub async fn writer(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<opendal::Writer, BlobError> {
        self.operator
            .writer_with(key)
            .content_type(content_type)
            .await
            .map_err(BlobError::from)
    }

    /// Read a whole object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or the read fails.
    pub async fn read(&self, key: &str) -> Result<Bytes, BlobError> {
        let buffer = self.operator.read(key).await.map_err(BlobError::from)?;
        Ok(buffer.to_bytes())
    }

    /// Read a byte range of an object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or the read fails.
    pub async fn read_range(
        &self,
        key: &str,
        range: std::ops::Range<u64>,
    ) -> Result<Bytes, BlobError> {
        let buffer = self
            .operator
            .read_with(key)
            .range(range)
            .await
            .map_err(BlobError::from)?;
        Ok(buffer.to_bytes())
    }

    /// Stat an object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object does not exist or cannot be accessed.
    pub async fn stat(&self, key: &str) -> Result<ObjectStat, BlobError> {
        let meta = self.operator.stat(key).await.map_err(BlobError::from)?;
        Ok(ObjectStat {
            size: meta.content_length(),
            content_type: meta.content_type().map(String::from),
            uploaded_at: meta
                .last_modified()
                .map(|ts| DateTime::<Utc>::from(std::time::SystemTime::from(ts))),
        })
    }

    /// Check whether an object exists.
    pub async fn exists(&self, key: &str) -> bool {
        match self.operator.stat(key).await {
            Ok(_) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(_) => false,
        }
    }

    /// List objects under a prefix.
    ///
    /// Directory placeholders are skipped; each entry is stat'ed for an
    /// accurate size and content type.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    pub async fn list(&self, prefix: &str) -> Result<Vec<ListedObject>, BlobError> {
        let entries = self
            .operator
            .list_with(prefix)
            .recursive(true)
            .await
            .map_err(BlobError::from)?;

        let mut objects = Vec::with_capacity(entries.len());
        for entry in entries {
            let name = entry.path().trim_start_matches(prefix).to_string();
            if name.is_empty() || name.ends_with('/') {
                continue;
            }
            let stat = self.stat(entry.path()).await?;
            objects.push(ListedObject { name, stat });
        }

        Ok(objects)
    }

    /// Delete an object. Deleting a missing object is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn delete(&self, key: &str) -> Result<(), BlobError> {
        self.operator.delete(key).await.map_err(BlobError::from)
    }

    /// Delete every object under a prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    pub async fn remove_prefix(&self, prefix: &str) -> Result<(), BlobError> {
        self.operator
            .remove_all(prefix)
            .await
            .map_err(BlobError::from)
    }

    /// Best-effort delete used on failure paths so no partial object stays
    /// visible. Failures are logged, never propagated.
    pub async fn discard(&self, key: &str) {
        if let Err(e) = self.operator.delete(key).await {
            if e.kind() != ErrorKind::NotFound {
                error!(key = %key, error = %e, "failed to discard partial object");
            }
        }
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider_name
    }

    /// Get the bucket/container name.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Storage key for a feedback's content document.
#[must_use]
pub fn content_key(feedback_id: Uuid) -> String {
    format!("feedback/{feedback_id}/content.md")
}

/// Storage key for an attachment payload.
#[must_use]
pub fn asset_key(feedback_id: Uuid, filename: &str) -> String {
    format!("feedback/{feedback_id}/assets/{}", sanitize_filename(filename))
}

/// Prefix holding every attachment of one feedback.
#[must_use]
pub fn asset_prefix(feedback_id: Uuid) -> String {
    format!("feedback/{feedback_id}/assets/")
}

/// Prefix holding everything stored for one feedback.
#[must_use]
pub fn feedback_prefix(feedback_id: Uuid) -> String {
    format!("feedback/{feedback_id}/")
}

/// Sanitize a filename for use inside a storage key.
///
/// Only ASCII alphanumeric characters, dots, hyphens, and underscores
/// survive; everything else becomes an underscore.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
