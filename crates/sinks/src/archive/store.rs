//! Object store abstraction for the archive path

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tempest_protocol::FunctionDescriptor;
use thiserror::Error;
use tokio::sync::mpsc;

/// Configuration key under which the function trigger is stored
pub const FUNCTION_NOTIFICATION_ID: &str = "FunctionConfigurations";

/// Event name for object creation
pub const OBJECT_CREATED: &str = "ObjectCreated:*";

/// Receives one event per object written into a bucket with a trigger
pub type EventSender = mpsc::UnboundedSender<ObjectCreated>;

/// Errors from object store and function registry backings
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid bucket name '{name}': {reason}")]
    InvalidBucketName { name: String, reason: &'static str },

    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("bucket '{0}' does not exist")]
    NoSuchBucket(String),

    #[error("bucket '{0}' already exists")]
    BucketExists(String),

    #[error("bucket '{bucket}' is not empty")]
    BucketNotEmpty { bucket: String },

    #[error("object '{key}' not found in bucket '{bucket}'")]
    NoSuchKey { bucket: String, key: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt metadata: {0}")]
    Metadata(String),
}

impl StoreError {
    pub fn no_such_key(bucket: &str, key: &str) -> Self {
        Self::NoSuchKey {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }
}

/// Bucket names: 1-63 chars of lowercase letters, digits, `-` and `.`,
/// not starting with `.` or `-`
pub fn validate_bucket_name(name: &str) -> Result<(), StoreError> {
    let invalid = |reason| StoreError::InvalidBucketName {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > 63 {
        return Err(invalid("longer than 63 characters"));
    }
    if name.starts_with(['.', '-']) {
        return Err(invalid("must start with a letter or digit"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid("only lowercase letters, digits, '-' and '.' are allowed"));
    }
    Ok(())
}

/// Object keys must be non-empty and not a path traversal component
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key == "." || key == ".." {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// One page of a bucket listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    /// Pass back to `list_objects` for the next page; `None` on the last page
    pub next_token: Option<String>,
}

impl ObjectPage {
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.next_token.is_some()
    }
}

/// Slice sorted `keys` into the page that follows `after`
pub(crate) fn paginate<I>(sorted_keys: I, after: Option<&str>, page_size: usize) -> ObjectPage
where
    I: IntoIterator<Item = String>,
{
    let mut remaining = sorted_keys
        .into_iter()
        .filter(|k| after.is_none_or(|token| k.as_str() > token));
    let keys: Vec<String> = remaining.by_ref().take(page_size.max(1)).collect();
    let next_token = if remaining.next().is_some() {
        keys.last().cloned()
    } else {
        None
    };
    ObjectPage { keys, next_token }
}

/// Bucket notification invoking a function on object creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRule {
    /// Rules with the same id replace each other
    pub id: String,
    pub function: String,
    pub target: String,
    pub events: Vec<String>,
}

impl NotificationRule {
    pub fn for_function(descriptor: &FunctionDescriptor) -> Self {
        Self {
            id: FUNCTION_NOTIFICATION_ID.to_string(),
            function: descriptor.name.clone(),
            target: descriptor.target(),
            events: vec![OBJECT_CREATED.to_string()],
        }
    }

    pub fn fires_on_create(&self) -> bool {
        self.events.iter().any(|e| e.starts_with("ObjectCreated"))
    }
}

/// An object landed in a bucket watched by `function`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCreated {
    pub bucket: String,
    pub key: String,
    pub function: String,
}

/// Emit creation events for every rule on the bucket that listens for them
pub(crate) fn emit_created<'a>(
    events: Option<&EventSender>,
    rules: impl IntoIterator<Item = &'a NotificationRule>,
    bucket: &str,
    key: &str,
) {
    let Some(tx) = events else {
        return;
    };
    for rule in rules.into_iter().filter(|r| r.fires_on_create()) {
        // closed receiver means nobody dispatches triggers
        let _ = tx.send(ObjectCreated {
            bucket: bucket.to_string(),
            key: key.to_string(),
            function: rule.function.clone(),
        });
    }
}

/// Bucket-oriented blob storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError>;

    /// Fails with `BucketExists` if already present
    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    /// Fails with `BucketNotEmpty` if any object remains
    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    async fn list_buckets(&self) -> Result<Vec<String>, StoreError>;

    /// Keys in lexical order, one page at a time
    async fn list_objects(
        &self,
        bucket: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectPage, StoreError>;

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;

    /// Deleting a missing key succeeds
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Insert or replace the rule with the same id
    async fn put_notification(&self, bucket: &str, rule: NotificationRule) -> Result<(), StoreError>;

    async fn notifications(&self, bucket: &str) -> Result<Vec<NotificationRule>, StoreError>;
}
