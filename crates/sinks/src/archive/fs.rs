//! Filesystem object store and function registry
//!
//! Layout under `root`:
//!
//! ```text
//! root/
//!   <bucket>/<encoded key>
//!   .tempest/notifications/<bucket>.json
//!   .tempest/functions/<name>/function.json
//!   .tempest/functions/<name>/code
//! ```
//!
//! Keys are stored as single file names with `%` and `/` percent-encoded.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tempest_protocol::FunctionDescriptor;
use tokio::fs;

use super::function::{CallStatus, FunctionService};
use super::store::{
    EventSender, NotificationRule, ObjectPage, ObjectStore, StoreError, emit_created, paginate,
    validate_bucket_name, validate_key,
};

const META_DIR: &str = ".tempest";

fn encode_key(key: &str) -> String {
    key.replace('%', "%25").replace('/', "%2F")
}

fn decode_key(name: &str) -> String {
    name.replace("%2F", "/").replace("%25", "%")
}

fn is_not_found(e: &std::io::Error) -> bool {
    e.kind() == ErrorKind::NotFound
}

/// Buckets as directories on local disk
#[derive(Debug)]
pub struct FsObjectStore {
    root: PathBuf,
    page_size: usize,
    events: Option<EventSender>,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, page_size: usize) -> Self {
        Self {
            root: root.into(),
            page_size: page_size.max(1),
            events: None,
        }
    }

    /// Send an `ObjectCreated` event for writes into watched buckets
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_path(&self, bucket: &str) -> Result<PathBuf, StoreError> {
        validate_bucket_name(bucket)?;
        Ok(self.root.join(bucket))
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
        validate_key(key)?;
        Ok(self.bucket_path(bucket)?.join(encode_key(key)))
    }

    fn rules_path(&self, bucket: &str) -> PathBuf {
        self.root
            .join(META_DIR)
            .join("notifications")
            .join(format!("{bucket}.json"))
    }

    async fn require_bucket(&self, bucket: &str) -> Result<PathBuf, StoreError> {
        let path = self.bucket_path(bucket)?;
        if fs::try_exists(&path).await? {
            Ok(path)
        } else {
            Err(StoreError::NoSuchBucket(bucket.to_string()))
        }
    }

    async fn read_rules(&self, bucket: &str) -> Result<BTreeMap<String, NotificationRule>, StoreError> {
        match fs::read(self.rules_path(bucket)).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|e| StoreError::Metadata(format!("notifications for '{bucket}': {e}"))),
            Err(e) if is_not_found(&e) => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn sorted_keys(&self, dir: &Path) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                keys.push(decode_key(&entry.file_name().to_string_lossy()));
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        match self.bucket_path(bucket) {
            Ok(path) => Ok(fs::try_exists(path).await?),
            Err(StoreError::InvalidBucketName { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let path = self.bucket_path(bucket)?;
        fs::create_dir_all(&self.root).await?;
        match fs::create_dir(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::BucketExists(bucket.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let path = self.require_bucket(bucket).await?;
        if !self.sorted_keys(&path).await?.is_empty() {
            return Err(StoreError::BucketNotEmpty {
                bucket: bucket.to_string(),
            });
        }
        fs::remove_dir(&path).await?;
        match fs::remove_file(self.rules_path(bucket)).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if is_not_found(&e) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut buckets = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() && !name.starts_with('.') {
                buckets.push(name);
            }
        }
        buckets.sort();
        Ok(buckets)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectPage, StoreError> {
        let path = self.require_bucket(bucket).await?;
        let keys = self.sorted_keys(&path).await?;
        Ok(paginate(keys, continuation, self.page_size))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError> {
        self.require_bucket(bucket).await?;
        fs::write(self.object_path(bucket, key)?, &body).await?;

        if self.events.is_some() {
            let rules = self.read_rules(bucket).await?;
            emit_created(self.events.as_ref(), rules.values(), bucket, key);
        }
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        self.require_bucket(bucket).await?;
        match fs::read(self.object_path(bucket, key)?).await {
            Ok(raw) => Ok(Bytes::from(raw)),
            Err(e) if is_not_found(&e) => Err(StoreError::no_such_key(bucket, key)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.require_bucket(bucket).await?;
        match fs::remove_file(self.object_path(bucket, key)?).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_notification(&self, bucket: &str, rule: NotificationRule) -> Result<(), StoreError> {
        self.require_bucket(bucket).await?;
        let mut rules = self.read_rules(bucket).await?;
        rules.insert(rule.id.clone(), rule);

        let path = self.rules_path(bucket);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_vec_pretty(&rules)
            .map_err(|e| StoreError::Metadata(e.to_string()))?;
        fs::write(path, raw).await?;
        Ok(())
    }

    async fn notifications(&self, bucket: &str) -> Result<Vec<NotificationRule>, StoreError> {
        self.require_bucket(bucket).await?;
        Ok(self.read_rules(bucket).await?.into_values().collect())
    }
}

/// Function registry persisted next to the buckets
#[derive(Debug)]
pub struct FsFunctionService {
    dir: PathBuf,
}

impl FsFunctionService {
    /// Registry under `root/.tempest/functions`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(META_DIR).join("functions"),
        }
    }

    fn function_dir(&self, name: &str) -> Result<PathBuf, StoreError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(StoreError::Metadata(format!("invalid function name '{name}'")));
        }
        Ok(self.dir.join(name))
    }

    async fn read_descriptor(&self, dir: &Path) -> Result<Option<FunctionDescriptor>, StoreError> {
        match fs::read(dir.join("function.json")).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map(Some)
                .map_err(|e| StoreError::Metadata(format!("{}: {e}", dir.display()))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_descriptor(&self, dir: &Path, descriptor: &FunctionDescriptor) -> Result<(), StoreError> {
        let raw = serde_json::to_vec_pretty(descriptor)
            .map_err(|e| StoreError::Metadata(e.to_string()))?;
        fs::write(dir.join("function.json"), raw).await?;
        Ok(())
    }
}

#[async_trait]
impl FunctionService for FsFunctionService {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn get_function(&self, name: &str) -> Result<Option<FunctionDescriptor>, StoreError> {
        let dir = self.function_dir(name)?;
        self.read_descriptor(&dir).await
    }

    async fn create_function(
        &self,
        descriptor: &FunctionDescriptor,
        code: Bytes,
    ) -> Result<CallStatus, StoreError> {
        let dir = self.function_dir(&descriptor.name)?;
        if self.read_descriptor(&dir).await?.is_some() {
            return Ok(CallStatus::CONFLICT);
        }
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join("code"), &code).await?;
        self.write_descriptor(&dir, descriptor).await?;
        Ok(CallStatus::CREATED)
    }

    async fn update_configuration(
        &self,
        descriptor: &FunctionDescriptor,
    ) -> Result<CallStatus, StoreError> {
        let dir = self.function_dir(&descriptor.name)?;
        let Some(existing) = self.read_descriptor(&dir).await? else {
            return Ok(CallStatus::NOT_FOUND);
        };
        let updated = FunctionDescriptor {
            code_path: existing.code_path,
            ..descriptor.clone()
        };
        self.write_descriptor(&dir, &updated).await?;
        Ok(CallStatus::OK)
    }

    async fn update_code(&self, name: &str, code: Bytes) -> Result<CallStatus, StoreError> {
        let dir = self.function_dir(name)?;
        if self.read_descriptor(&dir).await?.is_none() {
            return Ok(CallStatus::NOT_FOUND);
        }
        fs::write(dir.join("code"), &code).await?;
        Ok(CallStatus::OK)
    }

    async fn delete_function(&self, name: &str) -> Result<bool, StoreError> {
        let dir = self.function_dir(name)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_functions(&self) -> Result<Vec<FunctionDescriptor>, StoreError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if is_not_found(&e) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut functions = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(descriptor) = self.read_descriptor(&entry.path()).await? {
                functions.push(descriptor);
            }
        }
        functions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(functions)
    }
}
