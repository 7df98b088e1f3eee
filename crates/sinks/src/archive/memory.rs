//! In-process object store and function registry

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tempest_protocol::FunctionDescriptor;

use super::function::{CallStatus, FunctionService};
use super::store::{
    EventSender, NotificationRule, ObjectPage, ObjectStore, StoreError, emit_created, paginate,
    validate_bucket_name, validate_key,
};

#[derive(Debug, Default)]
struct Bucket {
    objects: BTreeMap<String, Bytes>,
    rules: BTreeMap<String, NotificationRule>,
}

/// Buckets held in memory
#[derive(Debug)]
pub struct MemoryObjectStore {
    buckets: RwLock<BTreeMap<String, Bucket>>,
    page_size: usize,
    events: Option<EventSender>,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl MemoryObjectStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            buckets: RwLock::new(BTreeMap::new()),
            page_size: page_size.max(1),
            events: None,
        }
    }

    /// Send an `ObjectCreated` event for writes into watched buckets
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Number of objects in `bucket` (0 if missing)
    pub fn object_count(&self, bucket: &str) -> usize {
        self.buckets.read().get(bucket).map_or(0, |b| b.objects.len())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        Ok(self.buckets.read().contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        validate_bucket_name(bucket)?;
        let mut buckets = self.buckets.write();
        if buckets.contains_key(bucket) {
            return Err(StoreError::BucketExists(bucket.to_string()));
        }
        buckets.insert(bucket.to_string(), Bucket::default());
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write();
        match buckets.get(bucket) {
            None => Err(StoreError::NoSuchBucket(bucket.to_string())),
            Some(b) if !b.objects.is_empty() => Err(StoreError::BucketNotEmpty {
                bucket: bucket.to_string(),
            }),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.buckets.read().keys().cloned().collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        continuation: Option<&str>,
    ) -> Result<ObjectPage, StoreError> {
        let buckets = self.buckets.read();
        let b = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        Ok(paginate(b.objects.keys().cloned(), continuation, self.page_size))
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut buckets = self.buckets.write();
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        b.objects.insert(key.to_string(), body);
        emit_created(self.events.as_ref(), b.rules.values(), bucket, key);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let buckets = self.buckets.read();
        let b = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        b.objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::no_such_key(bucket, key))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write();
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        b.objects.remove(key);
        Ok(())
    }

    async fn put_notification(&self, bucket: &str, rule: NotificationRule) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write();
        let b = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        b.rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    async fn notifications(&self, bucket: &str) -> Result<Vec<NotificationRule>, StoreError> {
        let buckets = self.buckets.read();
        let b = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::NoSuchBucket(bucket.to_string()))?;
        Ok(b.rules.values().cloned().collect())
    }
}

/// Function registry held in memory
#[derive(Debug, Default)]
pub struct MemoryFunctionService {
    functions: RwLock<BTreeMap<String, (FunctionDescriptor, Bytes)>>,
}

impl MemoryFunctionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deployed code for `name`
    pub fn code(&self, name: &str) -> Option<Bytes> {
        self.functions.read().get(name).map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl FunctionService for MemoryFunctionService {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_function(&self, name: &str) -> Result<Option<FunctionDescriptor>, StoreError> {
        Ok(self.functions.read().get(name).map(|(d, _)| d.clone()))
    }

    async fn create_function(
        &self,
        descriptor: &FunctionDescriptor,
        code: Bytes,
    ) -> Result<CallStatus, StoreError> {
        let mut functions = self.functions.write();
        if functions.contains_key(&descriptor.name) {
            return Ok(CallStatus::CONFLICT);
        }
        functions.insert(descriptor.name.clone(), (descriptor.clone(), code));
        Ok(CallStatus::CREATED)
    }

    async fn update_configuration(
        &self,
        descriptor: &FunctionDescriptor,
    ) -> Result<CallStatus, StoreError> {
        match self.functions.write().get_mut(&descriptor.name) {
            Some((existing, _)) => {
                *existing = FunctionDescriptor {
                    code_path: existing.code_path.clone(),
                    ..descriptor.clone()
                };
                Ok(CallStatus::OK)
            }
            None => Ok(CallStatus::NOT_FOUND),
        }
    }

    async fn update_code(&self, name: &str, code: Bytes) -> Result<CallStatus, StoreError> {
        match self.functions.write().get_mut(name) {
            Some((_, existing)) => {
                *existing = code;
                Ok(CallStatus::OK)
            }
            None => Ok(CallStatus::NOT_FOUND),
        }
    }

    async fn delete_function(&self, name: &str) -> Result<bool, StoreError> {
        Ok(self.functions.write().remove(name).is_some())
    }

    async fn list_functions(&self) -> Result<Vec<FunctionDescriptor>, StoreError> {
        Ok(self.functions.read().values().map(|(d, _)| d.clone()).collect())
    }
}
