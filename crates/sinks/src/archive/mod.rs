//! Archive sink - CSV snapshots uploaded into a triggered bucket
//!
//! # Flow
//!
//! ```text
//! provision:  ensure_function ─┐
//!             ensure_bucket(source) ─┼─> wire_trigger(source -> function)
//!             ensure_bucket(sink) ───┘
//! archive:    serialize -> upload(source, generated key)
//!                                   └─> ObjectCreated -> copy function -> sink bucket
//! ```
//!
//! Provisioning is check-then-act. Two processes provisioning the same names
//! at once can both observe "absent"; the loser of a bucket race treats
//! `BucketExists` as "not created".

mod fs;
mod function;
mod memory;
mod snapshot;
mod store;
mod trigger;

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tempest_config::{ArchiveConfig, StorageBackend};
use tempest_protocol::{AlertRecord, FunctionDescriptor};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::common::{SinkError, SinkMetrics};
use crate::toggle::{Togglable, ToggleGate};

pub use fs::{FsFunctionService, FsObjectStore};
pub use function::{CallStatus, FunctionService};
pub use memory::{MemoryFunctionService, MemoryObjectStore};
pub use snapshot::serialize_snapshot;
pub use store::{
    EventSender, FUNCTION_NOTIFICATION_ID, NotificationRule, OBJECT_CREATED, ObjectCreated,
    ObjectPage, ObjectStore, StoreError, validate_bucket_name,
};
pub use trigger::{CopyToSinkHandler, DEFAULT_SINK_BUCKET, ObjectHandler, TriggerDispatcher};

/// Sink name used in errors and logs
pub const ARCHIVE: &str = "archive";

/// Names the archive sink provisions and writes to
#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub source_bucket: String,
    pub sink_bucket: String,
    pub key_prefix: String,
    pub descriptor: FunctionDescriptor,
}

impl ArchiveSettings {
    pub fn from_config(config: &ArchiveConfig) -> Self {
        Self {
            source_bucket: config.source_bucket.clone(),
            sink_bucket: config.sink_bucket.clone(),
            key_prefix: config.key_prefix.clone(),
            descriptor: config.descriptor(),
        }
    }
}

/// What `ensure_function` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionProvision {
    Created,
    Updated,
}

/// Outcome of one provisioning pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provisioned {
    pub function: FunctionProvision,
    pub source_created: bool,
    pub sink_created: bool,
}

/// Where a snapshot was uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReceipt {
    pub bucket: String,
    pub key: String,
    /// Data rows, header excluded
    pub rows: usize,
    pub bytes: usize,
    pub provisioned: Provisioned,
}

/// Receiving end of the store's `ObjectCreated` events
pub type EventReceiver = mpsc::UnboundedReceiver<ObjectCreated>;

/// Toggle-gated snapshot archiver
pub struct ArchivalSink {
    gate: ToggleGate,
    store: Arc<dyn ObjectStore>,
    functions: Arc<dyn FunctionService>,
    settings: ArchiveSettings,
    metrics: SinkMetrics,
}

impl ArchivalSink {
    pub fn new(
        gate: ToggleGate,
        store: Arc<dyn ObjectStore>,
        functions: Arc<dyn FunctionService>,
        settings: ArchiveSettings,
    ) -> Self {
        Self {
            gate,
            store,
            functions,
            settings,
            metrics: SinkMetrics::new(),
        }
    }

    /// Build from the `[archive]` section
    ///
    /// Returns the sink together with a dispatcher and the event stream it
    /// should consume to run the copy trigger.
    pub fn from_config(config: &ArchiveConfig) -> (Self, TriggerDispatcher, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (store, functions): (Arc<dyn ObjectStore>, Arc<dyn FunctionService>) =
            match &config.storage {
                StorageBackend::Memory { page_size } => (
                    Arc::new(MemoryObjectStore::new(*page_size).with_events(tx)),
                    Arc::new(MemoryFunctionService::new()),
                ),
                StorageBackend::Filesystem { root, page_size } => (
                    Arc::new(FsObjectStore::new(root, *page_size).with_events(tx)),
                    Arc::new(FsFunctionService::new(root)),
                ),
            };

        let dispatcher = TriggerDispatcher::new(Arc::clone(&store), Arc::clone(&functions));
        let sink = Self::new(
            ToggleGate::new(config.enabled),
            store,
            functions,
            ArchiveSettings::from_config(config),
        );
        (sink, dispatcher, rx)
    }

    pub fn settings(&self) -> &ArchiveSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.metrics
    }

    /// Create the function if absent, otherwise update its configuration and code
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Provisioning` if the code artifact cannot be read,
    /// creation is refused, or either update call does not succeed. A failed
    /// update is not rolled back.
    pub async fn ensure_function(
        &self,
        descriptor: &FunctionDescriptor,
    ) -> Result<FunctionProvision, SinkError> {
        let code = load_code(&descriptor.code_path).await?;
        let existing = self
            .functions
            .get_function(&descriptor.name)
            .await
            .map_err(provisioning)?;

        if existing.is_none() {
            let status = self
                .functions
                .create_function(descriptor, code)
                .await
                .map_err(provisioning)?;
            if !status.is_success() {
                return Err(SinkError::provisioning(format!(
                    "create function '{}' returned {status}",
                    descriptor.name
                )));
            }
            info!(function = %descriptor.name, backing = self.functions.name(), "function created");
            return Ok(FunctionProvision::Created);
        }

        let config_status = self
            .functions
            .update_configuration(descriptor)
            .await
            .map_err(provisioning)?;
        let code_status = self
            .functions
            .update_code(&descriptor.name, code)
            .await
            .map_err(provisioning)?;

        if config_status.is_success() && code_status.is_success() {
            info!(function = %descriptor.name, "function updated");
            Ok(FunctionProvision::Updated)
        } else {
            warn!(
                function = %descriptor.name,
                configuration = %config_status,
                code = %code_status,
                "function update incomplete"
            );
            Err(SinkError::provisioning(format!(
                "update function '{}': configuration {config_status}, code {code_status}",
                descriptor.name
            )))
        }
    }

    /// Create the bucket if absent; `true` only when this call created it
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Provisioning` for an invalid name or a failing backing
    pub async fn ensure_bucket(&self, name: &str) -> Result<bool, SinkError> {
        validate_bucket_name(name).map_err(provisioning)?;

        if self.store.bucket_exists(name).await.map_err(provisioning)? {
            debug!(bucket = name, "bucket exists");
            return Ok(false);
        }
        match self.store.create_bucket(name).await {
            Ok(()) => {
                info!(bucket = name, backing = self.store.name(), "bucket created");
                Ok(true)
            }
            Err(StoreError::BucketExists(_)) => Ok(false),
            Err(e) => Err(provisioning(e)),
        }
    }

    /// Invoke `descriptor` on every object created in `bucket`
    ///
    /// Replaces any earlier rule stored under the same id.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Provisioning` if the bucket is missing
    pub async fn wire_trigger(
        &self,
        bucket: &str,
        descriptor: &FunctionDescriptor,
    ) -> Result<(), SinkError> {
        let rule = NotificationRule::for_function(descriptor);
        debug!(bucket, function = %descriptor.name, rule = %rule.id, "wiring trigger");
        self.store
            .put_notification(bucket, rule)
            .await
            .map_err(provisioning)
    }

    /// CSV snapshot of `records`
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Delivery` if serialization fails
    pub fn serialize(&self, records: &[AlertRecord]) -> Result<Bytes, SinkError> {
        serialize_snapshot(records)
    }

    /// Object key for a new snapshot, unique per call
    pub fn generate_key(&self) -> String {
        format!(
            "{}-{}-{}.csv",
            self.settings.key_prefix,
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        )
    }

    /// Put `body` under `key`
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Delivery` if the store rejects the write
    pub async fn upload(&self, body: Bytes, bucket: &str, key: &str) -> Result<(), SinkError> {
        let len = body.len();
        self.store.put_object(bucket, key, body).await.map_err(|e| {
            self.metrics.error();
            SinkError::delivery(ARCHIVE, e.to_string())
        })?;
        debug!(bucket, key, bytes = len, "snapshot uploaded");
        Ok(())
    }

    /// Ensure the function and both buckets, then wire the trigger
    ///
    /// The three ensure steps are independent and run concurrently.
    ///
    /// # Errors
    ///
    /// Returns the first `SinkError::Provisioning` encountered
    pub async fn provision(&self) -> Result<Provisioned, SinkError> {
        let descriptor = &self.settings.descriptor;
        let (function, source_created, sink_created) = tokio::try_join!(
            self.ensure_function(descriptor),
            self.ensure_bucket(&self.settings.source_bucket),
            self.ensure_bucket(&self.settings.sink_bucket),
        )?;
        self.wire_trigger(&self.settings.source_bucket, descriptor).await?;

        Ok(Provisioned {
            function,
            source_created,
            sink_created,
        })
    }

    /// Provision, then upload a snapshot of `records` to the source bucket
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Disabled` when the gate is off, otherwise any
    /// provisioning or delivery error
    pub async fn snapshot_and_archive(
        &self,
        records: &[AlertRecord],
    ) -> Result<ArchiveReceipt, SinkError> {
        self.require_enabled(SinkError::disabled(ARCHIVE))?;
        self.metrics.received(records.len() as u64);

        let provisioned = self.provision().await?;
        let body = self.serialize(records)?;
        let bytes = body.len();
        let key = self.generate_key();
        let bucket = self.settings.source_bucket.clone();
        self.upload(body, &bucket, &key).await?;

        self.metrics.delivered(records.len() as u64, bytes as u64);
        info!(bucket = %bucket, key = %key, rows = records.len(), bytes, "snapshot archived");
        Ok(ArchiveReceipt {
            bucket,
            key,
            rows: records.len(),
            bytes,
            provisioned,
        })
    }

    /// Delete an empty bucket
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Provisioning` if the bucket is missing or not empty
    pub async fn delete_bucket(&self, name: &str) -> Result<(), SinkError> {
        self.store.delete_bucket(name).await.map_err(provisioning)?;
        info!(bucket = name, "bucket deleted");
        Ok(())
    }

    /// Delete every object in the bucket page by page, then the bucket
    ///
    /// Returns the number of objects removed.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Provisioning` if listing or any delete fails
    pub async fn force_delete_bucket(&self, name: &str) -> Result<usize, SinkError> {
        let mut removed = 0;
        let mut token: Option<String> = None;
        loop {
            let page = self
                .store
                .list_objects(name, token.as_deref())
                .await
                .map_err(provisioning)?;
            for key in &page.keys {
                self.store.delete_object(name, key).await.map_err(provisioning)?;
            }
            removed += page.keys.len();
            debug!(
                bucket = name,
                deleted = page.keys.len(),
                truncated = page.is_truncated(),
                "page emptied"
            );
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        self.delete_bucket(name).await?;
        Ok(removed)
    }

    /// Delete every bucket in the store, forcing if asked
    ///
    /// # Errors
    ///
    /// Stops at the first bucket that cannot be deleted
    pub async fn delete_all_buckets(&self, force: bool) -> Result<Vec<String>, SinkError> {
        let buckets = self.list_buckets().await?;
        for bucket in &buckets {
            if force {
                self.force_delete_bucket(bucket).await?;
            } else {
                self.delete_bucket(bucket).await?;
            }
        }
        Ok(buckets)
    }

    pub async fn list_buckets(&self) -> Result<Vec<String>, SinkError> {
        self.store.list_buckets().await.map_err(provisioning)
    }

    pub async fn list_functions(&self) -> Result<Vec<FunctionDescriptor>, SinkError> {
        self.functions.list_functions().await.map_err(provisioning)
    }

    pub async fn function_exists(&self, name: &str) -> Result<bool, SinkError> {
        Ok(self
            .functions
            .get_function(name)
            .await
            .map_err(provisioning)?
            .is_some())
    }

    /// `true` if the function existed
    pub async fn delete_function(&self, name: &str) -> Result<bool, SinkError> {
        let deleted = self.functions.delete_function(name).await.map_err(provisioning)?;
        if deleted {
            info!(function = name, "function deleted");
        }
        Ok(deleted)
    }
}

impl Togglable for ArchivalSink {
    fn enabled(&self) -> bool {
        self.gate.enabled()
    }
}

fn provisioning(e: StoreError) -> SinkError {
    SinkError::provisioning(e.to_string())
}

/// Code artifact bytes; an empty path deploys the built-in handler with no artifact
async fn load_code(path: &Path) -> Result<Bytes, SinkError> {
    if path.as_os_str().is_empty() {
        return Ok(Bytes::new());
    }
    tokio::fs::read(path)
        .await
        .map(Bytes::from)
        .map_err(|e| SinkError::provisioning(format!("code artifact {}: {e}", path.display())))
}
