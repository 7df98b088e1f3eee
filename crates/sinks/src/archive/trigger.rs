//! Object-created trigger dispatch
//!
//! Stores emit an `ObjectCreated` event for each write into a bucket with a
//! notification rule. The dispatcher looks up the function named by the rule
//! and runs the handler registered for its `handler` entry point.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tempest_config::SINK_BUCKET_ENV;
use tempest_protocol::FunctionDescriptor;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::common::SinkError;

use super::ARCHIVE;
use super::function::FunctionService;
use super::store::{ObjectCreated, ObjectStore};

/// Sink bucket used when the function has no `SINK_BUCKET` environment entry
pub const DEFAULT_SINK_BUCKET: &str = "alert-sink-bucket";

/// Code run for a triggered function
#[async_trait]
pub trait ObjectHandler: Send + Sync {
    async fn handle(
        &self,
        store: &dyn ObjectStore,
        function: &FunctionDescriptor,
        event: &ObjectCreated,
    ) -> Result<(), SinkError>;
}

/// Copies the new object into the function's sink bucket under the same key
#[derive(Debug, Default, Clone, Copy)]
pub struct CopyToSinkHandler;

impl CopyToSinkHandler {
    /// Entry point name this handler is registered under
    pub const HANDLER: &'static str = "tempest::copy_to_sink";
}

#[async_trait]
impl ObjectHandler for CopyToSinkHandler {
    async fn handle(
        &self,
        store: &dyn ObjectStore,
        function: &FunctionDescriptor,
        event: &ObjectCreated,
    ) -> Result<(), SinkError> {
        let sink_bucket = function
            .environment
            .get(SINK_BUCKET_ENV)
            .map_or(DEFAULT_SINK_BUCKET, String::as_str);

        let body = store
            .get_object(&event.bucket, &event.key)
            .await
            .map_err(|e| SinkError::delivery(ARCHIVE, e.to_string()))?;
        let bytes = body.len();
        store
            .put_object(sink_bucket, &event.key, body)
            .await
            .map_err(|e| SinkError::delivery(ARCHIVE, e.to_string()))?;

        info!(
            function = %function.name,
            from = %event.bucket,
            to = sink_bucket,
            key = %event.key,
            bytes,
            "object copied"
        );
        Ok(())
    }
}

/// Runs the handler of the function each event names
pub struct TriggerDispatcher {
    store: Arc<dyn ObjectStore>,
    functions: Arc<dyn FunctionService>,
    handlers: HashMap<String, Arc<dyn ObjectHandler>>,
}

impl TriggerDispatcher {
    /// Dispatcher with the built-in copy handler registered
    pub fn new(store: Arc<dyn ObjectStore>, functions: Arc<dyn FunctionService>) -> Self {
        Self {
            store,
            functions,
            handlers: HashMap::new(),
        }
        .with_handler(CopyToSinkHandler::HANDLER, Arc::new(CopyToSinkHandler))
    }

    /// Register (or replace) the handler for an entry point
    pub fn with_handler(mut self, entry_point: impl Into<String>, handler: Arc<dyn ObjectHandler>) -> Self {
        self.handlers.insert(entry_point.into(), handler);
        self
    }

    /// Handle one event
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Delivery` if the function is unknown, has no
    /// registered handler, or the handler fails.
    pub async fn dispatch(&self, event: &ObjectCreated) -> Result<(), SinkError> {
        let function = self
            .functions
            .get_function(&event.function)
            .await
            .map_err(|e| SinkError::delivery(ARCHIVE, e.to_string()))?
            .ok_or_else(|| {
                SinkError::delivery(ARCHIVE, format!("function '{}' is not deployed", event.function))
            })?;

        let handler = self.handlers.get(&function.handler).ok_or_else(|| {
            SinkError::delivery(
                ARCHIVE,
                format!("no handler registered for '{}'", function.handler),
            )
        })?;

        debug!(function = %function.name, key = %event.key, "dispatching trigger");
        handler.handle(self.store.as_ref(), &function, event).await
    }

    /// Dispatch events until the channel closes or `cancel` fires
    ///
    /// Events already queued when `cancel` fires are still delivered.
    /// Handler failures are logged and do not stop the loop.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<ObjectCreated>, cancel: CancellationToken) {
        info!("trigger dispatcher started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    while let Ok(event) = events.try_recv() {
                        self.deliver(&event).await;
                    }
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    self.deliver(&event).await;
                }
            }
        }
        info!("trigger dispatcher stopped");
    }

    async fn deliver(&self, event: &ObjectCreated) {
        if let Err(e) = self.dispatch(event).await {
            warn!(
                function = %event.function,
                bucket = %event.bucket,
                key = %event.key,
                error = %e,
                "trigger failed"
            );
        }
    }
}
