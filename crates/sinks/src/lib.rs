//! Tempest - Sinks
//!
//! Downstream destinations for alert records. Every sink owns one
//! [`ToggleGate`] resolved from configuration at construction.
//!
//! | Sink | Purpose | Disabled behavior |
//! |------|---------|-------------------|
//! | `bus` | Publish each record to a topic | Returns a result for the input count |
//! | `index` | Store and query records by id | Writes skipped, queries fail |
//! | `archive` | CSV snapshot into a triggered bucket | Fails with `Disabled` |
//!
//! Backings are swappable behind traits: [`Publisher`] for the bus,
//! [`SearchBackend`] for the index, [`ObjectStore`] and [`FunctionService`]
//! for the archive.
//!
//! # Example
//!
//! ```ignore
//! use tempest_sinks::{BusSink, ChannelPublisher, ToggleGate};
//!
//! let (publisher, rx) = ChannelPublisher::new(1024);
//! let bus = BusSink::new(ToggleGate::on(), "weather-alerts", Arc::new(publisher));
//! let result = bus.publish(&records).await?;
//! ```

pub mod archive;
pub mod bus;
pub mod common;
pub mod index;
pub mod toggle;

#[cfg(test)]
mod test_util;

pub use archive::{
    ARCHIVE, ArchivalSink, ArchiveReceipt, ArchiveSettings, CallStatus, CopyToSinkHandler,
    EventReceiver, FsFunctionService, FsObjectStore, FunctionProvision, FunctionService,
    MemoryFunctionService, MemoryObjectStore, NotificationRule, ObjectCreated, ObjectHandler,
    ObjectPage, ObjectStore, Provisioned, StoreError, TriggerDispatcher, serialize_snapshot,
};
pub use bus::{BUS, BusMessage, BusSink, ChannelPublisher, Publisher, RestProxyPublisher};
pub use common::{MetricsSnapshot, SinkError, SinkMetrics};
pub use index::{
    DEFAULT_LIMIT, ElasticsearchBackend, FALLBACK_INDEX_NAME, INDEX, IndexSink, MatchMode,
    MemoryIndex, SearchBackend, resolve_index_name,
};
pub use toggle::{Togglable, ToggleGate};
