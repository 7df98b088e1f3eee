//! Tempest Protocol - Core types for the alert fan-out pipeline
//!
//! This crate provides the types that flow from the feed to every sink:
//! - `AlertRecord` - One normalized alert, built once per feed entry
//! - `RecordField` - Statically declared column list for records
//! - `AlertQuery` - Partial record used for exact and fuzzy lookups
//! - `ProcessingResult` - Outcome of one bus publish invocation
//! - `FunctionDescriptor` - Serverless function definition used by the archive path
//!
//! # Design Principles
//!
//! - **Immutable records**: `active` is computed at creation and never revised
//! - **Static schema**: every column is declared in `RecordField::ALL`, no runtime field discovery
//! - **Serde everywhere**: records travel as JSON on the bus and in the index

mod error;
mod function;
mod query;
mod record;
mod result;

pub use error::ProtocolError;
pub use function::FunctionDescriptor;
pub use query::AlertQuery;
pub use record::{AlertRecord, AlertRecordBuilder, RecordField, compute_active, id_from_uri};
pub use result::{ProcessingResult, ProcessingStatus};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// CAP extension fields kept by default when no allow-list is configured
pub const DEFAULT_CAP_FIELDS: &[&str] = &[
    "effective",
    "expires",
    "category",
    "urgency",
    "severity",
    "certainty",
    "areaDesc",
];
