//! Bus publish outcome

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a publish invocation saw any records
///
/// This is a record-count check, not a delivery check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Success,
    Unprocessed,
}

impl ProcessingStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Unprocessed => "UNPROCESSED",
        }
    }
}

/// Result of one bus publish invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    /// Fresh id per invocation
    pub run_id: Uuid,
    pub record_count: usize,
    pub status: ProcessingStatus,
    pub timestamp: DateTime<Utc>,
}

impl ProcessingResult {
    /// Build a result for `record_count` input records, stamped now
    pub fn for_count(record_count: usize) -> Self {
        Self::for_count_at(record_count, Utc::now())
    }

    pub fn for_count_at(record_count: usize, timestamp: DateTime<Utc>) -> Self {
        let status = if record_count > 0 {
            ProcessingStatus::Success
        } else {
            ProcessingStatus::Unprocessed
        };
        Self {
            run_id: Uuid::new_v4(),
            record_count,
            status,
            timestamp,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        self.status == ProcessingStatus::Success
    }
}
