//! Feed source trait definition

use async_trait::async_trait;
use tempest_protocol::AlertRecord;

use crate::error::FeedError;

/// A source of alert records
///
/// Each call to `fetch` reads the whole feed once and returns its entries
/// in feed order. Implementations own their location and allow-list.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Short name for logs (e.g., "atom")
    fn name(&self) -> &'static str;

    /// Human-readable location being read
    fn location(&self) -> String;

    /// Fetch and parse the feed
    async fn fetch(&self) -> Result<Vec<AlertRecord>, FeedError>;
}
