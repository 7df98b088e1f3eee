//! Tempest - Feed sources
//!
//! Sources that read an external alert feed and produce `AlertRecord`s.
//!
//! # Available Sources
//!
//! - **Atom** - Atom feeds with CAP extension elements, from a file or over HTTP
//!
//! # Example
//!
//! ```ignore
//! use tempest_connectors::{AtomFeed, FeedSource};
//!
//! let feed = AtomFeed::from_config(&config.feed)?;
//! let records = feed.fetch().await?;
//! ```

mod atom;
mod error;
mod traits;

pub use atom::{AtomFeed, FeedLocation, parse_feed};
pub use error::FeedError;
pub use traits::FeedSource;
