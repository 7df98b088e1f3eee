//! Archive sink configuration

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use tempest_protocol::FunctionDescriptor;

/// Environment key telling the copy function where to write
pub const SINK_BUCKET_ENV: &str = "SINK_BUCKET";

/// Object store and function registry backing
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageBackend {
    /// In-process buckets, lost on exit
    Memory {
        #[serde(default = "default_page_size")]
        page_size: usize,
    },

    /// One directory per bucket under `root`
    Filesystem {
        root: PathBuf,
        #[serde(default = "default_page_size")]
        page_size: usize,
    },
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::Memory {
            page_size: default_page_size(),
        }
    }
}

impl StorageBackend {
    /// State lives only as long as the process
    pub fn is_in_process(&self) -> bool {
        matches!(self, Self::Memory { .. })
    }

    /// Objects returned per listing page
    pub fn page_size(&self) -> usize {
        match self {
            Self::Memory { page_size } | Self::Filesystem { page_size, .. } => *page_size,
        }
    }
}

fn default_page_size() -> usize {
    1000
}

/// Serverless copy function settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FunctionConfig {
    pub name: String,
    pub handler: String,
    pub role: String,
    pub timeout_secs: u32,
    /// Code artifact uploaded on provisioning; empty selects the built-in handler
    pub code_path: PathBuf,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            name: "alert-copy".to_string(),
            handler: "tempest::copy_to_sink".to_string(),
            role: "alert-function-role".to_string(),
            timeout_secs: 60,
            code_path: PathBuf::new(),
        }
    }
}

impl FunctionConfig {
    /// Descriptor for provisioning, wired to write into `sink_bucket`
    pub fn descriptor(&self, sink_bucket: &str) -> FunctionDescriptor {
        let mut environment = BTreeMap::new();
        environment.insert(SINK_BUCKET_ENV.to_string(), sink_bucket.to_string());
        FunctionDescriptor {
            name: self.name.clone(),
            handler: self.handler.clone(),
            role: self.role.clone(),
            timeout_secs: self.timeout_secs,
            code_path: self.code_path.clone(),
            environment,
        }
    }
}

/// Archive sink configuration
///
/// # Example
///
/// ```toml
/// [archive]
/// source_bucket = "alert-source-bucket"
/// sink_bucket = "alert-sink-bucket"
///
/// [archive.storage]
/// type = "filesystem"
/// root = "/var/lib/tempest/buckets"
///
/// [archive.function]
/// name = "alert-copy"
/// timeout_secs = 30
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub enabled: bool,

    /// Snapshots are uploaded here; the trigger watches this bucket
    pub source_bucket: String,

    /// The copy function writes here
    pub sink_bucket: String,

    /// Snapshot object keys start with this prefix
    pub key_prefix: String,

    pub storage: StorageBackend,

    pub function: FunctionConfig,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            source_bucket: "alert-source-bucket".to_string(),
            sink_bucket: "alert-sink-bucket".to_string(),
            key_prefix: "weather-alert".to_string(),
            storage: StorageBackend::default(),
            function: FunctionConfig::default(),
        }
    }
}

impl ArchiveConfig {
    /// Function descriptor for this archive's sink bucket
    pub fn descriptor(&self) -> FunctionDescriptor {
        self.function.descriptor(&self.sink_bucket)
    }
}
