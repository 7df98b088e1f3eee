//! Serverless function definition for the archive trigger

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Definition of the function invoked when an object lands in the source bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    /// Entry point, e.g. `package.Handler::handleRequest`
    pub handler: String,
    /// Execution role identifier
    pub role: String,
    pub timeout_secs: u32,
    /// Path to the deployable code artifact
    pub code_path: PathBuf,
    /// Environment passed to the function at invocation
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

impl FunctionDescriptor {
    /// Trigger target identifier used in bucket notification rules
    pub fn target(&self) -> String {
        format!("function:{}", self.name)
    }
}
