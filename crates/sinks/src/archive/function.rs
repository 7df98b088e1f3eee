//! Function registry abstraction

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use tempest_protocol::FunctionDescriptor;

use super::store::StoreError;

/// HTTP-style status of a registry call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallStatus(pub u16);

impl CallStatus {
    pub const OK: Self = Self(200);
    pub const CREATED: Self = Self(201);
    pub const NOT_FOUND: Self = Self(404);
    pub const CONFLICT: Self = Self(409);

    #[inline]
    pub fn is_success(self) -> bool {
        (200..300).contains(&self.0)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry of deployable functions
///
/// Creation and updates report a `CallStatus`; `Err` is reserved for the
/// backing itself failing.
#[async_trait]
pub trait FunctionService: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_function(&self, name: &str) -> Result<Option<FunctionDescriptor>, StoreError>;

    /// `CONFLICT` if a function with this name exists
    async fn create_function(
        &self,
        descriptor: &FunctionDescriptor,
        code: Bytes,
    ) -> Result<CallStatus, StoreError>;

    /// Replace handler, role, timeout and environment; `NOT_FOUND` if absent
    async fn update_configuration(
        &self,
        descriptor: &FunctionDescriptor,
    ) -> Result<CallStatus, StoreError>;

    /// Replace the code artifact; `NOT_FOUND` if absent
    async fn update_code(&self, name: &str, code: Bytes) -> Result<CallStatus, StoreError>;

    /// `true` if something was deleted
    async fn delete_function(&self, name: &str) -> Result<bool, StoreError>;

    async fn list_functions(&self) -> Result<Vec<FunctionDescriptor>, StoreError>;
}
