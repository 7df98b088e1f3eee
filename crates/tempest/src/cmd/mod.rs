//! Command implementations for the Tempest CLI

pub mod admin;
pub mod query;
pub mod run;
pub mod serve;
