//! Source merging for configuration.

mod merge_policy;
pub mod service;
