//! In-memory store implementation for the Templink engine
//!
//! This crate provides in-memory implementations of the store traits
//! defined in the templink-core crate. It is primarily useful for
//! development, testing, and single-process deployments where
//! persistence is not required.

pub mod store;
pub use store::InMemoryStore;

pub mod testkit;
pub use testkit::{RecordingAuditSink, SelectiveAuthorizer};
