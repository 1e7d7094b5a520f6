//! Request-scoped capabilities.
//!
//! Every public operation receives an explicit [`RequestContext`] carrying
//! the calling session's authorization checks and its audit sink, instead of
//! reading either from ambient state.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::entity::EntityId;
use crate::error::StoreError;

/// Authorization capability of the calling session
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// How many of the given templates the caller is allowed to read
    async fn readable_template_count(
        &self,
        template_ids: &[EntityId],
    ) -> Result<usize, StoreError>;
}

/// Sink for user-facing informational audit messages
pub trait AuditSink: Send + Sync {
    /// Record one informational message
    fn info(&self, message: &str);
}

/// Audit sink that forwards messages to the `tracing` pipeline
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn info(&self, message: &str) {
        tracing::info!(target: "templink::audit", "{}", message);
    }
}

/// Capabilities passed into every public engine operation
#[derive(Clone)]
pub struct RequestContext {
    /// Authorization checks for the calling session
    pub authorizer: Arc<dyn Authorizer>,

    /// Destination for informational audit messages
    pub audit: Arc<dyn AuditSink>,
}

impl RequestContext {
    /// Create a new context from its capabilities
    pub fn new(authorizer: Arc<dyn Authorizer>, audit: Arc<dyn AuditSink>) -> Self {
        Self { authorizer, audit }
    }
}
