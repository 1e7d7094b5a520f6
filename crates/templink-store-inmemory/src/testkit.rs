use std::collections::BTreeSet;
use std::sync::Mutex;

use async_trait::async_trait;

use templink_core::{
    context::{AuditSink, Authorizer},
    domain::entity::EntityId,
    error::StoreError,
};

/// Audit sink that records every message for later assertion
#[derive(Default)]
pub struct RecordingAuditSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingAuditSink {
    /// Create a new recording sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far, in emission order
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn info(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Authorizer granting read access to a fixed set of template ids
pub struct SelectiveAuthorizer {
    readable: BTreeSet<EntityId>,
}

impl SelectiveAuthorizer {
    /// Create an authorizer that can read exactly the given ids
    pub fn new(readable: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            readable: readable.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Authorizer for SelectiveAuthorizer {
    async fn readable_template_count(
        &self,
        template_ids: &[EntityId],
    ) -> Result<usize, StoreError> {
        Ok(template_ids
            .iter()
            .filter(|id| self.readable.contains(id))
            .count())
    }
}
