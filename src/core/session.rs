//! Sessions and the pluggable session strategy

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::context::Context;

/// Application-defined session value
///
/// The core never looks inside a session. A context either has one or it
/// does not; `Value::Null` counts as not having one.
pub type Session = Value;

/// Capability that resolves the session for a context
///
/// Called by [`Context::with_request`] with a provisional context that
/// already carries the new transport, so implementations can read cookies
/// or headers from `context.transport()`.
#[async_trait]
pub trait SessionStrategy: Send + Sync {
    /// Resolve the session for `context`, or `None` when there is none
    async fn get(&self, context: &Context) -> Result<Option<Session>>;
}

/// Collapse a null session into absence
pub(crate) fn normalize(session: Option<Session>) -> Option<Session> {
    session.filter(|s| !s.is_null())
}
