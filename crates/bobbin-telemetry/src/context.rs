//! Span context for command invocations.
//!
//! # Design
//! - A process-wide span carries the command name and build SHA.
//! - The request identifier sent as `x-request-id` is kept in task-local
//!   storage so log lines can be correlated with backend logs.

use std::future::Future;
use std::sync::Arc;

use tracing::{Instrument, Span, span::Entered};

use crate::init::build_sha;

/// Keeps the invocation span entered for the lifetime of the guard.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the invocation span for `command`.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("bobbin", command = %command, build_sha = %build_sha()),
        ));
        Self {
            _guard: span.enter(),
        }
    }
}

/// Request identifier of the running command, if one is set.
#[must_use]
pub fn current_request_id() -> Option<String> {
    ACTIVE_REQUEST_ID
        .try_with(|id| id.as_ref().to_string())
        .ok()
}

/// Run `fut` with `request_id` available through [`current_request_id`].
pub async fn with_request_context<Fut, T>(request_id: impl Into<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    let request_id: Arc<str> = Arc::from(request_id.into());
    let span = tracing::info_span!("request", request_id = %request_id);
    ACTIVE_REQUEST_ID.scope(request_id, fut).instrument(span).await
}

tokio::task_local! {
    static ACTIVE_REQUEST_ID: Arc<str>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_context_guard_enters_and_drops() {
        let guard = GlobalContextGuard::new("status");
        tracing::info!("inside invocation span");
        drop(guard);
    }

    #[tokio::test]
    async fn with_request_context_exposes_identifier() {
        let output = with_request_context("req-42", async {
            assert_eq!(current_request_id().as_deref(), Some("req-42"));
            "done"
        })
        .await;
        assert_eq!(output, "done");
        assert!(current_request_id().is_none());
    }
}
