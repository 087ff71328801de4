//! Request-scoped context read by the validators.

use axum::http::{HeaderMap, Request};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use super::principal::AuthenticatedSubject;

/// Receiving side of a per-request cancellation signal.
///
/// Supplied by stages in front of the validators (a client-disconnect
/// watcher, a parent job) as a request extension or through
/// [`RequestContext::with_cancel`]. Without one, dropping the request future
/// is what cancels a pending validation.
#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

/// Sending side of a [`CancelSignal`].
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelSignal {
    /// Create a connected handle/signal pair.
    pub fn new() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(tx), CancelSignal(rx))
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the request is cancelled.
    ///
    /// Never resolves if the handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.0.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

/// Instants further out than this are treated as "never".
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + after`, saturating at [`FAR_FUTURE`] instead of overflowing.
pub fn instant_after(after: Duration) -> Instant {
    Instant::now() + after.min(FAR_FUTURE)
}

/// Absolute deadline of the inbound request, inserted into request
/// extensions by [`crate::middleware::DeadlineLayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDeadline(pub Instant);

/// What a validator needs to know about one inbound request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub headers: HeaderMap,
    /// Identity established by the primary authentication stage
    pub subject: Option<serde_json::Value>,
    pub deadline: Option<Instant>,
    pub cancel: Option<CancelSignal>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an HTTP request: headers, the authenticated subject and
    /// the deadline extensions, plus any cancel signal attached upstream.
    pub fn from_request<B>(req: &Request<B>) -> Self {
        let extensions = req.extensions();
        Self {
            headers: req.headers().clone(),
            subject: extensions
                .get::<AuthenticatedSubject>()
                .map(|subject| subject.0.clone()),
            deadline: extensions.get::<RequestDeadline>().map(|d| d.0),
            cancel: extensions.get::<CancelSignal>().cloned(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_subject(mut self, subject: serde_json::Value) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(instant_after(timeout))
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Time left before the deadline; `None` when the request has no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}
