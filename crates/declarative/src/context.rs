//! Operation context: deadline and cancellation
//!
//! Every lifecycle operation runs with a [`Context`] carrying the deadline
//! derived from the resource timeout and a [`CancellationToken`] shared with
//! the host. Poll loops sleep through [`Context::sleep`] so that both the
//! deadline and cancellation are observed on every tick, and RPC
//! implementations bound each request by [`Context::remaining`].

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Granularity at which sleeping poll loops re-check cancellation.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Lifecycle operation being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Create => "Create",
            Self::Read => "Read",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Import => "Import",
        };
        write!(f, "{name}")
    }
}

/// Cancellation flag shared between the host and a running operation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Context passed to every resource operation and RPC call.
#[derive(Debug, Clone)]
pub struct Context {
    resource_type: String,
    operation: Operation,
    started: Instant,
    deadline: Instant,
    cancel: CancellationToken,
}

impl Context {
    /// Create a context whose deadline is `timeout` from now.
    pub fn new(
        resource_type: impl Into<String>,
        operation: Operation,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let started = Instant::now();
        Self {
            resource_type: resource_type.into(),
            operation,
            started,
            deadline: started + timeout,
            cancel,
        }
    }

    /// A context for provider-level calls outside a resource operation.
    pub fn background(timeout: Duration) -> Self {
        Self::new("provider", Operation::Read, timeout, CancellationToken::new())
    }

    /// Resource type this operation belongs to.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Operation being executed.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Cancellation token of this operation.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Time left until the deadline (zero once expired).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Time spent since the operation started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Derive a context with a tighter deadline; never extends the parent's.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut child = self.clone();
        child.deadline = child.deadline.min(Instant::now() + timeout);
        child
    }

    /// Fail if the operation was cancelled or its deadline passed.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.is_expired() {
            return Err(Error::Timeout {
                waiting_for: format!("{} of {}", self.operation, self.resource_type),
                timeout: self.deadline.saturating_duration_since(self.started),
                last_error: None,
            });
        }
        Ok(())
    }

    /// Sleep for `duration`, waking early on cancellation or deadline.
    pub fn sleep(&self, duration: Duration) -> Result<()> {
        let wake_at = Instant::now() + duration;
        loop {
            self.check()?;
            let now = Instant::now();
            if now >= wake_at {
                return Ok(());
            }
            let slice = (wake_at - now).min(SLEEP_SLICE).min(self.remaining());
            thread::sleep(slice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_passes_before_deadline() {
        let ctx = Context::background(Duration::from_secs(60));
        assert!(ctx.check().is_ok());
        assert!(ctx.remaining() > Duration::from_secs(50));
    }

    #[test]
    fn test_check_reports_cancellation() {
        let token = CancellationToken::new();
        let ctx = Context::new("t", Operation::Create, Duration::from_secs(60), token.clone());
        token.cancel();
        assert!(matches!(ctx.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_sleep_stops_at_deadline() {
        let ctx = Context::background(Duration::from_millis(20));
        let result = ctx.sleep(Duration::from_secs(5));
        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert!(ctx.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_sleep_observes_cancellation() {
        let token = CancellationToken::new();
        let ctx = Context::new("t", Operation::Read, Duration::from_secs(60), token.clone());
        let handle = std::thread::spawn(move || ctx.sleep(Duration::from_secs(10)));
        std::thread::sleep(Duration::from_millis(30));
        token.cancel();
        let result = handle.join().unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_with_timeout_never_extends() {
        let ctx = Context::background(Duration::from_millis(50));
        let child = ctx.with_timeout(Duration::from_secs(3600));
        assert!(child.remaining() <= Duration::from_millis(50));
    }

    #[test]
    fn test_operation_display() {
        assert_eq!(Operation::Create.to_string(), "Create");
        assert_eq!(Operation::Delete.to_string(), "Delete");
    }
}
