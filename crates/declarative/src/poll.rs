//! State-machine poller and retry loop.
//!
//! [`StateChangeConf`] polls a refresh function until the observed state is
//! a target state for `streak` consecutive ticks. The post-write retry loop
//! ([`retry`]) is expressed on the same primitive: a successful attempt is
//! the target state, a retryable failure is the pending state.

use crate::context::Context;
use crate::error::{Error, Result};
use std::time::{Duration, Instant};

/// Number of consecutive "not found" refreshes tolerated before failing.
const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;

/// Outcome of one refresh tick.
#[derive(Debug)]
pub enum Refresh<T> {
    /// The object was observed in the given state.
    State(T, String),
    /// The object is not visible (yet).
    NotFound,
}

/// Explicit poll configuration: `{pending, target, timeout, interval, streak}`.
#[derive(Debug, Clone)]
pub struct StateChangeConf {
    /// States that mean "keep waiting".
    pub pending: Vec<String>,
    /// States that mean "done".
    pub target: Vec<String>,
    /// Wait before the first refresh.
    pub delay: Duration,
    /// Wait between refreshes.
    pub min_interval: Duration,
    /// Overall timeout; `None` waits until the context deadline.
    pub timeout: Option<Duration>,
    /// Consecutive target observations required.
    pub streak: u32,
    /// Consecutive not-found refreshes tolerated.
    pub not_found_checks: u32,
}

impl StateChangeConf {
    /// Create a configuration with the given pending and target states.
    pub fn new(pending: &[&str], target: &[&str]) -> Self {
        Self {
            pending: pending.iter().map(ToString::to_string).collect(),
            target: target.iter().map(ToString::to_string).collect(),
            delay: Duration::ZERO,
            min_interval: Duration::ZERO,
            timeout: None,
            streak: 1,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn streak(mut self, streak: u32) -> Self {
        self.streak = streak.max(1);
        self
    }

    /// Poll `refresh` until a target state is observed `streak` times in a row.
    ///
    /// Returns the value of the last refresh. Errors from `refresh` end the
    /// loop immediately; an unexpected state (neither pending nor target)
    /// is an error; expiry of the timeout or the context deadline yields
    /// [`Error::Timeout`].
    pub fn wait<T, F>(&self, ctx: &Context, mut refresh: F) -> Result<T>
    where
        F: FnMut() -> Result<Refresh<T>>,
    {
        let ctx = match self.timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        };
        let started = Instant::now();
        let mut streak = 0;
        let mut not_found = 0;
        let mut last_state = String::new();

        let map_timeout = |err: Error, last_state: &str| match err {
            Error::Timeout { .. } => Error::Timeout {
                waiting_for: format!(
                    "state to become '{}' (last state: '{}')",
                    self.target.join(", "),
                    last_state
                ),
                timeout: self.timeout.unwrap_or_else(|| started.elapsed()),
                last_error: None,
            },
            other => other,
        };

        if !self.delay.is_zero() {
            ctx.sleep(self.delay).map_err(|e| map_timeout(e, &last_state))?;
        }

        loop {
            ctx.check().map_err(|e| map_timeout(e, &last_state))?;

            match refresh()? {
                Refresh::NotFound => {
                    streak = 0;
                    not_found += 1;
                    if not_found > self.not_found_checks {
                        return Err(Error::not_found(format!(
                            "couldn't find resource ({} retries)",
                            self.not_found_checks
                        )));
                    }
                    log::debug!("{}: waiting, resource not visible yet", ctx.resource_type());
                }
                Refresh::State(value, state) => {
                    not_found = 0;
                    if self.target.iter().any(|t| *t == state) {
                        streak += 1;
                        if streak >= self.streak {
                            return Ok(value);
                        }
                    } else if self.pending.iter().any(|p| *p == state) {
                        streak = 0;
                    } else {
                        return Err(Error::internal(format!(
                            "unexpected state '{}', wanted target '{}'",
                            state,
                            self.target.join(", ")
                        )));
                    }
                    if state != last_state {
                        log::debug!("{}: state is now '{}'", ctx.resource_type(), state);
                    }
                    last_state = state;
                }
            }

            ctx.sleep(self.min_interval)
                .map_err(|e| map_timeout(e, &last_state))?;
        }
    }
}

/// Options of the post-write retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOption {
    /// Overall timeout; `None` runs until the context deadline.
    pub timeout: Option<Duration>,
    /// Wait between attempts.
    pub interval: Duration,
    /// Consecutive successful attempts required.
    pub streak: u32,
    /// Give up with the last failure after this many attempts.
    pub attempts: Option<u32>,
}

impl RetryOption {
    /// A single successful attempt, bounded only by the context deadline.
    pub fn until_deadline() -> Self {
        Self {
            timeout: None,
            interval: Duration::from_millis(500),
            streak: 1,
            attempts: None,
        }
    }

    /// `streak` consecutive successes, `interval` apart.
    pub fn simple(streak: u32, interval: Duration) -> Self {
        Self {
            timeout: None,
            interval,
            streak: streak.max(1),
            attempts: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts.max(1));
        self
    }
}

impl Default for RetryOption {
    fn default() -> Self {
        Self::until_deadline()
    }
}

/// Failure of one retry attempt.
#[derive(Debug)]
pub enum RetryError {
    /// Try again after the interval.
    Retryable(Error),
    /// Stop and report this error.
    NonRetryable(Error),
}

const RETRY_PENDING: &str = "retryableerror";
const RETRY_TARGET: &str = "success";

/// Run `attempt` until it succeeds `option.streak` times in a row.
///
/// A retryable failure resets the streak. When the deadline expires the
/// timeout error carries the last retryable failure; when the attempt budget
/// runs out that failure is returned as is.
pub fn retry<F>(ctx: &Context, option: &RetryOption, mut attempt: F) -> Result<()>
where
    F: FnMut() -> std::result::Result<(), RetryError>,
{
    let mut conf = StateChangeConf::new(&[RETRY_PENDING], &[RETRY_TARGET])
        .min_interval(option.interval)
        .streak(option.streak);
    conf.timeout = option.timeout;

    let mut last_error: Option<Error> = None;
    let mut made = 0;
    let result = conf.wait(ctx, || {
        made += 1;
        match attempt() {
            Ok(()) => Ok(Refresh::State((), RETRY_TARGET.to_string())),
            Err(RetryError::Retryable(err)) => {
                if option.attempts.is_some_and(|max| made >= max) {
                    return Err(err);
                }
                log::debug!("{}: retryable failure: {}", ctx.resource_type(), err);
                last_error = Some(err);
                Ok(Refresh::State((), RETRY_PENDING.to_string()))
            }
            Err(RetryError::NonRetryable(err)) => Err(err),
        }
    });

    match result {
        Err(Error::Timeout {
            waiting_for,
            timeout,
            ..
        }) if last_error.is_some() => Err(Error::Timeout {
            waiting_for,
            timeout,
            last_error: last_error.map(Box::new),
        }),
        other => other,
    }
}
