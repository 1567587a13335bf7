//! Retry executors.
//!
//! [`retry`] drives an operation until it succeeds, fails terminally, or the
//! policy's budget runs out. [`retry_upload`] is the same loop with a stricter
//! rule for multipart uploads. Both are thin wrappers over [`retry_with`],
//! which accepts any [`RetryPredicate`].

use crate::classify::{classify, ErrorClassification};
use crate::TransportError;
use http::StatusCode;
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// The delay inserted between attempts.
///
/// # Examples
///
/// ```
/// use steadycall::Backoff;
/// use std::time::Duration;
///
/// let backoff = Backoff::Exponential {
///     initial_delay: Duration::from_millis(100),
///     max_delay: Duration::from_secs(1),
///     jitter: false,
/// };
///
/// assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(100));
/// assert_eq!(backoff.delay_for_attempt(3), Duration::from_millis(400));
/// assert_eq!(backoff.delay_for_attempt(10), Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// Retry immediately.
    None,

    /// The same delay before every retry.
    Fixed(Duration),

    /// `initial_delay * 2^(attempt - 1)`, capped at `max_delay`.
    ///
    /// With `jitter` the delay is scaled by a random factor in `0.5..=1.0`.
    Exponential {
        /// Delay before the first retry.
        initial_delay: Duration,
        /// Upper bound for any single delay.
        max_delay: Duration,
        /// Whether to randomize delays.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Returns the delay before the given retry (1 = first retry).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => *delay,
            Backoff::Exponential {
                initial_delay,
                max_delay,
                jitter,
            } => {
                let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                let multiplier = 2u32.saturating_pow(exponent);
                let delay = initial_delay.saturating_mul(multiplier).min(*max_delay);

                if *jitter {
                    // In whole nanoseconds, saturating at `u64::MAX`.
                    let nanos = delay.as_nanos();
                    let jittered = rand::thread_rng().gen_range(nanos / 2..=nanos);
                    Duration::from_nanos(u64::try_from(jittered).unwrap_or(u64::MAX))
                } else {
                    delay
                }
            }
        }
    }
}

type RetryHook = Arc<dyn Fn(usize) + Send + Sync>;

/// How many times to retry, how long to wait, and who to tell.
///
/// The call makes at most `max_retries + 1` attempts.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: usize,

    /// Delay strategy between attempts.
    pub backoff: Backoff,

    /// Cap on how long a server's rate limit hint may stretch a delay.
    pub max_rate_limit_wait: Duration,

    on_retry: Option<RetryHook>,
}

impl RetryPolicy {
    /// A policy with the default backoff and no retry hook.
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            backoff: Backoff::default(),
            max_rate_limit_wait: Duration::from_secs(60),
            on_retry: None,
        }
    }

    /// Sets the delay strategy.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the cap applied to `Retry-After` style hints.
    pub fn max_rate_limit_wait(mut self, max_wait: Duration) -> Self {
        self.max_rate_limit_wait = max_wait;
        self
    }

    /// Registers a callback invoked with the retry number (starting at 1)
    /// right before each backoff sleep.
    pub fn on_retry(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_retry = Some(Arc::new(hook));
        self
    }

    fn delay_for(
        &self,
        attempt: usize,
        error: &TransportError,
        class: ErrorClassification,
    ) -> Duration {
        let delay = self.backoff.delay_for_attempt(attempt);
        if class != ErrorClassification::RateLimited {
            return delay;
        }

        match error.rate_limit().and_then(|info| info.delay(self.max_rate_limit_wait)) {
            Some(hint) => delay.max(hint),
            None => delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("max_rate_limit_wait", &self.max_rate_limit_wait)
            .field("on_retry", &self.on_retry.is_some())
            .finish()
    }
}

/// Decides whether a failed attempt may be retried.
///
/// The budget is enforced by the executor; predicates only judge the error.
///
/// ```
/// use steadycall::{ErrorClassification, RetryPredicate, TransportError};
///
/// struct OnlyNetwork;
///
/// impl RetryPredicate for OnlyNetwork {
///     fn should_retry(&self, _error: &TransportError, class: ErrorClassification) -> bool {
///         class == ErrorClassification::Network
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Returns `true` if the failure is worth another attempt.
    fn should_retry(&self, error: &TransportError, class: ErrorClassification) -> bool;
}

/// Retries network failures, rate limiting and server errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryOnTransient;

impl RetryPredicate for RetryOnTransient {
    fn should_retry(&self, _error: &TransportError, class: ErrorClassification) -> bool {
        class.is_retryable()
    }
}

/// Upload rule: a payload the server already rejected is never resent.
///
/// Validation failures, `413 Payload Too Large` and `415 Unsupported Media
/// Type` fail fast; everything else follows [`RetryOnTransient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UploadRetry;

impl UploadRetry {
    fn is_rejected_payload(error: &TransportError, class: ErrorClassification) -> bool {
        class == ErrorClassification::Validation
            || matches!(
                error.status(),
                Some(StatusCode::PAYLOAD_TOO_LARGE | StatusCode::UNSUPPORTED_MEDIA_TYPE)
            )
    }
}

impl RetryPredicate for UploadRetry {
    fn should_retry(&self, error: &TransportError, class: ErrorClassification) -> bool {
        !Self::is_rejected_payload(error, class) && class.is_retryable()
    }
}

/// Runs `operation` with the classification-based retry rule.
pub async fn retry<T, F, Fut>(operation: F, policy: &RetryPolicy) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    retry_with(operation, policy, &RetryOnTransient).await
}

/// Runs a multipart/file `operation` with the upload retry rule.
pub async fn retry_upload<T, F, Fut>(
    operation: F,
    policy: &RetryPolicy,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    retry_with(operation, policy, &UploadRetry).await
}

/// Runs `operation` until it succeeds, `predicate` rejects the failure, or
/// `policy.max_retries` retries have been spent. The last error is returned.
pub async fn retry_with<T, F, Fut>(
    mut operation: F,
    policy: &RetryPolicy,
    predicate: &dyn RetryPredicate,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempt = 0;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let class = classify(&error);
        tracing::warn!(
            error = %error,
            attempt = attempt,
            classification = %class,
            "Operation failed"
        );

        if !predicate.should_retry(&error, class) || attempt >= policy.max_retries {
            return Err(error);
        }

        attempt += 1;
        if let Some(hook) = &policy.on_retry {
            hook(attempt);
        }

        let delay = policy.delay_for(attempt, &error, class);
        tracing::info!(
            delay_ms = delay.as_millis() as u64,
            attempt = attempt,
            "Retrying operation after delay"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
