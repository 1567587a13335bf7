//! The call orchestrator.
//!
//! [`ApiCall`] wraps one operation and owns a [`CallState`] shared by every
//! invocation issued through it. It composes the retry executors, the
//! classifier and the injected [`Notifier`], and never surfaces a failure as
//! an `Err`: callers observe failures through state and callbacks only.

use crate::classify::{classify, ErrorClassification};
use crate::notify::{NotificationKind, Notifier};
use crate::retry::{retry, retry_upload, Backoff, RetryPolicy};
use crate::state::CallState;
use crate::{Response, TransportError};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type SuccessHook<T> = Box<dyn Fn(&T) + Send + Sync>;
type ErrorHook = Box<dyn Fn(&TransportError) + Send + Sync>;

const GENERIC_FAILURE: &str = "Request failed";

/// Which overlapping invocation gets to write the shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettleOrder {
    /// Whichever invocation settles last wins, regardless of start order.
    /// `reset()` does not stop in-flight invocations from writing later.
    #[default]
    LastSettled,

    /// Each invocation carries a sequence number and only the most recently
    /// issued one may write. `reset()` invalidates everything in flight.
    LatestIssued,
}

/// Per-orchestrator configuration.
///
/// # Examples
///
/// ```
/// use steadycall::CallOptions;
///
/// let options = CallOptions::<String>::builder()
///     .success_message("Saved")
///     .error_message("Could not save")
///     .retry(true)
///     .max_retries(2)
///     .build();
/// ```
pub struct CallOptions<T> {
    on_success: Option<SuccessHook<T>>,
    on_error: Option<ErrorHook>,
    success_message: Option<String>,
    error_message: Option<String>,
    retry: bool,
    max_retries: usize,
    backoff: Backoff,
    upload: bool,
    settle_order: SettleOrder,
}

impl<T> CallOptions<T> {
    /// Creates a builder with the defaults: no retry, `max_retries = 3`,
    /// default backoff, [`SettleOrder::LastSettled`].
    pub fn builder() -> CallOptionsBuilder<T> {
        CallOptionsBuilder::default()
    }
}

impl<T> Default for CallOptions<T> {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<T> fmt::Debug for CallOptions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOptions")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("success_message", &self.success_message)
            .field("error_message", &self.error_message)
            .field("retry", &self.retry)
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("upload", &self.upload)
            .field("settle_order", &self.settle_order)
            .finish()
    }
}

/// Builder for [`CallOptions`].
pub struct CallOptionsBuilder<T> {
    on_success: Option<SuccessHook<T>>,
    on_error: Option<ErrorHook>,
    success_message: Option<String>,
    error_message: Option<String>,
    retry: Option<bool>,
    max_retries: Option<usize>,
    backoff: Option<Backoff>,
    upload: Option<bool>,
    settle_order: Option<SettleOrder>,
}

impl<T> Default for CallOptionsBuilder<T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
            success_message: None,
            error_message: None,
            retry: None,
            max_retries: None,
            backoff: None,
            upload: None,
            settle_order: None,
        }
    }
}

impl<T> CallOptionsBuilder<T> {
    /// Called with the payload after every successful invocation.
    pub fn on_success(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Box::new(hook));
        self
    }

    /// Called with the error after every failed invocation.
    pub fn on_error(mut self, hook: impl Fn(&TransportError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }

    /// Title of the success notification. Without it, success is silent.
    pub fn success_message(mut self, message: impl Into<String>) -> Self {
        self.success_message = Some(message.into());
        self
    }

    /// Failure title used when the classification has no copy of its own.
    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Routes invocations through the retry executor.
    pub fn retry(mut self, enabled: bool) -> Self {
        self.retry = Some(enabled);
        self
    }

    /// Retry budget, used only when retry is enabled.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Delay strategy between retries.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Uses the upload retry rule, which never resends a rejected payload.
    pub fn upload(mut self, upload: bool) -> Self {
        self.upload = Some(upload);
        self
    }

    /// How overlapping invocations settle the shared state.
    pub fn settle_order(mut self, order: SettleOrder) -> Self {
        self.settle_order = Some(order);
        self
    }

    /// Builds the options.
    pub fn build(self) -> CallOptions<T> {
        CallOptions {
            on_success: self.on_success,
            on_error: self.on_error,
            success_message: self.success_message,
            error_message: self.error_message,
            retry: self.retry.unwrap_or(false),
            max_retries: self.max_retries.unwrap_or(3),
            backoff: self.backoff.unwrap_or_default(),
            upload: self.upload.unwrap_or(false),
            settle_order: self.settle_order.unwrap_or_default(),
        }
    }
}

/// Runs one operation on behalf of a UI action and tracks its state.
///
/// # Examples
///
/// ```no_run
/// use steadycall::{ApiCall, ApiClient, CallOptions, TracingNotifier};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), steadycall::Error> {
/// let client = ApiClient::builder().base_url("https://api.example.com")?.build()?;
///
/// let load_user = ApiCall::with_options(
///     move |id: u64| {
///         let client = client.clone();
///         async move { client.get::<serde_json::Value>(format!("/users/{id}")).await }
///     },
///     Arc::new(TracingNotifier),
///     CallOptions::builder().retry(true).error_message("Could not load user").build(),
/// );
///
/// if let Some(user) = load_user.execute(42).await {
///     println!("{user}");
/// }
/// assert!(!load_user.is_loading());
/// # Ok(())
/// # }
/// ```
pub struct ApiCall<T, F> {
    operation: F,
    options: CallOptions<T>,
    policy: RetryPolicy,
    notifier: Arc<dyn Notifier>,
    state: Mutex<CallState<T>>,
    issued: AtomicU64,
}

impl<T, F> ApiCall<T, F> {
    /// Creates an orchestrator with default options.
    pub fn new<A, Fut>(operation: F, notifier: Arc<dyn Notifier>) -> Self
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<Response<T>, TransportError>>,
    {
        Self::with_options(operation, notifier, CallOptions::default())
    }

    /// Creates an orchestrator with the given options.
    pub fn with_options<A, Fut>(
        operation: F,
        notifier: Arc<dyn Notifier>,
        options: CallOptions<T>,
    ) -> Self
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<Response<T>, TransportError>>,
    {
        let max_retries = options.max_retries;
        let policy = RetryPolicy::new(max_retries)
            .backoff(options.backoff.clone())
            .on_retry(move |attempt| {
                tracing::info!(attempt = attempt, max_retries = max_retries, "Retrying call");
            });

        Self {
            operation,
            options,
            policy,
            notifier,
            state: Mutex::new(CallState::idle()),
            issued: AtomicU64::new(0),
        }
    }

    /// Returns the state to idle. In-flight invocations are not cancelled.
    pub fn reset(&self) {
        self.issued.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = CallState::idle();
    }

    /// Whether an invocation is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// The error of the last failed invocation.
    pub fn error(&self) -> Option<TransportError> {
        self.state.lock().error.clone()
    }

    pub(crate) fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    fn may_settle(&self, sequence: u64) -> bool {
        match self.options.settle_order {
            SettleOrder::LastSettled => true,
            SettleOrder::LatestIssued => self.issued.load(Ordering::SeqCst) == sequence,
        }
    }

    fn notify_failure(&self, error: &TransportError, class: ErrorClassification) {
        let title = class
            .user_message()
            .or(self.options.error_message.as_deref())
            .or(error.message())
            .unwrap_or(GENERIC_FAILURE);
        let description = error.message().filter(|message| *message != title);

        self.notifier.notify(NotificationKind::Error, title, description);
    }
}

impl<T: Clone, F> ApiCall<T, F> {
    /// A copy of the current state.
    pub fn state(&self) -> CallState<T> {
        self.state.lock().clone()
    }

    /// The payload of the last successful invocation.
    pub fn data(&self) -> Option<T> {
        self.state.lock().data.clone()
    }

    /// Runs the operation once, or through the retry executor when enabled.
    ///
    /// Returns the payload on success and `None` on failure.
    pub async fn execute<A, Fut>(&self, args: A) -> Option<T>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<Response<T>, TransportError>>,
        A: Clone,
    {
        self.run(args, |_, _| false).await
    }

    /// `intercept` lets the form variant take over failure presentation; it
    /// returns `true` when it already notified the user.
    pub(crate) async fn run<A, Fut, I>(&self, args: A, intercept: I) -> Option<T>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<Response<T>, TransportError>>,
        A: Clone,
        I: Fn(&TransportError, ErrorClassification) -> bool,
    {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.lock().start();

        let outcome = if self.options.retry {
            let attempt = || (self.operation)(args.clone());
            if self.options.upload {
                retry_upload(attempt, &self.policy).await
            } else {
                retry(attempt, &self.policy).await
            }
        } else {
            (self.operation)(args).await
        };

        match outcome {
            Ok(response) => {
                let payload = response.data;
                if !self.may_settle(sequence) {
                    tracing::debug!(sequence = sequence, "Discarding superseded result");
                    return Some(payload);
                }

                self.state.lock().succeed(payload.clone());
                if let Some(hook) = &self.options.on_success {
                    hook(&payload);
                }
                if let Some(message) = &self.options.success_message {
                    self.notifier.notify(NotificationKind::Success, message, None);
                }
                Some(payload)
            }
            Err(error) => {
                if !self.may_settle(sequence) {
                    tracing::debug!(
                        sequence = sequence,
                        error = %error,
                        "Discarding superseded failure"
                    );
                    return None;
                }

                let class = classify(&error);
                tracing::warn!(
                    error = %error,
                    classification = %class,
                    "Call failed"
                );
                self.state.lock().fail(error.clone());

                if !intercept(&error, class) {
                    self.notify_failure(&error, class);
                }
                if let Some(hook) = &self.options.on_error {
                    hook(&error);
                }
                None
            }
        }
    }
}

impl<T, F> fmt::Debug for ApiCall<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCall")
            .field("options", &self.options)
            .field("issued", &self.issued.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(NotificationKind, String, Option<String>)>>);

    impl Notifier for Recorder {
        fn notify(&self, kind: NotificationKind, title: &str, description: Option<&str>) {
            self.0
                .lock()
                .push((kind, title.to_string(), description.map(str::to_string)));
        }
    }

    fn failing(
        error: TransportError,
    ) -> impl Fn(()) -> std::future::Ready<Result<Response<u32>, TransportError>> {
        move |_| std::future::ready(Err(error.clone()))
    }

    #[tokio::test]
    async fn not_found_uses_caller_fallback() {
        let recorder = Arc::new(Recorder::default());
        let call = ApiCall::with_options(
            failing(TransportError::http(StatusCode::NOT_FOUND).with_message("no such org")),
            recorder.clone(),
            CallOptions::builder().error_message("Organization missing").build(),
        );

        assert_eq!(call.execute(()).await, None);

        let seen = recorder.0.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, NotificationKind::Error);
        assert_eq!(seen[0].1, "Organization missing");
        assert_eq!(seen[0].2.as_deref(), Some("no such org"));
    }

    #[tokio::test]
    async fn classified_copy_beats_fallback() {
        let recorder = Arc::new(Recorder::default());
        let call = ApiCall::with_options(
            failing(TransportError::http(StatusCode::FORBIDDEN)),
            recorder.clone(),
            CallOptions::builder().error_message("Could not delete").build(),
        );

        call.execute(()).await;

        let seen = recorder.0.lock();
        assert_eq!(
            seen[0].1,
            ErrorClassification::Forbidden.user_message().unwrap()
        );
        assert_eq!(seen[0].2, None);
    }

    #[tokio::test]
    async fn unknown_without_any_message_is_generic() {
        let recorder = Arc::new(Recorder::default());
        let call = ApiCall::new(
            failing(TransportError::http(StatusCode::CONFLICT)),
            recorder.clone(),
        );

        call.execute(()).await;

        assert_eq!(recorder.0.lock()[0].1, GENERIC_FAILURE);
    }

    #[tokio::test]
    async fn success_is_silent_without_message() {
        let recorder = Arc::new(Recorder::default());
        let call = ApiCall::new(
            |n: u32| async move { Ok::<_, TransportError>(Response::ok(n + 1)) },
            recorder.clone(),
        );

        assert_eq!(call.execute(1).await, Some(2));
        assert_eq!(call.data(), Some(2));
        assert!(recorder.0.lock().is_empty());
    }

    #[tokio::test]
    async fn failure_keeps_previous_data() {
        let recorder = Arc::new(Recorder::default());
        let call = ApiCall::new(
            |fail: bool| async move {
                if fail {
                    Err(TransportError::network("offline"))
                } else {
                    Ok(Response::ok("loaded"))
                }
            },
            recorder,
        );

        call.execute(false).await;
        call.execute(true).await;

        let state = call.state();
        assert_eq!(state.data, Some("loaded"));
        assert!(state.error.is_some());
        assert!(!state.loading);
    }
}
