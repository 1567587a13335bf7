//! Form submission: an [`ApiCall`] that turns validation failures into
//! per-field messages.

use crate::call::{ApiCall, CallOptions};
use crate::classify::ErrorClassification;
use crate::notify::{NotificationKind, Notifier};
use crate::state::CallState;
use crate::{Response, TransportError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// One display message per field, taken from a validation failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    /// Keeps the first server message of every field.
    pub fn from_error(error: &TransportError) -> Self {
        Self(
            error
                .field_errors()
                .iter()
                .filter_map(|(field, messages)| Some((field.clone(), messages.first()?.clone())))
                .collect(),
        )
    }

    /// The message for `field`.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Removes the message for `field`, returning it.
    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    /// Fields with a message, in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields with a message.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no field has a message.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drops every message.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// Submits a form and keeps the server's field errors for display.
///
/// A validation failure that names fields replaces the current
/// [`FieldErrors`] and notifies one [`NotificationKind::Warning`] per field
/// instead of the generic error toast. Every other failure goes through the
/// regular [`ApiCall`] path untouched. Field errors persist across
/// submissions until the caller clears them.
///
/// # Examples
///
/// ```no_run
/// use steadycall::{ApiClient, CallOptions, FormSubmit, TracingNotifier};
/// use serde_json::{json, Value};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), steadycall::Error> {
/// let client = ApiClient::builder().base_url("https://api.example.com")?.build()?;
///
/// let signup = FormSubmit::with_options(
///     move |body: Value| {
///         let client = client.clone();
///         async move { client.post::<_, Value>("/users", &body).await }
///     },
///     Arc::new(TracingNotifier),
///     CallOptions::builder().success_message("Account created").build(),
/// );
///
/// signup.submit(json!({ "email": "not-an-email" })).await;
/// if let Some(message) = signup.field_error("email") {
///     println!("email: {message}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct FormSubmit<T, F> {
    call: ApiCall<T, F>,
    field_errors: Mutex<FieldErrors>,
}

impl<T, F> FormSubmit<T, F> {
    /// Creates a form submitter with default options.
    pub fn new<A, Fut>(operation: F, notifier: Arc<dyn Notifier>) -> Self
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<Response<T>, TransportError>>,
    {
        Self::with_options(operation, notifier, CallOptions::default())
    }

    /// Creates a form submitter with the given options.
    pub fn with_options<A, Fut>(
        operation: F,
        notifier: Arc<dyn Notifier>,
        options: CallOptions<T>,
    ) -> Self
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<Response<T>, TransportError>>,
    {
        Self {
            call: ApiCall::with_options(operation, notifier, options),
            field_errors: Mutex::new(FieldErrors::default()),
        }
    }

    /// The message currently shown for `field`.
    pub fn field_error(&self, field: &str) -> Option<String> {
        self.field_errors.lock().get(field).map(str::to_string)
    }

    /// A copy of every field message.
    pub fn field_errors(&self) -> FieldErrors {
        self.field_errors.lock().clone()
    }

    /// Drops the message for one field, typically when the user edits it.
    pub fn clear_field_error(&self, field: &str) {
        self.field_errors.lock().remove(field);
    }

    /// Drops every field message and resets the call state.
    pub fn clear_all_errors(&self) {
        self.field_errors.lock().clear();
        self.call.reset();
    }

    /// Returns the call state to idle.
    pub fn reset(&self) {
        self.call.reset();
    }

    /// Whether a submission is in flight.
    pub fn is_loading(&self) -> bool {
        self.call.is_loading()
    }

    /// The error of the last failed submission.
    pub fn error(&self) -> Option<TransportError> {
        self.call.error()
    }

    fn absorb_validation(&self, error: &TransportError, class: ErrorClassification) -> bool {
        if class != ErrorClassification::Validation {
            return false;
        }

        let extracted = FieldErrors::from_error(error);
        if extracted.is_empty() {
            return false;
        }

        tracing::debug!(fields = extracted.len(), "Extracted field errors");
        let notifier = self.call.notifier();
        for (field, message) in extracted.iter() {
            notifier.notify(NotificationKind::Warning, field, Some(message));
        }
        *self.field_errors.lock() = extracted;
        true
    }
}

impl<T: Clone, F> FormSubmit<T, F> {
    /// A copy of the current call state.
    pub fn state(&self) -> CallState<T> {
        self.call.state()
    }

    /// Submits the form. Returns the payload on success, `None` on failure.
    pub async fn submit<A, Fut>(&self, args: A) -> Option<T>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<Response<T>, TransportError>>,
        A: Clone,
    {
        self.call
            .run(args, |error, class| self.absorb_validation(error, class))
            .await
    }
}
