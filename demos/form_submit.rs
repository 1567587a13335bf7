//! Walks a signup form through a validation failure, a flaky backend and a
//! success, printing what a UI would show.
//!
//! Run with: `cargo run --example form_submit`

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use steadycall::{
    Backoff, CallOptions, FormSubmit, NotificationKind, Notifier, Response, TransportError,
};

/// Prints notifications the way a toast component would show them.
struct ConsoleToasts;

impl Notifier for ConsoleToasts {
    fn notify(&self, kind: NotificationKind, title: &str, description: Option<&str>) {
        match description {
            Some(description) => println!("[{kind}] {title}: {description}"),
            None => println!("[{kind}] {title}"),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("steadycall=info,form_submit=info")
        .init();

    let flaky = Arc::new(AtomicUsize::new(0));

    let signup = FormSubmit::with_options(
        move |form: Value| {
            let flaky = flaky.clone();
            async move {
                let email = form["email"].as_str().unwrap_or_default().to_string();
                if !email.contains('@') {
                    return Err(TransportError::http(http::StatusCode::UNPROCESSABLE_ENTITY)
                        .with_message("Invalid input")
                        .with_field_error("email", "Enter a valid email address"));
                }
                // The first accepted submission hits a struggling backend.
                if flaky.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(TransportError::http(http::StatusCode::SERVICE_UNAVAILABLE));
                }
                Ok(Response::ok(json!({ "id": 17, "email": email })))
            }
        },
        Arc::new(ConsoleToasts),
        CallOptions::builder()
            .retry(true)
            .max_retries(2)
            .backoff(Backoff::Exponential {
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(1),
                jitter: true,
            })
            .success_message("Account created")
            .error_message("Could not create account")
            .build(),
    );

    println!("=== Submitting an invalid email ===");
    signup.submit(json!({ "email": "alice" })).await;
    println!("email field: {:?}", signup.field_error("email"));

    println!();
    println!("=== User edits the field, then resubmits ===");
    signup.clear_field_error("email");
    match signup.submit(json!({ "email": "alice@example.com" })).await {
        Some(user) => println!("created user {}", user["id"]),
        None => println!("submission failed: {:?}", signup.error()),
    }

    signup.clear_all_errors();
    println!("state after clear: {:?}", signup.state().phase());
}
