//! Example: retrying a flaky call with timeouts and exponential backoff
//!
//! This example demonstrates:
//! 1. Binding an operation to a policy with `create_retryable_operation`
//! 2. An attempt that hangs and is cut off by the timeout
//! 3. Cancelling a retry loop while it waits
//!
//! Run with:
//! ```bash
//! cargo run -p portal-core --example retry_example
//! ```

use portal_core::prelude::*;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// A simulated mail service that fails the first few times
struct FlakyMailer {
    attempts: AtomicU32,
    fail_count: u32,
}

impl FlakyMailer {
    fn new(fail_count: u32) -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicU32::new(0),
            fail_count,
        })
    }

    async fn send_reset_mail(&self, email: String) -> Result<String, std::io::Error> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_count {
            println!("  Attempt {attempt}: FAILED");
            return Err(std::io::Error::other("smtp relay unavailable"));
        }
        println!("  Attempt {attempt}: SUCCESS");
        Ok(format!("reset mail queued for {email}"))
    }
}

async fn example_factory() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 1: Retryable operation ===\n");

    let mailer = FlakyMailer::new(2);
    let send = create_retryable_operation(
        move |email: String| {
            let mailer = Arc::clone(&mailer);
            async move { mailer.send_reset_mail(email).await }
        },
        RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(1)),
    );

    let start = Instant::now();
    let receipt = send.call("ada@example.com".to_string()).await?;
    println!("\n{receipt} after {:?} (100ms + 200ms of backoff)", start.elapsed());
    Ok(())
}

async fn example_timeout() {
    println!("\n=== Example 2: Hanging attempts ===\n");

    let policy = RetryPolicy::builder()
        .max_retries(2)
        .delay(Duration::from_millis(50))
        .timeout(Duration::from_millis(200))
        .build();

    let err = retry_operation(&policy, || async {
        std::future::pending::<Result<(), std::io::Error>>().await
    })
    .await
    .unwrap_err();

    println!("Gave up: {err}");
    println!("Timed out: {}, attempts: {}", err.is_timeout(), err.attempts());
}

async fn example_cancel() {
    println!("\n=== Example 3: Cancellation ===\n");

    let (signal, token) = cancel_pair();
    let policy = RetryPolicy::new(5, Duration::from_secs(2), Duration::from_secs(1));

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        println!("  cancelling...");
        signal.cancel();
    });

    let err = retry_operation_with_cancel(&policy, &token, || async {
        Err::<(), _>(std::io::Error::other("still down"))
    })
    .await
    .unwrap_err();

    println!("Stopped: {err}");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    example_factory().await?;
    example_timeout().await;
    example_cancel().await;
    Ok(())
}
