//! Long-running operation polling
//!
//! Mutating Google APIs answer with an operation resource that is polled
//! at a fixed interval until `done` is set or the timeout elapses.

use super::client::GcpClient;
use crate::error::{GcpError, Result};
use serde_json::Value;
use std::future::Future;
use std::io::Write;
use std::time::{Duration, Instant};

/// Polling parameters for long-running operations
#[derive(Debug, Clone)]
pub struct OperationOptions {
    pub timeout: Duration,
    pub polling_interval: Duration,
    /// Print a progress dot to stderr on every poll
    pub verbose: bool,
}

impl Default for OperationOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            polling_interval: Duration::from_secs(5),
            verbose: false,
        }
    }
}

impl OperationOptions {
    /// Defaults for project creation, which can take several minutes
    pub fn for_project_create() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

fn is_done(operation: &Value) -> bool {
    operation
        .get("done")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Turn a finished operation into `Ok(operation)` or its embedded error
pub fn check_operation(operation: Value) -> Result<Value> {
    if let Some(err) = operation.get("error") {
        return Err(GcpError::OperationFailed {
            code: err.get("code").and_then(|v| v.as_i64()).unwrap_or(-1),
            message: err
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error")
                .to_string(),
        });
    }
    Ok(operation)
}

/// Poll an operation until it completes
///
/// `operation_url` maps the operation name to the URL that returns its
/// current state.
pub async fn wait_for_operation<F>(
    client: &GcpClient,
    mut operation: Value,
    operation_url: F,
    options: &OperationOptions,
) -> Result<Value>
where
    F: Fn(&str) -> String,
{
    let name = operation
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    if !is_done(&operation) && name.is_empty() {
        return Err(GcpError::InvalidArgument(
            "operation has neither a name nor a done flag".to_string(),
        ));
    }

    let start = Instant::now();
    while !is_done(&operation) {
        if start.elapsed() > options.timeout {
            if options.verbose {
                eprintln!();
            }
            return Err(GcpError::Timeout(format!(
                "operation {} did not finish after {}s",
                name,
                options.timeout.as_secs_f64()
            )));
        }

        if options.verbose {
            eprint!(".");
            let _ = std::io::stderr().flush();
        }

        tokio::time::sleep(options.polling_interval).await;
        operation = client.get(&operation_url(&name)).await?;
        tracing::debug!("Polled operation {} (done={})", name, is_done(&operation));
    }

    if options.verbose {
        eprintln!();
    }

    check_operation(operation)
}

/// Retry `attempt` at the polling interval until it succeeds or the timeout elapses
///
/// Used to wait for eventually-consistent reads after a create.
pub async fn poll_until_ok<T, F, Fut>(what: &str, options: &OperationOptions, attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    poll_while(what, options, |_| true, attempt).await
}

/// Like [`poll_until_ok`], but only errors accepted by `retry` are retried
///
/// Any other error is returned immediately.
pub async fn poll_while<T, F, Fut, R>(
    what: &str,
    options: &OperationOptions,
    retry: R,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    R: Fn(&GcpError) -> bool,
{
    let start = Instant::now();
    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if !retry(&err) => return Err(err),
            Err(err) => {
                if start.elapsed() > options.timeout {
                    tracing::warn!("Giving up waiting for {}: {}", what, err);
                    return Err(GcpError::Timeout(format!(
                        "{} not available after {}s",
                        what,
                        options.timeout.as_secs_f64()
                    )));
                }
                tracing::debug!("{} not ready yet: {}", what, err);
                tokio::time::sleep(options.polling_interval).await;
            },
        }
    }
}
