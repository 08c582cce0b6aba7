use std::os::fd::BorrowedFd;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tokio::io::unix::AsyncFd;
use tokio::io::Interest;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::error::{parse_error_message, EngineError};
use crate::headers::{build_headers, to_header_map};

/// One JSON POST.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    pub url: String,
    pub body: Value,
}

impl EngineRequest {
    pub fn new(url: impl Into<String>, body: Value) -> Self {
        Self {
            url: url.into(),
            body,
        }
    }
}

/// Blocking, cancellable HTTP client.
///
/// Every call builds its own single-threaded runtime and connection pool and
/// tears both down before returning, whatever the outcome.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    config: EngineConfig,
}

impl HttpEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Posts `request.body` and returns the decoded JSON response.
    ///
    /// Stale cancellation from an earlier call is discarded first. A cancel
    /// that lands before the response is fully read yields
    /// [`EngineError::Cancelled`] and the partial response is dropped.
    pub fn post_json(
        &self,
        request: &EngineRequest,
        cancel: &CancelToken,
    ) -> Result<Value, EngineError> {
        cancel.reset();
        let headers = to_header_map(&build_headers(&self.config)?)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(EngineError::Runtime)?;

        let result = runtime.block_on(async {
            let wake = AsyncFd::with_interest(cancel.wake_fd(), Interest::READABLE)
                .map_err(EngineError::WakeChannel)?;
            let client = Client::builder()
                .timeout(self.config.timeout)
                .build()
                .map_err(EngineError::from)?;
            let exchange = client
                .post(&request.url)
                .headers(headers)
                .json(&request.body);

            tokio::select! {
                biased;
                () = wait_for_cancel(cancel, &wake, self.config.cancel_check_interval) => {
                    Err(EngineError::Cancelled)
                }
                outcome = tokio::time::timeout(self.config.timeout, send(exchange)) => {
                    outcome.unwrap_or(Err(EngineError::Timeout))
                }
            }
        });

        if cancel.is_cancelled() {
            debug!(url = %request.url, "request cancelled");
            return Err(EngineError::Cancelled);
        }
        result
    }
}

async fn send(exchange: reqwest::RequestBuilder) -> Result<Value, EngineError> {
    let response = exchange.send().await?;
    let status = response.status();
    let body = response.text().await?;
    debug!(status = status.as_u16(), bytes = body.len(), "response received");

    if !status.is_success() {
        return Err(EngineError::Status {
            status,
            message: parse_error_message(status, &body),
        });
    }
    Ok(serde_json::from_str(&body)?)
}

/// Resolves once the token is cancelled. The wake pipe makes this prompt; the
/// interval re-check covers a cancel that raced the readiness registration.
async fn wait_for_cancel(
    cancel: &CancelToken,
    wake: &AsyncFd<BorrowedFd<'_>>,
    interval: Duration,
) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        match tokio::time::timeout(interval, wake.readable()).await {
            Ok(Ok(mut guard)) => {
                if cancel.is_cancelled() {
                    return;
                }
                guard.clear_ready();
            }
            Ok(Err(_)) => tokio::time::sleep(interval).await,
            Err(_) => {}
        }
    }
}
