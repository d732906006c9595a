//! Remote worker client.
//!
//! POSTs the worker's JSON payload to its endpoint and decodes the JSON
//! result. Transport faults are retried here with backoff; whatever is left
//! after retries becomes a [`WorkerInvocationError`].

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    InventoryRequest, InventoryResult, InventoryWorker, PaymentRequest, PaymentResult,
    PaymentWorker, ShippingRequest, ShippingResult, ShippingWorker, TaxRequest, TaxResult,
    TaxWorker, WorkerKind,
};
use crate::error::WorkerInvocationError;

/// HTTP worker configuration.
#[derive(Debug, Clone)]
pub struct HttpWorkerConfig {
    /// Worker endpoint URL.
    pub endpoint: String,

    /// Per-request timeout.
    pub timeout: Duration,

    /// Total attempts for transport faults, including the first.
    pub max_attempts: usize,

    /// First retry delay; doubles up to five seconds.
    pub min_delay: Duration,
}

impl Default for HttpWorkerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            min_delay: Duration::from_millis(100),
        }
    }
}

impl HttpWorkerConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }
}

/// Error body a worker returns when its own execution failed.
#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionError {
    error_type: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug)]
enum CallError {
    Transport(reqwest::Error),
    Status(StatusCode, String),
    Function(FunctionError),
    Decode(String),
}

impl CallError {
    fn is_retryable(&self) -> bool {
        match self {
            CallError::Transport(err) => err.is_timeout() || err.is_connect(),
            CallError::Status(status, _) => is_retryable_status(*status),
            CallError::Function(_) | CallError::Decode(_) => false,
        }
    }

    fn into_invocation_error(self, worker: WorkerKind) -> WorkerInvocationError {
        match self {
            CallError::Transport(err) => WorkerInvocationError::transport(worker, err.to_string()),
            CallError::Status(status, body) => {
                WorkerInvocationError::transport(worker, format!("HTTP {status} - {body}"))
            }
            CallError::Function(err) => WorkerInvocationError::application(
                worker,
                &err.error_type,
                err.error_message.unwrap_or_default(),
            ),
            CallError::Decode(cause) => WorkerInvocationError::transport(worker, cause),
        }
    }
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallError::Transport(err) => write!(f, "{err}"),
            CallError::Status(status, _) => write!(f, "HTTP {status}"),
            CallError::Function(err) => write!(f, "function error {}", err.error_type),
            CallError::Decode(cause) => write!(f, "{cause}"),
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// A worker reached over HTTP.
///
/// One instance serves a single worker; it implements all four worker
/// traits so the same type can back any of them.
#[derive(Debug, Clone)]
pub struct HttpWorker {
    kind: WorkerKind,
    client: Client,
    config: HttpWorkerConfig,
}

impl HttpWorker {
    pub fn new(kind: WorkerKind, config: HttpWorkerConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            kind,
            client,
            config,
        })
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.config.min_delay)
            .with_max_delay(Duration::from_secs(5))
            .with_max_times(self.config.max_attempts.saturating_sub(1))
            .with_jitter()
    }

    async fn post<Req, Resp>(&self, request: &Req) -> Result<Resp, CallError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(request)
            .send()
            .await
            .map_err(CallError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(CallError::Transport)?;

        if !status.is_success() {
            if !is_retryable_status(status)
                && let Ok(function_error) = serde_json::from_str::<FunctionError>(&body)
            {
                return Err(CallError::Function(function_error));
            }
            return Err(CallError::Status(
                status,
                body.chars().take(200).collect(),
            ));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| CallError::Decode(format!("invalid JSON response: {e}")))?;
        if value.get("errorType").is_some() {
            let function_error = serde_json::from_value::<FunctionError>(value)
                .map_err(|e| CallError::Decode(format!("invalid error payload: {e}")))?;
            return Err(CallError::Function(function_error));
        }

        serde_json::from_value(value)
            .map_err(|e| CallError::Decode(format!("unexpected response shape: {e}")))
    }

    async fn invoke<Req, Resp>(&self, request: Req) -> Result<Resp, WorkerInvocationError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let worker = self.kind.worker_name();
        debug!(worker, endpoint = %self.config.endpoint, "invoking worker");

        (|| async { self.post(&request).await })
            .retry(self.backoff())
            .when(CallError::is_retryable)
            .notify(|err: &CallError, delay: Duration| {
                warn!(worker, error = %err, ?delay, "worker call failed, retrying");
            })
            .await
            .map_err(|err| err.into_invocation_error(self.kind))
    }
}

#[async_trait]
impl InventoryWorker for HttpWorker {
    async fn check_inventory(
        &self,
        request: InventoryRequest,
    ) -> Result<InventoryResult, WorkerInvocationError> {
        self.invoke(request).await
    }
}

#[async_trait]
impl PaymentWorker for HttpWorker {
    async fn validate_payment(
        &self,
        request: PaymentRequest,
    ) -> Result<PaymentResult, WorkerInvocationError> {
        self.invoke(request).await
    }
}

#[async_trait]
impl ShippingWorker for HttpWorker {
    async fn calculate_shipping(
        &self,
        request: ShippingRequest,
    ) -> Result<ShippingResult, WorkerInvocationError> {
        self.invoke(request).await
    }
}

#[async_trait]
impl TaxWorker for HttpWorker {
    async fn calculate_tax(&self, request: TaxRequest) -> Result<TaxResult, WorkerInvocationError> {
        self.invoke(request).await
    }
}
