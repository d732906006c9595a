//! The execution context handed to workflow code.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use backon::{ExponentialBuilder, Retryable};
use common::ExecutionId;
use futures_util::future::{BoxFuture, join_all};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::{CheckpointStore, ExecutionError, Result};

/// Retry policy applied to every step body.
///
/// The default is a single attempt: a failing step surfaces its error
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepRetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl StepRetryPolicy {
    /// Creates a policy with the given number of attempts and default delays.
    pub fn attempts(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

impl Default for StepRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// One branch of a [`ExecutionContext::parallel`] call.
pub type Branch<'a, T> = Box<dyn FnOnce(ExecutionContext) -> BoxFuture<'a, T> + Send + 'a>;

/// Wraps an async closure into a [`Branch`].
pub fn branch<'a, T, F, Fut>(f: F) -> Branch<'a, T>
where
    F: FnOnce(ExecutionContext) -> Fut + Send + 'a,
    Fut: Future<Output = T> + Send + 'a,
{
    Box::new(move |ctx| Box::pin(f(ctx)))
}

/// Handle through which a workflow runs named, checkpointed operations.
///
/// Cloning is cheap; clones and child contexts share the checkpoint store
/// and the cancellation signal.
#[derive(Clone)]
pub struct ExecutionContext {
    execution_id: ExecutionId,
    namespace: Option<String>,
    store: Option<Arc<dyn CheckpointStore>>,
    retry: StepRetryPolicy,
    cancel: Arc<watch::Sender<bool>>,
}

impl ExecutionContext {
    /// Creates a context with no persistence: steps are plain calls.
    pub fn local(execution_id: ExecutionId) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            execution_id,
            namespace: None,
            store: None,
            retry: StepRetryPolicy::default(),
            cancel: Arc::new(cancel),
        }
    }

    /// Creates a context that checkpoints step outputs to `store`.
    pub fn with_store(execution_id: ExecutionId, store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::local(execution_id)
        }
    }

    /// Sets the retry policy used by [`step`](Self::step).
    pub fn with_retry_policy(mut self, retry: StepRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    pub fn is_durable(&self) -> bool {
        self.store.is_some()
    }

    /// Returns an isolated child context whose step names are prefixed by `name`.
    pub fn child(&self, name: &str) -> ExecutionContext {
        ExecutionContext {
            namespace: Some(self.qualify(name)),
            ..self.clone()
        }
    }

    /// Requests cancellation of any in-progress or future [`wait`](Self::wait).
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Runs a named step.
    ///
    /// If the step already has a checkpoint its output is returned without
    /// running `f`. Otherwise `f` runs under the retry policy and a
    /// successful output is checkpointed. Errors are not checkpointed, so a
    /// later execution retries the step.
    pub async fn step<T, E, F, Fut>(&self, name: &str, f: F) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<ExecutionError> + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let step = self.qualify(name);

        if let Some(output) = self.load(&step).await? {
            tracing::debug!(%step, execution_id = %self.execution_id, "step replayed from checkpoint");
            metrics::counter!("execution_steps_replayed_total").increment(1);
            return serde_json::from_value(output)
                .map_err(|e| E::from(ExecutionError::Serialization(e)));
        }

        let started = Instant::now();
        let output = f
            .retry(self.retry.backoff())
            .notify(|err: &E, delay: Duration| {
                tracing::warn!(%step, error = %err, ?delay, "step failed, retrying");
            })
            .await?;

        if let Some(store) = &self.store {
            let value = serde_json::to_value(&output).map_err(ExecutionError::from)?;
            store.save(self.execution_id, &step, value).await?;
        }

        metrics::counter!("execution_steps_total").increment(1);
        tracing::debug!(
            %step,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "step completed"
        );
        Ok(output)
    }

    /// Runs all branches concurrently, each in a child context named
    /// `name/<branch>`, and waits for every one of them.
    ///
    /// No branch is cancelled when a sibling fails. Results are returned in
    /// branch order.
    pub async fn parallel<'a, T>(&self, name: &str, branches: Vec<(&str, Branch<'a, T>)>) -> Vec<T> {
        let group = self.child(name);
        let count = branches.len();
        tracing::debug!(parallel = %group.qualify(""), branch_count = count, "parallel started");

        let futures: Vec<BoxFuture<'a, T>> = branches
            .into_iter()
            .map(|(branch_name, run)| run(group.child(branch_name)))
            .collect();
        let results = join_all(futures).await;

        tracing::debug!(parallel = %group.qualify(""), branch_count = count, "parallel joined");
        results
    }

    /// Pauses for `duration`.
    ///
    /// A completed wait is checkpointed and skipped on replay. Cancellation
    /// interrupts the pause with [`ExecutionError::Cancelled`].
    pub async fn wait(&self, name: &str, duration: Duration) -> Result<()> {
        let step = self.qualify(name);

        if self.load(&step).await?.is_some() {
            tracing::debug!(%step, "wait already elapsed, skipping");
            return Ok(());
        }
        if self.is_cancelled() {
            return Err(ExecutionError::Cancelled { step });
        }

        tracing::info!(%step, duration_ms = duration.as_millis() as u64, "waiting");
        let mut cancel_rx = self.cancel.subscribe();
        let cancelled = async move { cancel_rx.wait_for(|c| *c).await.is_ok() };
        tokio::select! {
            () = tokio::time::sleep(duration) => {}
            true = cancelled => {
                tracing::warn!(%step, "wait cancelled");
                return Err(ExecutionError::Cancelled { step });
            }
        }

        if let Some(store) = &self.store {
            store.save(self.execution_id, &step, Value::Null).await?;
        }
        Ok(())
    }

    fn qualify(&self, name: &str) -> String {
        match &self.namespace {
            Some(ns) if name.is_empty() => ns.clone(),
            Some(ns) => format!("{ns}/{name}"),
            None => name.to_string(),
        }
    }

    async fn load(&self, step: &str) -> Result<Option<Value>> {
        match &self.store {
            Some(store) => store.load(self.execution_id, step).await,
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("execution_id", &self.execution_id)
            .field("namespace", &self.namespace)
            .field("durable", &self.is_durable())
            .field("retry", &self.retry)
            .finish()
    }
}
