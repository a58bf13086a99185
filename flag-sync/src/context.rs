use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio_util::sync::CancellationToken;

use crate::{
    adapters::{ApiAdapter, RemoteError, SdkAdapter},
    api::errors::SyncError,
    config::Config,
    metrics::consts::{CANCELLED_CALLS_COUNTER, TIMED_OUT_CALLS_COUNTER},
    observers::{Observers, ProjectEvent},
    store::{Store, StoreError},
};

/// Everything one request needs to reach the outside world. Cheap to clone; every handle
/// is shared. Requests that should not see each other's observers get their own `Observers`.
#[derive(Clone)]
pub struct RequestContext {
    store: Arc<dyn Store>,
    api: Arc<dyn ApiAdapter>,
    sdk: Arc<dyn SdkAdapter>,
    observers: Arc<Observers>,
    config: Arc<Config>,
    cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new(
        store: Arc<dyn Store>,
        api: Arc<dyn ApiAdapter>,
        sdk: Arc<dyn SdkAdapter>,
        observers: Arc<Observers>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            api,
            sdk,
            observers,
            config,
            cancellation: CancellationToken::new(),
        }
    }

    /// Ties this context to an externally owned token, e.g. the one of the inbound request.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// A context whose cancellation also fires when this one is cancelled.
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            ..self.clone()
        }
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn api(&self) -> &dyn ApiAdapter {
        self.api.as_ref()
    }

    pub fn sdk(&self) -> &dyn SdkAdapter {
        self.sdk.as_ref()
    }

    pub fn observers(&self) -> &Observers {
        &self.observers
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn notify(&self, event: ProjectEvent) {
        self.observers.notify(event);
    }

    /// Runs a store call, giving up on cancellation or after the store timeout.
    pub async fn store_call<T, F>(&self, operation: &'static str, call: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        self.run(operation, self.config.store_timeout(), call)
            .await
    }

    /// Runs a management API or evaluation call, giving up on cancellation or after the
    /// remote timeout.
    pub async fn remote_call<T, F>(&self, operation: &'static str, call: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        self.run(operation, self.config.remote_timeout(), call)
            .await
    }

    async fn run<T, E, F>(
        &self,
        operation: &'static str,
        timeout: Duration,
        call: F,
    ) -> Result<T, SyncError>
    where
        E: Into<SyncError>,
        F: Future<Output = Result<T, E>>,
    {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {
                tracing::debug!(operation, "call cancelled");
                counter!(CANCELLED_CALLS_COUNTER, "operation" => operation).increment(1);
                Err(SyncError::Cancelled)
            }
            result = tokio::time::timeout(timeout, call) => match result {
                Ok(inner) => inner.map_err(Into::into),
                Err(_) => {
                    tracing::warn!(
                        operation,
                        timeout_ms = timeout.as_millis() as u64,
                        "call timed out"
                    );
                    counter!(TIMED_OUT_CALLS_COUNTER, "operation" => operation).increment(1);
                    Err(SyncError::Timeout(operation))
                }
            },
        }
    }
}
