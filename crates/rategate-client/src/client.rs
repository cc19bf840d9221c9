//! The retrying domain client.

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use rategate_core::events::EventListeners;
use rategate_core::{DelayAdjustment, DomainKey};
use rategate_store::{DomainRateLimitConfig, RateLimitConfigUpdate, StoreError};
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};

use crate::backoff::BackoffPolicy;
use crate::classify::{classify_status, Outcome};
use crate::config::DomainClientBuilder;
use crate::error::ClientError;
use crate::events::ClientEvent;
use crate::registry::DomainGate;
use crate::transport::{TransportError, TransportRequest, TransportResponse};

#[cfg(feature = "metrics")]
use metrics::counter;

/// Retries after the first attempt, so at most four attempts per request.
pub const MAX_RETRIES: usize = 3;

pub(crate) struct ClientInner {
    pub(crate) gate: DomainGate,
    pub(crate) max_retries: usize,
    pub(crate) backoff: BackoffPolicy,
    pub(crate) deadline: Option<Duration>,
    pub(crate) event_listeners: EventListeners<ClientEvent>,
}

/// Sends requests to one domain through its concurrency limiter and request
/// throttler, retrying rate-limited and transient failures.
///
/// For each logical request the client:
///
/// 1. reads the domain's [`DomainRateLimitConfig`] and the global
///    [`AdaptiveConfig`](rategate_core::AdaptiveConfig) once;
/// 2. per attempt, takes a concurrency slot, waits for its start, and calls
///    the transport;
/// 3. on a 2xx, records the success and returns;
/// 4. on 403/429, penalizes the domain's delay (first rejection only), then
///    sits out the cooldown and retries;
/// 5. on 502/503/504, backs off exponentially and retries;
/// 6. on anything else, fails immediately.
///
/// After `max_retries + 1` failed attempts the request fails with
/// [`ClientError::RetriesExhausted`]. The concurrency slot is held for the
/// attempt, including its cooldown or backoff, and always released.
///
/// Dropping a request future at any point releases its slot and its place in
/// both queues.
pub struct DomainClient<S> {
    inner: Arc<ClientInner>,
    transport: S,
}

impl<S: Clone> Clone for DomainClient<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            transport: self.transport.clone(),
        }
    }
}

impl<S> DomainClient<S> {
    /// Creates a client with default settings.
    pub fn new(gate: DomainGate, transport: S) -> Self {
        DomainClientBuilder::new(gate).build(transport)
    }

    /// Creates a builder for a client bound to `gate`.
    pub fn builder(gate: DomainGate) -> DomainClientBuilder {
        DomainClientBuilder::new(gate)
    }

    pub(crate) fn from_inner(inner: Arc<ClientInner>, transport: S) -> Self {
        Self { inner, transport }
    }

    /// The domain this client talks to.
    pub fn domain(&self) -> &DomainKey {
        self.inner.gate.domain()
    }

    /// The limiter and throttler this client goes through.
    pub fn gate(&self) -> &DomainGate {
        &self.inner.gate
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.inner.max_retries
    }

    /// The wrapped transport.
    pub fn get_ref(&self) -> &S {
        &self.transport
    }
}

impl<S> DomainClient<S>
where
    S: Service<TransportRequest, Response = TransportResponse, Error = TransportError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    /// Sends a `GET` and returns the response body.
    pub fn get<I, K, V>(
        &self,
        path: impl Into<String>,
        params: I,
    ) -> impl Future<Output = Result<String, ClientError>> + Send + 'static
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let response = self.execute_with_retry(TransportRequest::get(path, params));
        async move { response.await.map(|response| response.body) }
    }

    /// Sends a `POST` with a JSON body and returns the response body.
    pub fn post(
        &self,
        path: impl Into<String>,
        body: serde_json::Value,
    ) -> impl Future<Output = Result<String, ClientError>> + Send + 'static {
        let response = self.execute_with_retry(TransportRequest::post(path, body));
        async move { response.await.map(|response| response.body) }
    }

    /// Runs one logical request with the full retry policy.
    pub fn execute_with_retry(
        &self,
        request: TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse, ClientError>> + Send + 'static {
        let inner = Arc::clone(&self.inner);
        let transport = self.transport.clone();
        async move { inner.execute(transport, request).await }
    }

    /// Like [`execute_with_retry`](Self::execute_with_retry), but gives up
    /// with [`ClientError::Cancelled`] as soon as `token` is cancelled.
    pub fn execute_with_cancel(
        &self,
        request: TransportRequest,
        token: &CancellationToken,
    ) -> impl Future<Output = Result<TransportResponse, ClientError>> + Send + 'static {
        let token = token.clone();
        let domain = self.domain().clone();
        let response = self.execute_with_retry(request);
        async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(domain = %domain, "request cancelled");
                    Err(ClientError::Cancelled { domain })
                }
                result = response => result,
            }
        }
    }
}

impl<S> std::fmt::Debug for DomainClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainClient")
            .field("domain", self.domain())
            .field("max_retries", &self.inner.max_retries)
            .field("backoff", &self.inner.backoff)
            .field("deadline", &self.inner.deadline)
            .finish()
    }
}

/// Readiness is always reported; the transport's own readiness is awaited
/// inside every attempt, after the slot and start are granted.
impl<S> Service<TransportRequest> for DomainClient<S>
where
    S: Service<TransportRequest, Response = TransportResponse, Error = TransportError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = TransportResponse;
    type Error = ClientError;
    type Future = BoxFuture<'static, Result<TransportResponse, ClientError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: TransportRequest) -> Self::Future {
        Box::pin(self.execute_with_retry(request))
    }
}

impl ClientInner {
    fn domain(&self) -> &DomainKey {
        self.gate.domain()
    }

    fn emit(&self, event: ClientEvent) {
        self.event_listeners.emit(&event);
    }

    fn config_error(&self, source: StoreError) -> ClientError {
        ClientError::Config {
            domain: self.domain().clone(),
            source,
        }
    }

    async fn execute<S>(
        &self,
        transport: S,
        request: TransportRequest,
    ) -> Result<TransportResponse, ClientError>
    where
        S: Service<TransportRequest, Response = TransportResponse, Error = TransportError>,
    {
        let Some(deadline) = self.deadline else {
            return self.run(transport, request).await;
        };

        match tokio::time::timeout(deadline, self.run(transport, request)).await {
            Ok(result) => result,
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    domain = %self.domain(),
                    deadline_ms = deadline.as_millis() as u64,
                    "request deadline exceeded"
                );
                Err(ClientError::DeadlineExceeded {
                    domain: self.domain().clone(),
                    deadline,
                })
            }
        }
    }

    async fn run<S>(
        &self,
        mut transport: S,
        request: TransportRequest,
    ) -> Result<TransportResponse, ClientError>
    where
        S: Service<TransportRequest, Response = TransportResponse, Error = TransportError>,
    {
        let store = self.gate.store();
        let mut config = store
            .read(self.domain())
            .await
            .map_err(|e| self.config_error(e))?;
        let adaptive = store
            .read_adaptive()
            .await
            .map_err(|e| self.config_error(e))?;

        let attempts = self.max_retries + 1;
        let mut penalized = false;
        let mut last_status = 0;

        for attempt in 0..attempts {
            let is_last = attempt + 1 == attempts;
            let slot = self
                .gate
                .limiter()
                .acquire(config.max_concurrent_requests)
                .await;
            self.gate.throttler().wait_to_start(&config).await;
            self.record_attempt(&request, attempt);

            let response = match call(&mut transport, request.clone()).await {
                Ok(response) => response,
                Err(source) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(domain = %self.domain(), error = %source, "transport failed");
                    self.emit(ClientEvent::Failed {
                        domain: self.domain().clone(),
                        timestamp: Instant::now(),
                        attempts: attempt + 1,
                        status: None,
                    });
                    return Err(ClientError::Transport {
                        domain: self.domain().clone(),
                        source,
                    });
                }
            };

            let status = response.status;
            match classify_status(status) {
                Outcome::Success => {
                    // the slot is not held across the adaptive write
                    drop(slot);
                    self.gate
                        .throttler()
                        .record_success(&config, &adaptive)
                        .await;
                    self.emit(ClientEvent::Success {
                        domain: self.domain().clone(),
                        timestamp: Instant::now(),
                        attempts: attempt + 1,
                    });
                    return Ok(response);
                }
                Outcome::Fatal => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(domain = %self.domain(), status, "non-retryable status");
                    self.emit(ClientEvent::Failed {
                        domain: self.domain().clone(),
                        timestamp: Instant::now(),
                        attempts: attempt + 1,
                        status: Some(status),
                    });
                    return Err(ClientError::Status {
                        domain: self.domain().clone(),
                        status,
                        body: response.body,
                    });
                }
                Outcome::RateLimited => {
                    last_status = status;
                    self.record_rate_limited(attempt, status);

                    // one penalty per logical request, however many retries hit it
                    if !penalized {
                        penalized = true;
                        let adjustment = self
                            .gate
                            .throttler()
                            .record_rate_limit(&config, &adaptive)
                            .await;
                        config = self.refresh(config, adjustment).await;
                    }

                    if is_last {
                        self.gate.throttler().enter_cooldown(&config);
                    } else {
                        self.record_retry(attempt, status, config.rate_limit_cooldown());
                        self.gate.throttler().apply_rate_limit_cooldown(&config).await;
                    }
                }
                Outcome::Transient => {
                    last_status = status;
                    if !is_last {
                        let delay = self.backoff.delay(config.request_delay(), attempt);
                        self.record_retry(attempt, status, delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }

            drop(slot);
        }

        #[cfg(feature = "metrics")]
        counter!("rategate_retries_exhausted_total", "domain" => self.domain().to_string())
            .increment(1);

        #[cfg(feature = "tracing")]
        tracing::warn!(
            domain = %self.domain(),
            attempts,
            last_status,
            "request failed after exhausting retries"
        );

        self.emit(ClientEvent::RetriesExhausted {
            domain: self.domain().clone(),
            timestamp: Instant::now(),
            attempts,
            last_status,
        });
        Err(ClientError::RetriesExhausted {
            domain: self.domain().clone(),
            attempts,
            last_status,
        })
    }

    /// Re-reads the config after a penalty so later attempts use the new
    /// delay and cooldown. The adjustment is applied on top, which covers a
    /// write that did not make it to the store.
    async fn refresh(
        &self,
        current: DomainRateLimitConfig,
        adjustment: Option<DelayAdjustment>,
    ) -> DomainRateLimitConfig {
        let mut config = match self.gate.store().read(self.domain()).await {
            Ok(fresh) => fresh,
            Err(_error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(domain = %self.domain(), error = %_error, "config refresh failed");
                current
            }
        };
        if let Some(adjustment) = adjustment {
            config.apply(&RateLimitConfigUpdate::from(adjustment));
        }
        config
    }

    #[allow(unused_variables)]
    fn record_attempt(&self, request: &TransportRequest, attempt: usize) {
        #[cfg(feature = "metrics")]
        counter!("rategate_attempts_total", "domain" => self.domain().to_string()).increment(1);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            domain = %self.domain(),
            method = %request.method,
            path = %request.path,
            attempt = attempt + 1,
            "sending request"
        );

        self.emit(ClientEvent::Attempt {
            domain: self.domain().clone(),
            timestamp: Instant::now(),
            attempt,
        });
    }

    fn record_rate_limited(&self, attempt: usize, status: u16) {
        #[cfg(feature = "metrics")]
        counter!("rategate_rate_limited_total", "domain" => self.domain().to_string())
            .increment(1);

        self.emit(ClientEvent::RateLimited {
            domain: self.domain().clone(),
            timestamp: Instant::now(),
            attempt,
            status,
        });
    }

    fn record_retry(&self, attempt: usize, status: u16, delay: Duration) {
        #[cfg(feature = "metrics")]
        counter!("rategate_retries_total", "domain" => self.domain().to_string()).increment(1);

        #[cfg(feature = "tracing")]
        tracing::warn!(
            domain = %self.domain(),
            status,
            attempt = attempt + 1,
            delay_ms = delay.as_millis() as u64,
            "retrying request"
        );

        self.emit(ClientEvent::Retry {
            domain: self.domain().clone(),
            timestamp: Instant::now(),
            attempt,
            status,
            delay,
        });
    }
}

async fn call<S>(transport: &mut S, request: TransportRequest) -> Result<TransportResponse, TransportError>
where
    S: Service<TransportRequest, Response = TransportResponse, Error = TransportError>,
{
    transport.ready().await?.call(request).await
}
