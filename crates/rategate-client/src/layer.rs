use crate::client::{ClientInner, DomainClient};
use crate::config::DomainClientBuilder;
use crate::registry::DomainGate;
use std::sync::Arc;
use tower::Layer;

/// A Tower [`Layer`] that turns a transport into a [`DomainClient`].
///
/// Every client produced by one layer shares the same domain gate, so the
/// concurrency ceiling and start spacing hold across all of them.
///
/// # Example
///
/// ```
/// use rategate_client::{DomainGate, DomainLayer, TransportError, TransportRequest, TransportResponse};
/// use rategate_store::{MemoryConfigStore, SharedConfigStore};
/// use std::sync::Arc;
/// use tower::ServiceBuilder;
///
/// let store: SharedConfigStore = Arc::new(MemoryConfigStore::default());
/// let gate = DomainGate::new("search-api", store);
///
/// let client = ServiceBuilder::new()
///     .layer(DomainLayer::new(gate))
///     .service(tower::service_fn(|req: TransportRequest| async move {
///         Ok::<_, TransportError>(TransportResponse::ok(req.path))
///     }));
/// ```
#[derive(Clone)]
pub struct DomainLayer {
    inner: Arc<ClientInner>,
}

impl DomainLayer {
    /// Creates a layer with default client settings.
    pub fn new(gate: DomainGate) -> Self {
        DomainClientBuilder::new(gate).layer()
    }

    /// Creates a builder for configuring the layer.
    pub fn builder(gate: DomainGate) -> DomainClientBuilder {
        DomainClientBuilder::new(gate)
    }

    pub(crate) fn from_inner(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn client<S>(&self, transport: S) -> DomainClient<S> {
        DomainClient::from_inner(Arc::clone(&self.inner), transport)
    }
}

impl<S> Layer<S> for DomainLayer {
    type Service = DomainClient<S>;

    fn layer(&self, service: S) -> Self::Service {
        self.client(service)
    }
}

impl std::fmt::Debug for DomainLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainLayer")
            .field("domain", self.inner.gate.domain())
            .finish()
    }
}
