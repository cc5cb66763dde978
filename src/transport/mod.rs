// src/transport/mod.rs
//! External transport seam.
//!
//! The protocol service is reached through a [`Transport`]: an RPC-style
//! client exchanging [`SignedEnvelope`]s. How bytes travel is opaque to the
//! engine; timeouts and retries belong to the implementation.
//!
//! A [`GatewayContext`] owns the single logical connection. It is established
//! explicitly on first use through a [`Connector`] and shared read-only
//! afterwards; a failed attempt leaves nothing cached.

pub mod http;

use crate::error::TransportError;
use crate::models::envelope::SignedEnvelope;
use async_trait::async_trait;
use log::info;
use std::sync::Arc;
use tokio::sync::OnceCell;

pub use http::{HttpConnector, HttpTransport};

/// RPC client of the protocol service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submits a signed issuance request.
    async fn issue(&self, envelope: SignedEnvelope) -> Result<(), TransportError>;

    /// Submits a signed sharing request; the answer is itself a signed envelope.
    async fn verify(&self, envelope: SignedEnvelope) -> Result<SignedEnvelope, TransportError>;

    /// Registers a verifier.
    async fn register_verifier(&self, envelope: SignedEnvelope) -> Result<(), TransportError>;
}

/// Establishes a [`Transport`] to a network endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, endpoint: &str, secure: bool) -> Result<Arc<dyn Transport>, TransportError>;
}

/// Owner of the transport handle, passed explicitly into gateway calls.
pub struct GatewayContext {
    connector: Option<Arc<dyn Connector>>,
    transport: OnceCell<Arc<dyn Transport>>,
}

impl GatewayContext {
    /// A context that connects through `connector` on first use.
    pub fn new<C: Connector + 'static>(connector: C) -> Self {
        Self {
            connector: Some(Arc::new(connector)),
            transport: OnceCell::new(),
        }
    }

    /// A context around an already established transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            connector: None,
            transport: OnceCell::new_with(Some(transport)),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.initialized()
    }

    /// Returns the shared transport, connecting to `endpoint` if this is the first call.
    ///
    /// Once connected the handle is reused for every later call, whatever the
    /// endpoint; use one context per endpoint.
    pub async fn ensure_connected(&self, endpoint: &str, secure: bool) -> Result<Arc<dyn Transport>, TransportError> {
        let transport = self
            .transport
            .get_or_try_init(|| async {
                let connector = self.connector.as_ref().ok_or_else(|| TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    reason: "no connector configured".to_string(),
                })?;
                let transport = connector.connect(endpoint, secure).await?;
                info!("connected to protocol endpoint {endpoint} (secure: {secure})");
                Ok::<_, TransportError>(transport)
            })
            .await?;
        Ok(Arc::clone(transport))
    }
}
