// src/services/gateway.rs
//! Protocol gateway.
//!
//! Every call follows the same path:
//! 1. validate the protocol configuration (chain and network)
//! 2. sign the serialized request into a [`SignedEnvelope`]
//! 3. hand the envelope to the context's transport
//! 4. for signed responses, verify the responder before returning any data

use crate::chains::{sign_payload, ChainAdapter, ChainRegistry};
use crate::error::{ConfigError, Error, Result};
use crate::models::credential::SignedRequest;
use crate::models::envelope::{RegisterVerifierRequest, SignedEnvelope, VerifyRequest, VerifyResponse};
use crate::models::protocol::{ProtocolConfig, MAINNET, TESTNET};
use crate::transport::GatewayContext;
use crate::utils::serialization::encode_base64;
use crate::wallet::key_management::SigningCapability;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Validates configuration, seals requests and checks responses.
#[derive(Clone)]
pub struct ProtocolGateway {
    chains: Arc<ChainRegistry>,
    networks: Vec<String>,
}

impl ProtocolGateway {
    /// A gateway recognizing the mainnet and testnet endpoints.
    pub fn new(chains: Arc<ChainRegistry>) -> Self {
        Self {
            chains,
            networks: vec![MAINNET.to_string(), TESTNET.to_string()],
        }
    }

    /// Recognize one more network endpoint, e.g. a local deployment.
    pub fn with_network(mut self, network: &str) -> Self {
        if !self.networks.iter().any(|known| known == network) {
            self.networks.push(network.to_string());
        }
        self
    }

    pub fn networks(&self) -> &[String] {
        &self.networks
    }

    /// Returns the adapter for `config.chain` if the configuration is usable.
    pub fn validate(&self, config: &ProtocolConfig) -> Result<Arc<dyn ChainAdapter>, ConfigError> {
        let adapter = self.chains.get(&config.chain)?;
        if !self.networks.iter().any(|known| *known == config.network) {
            return Err(ConfigError::UnknownNetwork(config.network.clone()));
        }
        Ok(adapter)
    }

    /// Submits a signed issuance request.
    pub async fn issue<S>(
        &self,
        context: &GatewayContext,
        config: &ProtocolConfig,
        signer: &S,
        request: &SignedRequest,
    ) -> Result<()>
    where
        S: SigningCapability + ?Sized,
    {
        let adapter = self.validate(config)?;
        let transport = context.ensure_connected(&config.network, config.secure).await?;
        let envelope = seal(adapter.as_ref(), signer, request).await?;

        info!("issuing {} credentials for resource {}", request.attributes.len(), request.resource.id);
        transport.issue(envelope).await?;
        Ok(())
    }

    /// Submits an owner-signed sharing request and returns the shared data.
    ///
    /// # Errors
    /// `UntrustedResponse` if the response is not signed by `config.responder_address`
    /// on `config.chain`; its payload is discarded.
    pub async fn verify_share<S>(
        &self,
        context: &GatewayContext,
        config: &ProtocolConfig,
        signer: &S,
        request: &VerifyRequest,
    ) -> Result<VerifyResponse>
    where
        S: SigningCapability + ?Sized,
    {
        let adapter = self.validate(config)?;
        let transport = context.ensure_connected(&config.network, config.secure).await?;
        let envelope = seal(adapter.as_ref(), signer, request).await?;

        debug!("sending {} verification request", request.schema);
        let response = transport.verify(envelope).await?;
        check_response(adapter.as_ref(), config, &response)?;

        Ok(serde_json::from_slice(&response.payload)?)
    }

    /// Registers a verifier with the protocol.
    pub async fn register_verifier<S>(
        &self,
        context: &GatewayContext,
        config: &ProtocolConfig,
        signer: &S,
        request: &RegisterVerifierRequest,
    ) -> Result<()>
    where
        S: SigningCapability + ?Sized,
    {
        let adapter = self.validate(config)?;
        let transport = context.ensure_connected(&config.network, config.secure).await?;
        let envelope = seal(adapter.as_ref(), signer, request).await?;

        info!("registering verifier {} ({})", request.verifier.id, request.name);
        transport.register_verifier(envelope).await?;
        Ok(())
    }
}

/// Serializes `request` and signs the content record of its base64.
async fn seal<S, T>(adapter: &dyn ChainAdapter, signer: &S, request: &T) -> Result<SignedEnvelope>
where
    S: SigningCapability + ?Sized,
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(request)?;
    let canonical = adapter.encode_content(&encode_base64(&payload))?;
    let signature = sign_payload(adapter, signer, &canonical).await?;
    Ok(SignedEnvelope {
        payload,
        signature,
        chain: adapter.chain().to_string(),
    })
}

fn check_response(adapter: &dyn ChainAdapter, config: &ProtocolConfig, response: &SignedEnvelope) -> Result<()> {
    if response.chain != config.chain {
        warn!("discarding response signed on {} (expected {})", response.chain, config.chain);
        return Err(Error::UntrustedResponse(format!(
            "response chain `{}` does not match `{}`",
            response.chain, config.chain
        )));
    }

    let canonical = adapter.encode_content(&encode_base64(&response.payload))?;
    if let Err(err) = adapter.verify(&config.responder_address, &canonical, &response.signature) {
        warn!("discarding response not signed by {}: {err}", config.responder_address);
        return Err(Error::UntrustedResponse(err.to_string()));
    }
    Ok(())
}
