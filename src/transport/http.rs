// src/transport/http.rs
//! JSON-over-HTTP transport.
//!
//! Each RPC is a `POST` whose body is the envelope payload; the envelope's
//! `signature` and `chain` travel as headers, both ways.

use crate::error::TransportError;
use crate::models::envelope::SignedEnvelope;
use crate::transport::{Connector, Transport};
use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use std::sync::Arc;

pub const SIGNATURE_HEADER: &str = "signature";
pub const CHAIN_HEADER: &str = "chain";

const ISSUE_PATH: &str = "/v1/issue";
const VERIFY_PATH: &str = "/v1/verify";
const REGISTER_VERIFIER_PATH: &str = "/v1/verifiers";

/// HTTP client for the protocol service.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport rooted at `base_url`, e.g. `https://protocol.anima.io:443`.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Ok(Self {
            client: Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, path: &str, envelope: SignedEnvelope) -> Result<Response, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {url} ({} bytes)", envelope.payload.len());

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, envelope.signature)
            .header(CHAIN_HEADER, envelope.chain)
            .body(envelope.payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

fn header(response: &Response, name: &'static str) -> Result<String, TransportError> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .ok_or(TransportError::MissingMetadata(name))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn issue(&self, envelope: SignedEnvelope) -> Result<(), TransportError> {
        self.post(ISSUE_PATH, envelope).await?;
        Ok(())
    }

    async fn verify(&self, envelope: SignedEnvelope) -> Result<SignedEnvelope, TransportError> {
        let response = self.post(VERIFY_PATH, envelope).await?;
        let signature = header(&response, SIGNATURE_HEADER)?;
        let chain = header(&response, CHAIN_HEADER)?;
        let payload = response.bytes().await?.to_vec();
        Ok(SignedEnvelope {
            payload,
            signature,
            chain,
        })
    }

    async fn register_verifier(&self, envelope: SignedEnvelope) -> Result<(), TransportError> {
        self.post(REGISTER_VERIFIER_PATH, envelope).await?;
        Ok(())
    }
}

/// Builds [`HttpTransport`]s; the security flag picks the scheme.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpConnector;

impl HttpConnector {
    pub fn url(endpoint: &str, secure: bool) -> String {
        let scheme = if secure { "https" } else { "http" };
        format!("{scheme}://{endpoint}")
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self, endpoint: &str, secure: bool) -> Result<Arc<dyn Transport>, TransportError> {
        let transport = HttpTransport::new(&Self::url(endpoint, secure)).map_err(|e| TransportError::Connect {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Arc::new(transport))
    }
}
