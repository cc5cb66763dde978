// src/models/envelope.rs
//! Units exchanged with the external transport.

use crate::models::identity::Verifier;
use serde::{Deserialize, Serialize};

/// A signed payload plus the chain its signature belongs to.
///
/// Used for outbound requests and inbound responses alike.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    pub payload: Vec<u8>,
    pub signature: String,
    pub chain: String,
}

/// A sharing request signed by the data owner, submitted by a verifier.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VerifyRequest {
    pub schema: String,
    pub content: String,
    pub signature: String,
}

/// Shared data returned by the protocol once its envelope signature checks out.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VerifyResponse {
    /// base64 JSON of the shared credentials
    pub content: String,
}

impl VerifyResponse {
    /// Decodes `content` into JSON.
    pub fn decode_content(&self) -> crate::error::Result<serde_json::Value> {
        let raw = crate::utils::serialization::decode_base64(&self.content)?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

/// Registration of a verifier with the protocol.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RegisterVerifierRequest {
    pub verifier: Verifier,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
