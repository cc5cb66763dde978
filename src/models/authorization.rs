// src/models/authorization.rs
//! Issuing authorizations: the owner's signed permission for an issuer.

use crate::models::identity::{Issuer, Owner};
use crate::utils::serialization::deserialize_lenient_u64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Decoded authorization statement.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IssuingAuthorization {
    pub request: IssuingAuthorizationRequest,
    pub owner: Owner,
    pub issuer: Issuer,
}

/// What the owner agreed to have issued.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IssuingAuthorizationRequest {
    /// Identifier of the resource credentials will be attached to
    pub resource: String,

    /// Unix timestamp of the owner's approval
    #[serde(deserialize_with = "deserialize_lenient_u64")]
    pub requested_at: u64,

    /// Authorized attribute names mapped to their content hashes
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Externally supplied authorization as it travels on the wire.
///
/// `content` is the base64 of the exact bytes the owner signed; `schema`
/// selects how they are decoded and verified.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationEnvelope {
    pub schema: String,
    pub content: String,
    pub signature: String,
}
