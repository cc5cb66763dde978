// src/models/credential.rs
//! Credential issuance data model.
//!
//! An [`IssueRequest`] carries raw attribute values from the caller; signing it
//! yields a [`SignedRequest`] in which every attribute has a [`Credential`]
//! binding the value's content hash to its owner, issuer and source document.
//! Raw values never appear inside a signed payload.

use crate::models::authorization::AuthorizationEnvelope;
use crate::models::identity::{Issuer, Owner};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The subject of an authorization.
///
/// `expires_at` is carried through signing unmodified; enforcing it against a
/// clock is the caller's job.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    pub expires_at: u64,
}

/// Kind of attribute value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    File,
    Date,
    Number,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::File => "file",
            AttributeType::Date => "date",
            AttributeType::Number => "number",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw personal-data attribute supplied by the issuer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    /// Raw value; only its content hash is ever signed
    pub value: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Where the attribute was read from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialSource {
    /// `anima:document:<sha256 of the compact document json>`
    pub id: String,
    pub specs: String,
}

/// The signed statement about one attribute.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CredentialContent {
    pub expires_at: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    /// Content hash of the raw attribute value
    pub hash: String,
    pub source: CredentialSource,
    pub owner: Owner,
    pub issuer: Issuer,
}

/// A credential content and the issuer's signature over its canonical encoding.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub content: CredentialContent,
    pub signature: String,
}

/// The source document the attributes were extracted from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IssueDocument {
    /// Document specification, e.g. "anima:specs:document/passport@1.0.0"
    pub specs: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Issuer-defined proof payload (base64 JSON), signed as-is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// Unsigned issuance request as built by the caller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IssueRequest {
    pub resource: Resource,
    pub document: IssueDocument,
    pub attributes: BTreeMap<String, Attribute>,
    pub proof: Proof,
    pub authorization: AuthorizationEnvelope,
}

/// An attribute with its credential attached.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SignedAttribute {
    pub value: Attribute,
    pub credential: Credential,
}

/// Fully signed issuance request, ready to be sent to the protocol.
///
/// Only ever produced whole: every attribute carries a credential and the
/// proof carries a signature.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SignedRequest {
    pub resource: Resource,
    pub document: IssueDocument,
    pub attributes: BTreeMap<String, SignedAttribute>,
    pub proof: Proof,
    pub authorization: AuthorizationEnvelope,
}
