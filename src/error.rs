// src/error.rs
//! Error taxonomy for the signing and verification engine.
//!
//! Every failure aborts the operation that produced it. Errors carry enough
//! detail to tell which check failed, never key material or raw attribute values.

use std::error::Error as StdError;
use thiserror::Error;

/// Convenience alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Protocol configuration was rejected before any cryptographic work started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("chain unavailable: `{0}`")]
    UnsupportedChain(String),

    #[error("invalid network: `{0}`")]
    UnknownNetwork(String),

    #[error("missing setting `{0}`")]
    MissingSetting(&'static str),

    #[error(transparent)]
    Settings(#[from] config::ConfigError),
}

/// A typed-data schema or message could not be encoded.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("type `{0}` is not declared in the schema")]
    UnknownType(String),

    #[error("field `{field}` of `{type_name}` is missing from the message")]
    MissingField { type_name: String, field: String },

    #[error("field `{field}` is not declared on `{type_name}`")]
    UnexpectedField { type_name: String, field: String },

    #[error("invalid value for `{type_name}`: {reason}")]
    InvalidValue { type_name: String, reason: String },

    #[error("malformed typed data: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn invalid(type_name: &str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidValue {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by a signing capability, passed through untouched.
#[derive(Debug, Error)]
#[error("signing capability failed: {0}")]
pub struct SigningError(#[source] Box<dyn StdError + Send + Sync>);

impl SigningError {
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        SigningError(error.into())
    }

    /// The error raised by the capability itself.
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

/// A signature could not be verified.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("invalid signature length: {0}")]
    InvalidLength(usize),

    #[error("invalid recovery id: {0}")]
    InvalidRecoveryId(u8),

    #[error("cannot compute signed digest: {0}")]
    Digest(#[from] SchemaError),

    #[error("public key recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("public address {expected} and signer address {recovered} do not match")]
    SignerMismatch { expected: String, recovered: String },

    #[error("payload is scoped to {found}, expected {expected}")]
    DomainMismatch { expected: String, found: String },
}

impl VerificationError {
    /// `true` when the signature itself is malformed, as opposed to signed by someone else.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            VerificationError::MalformedSignature(_)
                | VerificationError::InvalidLength(_)
                | VerificationError::InvalidRecoveryId(_)
        )
    }
}

/// An issuing authorization cannot be trusted.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("malformed authorization content: {0}")]
    Malformed(String),

    #[error("authorization signature rejected: {0}")]
    Signature(#[from] VerificationError),

    #[error("authorization was granted to issuer {granted}, not {actual}")]
    IssuerMismatch { granted: String, actual: String },

    #[error("authorization owner is on chain `{found}`, expected `{expected}`")]
    ChainMismatch { expected: String, found: String },
}

/// Failure of the external transport, propagated unchanged.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("could not connect to protocol endpoint {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("protocol endpoint answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response is missing `{0}` metadata")]
    MissingMetadata(&'static str),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// Crate-wide error returned by the public operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("credential `{attribute}` could not be signed: {source}")]
    Credential {
        attribute: String,
        #[source]
        source: Box<Error>,
    },

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("unsupported authorization schema `{0}`")]
    UnsupportedSchema(String),

    #[error("invalid issuing authorization: {0}")]
    InvalidAuthorization(#[from] AuthorizationError),

    #[error("untrusted protocol response: {0}")]
    UntrustedResponse(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("encoding error: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Encoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_errors_are_distinguished() {
        assert!(VerificationError::InvalidLength(64).is_shape_error());
        assert!(VerificationError::InvalidRecoveryId(29).is_shape_error());
        assert!(!VerificationError::SignerMismatch {
            expected: "0xa".into(),
            recovered: "0xb".into(),
        }
        .is_shape_error());
    }

    #[test]
    fn test_signing_error_keeps_capability_error() {
        let err = SigningError::new("user rejected the request");
        assert_eq!(err.inner().to_string(), "user rejected the request");
        assert!(err.to_string().contains("user rejected"));
    }
}
