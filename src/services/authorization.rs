// src/services/authorization.rs
//! Issuing authorization resolution.
//!
//! An authorization arrives as `(schema, content, signature)`. The schema
//! string selects an [`AuthorizationSchema`] from the registry, which decodes
//! the content, names the identity that must have signed it, and verifies the
//! signature over the *encoded* bytes exactly as received.
//!
//! Resolution is scoped to the chain of the operation: the owner must live on
//! that chain and the signed payload must carry that chain's protocol domain.
//!
//! Schema keys are part of the wire contract and must match byte for byte
//! across issuer and verifier deployments.

use crate::chains::ethereum::typed_data::TypedData;
use crate::chains::ethereum::{templates, EthereumAdapter};
use crate::chains::{sign_payload, ChainAdapter};
use crate::error::{AuthorizationError, Error, Result, VerificationError};
use crate::models::authorization::{AuthorizationEnvelope, IssuingAuthorization};
use crate::utils::serialization::{decode_base64, encode_base64};
use crate::wallet::key_management::SigningCapability;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry key of EVM typed-data issuing authorizations.
pub const ETH_ISSUING_AUTHORIZATION: &str = "anima:schema:eth_issuing_authorization";

/// Decode / extract-identity / verify strategy for one schema.
pub trait AuthorizationSchema: Send + Sync {
    /// Decodes the signed bytes into an authorization.
    fn decode(&self, content: &[u8]) -> Result<IssuingAuthorization, AuthorizationError>;

    /// The identity whose signature makes the authorization valid.
    fn claimed_identity<'a>(&self, authorization: &'a IssuingAuthorization) -> &'a str {
        &authorization.owner.public_address
    }

    /// Verifies `signature` over the encoded `content` under `chain`'s domain and recovery conventions.
    fn verify(
        &self,
        chain: &dyn ChainAdapter,
        claimed: &str,
        content: &[u8],
        signature: &str,
    ) -> Result<(), VerificationError> {
        chain.verify(claimed, content, signature)
    }
}

/// EIP-712 issuing authorization signed by the owner's wallet.
///
/// Signature checks go through the chain adapter of the operation, which owns
/// the chain id and the recovery id offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct EthIssuingAuthorization;

#[derive(Deserialize)]
struct EthAuthorizationDocument {
    message: IssuingAuthorization,
}

impl AuthorizationSchema for EthIssuingAuthorization {
    fn decode(&self, content: &[u8]) -> Result<IssuingAuthorization, AuthorizationError> {
        let document: EthAuthorizationDocument =
            serde_json::from_slice(content).map_err(|e| AuthorizationError::Malformed(e.to_string()))?;
        Ok(document.message)
    }
}

/// Schema registry and resolution entry point.
#[derive(Clone)]
pub struct AuthorizationResolver {
    schemas: HashMap<String, Arc<dyn AuthorizationSchema>>,
}

impl AuthorizationResolver {
    /// A resolver with no schemas registered.
    pub fn new() -> Self {
        Self {
            schemas: HashMap::new(),
        }
    }

    /// Registers `strategy` under `schema`, returning the strategy it replaces.
    pub fn register<S: AuthorizationSchema + 'static>(
        &mut self,
        schema: &str,
        strategy: S,
    ) -> Option<Arc<dyn AuthorizationSchema>> {
        self.schemas.insert(schema.to_string(), Arc::new(strategy))
    }

    pub fn supports(&self, schema: &str) -> bool {
        self.schemas.contains_key(schema)
    }

    /// Decodes `encoded_content` with `schema`'s strategy and verifies it against its claimed owner on `chain`.
    ///
    /// # Errors
    /// - `UnsupportedSchema` if no strategy is registered for `schema`
    /// - `InvalidAuthorization` if decoding fails, the owner is on another chain,
    ///   or the signature does not verify under `chain`'s domain
    pub fn resolve(
        &self,
        chain: &dyn ChainAdapter,
        schema: &str,
        encoded_content: &[u8],
        signature: &str,
    ) -> Result<IssuingAuthorization> {
        let strategy = self
            .schemas
            .get(schema)
            .ok_or_else(|| Error::UnsupportedSchema(schema.to_string()))?;

        let authorization = strategy.decode(encoded_content)?;
        if authorization.owner.chain != chain.chain() {
            warn!(
                "rejected {schema} authorization: owner chain {} is not {}",
                authorization.owner.chain,
                chain.chain()
            );
            return Err(AuthorizationError::ChainMismatch {
                expected: chain.chain().to_string(),
                found: authorization.owner.chain,
            }
            .into());
        }

        let claimed = strategy.claimed_identity(&authorization);
        if let Err(err) = strategy.verify(chain, claimed, encoded_content, signature) {
            warn!("rejected {schema} authorization claimed by {claimed}: {err}");
            return Err(AuthorizationError::Signature(err).into());
        }

        debug!("resolved {schema} authorization from owner {claimed}");
        Ok(authorization)
    }

    /// Resolves an envelope whose content is base64 encoded.
    pub fn resolve_envelope(
        &self,
        chain: &dyn ChainAdapter,
        envelope: &AuthorizationEnvelope,
    ) -> Result<IssuingAuthorization> {
        if !self.supports(&envelope.schema) {
            return Err(Error::UnsupportedSchema(envelope.schema.clone()));
        }
        let content = decode_base64(&envelope.content)
            .map_err(|e| AuthorizationError::Malformed(format!("content is not base64: {e}")))?;
        self.resolve(chain, &envelope.schema, &content, &envelope.signature)
    }
}

impl Default for AuthorizationResolver {
    /// A resolver holding the EVM issuing authorization schema.
    fn default() -> Self {
        let mut resolver = Self::new();
        resolver.register(ETH_ISSUING_AUTHORIZATION, EthIssuingAuthorization);
        resolver
    }
}

/// Owner side: encodes and signs an authorization for `adapter`'s chain.
///
/// The returned envelope is what the owner hands to the issuer.
pub async fn authorize<S>(
    adapter: &EthereumAdapter,
    authorization: &IssuingAuthorization,
    signer: &S,
) -> Result<AuthorizationEnvelope>
where
    S: SigningCapability + ?Sized,
{
    let typed: TypedData = templates::authorization(adapter.chain_id(), authorization)?;
    let content = typed.to_canonical_bytes()?;
    let signature = sign_payload(adapter, signer, &content).await?;
    Ok(AuthorizationEnvelope {
        schema: ETH_ISSUING_AUTHORIZATION.to_string(),
        content: encode_base64(&content),
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_authorization, sample_issuer, signed_authorization};
    use crate::wallet::key_management::KeyManager;

    struct FixedSchema;

    impl AuthorizationSchema for FixedSchema {
        fn decode(&self, content: &[u8]) -> Result<IssuingAuthorization, AuthorizationError> {
            let mut authorization = sample_authorization("0xTEST", &sample_issuer("0xISSUER"));
            authorization.request.resource = String::from_utf8_lossy(content).into_owned();
            Ok(authorization)
        }

        fn verify(
            &self,
            _chain: &dyn ChainAdapter,
            _claimed: &str,
            _content: &[u8],
            signature: &str,
        ) -> Result<(), VerificationError> {
            if signature == "trusted" {
                Ok(())
            } else {
                Err(VerificationError::MalformedSignature("untrusted".into()))
            }
        }
    }

    fn eth() -> EthereumAdapter {
        EthereumAdapter::mainnet()
    }

    #[tokio::test]
    async fn test_resolves_owner_signed_authorization() {
        let owner = KeyManager::new();
        let issuer = sample_issuer("0x0000000000000000000000000000000000000002");
        let envelope = signed_authorization(&owner, &issuer).await;

        let resolved = AuthorizationResolver::default().resolve_envelope(&eth(), &envelope).unwrap();
        assert_eq!(resolved.owner.public_address, owner.address());
        assert_eq!(resolved.issuer, issuer);
        assert_eq!(resolved.request.fields.len(), 3);
    }

    #[tokio::test]
    async fn test_signature_by_someone_else_is_rejected() {
        let owner = KeyManager::new();
        let impostor = KeyManager::new();
        let issuer = sample_issuer("0x0000000000000000000000000000000000000002");

        // authorization names `owner` but is signed by `impostor`
        let authorization = sample_authorization(owner.address(), &issuer);
        let envelope = authorize(&eth(), &authorization, &impostor).await.unwrap();

        let err = AuthorizationResolver::default().resolve_envelope(&eth(), &envelope).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidAuthorization(AuthorizationError::Signature(VerificationError::SignerMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_authorization_signed_for_another_chain_id() {
        let owner = KeyManager::new();
        let issuer = sample_issuer("0x0000000000000000000000000000000000000002");
        let authorization = sample_authorization(owner.address(), &issuer);
        let envelope = authorize(&EthereumAdapter::new("POLYGON", 137), &authorization, &owner)
            .await
            .unwrap();

        let err = AuthorizationResolver::default().resolve_envelope(&eth(), &envelope).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidAuthorization(AuthorizationError::Signature(VerificationError::DomainMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_authorization_in_foreign_domain() {
        let owner = KeyManager::new();
        let issuer = sample_issuer("0x0000000000000000000000000000000000000002");
        let authorization = sample_authorization(owner.address(), &issuer);

        let mut typed = templates::authorization(1, &authorization).unwrap();
        typed.domain.name = "other-app".to_string();
        let content = typed.to_canonical_bytes().unwrap();
        let signature = sign_payload(&eth(), &owner, &content).await.unwrap();

        let err = AuthorizationResolver::default()
            .resolve(&eth(), ETH_ISSUING_AUTHORIZATION, &content, &signature)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidAuthorization(AuthorizationError::Signature(VerificationError::DomainMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_owner_on_another_chain() {
        let owner = KeyManager::new();
        let issuer = sample_issuer("0x0000000000000000000000000000000000000002");
        let mut authorization = sample_authorization(owner.address(), &issuer);
        authorization.owner.chain = "POLYGON".to_string();
        let envelope = authorize(&eth(), &authorization, &owner).await.unwrap();

        let err = AuthorizationResolver::default().resolve_envelope(&eth(), &envelope).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidAuthorization(AuthorizationError::ChainMismatch { found, .. }) if found == "POLYGON"
        ));
    }

    #[tokio::test]
    async fn test_tampered_content_is_rejected() {
        let owner = KeyManager::new();
        let issuer = sample_issuer("0x0000000000000000000000000000000000000002");
        let envelope = signed_authorization(&owner, &issuer).await;

        let content = decode_base64(&envelope.content).unwrap();
        let tampered = String::from_utf8(content).unwrap().replace("passport-42", "passport-43");
        let err = AuthorizationResolver::default()
            .resolve(&eth(), &envelope.schema, tampered.as_bytes(), &envelope.signature)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAuthorization(_)));
    }

    #[test]
    fn test_unknown_schema() {
        let err = AuthorizationResolver::default()
            .resolve(&eth(), "anima:schema:sol_issuing_authorization", b"{}", "0x")
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedSchema(s) if s == "anima:schema:sol_issuing_authorization"));
    }

    #[test]
    fn test_malformed_content() {
        let envelope = AuthorizationEnvelope {
            schema: ETH_ISSUING_AUTHORIZATION.to_string(),
            content: encode_base64(b"not json"),
            signature: "0x".to_string(),
        };
        let err = AuthorizationResolver::default().resolve_envelope(&eth(), &envelope).unwrap_err();
        assert!(matches!(err, Error::InvalidAuthorization(AuthorizationError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_registering_schema_keeps_existing_results() {
        let owner = KeyManager::new();
        let issuer = sample_issuer("0x0000000000000000000000000000000000000002");
        let envelope = signed_authorization(&owner, &issuer).await;

        let before = AuthorizationResolver::default().resolve_envelope(&eth(), &envelope).unwrap();

        let mut resolver = AuthorizationResolver::default();
        assert!(resolver.register("test:v1", FixedSchema).is_none());

        let after = resolver.resolve_envelope(&eth(), &envelope).unwrap();
        assert_eq!(before, after);

        let dummy = resolver.resolve(&eth(), "test:v1", b"resource-7", "trusted").unwrap();
        assert_eq!(dummy.owner.public_address, "0xTEST");
        assert_eq!(dummy.request.resource, "resource-7");
        assert!(resolver.resolve(&eth(), "test:v1", b"resource-7", "forged").is_err());
    }
}
