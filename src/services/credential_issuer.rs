// src/services/credential_issuer.rs
//! Credential Issuer Service
//!
//! Turns an unsigned [`IssueRequest`] into a [`SignedRequest`]:
//! 1. resolve and verify the owner's issuing authorization
//! 2. derive the source document identifier
//! 3. build and sign one credential per attribute, concurrently
//! 4. sign the proof
//!
//! Signing is all-or-nothing. The first failure drops every in-flight
//! signature and no partially signed request is ever returned.

use crate::chains::{sign_payload, ChainAdapter, ChainRegistry};
use crate::error::{AuthorizationError, Error, Result};
use crate::models::credential::{
    Attribute, Credential, CredentialContent, CredentialSource, IssueDocument, IssueRequest, Proof, Resource,
    SignedAttribute, SignedRequest,
};
use crate::models::identity::{Issuer, Owner};
use crate::models::protocol::ProtocolConfig;
use crate::services::authorization::AuthorizationResolver;
use crate::services::gateway::ProtocolGateway;
use crate::transport::GatewayContext;
use crate::utils::crypto::hash;
use crate::utils::serialization::{canonical_json, decode_base64};
use crate::wallet::key_management::SigningCapability;
use futures::future::try_join_all;
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Prefix of source document identifiers.
pub const DOCUMENT_ID_PREFIX: &str = "anima:document:";

/// `anima:document:<sha256 of the compact, key-sorted document json>`.
pub fn document_identifier(document: &IssueDocument) -> Result<String> {
    Ok(format!("{DOCUMENT_ID_PREFIX}{}", hash(&canonical_json(document)?)))
}

/// The statement signed for one attribute. Only the value's content hash is included.
pub fn credential_content(
    attribute: &Attribute,
    resource: &Resource,
    source: &CredentialSource,
    owner: &Owner,
    issuer: &Issuer,
) -> CredentialContent {
    CredentialContent {
        expires_at: resource.expires_at,
        name: attribute.name.clone(),
        kind: attribute.kind,
        hash: hash(&attribute.value),
        source: source.clone(),
        owner: owner.clone(),
        issuer: issuer.clone(),
    }
}

/// Signs attribute credentials and proofs.
#[derive(Clone)]
pub struct CredentialSigner {
    chains: Arc<ChainRegistry>,
    authorizations: Arc<AuthorizationResolver>,
}

impl CredentialSigner {
    pub fn new(chains: Arc<ChainRegistry>, authorizations: Arc<AuthorizationResolver>) -> Self {
        Self { chains, authorizations }
    }

    /// Signs every attribute of `request` and its proof on behalf of `issuer`.
    ///
    /// # Errors
    /// - `Config` if `config.chain` has no registered adapter (before any crypto work)
    /// - `UnsupportedSchema` / `InvalidAuthorization` if the authorization cannot be trusted
    ///   or was granted to a different issuer
    /// - `Credential { attribute }` for the first attribute whose credential could not be signed
    /// - `Signing` / `Encoding` if the proof could not be signed
    pub async fn sign<S>(
        &self,
        config: &ProtocolConfig,
        issuer: &Issuer,
        request: IssueRequest,
        signer: &S,
    ) -> Result<SignedRequest>
    where
        S: SigningCapability + ?Sized,
    {
        let adapter = self.chains.get(&config.chain)?;

        let authorization = self
            .authorizations
            .resolve_envelope(adapter.as_ref(), &request.authorization)?;
        if !authorization
            .issuer
            .public_address
            .eq_ignore_ascii_case(&issuer.public_address)
        {
            return Err(AuthorizationError::IssuerMismatch {
                granted: authorization.issuer.public_address,
                actual: issuer.public_address.clone(),
            }
            .into());
        }
        let owner = authorization.owner;

        let source = CredentialSource {
            id: document_identifier(&request.document)?,
            specs: request.document.specs.clone(),
        };

        let pending = request.attributes.iter().map(|(key, attribute)| {
            let content = credential_content(attribute, &request.resource, &source, &owner, issuer);
            self.sign_attribute(adapter.as_ref(), key, attribute, content, signer)
        });
        let attributes: BTreeMap<String, SignedAttribute> = try_join_all(pending).await?.into_iter().collect();

        let proof = Self::sign_proof(adapter.as_ref(), &request.proof, signer).await?;

        info!(
            "signed {} credentials for resource {} (source {})",
            attributes.len(),
            request.resource.id,
            source.id
        );

        Ok(SignedRequest {
            resource: request.resource,
            document: request.document,
            attributes,
            proof,
            authorization: request.authorization,
        })
    }

    async fn sign_attribute<S>(
        &self,
        adapter: &dyn ChainAdapter,
        key: &str,
        attribute: &Attribute,
        content: CredentialContent,
        signer: &S,
    ) -> Result<(String, SignedAttribute)>
    where
        S: SigningCapability + ?Sized,
    {
        let signed = async {
            let canonical = adapter.encode_credential(&content)?;
            sign_payload(adapter, signer, &canonical).await
        };
        let signature = signed.await.map_err(|source| Error::Credential {
            attribute: key.to_string(),
            source: Box::new(source),
        })?;
        debug!("signed credential `{key}`");

        Ok((
            key.to_string(),
            SignedAttribute {
                value: attribute.clone(),
                credential: Credential { content, signature },
            },
        ))
    }

    /// Signs the proof content as-is; it must be base64 JSON.
    async fn sign_proof<S>(adapter: &dyn ChainAdapter, proof: &Proof, signer: &S) -> Result<Proof>
    where
        S: SigningCapability + ?Sized,
    {
        let raw = decode_base64(&proof.content)?;
        serde_json::from_slice::<serde_json::Value>(&raw)?;

        let canonical = adapter.encode_content(&proof.content)?;
        let signature = sign_payload(adapter, signer, &canonical).await?;
        Ok(Proof {
            content: proof.content.clone(),
            signature: Some(signature),
        })
    }
}

/// Signs issuance requests and submits them to the protocol.
#[derive(Clone)]
pub struct CredentialIssuer {
    signer: CredentialSigner,
    gateway: ProtocolGateway,
}

impl CredentialIssuer {
    pub fn new(signer: CredentialSigner, gateway: ProtocolGateway) -> Self {
        Self { signer, gateway }
    }

    /// Default chain registry and authorization schemas.
    pub fn with_defaults() -> Self {
        let chains = Arc::new(ChainRegistry::default());
        let authorizations = Arc::new(AuthorizationResolver::default());
        Self::new(
            CredentialSigner::new(chains.clone(), authorizations),
            ProtocolGateway::new(chains),
        )
    }

    pub fn signer(&self) -> &CredentialSigner {
        &self.signer
    }

    pub fn gateway(&self) -> &ProtocolGateway {
        &self.gateway
    }

    /// Signs `request` and issues it through `context`.
    ///
    /// The configuration is validated before any signing happens.
    pub async fn issue<S>(
        &self,
        context: &GatewayContext,
        config: &ProtocolConfig,
        issuer: &Issuer,
        request: IssueRequest,
        signer: &S,
    ) -> Result<SignedRequest>
    where
        S: SigningCapability + ?Sized,
    {
        self.gateway.validate(config)?;
        let signed = self.signer.sign(config, issuer, request, signer).await?;
        self.gateway.issue(context, config, signer, &signed).await?;
        Ok(signed)
    }
}
