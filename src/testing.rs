// src/testing.rs
//! Shared test fixtures.

use crate::chains::EthereumAdapter;
use crate::error::TransportError;
use crate::models::authorization::{AuthorizationEnvelope, IssuingAuthorization, IssuingAuthorizationRequest};
use crate::models::credential::{Attribute, AttributeType, IssueDocument, IssueRequest, Proof, Resource};
use crate::models::envelope::SignedEnvelope;
use crate::models::identity::{Issuer, Owner};
use crate::services::authorization::authorize;
use crate::transport::Transport;
use crate::utils::crypto::hash;
use crate::utils::serialization::encode_base64;
use crate::wallet::key_management::KeyManager;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

pub(crate) const RESOURCE_ID: &str = "anima:resource:passport-42";

fn raw_values() -> [(&'static str, AttributeType, &'static str); 3] {
    [
        ("firstname", AttributeType::String, "John"),
        ("lastname", AttributeType::String, "Doe"),
        ("birth_date", AttributeType::Date, "1990-01-01"),
    ]
}

pub(crate) fn sample_issuer(address: &str) -> Issuer {
    Issuer {
        id: format!("anima:issuer:{address}"),
        public_address: address.to_string(),
        chain: "ETH".to_string(),
    }
}

pub(crate) fn sample_authorization(owner_address: &str, issuer: &Issuer) -> IssuingAuthorization {
    let fields = raw_values()
        .into_iter()
        .map(|(name, _, value)| (name.to_string(), Value::String(hash(value.as_bytes()))))
        .collect();

    IssuingAuthorization {
        request: IssuingAuthorizationRequest {
            resource: RESOURCE_ID.to_string(),
            requested_at: 1_700_000_000,
            fields,
        },
        owner: Owner {
            id: format!("anima:owner:{owner_address}"),
            public_address: owner_address.to_string(),
            chain: "ETH".to_string(),
            wallet: "metamask".to_string(),
        },
        issuer: issuer.clone(),
    }
}

/// An authorization for `issuer`, signed by `owner` on Ethereum mainnet.
pub(crate) async fn signed_authorization(owner: &KeyManager, issuer: &Issuer) -> AuthorizationEnvelope {
    let authorization = sample_authorization(owner.address(), issuer);
    authorize(&EthereumAdapter::mainnet(), &authorization, owner)
        .await
        .unwrap()
}

/// A passport issuance with `firstname`, `lastname` and `birth_date`.
pub(crate) fn sample_request(authorization: AuthorizationEnvelope) -> IssueRequest {
    let attributes: BTreeMap<String, Attribute> = raw_values()
        .into_iter()
        .map(|(name, kind, value)| {
            let attribute = Attribute {
                name: name.to_string(),
                kind,
                value: value.as_bytes().to_vec(),
                format: None,
            };
            (name.to_string(), attribute)
        })
        .collect();

    let proof = json!({
        "face": {"liveness": true, "score": 0.98},
        "document": {"mrz_valid": true}
    });

    IssueRequest {
        resource: Resource {
            id: RESOURCE_ID.to_string(),
            expires_at: 1_900_000_000,
        },
        document: IssueDocument {
            specs: "anima:specs:document/passport@1.0.0".to_string(),
            content: json!({
                "country": "FRA",
                "document_number": "18AB12345",
                "firstname": "John",
                "lastname": "Doe",
                "birth_date": "1990-01-01"
            }),
        },
        attributes,
        proof: Proof {
            content: encode_base64(proof.to_string()),
            signature: None,
        },
        authorization,
    }
}

/// Records every envelope it receives and answers `verify` with a canned envelope.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    issued: Mutex<Vec<SignedEnvelope>>,
    verified: Mutex<Vec<SignedEnvelope>>,
    registered: Mutex<Vec<SignedEnvelope>>,
    response: Mutex<Option<SignedEnvelope>>,
}

impl RecordingTransport {
    pub(crate) fn responding(response: SignedEnvelope) -> Self {
        Self {
            response: Mutex::new(Some(response)),
            ..Self::default()
        }
    }

    pub(crate) fn issued(&self) -> Vec<SignedEnvelope> {
        self.issued.lock().unwrap().clone()
    }

    pub(crate) fn verified(&self) -> Vec<SignedEnvelope> {
        self.verified.lock().unwrap().clone()
    }

    pub(crate) fn registered(&self) -> Vec<SignedEnvelope> {
        self.registered.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.issued().len() + self.verified().len() + self.registered().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn issue(&self, envelope: SignedEnvelope) -> Result<(), TransportError> {
        self.issued.lock().unwrap().push(envelope);
        Ok(())
    }

    async fn verify(&self, envelope: SignedEnvelope) -> Result<SignedEnvelope, TransportError> {
        self.verified.lock().unwrap().push(envelope);
        self.response
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| TransportError::Other("no response configured".to_string()))
    }

    async fn register_verifier(&self, envelope: SignedEnvelope) -> Result<(), TransportError> {
        self.registered.lock().unwrap().push(envelope);
        Ok(())
    }
}
