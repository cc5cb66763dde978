// src/chains/mod.rs
//! Chain capability registry.
//!
//! Every signed object is scoped to one chain. A [`ChainAdapter`] bundles the
//! chain's canonical encoding, digest, signature formatting and verification;
//! the [`ChainRegistry`] maps chain tags to adapters and is consulted once per
//! call. Supporting a new chain is a `register` call.

pub mod ethereum;

use crate::error::{ConfigError, Error, SchemaError, VerificationError};
use crate::models::credential::CredentialContent;
use crate::wallet::key_management::SigningCapability;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

pub use ethereum::EthereumAdapter;

/// Encode / sign-adapter / verify bundle for one chain.
pub trait ChainAdapter: Send + Sync {
    /// Chain tag, e.g. `"ETH"`.
    fn chain(&self) -> &str;

    /// Canonical bytes of a credential statement.
    fn encode_credential(&self, content: &CredentialContent) -> Result<Vec<u8>, SchemaError>;

    /// Canonical bytes of the single-string record used for envelopes and proofs.
    fn encode_content(&self, content: &str) -> Result<Vec<u8>, SchemaError>;

    /// Digest that is handed to the signing capability.
    fn digest(&self, canonical: &[u8]) -> Result<[u8; 32], SchemaError>;

    /// Brings a capability's signature into the chain's textual form.
    fn normalize_signature(&self, signature: String) -> String;

    /// Checks that `signature` over `canonical` was produced by `claimed`.
    fn verify(&self, claimed: &str, canonical: &[u8], signature: &str) -> Result<(), VerificationError>;
}

/// Chain tag to adapter.
#[derive(Clone)]
pub struct ChainRegistry {
    adapters: HashMap<String, Arc<dyn ChainAdapter>>,
}

impl ChainRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registers `adapter` under its chain tag, returning the adapter it replaces.
    pub fn register<A: ChainAdapter + 'static>(&mut self, adapter: A) -> Option<Arc<dyn ChainAdapter>> {
        self.adapters.insert(adapter.chain().to_string(), Arc::new(adapter))
    }

    pub fn get(&self, chain: &str) -> Result<Arc<dyn ChainAdapter>, ConfigError> {
        self.adapters
            .get(chain)
            .cloned()
            .ok_or_else(|| ConfigError::UnsupportedChain(chain.to_string()))
    }

    pub fn contains(&self, chain: &str) -> bool {
        self.adapters.contains_key(chain)
    }

    pub fn chains(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }
}

impl Default for ChainRegistry {
    /// A registry holding the Ethereum mainnet adapter.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(EthereumAdapter::mainnet());
        registry
    }
}

/// Signs canonical bytes with `signer` under `adapter`'s conventions.
///
/// Capability errors are returned unchanged; nothing is retried.
pub async fn sign_payload<S>(adapter: &dyn ChainAdapter, signer: &S, canonical: &[u8]) -> Result<String, Error>
where
    S: SigningCapability + ?Sized,
{
    let digest = adapter.digest(canonical)?;
    debug!("signing {} payload of {} bytes", adapter.chain(), canonical.len());
    let signature = signer.sign(&digest).await?;
    Ok(adapter.normalize_signature(signature))
}
