// src/chains/ethereum/mod.rs
//! EVM chain adapter: EIP-712 typed data, secp256k1 signatures, `v ∈ {27, 28}`.

pub mod templates;
pub mod typed_data;
pub mod verify;

use crate::chains::ChainAdapter;
use crate::error::{SchemaError, VerificationError};
use crate::models::credential::CredentialContent;
use crate::models::protocol::CHAIN_ETH;

/// Ethereum's recovery id convention: `v = 27 + recovery_id`.
pub const RECOVERY_ID_OFFSET: u8 = 27;

/// Adapter for EVM-compatible chains.
#[derive(Debug, Clone)]
pub struct EthereumAdapter {
    chain: String,
    chain_id: u64,
    recovery_offset: u8,
}

impl EthereumAdapter {
    /// Creates an adapter for `chain`, signing under EIP-712 domain `chain_id`.
    pub fn new(chain: &str, chain_id: u64) -> Self {
        Self {
            chain: chain.to_string(),
            chain_id,
            recovery_offset: RECOVERY_ID_OFFSET,
        }
    }

    /// Ethereum mainnet, chain tag `"ETH"`.
    pub fn mainnet() -> Self {
        Self::new(CHAIN_ETH, 1)
    }

    pub fn with_recovery_offset(mut self, offset: u8) -> Self {
        self.recovery_offset = offset;
        self
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn recovery_offset(&self) -> u8 {
        self.recovery_offset
    }
}

impl ChainAdapter for EthereumAdapter {
    fn chain(&self) -> &str {
        &self.chain
    }

    fn encode_credential(&self, content: &CredentialContent) -> Result<Vec<u8>, SchemaError> {
        templates::credential(self.chain_id, content)?.to_canonical_bytes()
    }

    fn encode_content(&self, content: &str) -> Result<Vec<u8>, SchemaError> {
        templates::content(self.chain_id, content).to_canonical_bytes()
    }

    fn digest(&self, canonical: &[u8]) -> Result<[u8; 32], SchemaError> {
        typed_data::digest(canonical)
    }

    fn normalize_signature(&self, signature: String) -> String {
        if signature.starts_with("0x") {
            signature
        } else {
            format!("0x{signature}")
        }
    }

    fn verify(&self, claimed: &str, canonical: &[u8], signature: &str) -> Result<(), VerificationError> {
        verify::verify_scoped(
            claimed,
            canonical,
            signature,
            self.recovery_offset,
            &templates::domain(self.chain_id),
            &templates::domain_fields(),
        )
    }
}
