// src/utils/crypto.rs
//! Hashing primitives.
//!
//! - SHA-256 (via `ring`) for content hashes: attribute values, documents.
//! - Keccak-256 (via `ethers`) for everything that ends up inside an EVM signature.

use ethers::utils::{hex, keccak256};
use ring::digest::{digest, SHA256};

/// Computes the hex-encoded SHA-256 digest of `content`.
///
/// Total over all inputs, including the empty slice. Used wherever the protocol
/// stores a content hash in place of raw personal data.
pub fn hash(content: &[u8]) -> String {
    hex::encode(digest(&SHA256, content).as_ref())
}

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}
