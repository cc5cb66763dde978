// src/wallet/key_management.rs
//! Signing capabilities.
//!
//! The engine never holds raw key material itself: every signature is
//! requested from a [`SigningCapability`] supplied by the caller. Local keys,
//! hardware wallets and remote signers all plug in through the same trait.
//!
//! [`KeyManager`] is the in-process implementation:
//! - secp256k1 curve (via `k256` crate)
//! - deterministic recoverable ECDSA (RFC 6979) over pre-hashed digests
//! - `r ‖ s ‖ v` output with the chain's recovery-id offset applied

use crate::chains::ethereum::verify::address_of;
use crate::chains::ethereum::RECOVERY_ID_OFFSET;
use crate::error::SigningError;
use async_trait::async_trait;
use ethers::utils::hex;
use k256::ecdsa::SigningKey;
use std::fmt;
use std::sync::Arc;

/// Produces a signature string for a digest.
///
/// Implementations own timeouts, user prompts and retries; errors they return
/// are propagated to the caller verbatim.
#[async_trait]
pub trait SigningCapability: Send + Sync {
    async fn sign(&self, digest: &[u8]) -> Result<String, SigningError>;
}

#[async_trait]
impl<T: SigningCapability + ?Sized> SigningCapability for Arc<T> {
    async fn sign(&self, digest: &[u8]) -> Result<String, SigningError> {
        (**self).sign(digest).await
    }
}

/// Local secp256k1 key custody.
///
/// # Security Notes
/// - The private key is never exposed or logged; `Debug` prints the address only
/// - Uses cryptographically secure random number generation for new keys
#[derive(Clone)]
pub struct KeyManager {
    /// Securely stored private key (never exposed)
    signing_key: SigningKey,
    /// Checksummed address derived from the public key
    address: String,
    /// Added to the recovery id when serializing `v`
    recovery_offset: u8,
}

impl KeyManager {
    /// Generates a KeyManager with a fresh random key.
    pub fn new() -> Self {
        Self::from_signing_key(SigningKey::random(&mut rand::thread_rng()))
    }

    /// Loads a hex-encoded private key (with or without `0x` prefix).
    ///
    /// # Errors
    /// Returns `SigningError` if the string is not hex or not a valid secp256k1 scalar.
    pub fn from_private_key(private_key: &str) -> Result<Self, SigningError> {
        let raw = private_key.trim().trim_start_matches("0x");
        let bytes = hex::decode(raw).map_err(|e| SigningError::new(format!("invalid private key: {e}")))?;
        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|_| SigningError::new("invalid private key: not a secp256k1 scalar"))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = address_of(signing_key.verifying_key());
        Self {
            signing_key,
            address,
            recovery_offset: RECOVERY_ID_OFFSET,
        }
    }

    /// Use a different recovery-id convention, e.g. `0` for raw `{0, 1}`.
    pub fn with_recovery_offset(mut self, offset: u8) -> Self {
        self.recovery_offset = offset;
        self
    }

    /// The EIP-55 address this key signs as.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Signs a 32-byte digest, returning `0x`-prefixed `r ‖ s ‖ v`.
    pub fn sign_digest(&self, digest: &[u8]) -> Result<String, SigningError> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(SigningError::new)?;

        let mut bytes = signature.to_vec();
        bytes.push(recovery_id.to_byte() + self.recovery_offset);
        Ok(format!("0x{}", hex::encode(bytes)))
    }
}

impl Default for KeyManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyManager").field("address", &self.address).finish_non_exhaustive()
    }
}

#[async_trait]
impl SigningCapability for KeyManager {
    async fn sign(&self, digest: &[u8]) -> Result<String, SigningError> {
        self.sign_digest(digest)
    }
}
