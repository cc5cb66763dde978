// src/chains/ethereum/verify.rs
//! Signature verification by public-key recovery.
//!
//! A signature is `r ‖ s ‖ v` (65 bytes, hex, optional `0x`). `v` must be one
//! of the two values the chain convention allows (`offset` and `offset + 1`).
//! The signer's address is recovered from the typed-data digest and compared
//! case-insensitively against the claimed address.

use crate::chains::ethereum::typed_data::{Domain, TypedData, TypedField, DOMAIN_TYPE};
use crate::error::VerificationError;
use crate::utils::crypto::hash_data;
use ethers::types::Address;
use ethers::utils::{hex, to_checksum};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

/// Length of an `r ‖ s ‖ v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Verifies `signature` over the canonical typed-data bytes `data` against `public_address`.
///
/// Whatever domain `data` declares is accepted; see [`verify_scoped`].
///
/// # Errors
/// - `MalformedSignature` / `InvalidLength` / `InvalidRecoveryId` when the signature has the wrong shape
/// - `Digest` when `data` is not valid typed data
/// - `RecoveryFailed` when no public key can be recovered
/// - `SignerMismatch` when the recovered address differs from `public_address`
pub fn verify_signature(
    public_address: &str,
    data: &[u8],
    signature: &str,
    recovery_offset: u8,
) -> Result<(), VerificationError> {
    let (rs, recovery_id) = parse_signature(signature, recovery_offset)?;
    let typed = TypedData::from_slice(data)?;
    verify_typed(public_address, &typed, &rs, recovery_id)
}

/// Like [`verify_signature`], but `data` must be scoped to `domain` and declare
/// `domain_fields` as its `EIP712Domain` type.
///
/// # Errors
/// `DomainMismatch` when the payload belongs to another chain or application.
pub fn verify_scoped(
    public_address: &str,
    data: &[u8],
    signature: &str,
    recovery_offset: u8,
    domain: &Domain,
    domain_fields: &[TypedField],
) -> Result<(), VerificationError> {
    let (rs, recovery_id) = parse_signature(signature, recovery_offset)?;
    let typed = TypedData::from_slice(data)?;

    let declared = typed.types.get(DOMAIN_TYPE).map(Vec::as_slice);
    if typed.domain != *domain || declared != Some(domain_fields) {
        return Err(VerificationError::DomainMismatch {
            expected: describe(domain),
            found: describe(&typed.domain),
        });
    }
    verify_typed(public_address, &typed, &rs, recovery_id)
}

fn describe(domain: &Domain) -> String {
    format!("{} {} (chain id {})", domain.name, domain.version, domain.chain_id)
}

/// Splits a hex `r ‖ s ‖ v` signature into `r ‖ s` and a normalized recovery id.
fn parse_signature(signature: &str, recovery_offset: u8) -> Result<(Vec<u8>, RecoveryId), VerificationError> {
    let raw = signature.strip_prefix("0x").unwrap_or(signature);
    let mut bytes = hex::decode(raw).map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;

    if bytes.len() != SIGNATURE_LENGTH {
        return Err(VerificationError::InvalidLength(bytes.len()));
    }

    let v = bytes[64];
    let recovery_id = normalize_recovery_id(v, recovery_offset).ok_or(VerificationError::InvalidRecoveryId(v))?;
    bytes.truncate(64);
    Ok((bytes, recovery_id))
}

fn verify_typed(
    public_address: &str,
    typed: &TypedData,
    rs: &[u8],
    recovery_id: RecoveryId,
) -> Result<(), VerificationError> {
    let recovered = recover_address(&typed.digest()?, rs, recovery_id)?;
    if !recovered.eq_ignore_ascii_case(public_address) {
        return Err(VerificationError::SignerMismatch {
            expected: public_address.to_string(),
            recovered,
        });
    }
    Ok(())
}

/// Maps `offset`/`offset + 1` to recovery ids 0/1; anything else is rejected.
pub fn normalize_recovery_id(v: u8, offset: u8) -> Option<RecoveryId> {
    v.checked_sub(offset)
        .filter(|id| *id <= 1)
        .and_then(RecoveryId::from_byte)
}

/// Recovers the checksummed address that produced `rs` over `digest`.
pub fn recover_address(digest: &[u8; 32], rs: &[u8], recovery_id: RecoveryId) -> Result<String, VerificationError> {
    let signature = Signature::from_slice(rs).map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;
    let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|e| VerificationError::RecoveryFailed(e.to_string()))?;
    Ok(address_of(&key))
}

/// EIP-55 address of a secp256k1 public key.
pub fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let hash = hash_data(&point.as_bytes()[1..]);
    to_checksum(&Address::from_slice(&hash[12..]), None)
}
