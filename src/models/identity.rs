// src/models/identity.rs
//! Participant identities embedded in signed payloads.
//!
//! Identities are immutable once they are part of a signed payload: changing
//! any field changes the digest and invalidates the signature.

use serde::{Deserialize, Serialize};

/// The data owner: the person the attributes describe.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Owner {
    /// Protocol identifier of the owner
    /// Example: "anima:owner:0x6F0e...c3B1"
    pub id: String,

    /// Address the owner signs with
    pub public_address: String,

    /// Chain tag the address belongs to, e.g. "ETH"
    pub chain: String,

    /// Wallet software used by the owner
    #[serde(default)]
    pub wallet: String,
}

/// The party attaching credentials to an owner's data.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Issuer {
    pub id: String,
    pub public_address: String,
    pub chain: String,
}

/// A party allowed to request shared credentials.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Verifier {
    pub id: String,
    pub public_address: String,
    pub chain: String,
}
