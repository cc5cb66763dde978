// src/lib.rs

//! # Anima Protocol Client
//!
//! Credential issuance and verification for the anima protocol.
//!
//! ## Architecture Overview
//! 1. **Chains Layer**: canonical typed-data encoding, digests and signature recovery per chain
//! 2. **Wallet Layer**: signing capabilities supplied by the caller
//! 3. **Services Layer**: authorization resolution, credential signing and the protocol gateway
//! 4. **Transport Layer**: the connection to the protocol service, owned by a `GatewayContext`
//!
//! ## Typical flow
//! ```text
//! IssueRequest ──► CredentialSigner ──► SignedRequest ──► ProtocolGateway ──► Transport
//!                    │                                        │
//!                    ├─ AuthorizationResolver                 └─ response signature check
//!                    └─ SigningCapability
//! ```

pub mod chains;    // Chain adapters and registry
pub mod error;     // Error taxonomy
pub mod models;    // Data structures
pub mod services;  // Signing, authorization and gateway
pub mod settings;  // Layered configuration
pub mod transport; // Protocol transport
pub mod utils;     // Hashing and serialization helpers
pub mod wallet;    // Signing capabilities

#[cfg(test)]
pub(crate) mod testing;

pub use chains::{ChainAdapter, ChainRegistry, EthereumAdapter};
pub use error::{Error, Result};
pub use services::authorization::{AuthorizationResolver, AuthorizationSchema};
pub use services::credential_issuer::{CredentialIssuer, CredentialSigner};
pub use services::gateway::ProtocolGateway;
pub use transport::GatewayContext;
pub use wallet::key_management::{KeyManager, SigningCapability};
