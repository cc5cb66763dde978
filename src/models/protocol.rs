// src/models/protocol.rs
//! Protocol configuration passed to every operation.

use serde::{Deserialize, Serialize};

/// Production protocol endpoint.
pub const MAINNET: &str = "protocol.anima.io:443";
/// Test protocol endpoint.
pub const TESTNET: &str = "protocol-tesnet.anima.io:443";
/// Ethereum chain tag.
pub const CHAIN_ETH: &str = "ETH";

/// Where and how to reach the protocol, and whom to trust for responses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    /// Network endpoint, `host:port`
    pub network: String,

    /// Chain tag selecting the signing/verification adapter
    pub chain: String,

    /// Use a secure transport
    #[serde(default)]
    pub secure: bool,

    /// Address the protocol signs its responses with
    pub responder_address: String,
}

impl ProtocolConfig {
    pub fn new(network: &str, chain: &str, responder_address: &str) -> Self {
        Self {
            network: network.to_string(),
            chain: chain.to_string(),
            secure: false,
            responder_address: responder_address.to_string(),
        }
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }
}
