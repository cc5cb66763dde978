// src/settings.rs
//! Layered configuration.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults (mainnet, `ETH`, secure transport)
//! 2. `anima.toml` in the working directory, or the file passed explicitly
//! 3. `ANIMA_*` environment variables, e.g. `ANIMA_NETWORK`, `ANIMA_PRIVATE_KEY`

use crate::error::ConfigError;
use crate::models::identity::Issuer;
use crate::models::protocol::{ProtocolConfig, CHAIN_ETH, MAINNET};
use crate::wallet::key_management::KeyManager;
use config::{Config, Environment, File, Source};
use serde::Deserialize;
use std::fmt;

const DEFAULT_FILE: &str = "anima";
const ENV_PREFIX: &str = "ANIMA";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub network: String,
    pub chain: String,
    pub secure: bool,
    #[serde(default)]
    pub responder_address: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub issuer_id: Option<String>,
}

impl Settings {
    /// Loads settings from `path` (required) or the optional default file, then the environment.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path),
            None => File::with_name(DEFAULT_FILE).required(false),
        };
        Self::from_sources(file, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn from_sources<S>(file: S, environment: Environment) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .set_default("network", MAINNET)?
            .set_default("chain", CHAIN_ETH)?
            .set_default("secure", true)?
            .add_source(file)
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// The protocol configuration; requires `responder_address`.
    pub fn protocol(&self) -> Result<ProtocolConfig, ConfigError> {
        let responder = self
            .responder_address
            .as_deref()
            .ok_or(ConfigError::MissingSetting("responder_address"))?;
        Ok(ProtocolConfig::new(&self.network, &self.chain, responder).secure(self.secure))
    }

    /// The local signing key; requires `private_key`.
    pub fn signer(&self) -> Result<KeyManager, crate::error::Error> {
        let key = self
            .private_key
            .as_deref()
            .ok_or(ConfigError::MissingSetting("private_key"))?;
        Ok(KeyManager::from_private_key(key)?)
    }

    /// The issuer identity of `signer` on the configured chain.
    pub fn issuer(&self, signer: &KeyManager) -> Issuer {
        let address = signer.address().to_string();
        Issuer {
            id: self
                .issuer_id
                .clone()
                .unwrap_or_else(|| format!("anima:issuer:{address}")),
            public_address: address,
            chain: self.chain.clone(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("network", &self.network)
            .field("chain", &self.chain)
            .field("secure", &self.secure)
            .field("responder_address", &self.responder_address)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("issuer_id", &self.issuer_id)
            .finish()
    }
}
