pub mod authorization;
pub mod credential_issuer;
pub mod gateway;
