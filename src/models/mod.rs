pub mod authorization;
pub mod credential;
pub mod envelope;
pub mod identity;
pub mod protocol;
