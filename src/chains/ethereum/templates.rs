// src/chains/ethereum/templates.rs
//! Fixed "Main" record schemas signed by the protocol.
//!
//! These shapes are part of the wire contract: issuers and verifiers running
//! independent implementations must declare exactly the same types and field
//! order. Bump [`PROTOCOL_VERSION`] when changing any of them.

use crate::chains::ethereum::typed_data::{Domain, TypedData, TypedField, Types, DOMAIN_TYPE};
use crate::error::SchemaError;
use crate::models::authorization::IssuingAuthorization;
use crate::models::credential::CredentialContent;
use serde_json::{Map, Value};

pub const PROTOCOL_NAME: &str = "anima";
pub const PROTOCOL_VERSION: &str = "1.0";
pub const PRIMARY_TYPE: &str = "Main";

pub fn domain(chain_id: u64) -> Domain {
    Domain::new(PROTOCOL_NAME, PROTOCOL_VERSION, chain_id)
}

fn fields(entries: &[(&str, &str)]) -> Vec<TypedField> {
    entries.iter().map(|(name, kind)| TypedField::new(name, kind)).collect()
}

/// The declared `EIP712Domain` type of every protocol payload.
pub fn domain_fields() -> Vec<TypedField> {
    fields(&[("name", "string"), ("chainId", "uint256"), ("version", "string")])
}

fn base_types() -> Types {
    let mut types = Types::new();
    types.insert(DOMAIN_TYPE.to_string(), domain_fields());
    types
}

fn participant_types(types: &mut Types) {
    types.insert(
        "Owner".to_string(),
        fields(&[
            ("id", "string"),
            ("public_address", "string"),
            ("chain", "string"),
            ("wallet", "string"),
        ]),
    );
    types.insert(
        "Issuer".to_string(),
        fields(&[("id", "string"), ("public_address", "string"), ("chain", "string")]),
    );
}

/// Schema of a per-attribute credential statement.
pub fn credential_types() -> Types {
    let mut types = base_types();
    participant_types(&mut types);
    types.insert("Source".to_string(), fields(&[("id", "string"), ("specs", "string")]));
    types.insert(
        PRIMARY_TYPE.to_string(),
        fields(&[
            ("expires_at", "uint256"),
            ("name", "string"),
            ("type", "string"),
            ("hash", "string"),
            ("source", "Source"),
            ("owner", "Owner"),
            ("issuer", "Issuer"),
        ]),
    );
    types
}

/// Schema wrapping a single opaque string: request envelopes, responses, proofs.
pub fn content_types() -> Types {
    let mut types = base_types();
    types.insert(PRIMARY_TYPE.to_string(), fields(&[("content", "string")]));
    types
}

/// Schema of an issuing authorization; `Fields` lists the authorized attribute names.
pub fn authorization_types(authorization: &IssuingAuthorization) -> Types {
    let mut types = base_types();
    participant_types(&mut types);
    let names: Vec<(&str, &str)> = authorization
        .request
        .fields
        .keys()
        .map(|name| (name.as_str(), "string"))
        .collect();
    types.insert("Fields".to_string(), fields(&names));
    types.insert(
        "Request".to_string(),
        fields(&[("resource", "string"), ("requested_at", "uint256"), ("fields", "Fields")]),
    );
    types.insert(
        PRIMARY_TYPE.to_string(),
        fields(&[("request", "Request"), ("owner", "Owner"), ("issuer", "Issuer")]),
    );
    types
}

fn to_message<T: serde::Serialize>(value: &T) -> Result<Map<String, Value>, SchemaError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Err(SchemaError::invalid(PRIMARY_TYPE, "message must be an object")),
    }
}

pub fn credential(chain_id: u64, content: &CredentialContent) -> Result<TypedData, SchemaError> {
    Ok(TypedData::new(domain(chain_id), PRIMARY_TYPE, credential_types(), to_message(content)?))
}

pub fn content(chain_id: u64, content: &str) -> TypedData {
    let mut message = Map::new();
    message.insert("content".to_string(), Value::from(content));
    TypedData::new(domain(chain_id), PRIMARY_TYPE, content_types(), message)
}

pub fn authorization(chain_id: u64, authorization: &IssuingAuthorization) -> Result<TypedData, SchemaError> {
    Ok(TypedData::new(
        domain(chain_id),
        PRIMARY_TYPE,
        authorization_types(authorization),
        to_message(authorization)?,
    ))
}
