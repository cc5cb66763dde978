// src/chains/ethereum/typed_data.rs
//! EIP-712 typed structured data.
//!
//! A [`TypedData`] value is the canonical signing payload of the EVM adapter:
//! a domain separator plus a typed field tree. Two representations matter:
//!
//! - the **canonical bytes**: a JSON document whose layout is fixed by the type
//!   schema (sorted type names, declared field order at every depth), and
//! - the **digest**: `keccak256(0x19 0x01 ‖ domainSeparator ‖ hashStruct(message))`,
//!   which is what actually gets signed.
//!
//! The digest only depends on the logical content, so independent
//! implementations agree on it byte for byte.
//!
//! `ethers::types::transaction::eip712` is not used: it hashes the domain with
//! its own fixed `EIP712Domain` layout, while the wire contract hashes it with
//! the document's declared `EIP712Domain(string name,uint256 chainId,string version)`.

use crate::error::SchemaError;
use crate::utils::crypto::hash_data;
use crate::utils::serialization::deserialize_lenient_u64;
use ethers::types::{Address, I256, U256};
use ethers::utils::hex;
use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Name of the type describing the domain separator.
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// One `{name, type}` entry of a struct type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedField {
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// Struct type name to its ordered field list.
pub type Types = BTreeMap<String, Vec<TypedField>>;

/// Domain separator values.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub name: String,
    pub version: String,
    #[serde(deserialize_with = "deserialize_lenient_u64")]
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl Domain {
    pub fn new(name: &str, version: &str, chain_id: u64) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            chain_id,
            verifying_contract: None,
            salt: None,
        }
    }

    /// Domain values keyed by their EIP-712 field names; empty optionals are left out.
    fn to_message(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".into(), Value::from(self.name.clone()));
        map.insert("version".into(), Value::from(self.version.clone()));
        map.insert("chainId".into(), Value::from(self.chain_id));
        if let Some(contract) = self.verifying_contract.as_ref().filter(|c| !c.is_empty()) {
            map.insert("verifyingContract".into(), Value::from(contract.clone()));
        }
        if let Some(salt) = self.salt.as_ref().filter(|s| !s.is_empty()) {
            map.insert("salt".into(), Value::from(salt.clone()));
        }
        map
    }
}

/// A complete typed-data document.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: Types,
    pub primary_type: String,
    pub domain: Domain,
    pub message: Map<String, Value>,
}

impl TypedData {
    pub fn new(domain: Domain, primary_type: &str, types: Types, message: Map<String, Value>) -> Self {
        Self {
            types,
            primary_type: primary_type.to_string(),
            domain,
            message,
        }
    }

    /// Parses canonical bytes back into typed data.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SchemaError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Validates the document against its schema and returns its canonical bytes.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, SchemaError> {
        self.digest()?;
        Ok(serde_json::to_vec(self)?)
    }

    pub fn domain_separator(&self) -> Result<[u8; 32], SchemaError> {
        hash_struct(DOMAIN_TYPE, &self.domain.to_message(), &self.types)
    }

    pub fn struct_hash(&self) -> Result<[u8; 32], SchemaError> {
        hash_struct(&self.primary_type, &self.message, &self.types)
    }

    /// The EIP-712 signing digest.
    pub fn digest(&self) -> Result<[u8; 32], SchemaError> {
        let mut input = Vec::with_capacity(66);
        input.extend_from_slice(&[0x19, 0x01]);
        input.extend_from_slice(&self.domain_separator()?);
        if self.primary_type != DOMAIN_TYPE {
            input.extend_from_slice(&self.struct_hash()?);
        }
        Ok(hash_data(&input))
    }
}

impl Serialize for TypedData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_struct("TypedData", 4)?;
        out.serialize_field("types", &self.types)?;
        out.serialize_field("primaryType", &self.primary_type)?;
        out.serialize_field("domain", &self.domain)?;
        out.serialize_field(
            "message",
            &OrderedStruct {
                type_name: &self.primary_type,
                map: &self.message,
                types: &self.types,
            },
        )?;
        out.end()
    }
}

/// Encodes a message into canonical typed-data bytes.
///
/// Field order in the output comes from `types`, never from `message`.
/// Fails with [`SchemaError`] when a referenced type is missing or the message
/// does not match its declared fields.
pub fn encode(
    domain: &Domain,
    primary_type: &str,
    types: &Types,
    message: &Map<String, Value>,
) -> Result<Vec<u8>, SchemaError> {
    TypedData::new(domain.clone(), primary_type, types.clone(), message.clone()).to_canonical_bytes()
}

/// Digest of canonical typed-data bytes.
pub fn digest(canonical: &[u8]) -> Result<[u8; 32], SchemaError> {
    TypedData::from_slice(canonical)?.digest()
}

/// `Name(type field,...)` for the primary type followed by its dependencies, alphabetically.
pub fn encode_type(primary_type: &str, types: &Types) -> Result<String, SchemaError> {
    let mut deps = BTreeSet::new();
    collect_dependencies(primary_type, types, &mut deps)?;
    deps.remove(primary_type);

    let mut out = String::new();
    for name in std::iter::once(primary_type).chain(deps.iter().map(String::as_str)) {
        let fields = types
            .get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))?;
        let members: Vec<String> = fields
            .iter()
            .map(|field| format!("{} {}", field.kind, field.name))
            .collect();
        out.push_str(name);
        out.push('(');
        out.push_str(&members.join(","));
        out.push(')');
    }
    Ok(out)
}

fn collect_dependencies(
    type_name: &str,
    types: &Types,
    found: &mut BTreeSet<String>,
) -> Result<(), SchemaError> {
    if found.contains(type_name) {
        return Ok(());
    }
    let fields = types
        .get(type_name)
        .ok_or_else(|| SchemaError::UnknownType(type_name.to_string()))?;
    found.insert(type_name.to_string());

    for field in fields {
        let base = base_type(&field.kind);
        if types.contains_key(base) {
            collect_dependencies(base, types, found)?;
        } else if !is_primitive(base) {
            return Err(SchemaError::UnknownType(base.to_string()));
        }
    }
    Ok(())
}

fn hash_struct(type_name: &str, data: &Map<String, Value>, types: &Types) -> Result<[u8; 32], SchemaError> {
    Ok(hash_data(&encode_data(type_name, data, types)?))
}

fn encode_data(type_name: &str, data: &Map<String, Value>, types: &Types) -> Result<Vec<u8>, SchemaError> {
    let fields = types
        .get(type_name)
        .ok_or_else(|| SchemaError::UnknownType(type_name.to_string()))?;

    if let Some(extra) = data.keys().find(|key| !fields.iter().any(|f| &f.name == *key)) {
        return Err(SchemaError::UnexpectedField {
            type_name: type_name.to_string(),
            field: extra.clone(),
        });
    }

    let mut out = Vec::with_capacity(32 * (fields.len() + 1));
    out.extend_from_slice(&hash_data(encode_type(type_name, types)?.as_bytes()));
    for field in fields {
        let value = data.get(&field.name).ok_or_else(|| SchemaError::MissingField {
            type_name: type_name.to_string(),
            field: field.name.clone(),
        })?;
        out.extend_from_slice(&encode_field(&field.kind, value, types)?);
    }
    Ok(out)
}

fn encode_field(kind: &str, value: &Value, types: &Types) -> Result<[u8; 32], SchemaError> {
    if let Some((element, length)) = array_element(kind) {
        let items = value
            .as_array()
            .ok_or_else(|| SchemaError::invalid(kind, "expected an array"))?;
        if let Some(expected) = length {
            if items.len() != expected {
                return Err(SchemaError::invalid(
                    kind,
                    format!("expected {expected} elements, got {}", items.len()),
                ));
            }
        }
        let mut buffer = Vec::with_capacity(items.len() * 32);
        for item in items {
            buffer.extend_from_slice(&encode_field(element, item, types)?);
        }
        return Ok(hash_data(&buffer));
    }

    if types.contains_key(kind) {
        let data = value
            .as_object()
            .ok_or_else(|| SchemaError::invalid(kind, "expected an object"))?;
        return hash_struct(kind, data, types);
    }

    encode_primitive(kind, value)
}

fn encode_primitive(kind: &str, value: &Value) -> Result<[u8; 32], SchemaError> {
    match kind {
        "string" => {
            let text = value
                .as_str()
                .ok_or_else(|| SchemaError::invalid(kind, "expected a string"))?;
            Ok(hash_data(text.as_bytes()))
        }
        "bytes" => Ok(hash_data(&parse_hex(kind, value)?)),
        "bool" => {
            let flag = value
                .as_bool()
                .ok_or_else(|| SchemaError::invalid(kind, "expected a boolean"))?;
            Ok(word(U256::from(flag as u8)))
        }
        "address" => {
            let text = value
                .as_str()
                .ok_or_else(|| SchemaError::invalid(kind, "expected an address string"))?;
            let address = Address::from_str(text.trim_start_matches("0x"))
                .map_err(|e| SchemaError::invalid(kind, e.to_string()))?;
            let mut out = [0u8; 32];
            out[12..].copy_from_slice(address.as_bytes());
            Ok(out)
        }
        _ if kind.starts_with("bytes") => {
            let size = bit_size(kind, "bytes").filter(|n| (1..=32).contains(n));
            let size = size.ok_or_else(|| SchemaError::UnknownType(kind.to_string()))?;
            let raw = parse_hex(kind, value)?;
            if raw.len() > size {
                return Err(SchemaError::invalid(kind, format!("{} bytes do not fit", raw.len())));
            }
            let mut out = [0u8; 32];
            out[..raw.len()].copy_from_slice(&raw);
            Ok(out)
        }
        _ if kind.starts_with("uint") => {
            let bits = integer_bits(kind, "uint")?;
            let number = parse_uint(kind, value)?;
            if number.bits() > bits {
                return Err(SchemaError::invalid(kind, "value out of range"));
            }
            Ok(word(number))
        }
        _ if kind.starts_with("int") => {
            let bits = integer_bits(kind, "int")?;
            let number = parse_int(kind, value)?;
            if !fits_signed(number, bits) {
                return Err(SchemaError::invalid(kind, "value out of range"));
            }
            Ok(word(number.into_raw()))
        }
        _ => Err(SchemaError::UnknownType(kind.to_string())),
    }
}

fn word(value: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    value.to_big_endian(&mut out);
    out
}

fn parse_hex(kind: &str, value: &Value) -> Result<Vec<u8>, SchemaError> {
    let text = value
        .as_str()
        .ok_or_else(|| SchemaError::invalid(kind, "expected a hex string"))?;
    hex::decode(text.trim_start_matches("0x")).map_err(|e| SchemaError::invalid(kind, e.to_string()))
}

fn parse_uint(kind: &str, value: &Value) -> Result<U256, SchemaError> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| SchemaError::invalid(kind, format!("`{number}` is not an unsigned integer"))),
        Value::String(text) => match text.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| SchemaError::invalid(kind, format!("{e:?}"))),
            None => U256::from_dec_str(text).map_err(|e| SchemaError::invalid(kind, e.to_string())),
        },
        _ => Err(SchemaError::invalid(kind, "expected an integer")),
    }
}

fn parse_int(kind: &str, value: &Value) -> Result<I256, SchemaError> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .map(I256::from)
            .ok_or_else(|| SchemaError::invalid(kind, format!("`{number}` is not an integer"))),
        Value::String(text) if text.starts_with("0x") || text.starts_with("-0x") => {
            I256::from_hex_str(text).map_err(|e| SchemaError::invalid(kind, e.to_string()))
        }
        Value::String(text) => I256::from_dec_str(text).map_err(|e| SchemaError::invalid(kind, e.to_string())),
        _ => Err(SchemaError::invalid(kind, "expected an integer")),
    }
}

/// Two's complement range check: `-2^(bits-1) <= value < 2^(bits-1)`.
fn fits_signed(value: I256, bits: usize) -> bool {
    let magnitude = value.unsigned_abs();
    if value.is_negative() {
        (magnitude - U256::one()).bits() < bits
    } else {
        magnitude.bits() < bits
    }
}

fn integer_bits(kind: &str, prefix: &str) -> Result<usize, SchemaError> {
    bit_size(kind, prefix)
        .filter(|bits| *bits >= 8 && *bits <= 256 && bits % 8 == 0)
        .ok_or_else(|| SchemaError::UnknownType(kind.to_string()))
}

fn bit_size(kind: &str, prefix: &str) -> Option<usize> {
    kind.strip_prefix(prefix)?.parse().ok()
}

fn is_primitive(kind: &str) -> bool {
    match kind {
        "string" | "bytes" | "bool" | "address" => true,
        _ if kind.starts_with("bytes") => bit_size(kind, "bytes").map_or(false, |n| (1..=32).contains(&n)),
        _ if kind.starts_with("uint") => integer_bits(kind, "uint").is_ok(),
        _ if kind.starts_with("int") => integer_bits(kind, "int").is_ok(),
        _ => false,
    }
}

/// `Person[2][]` -> `Person`.
fn base_type(kind: &str) -> &str {
    match kind.find('[') {
        Some(index) => &kind[..index],
        None => kind,
    }
}

/// `Person[2][]` -> (`Person[2]`, None); `Person[2]` -> (`Person`, Some(2)).
fn array_element(kind: &str) -> Option<(&str, Option<usize>)> {
    let inner = kind.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    let length = &inner[open + 1..];
    let length = if length.is_empty() { None } else { Some(length.parse().ok()?) };
    Some((&kind[..open], length))
}

/// A struct value written in schema field order.
struct OrderedStruct<'a> {
    type_name: &'a str,
    map: &'a Map<String, Value>,
    types: &'a Types,
}

impl Serialize for OrderedStruct<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some(fields) = self.types.get(self.type_name) else {
            return self.map.serialize(serializer);
        };
        let present: Vec<&TypedField> = fields.iter().filter(|f| self.map.contains_key(&f.name)).collect();
        let mut out = serializer.serialize_map(Some(present.len()))?;
        for field in present {
            out.serialize_entry(
                &field.name,
                &OrderedValue {
                    kind: &field.kind,
                    value: &self.map[field.name.as_str()],
                    types: self.types,
                },
            )?;
        }
        out.end()
    }
}

struct OrderedValue<'a> {
    kind: &'a str,
    value: &'a Value,
    types: &'a Types,
}

impl Serialize for OrderedValue<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (array_element(self.kind), self.value) {
            (Some((element, _)), Value::Array(items)) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(&OrderedValue {
                        kind: element,
                        value: item,
                        types: self.types,
                    })?;
                }
                out.end()
            }
            (None, Value::Object(map)) if self.types.contains_key(self.kind) => OrderedStruct {
                type_name: self.kind,
                map,
                types: self.types,
            }
            .serialize(serializer),
            (_, value) => value.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mail_types() -> Types {
        let mut types = Types::new();
        types.insert(
            DOMAIN_TYPE.into(),
            vec![
                TypedField::new("name", "string"),
                TypedField::new("version", "string"),
                TypedField::new("chainId", "uint256"),
                TypedField::new("verifyingContract", "address"),
            ],
        );
        types.insert(
            "Person".into(),
            vec![TypedField::new("name", "string"), TypedField::new("wallet", "address")],
        );
        types.insert(
            "Mail".into(),
            vec![
                TypedField::new("from", "Person"),
                TypedField::new("to", "Person"),
                TypedField::new("contents", "string"),
            ],
        );
        types
    }

    fn mail_domain() -> Domain {
        let mut domain = Domain::new("Ether Mail", "1", 1);
        domain.verifying_contract = Some("0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC".into());
        domain
    }

    fn mail_message() -> Map<String, Value> {
        json!({
            "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
            "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
            "contents": "Hello, Bob!"
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn mail() -> TypedData {
        TypedData::new(mail_domain(), "Mail", mail_types(), mail_message())
    }

    #[test]
    fn test_encode_type_orders_dependencies() {
        assert_eq!(
            encode_type("Mail", &mail_types()).unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
    }

    #[test]
    fn test_reference_vector() {
        let typed = mail();
        assert_eq!(
            hex::encode(typed.domain_separator().unwrap()),
            "f2cee375fa42b42143804025fc449deafd50cc031ca257e0b194a650a912090f"
        );
        assert_eq!(
            hex::encode(typed.struct_hash().unwrap()),
            "c52c0ee5d84264471806290a3f2c4cecfc5490626bf912d01f240d7a274b371e"
        );
        assert_eq!(
            hex::encode(typed.digest().unwrap()),
            "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
        );
    }

    #[test]
    fn test_encoding_ignores_insertion_order() {
        let mut reversed = Map::new();
        reversed.insert("contents".into(), json!("Hello, Bob!"));
        reversed.insert(
            "to".into(),
            json!({"wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB", "name": "Bob"}),
        );
        reversed.insert(
            "from".into(),
            json!({"wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826", "name": "Cow"}),
        );

        let a = encode(&mail_domain(), "Mail", &mail_types(), &mail_message()).unwrap();
        let b = encode(&mail_domain(), "Mail", &mail_types(), &reversed).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonical_bytes_follow_schema_order() {
        let bytes = mail().to_canonical_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with(r#"{"types":{"EIP712Domain":"#));
        assert!(text.contains(
            r#""message":{"from":{"name":"Cow","wallet":"0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},"to":"#
        ));
        assert!(text.ends_with(r#""contents":"Hello, Bob!"}}"#));

        let parsed = TypedData::from_slice(&bytes).unwrap();
        assert_eq!(parsed, mail());
        assert_eq!(digest(&bytes).unwrap(), mail().digest().unwrap());
    }

    #[test]
    fn test_missing_referenced_type() {
        let mut types = mail_types();
        types.remove("Person");
        let err = encode(&mail_domain(), "Mail", &types, &mail_message()).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType(t) if t == "Person"));
    }

    #[test]
    fn test_missing_domain_type() {
        let mut types = mail_types();
        types.remove(DOMAIN_TYPE);
        let err = mail_with(types, mail_message()).digest().unwrap_err();
        assert!(matches!(err, SchemaError::UnknownType(t) if t == DOMAIN_TYPE));
    }

    #[test]
    fn test_message_must_match_declared_fields() {
        let mut missing = mail_message();
        missing.remove("contents");
        assert!(matches!(
            mail_with(mail_types(), missing).digest(),
            Err(SchemaError::MissingField { field, .. }) if field == "contents"
        ));

        let mut extra = mail_message();
        extra.insert("cc".into(), json!("Alice"));
        assert!(matches!(
            mail_with(mail_types(), extra).digest(),
            Err(SchemaError::UnexpectedField { field, .. }) if field == "cc"
        ));
    }

    #[test]
    fn test_primitive_values() {
        assert_eq!(
            encode_primitive("uint256", &json!("0x10")).unwrap(),
            encode_primitive("uint256", &json!(16)).unwrap()
        );
        assert_eq!(
            encode_primitive("uint256", &json!("16")).unwrap(),
            encode_primitive("uint256", &json!(16)).unwrap()
        );
        assert_eq!(encode_primitive("int256", &json!(-1)).unwrap(), [0xff; 32]);
        assert_eq!(encode_primitive("bool", &json!(true)).unwrap()[31], 1);
        assert!(encode_primitive("uint8", &json!(256)).is_err());
        assert!(encode_primitive("int8", &json!(127)).is_ok());
        assert!(encode_primitive("int8", &json!(-128)).is_ok());
        assert!(encode_primitive("int8", &json!(128)).is_err());
        assert!(encode_primitive("int8", &json!(-129)).is_err());
        assert!(matches!(
            encode_primitive("int8", &json!(100000)),
            Err(SchemaError::InvalidValue { .. })
        ));
        assert!(encode_primitive("int16", &json!("-32768")).is_ok());
        assert!(encode_primitive("string", &json!(5)).is_err());
        assert!(encode_primitive("bytes4", &json!("0x0102030405")).is_err());
        assert!(matches!(
            encode_primitive("uint7", &json!(1)),
            Err(SchemaError::UnknownType(_))
        ));
    }

    #[test]
    fn test_arrays() {
        let mut types = mail_types();
        types.insert(
            "Group".into(),
            vec![
                TypedField::new("members", "Person[]"),
                TypedField::new("tags", "string[2]"),
            ],
        );
        let message = json!({
            "members": [{"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"}],
            "tags": ["a", "b"]
        })
        .as_object()
        .cloned()
        .unwrap();
        let group = TypedData::new(mail_domain(), "Group", types.clone(), message);
        assert!(group.digest().is_ok());

        let short = json!({"members": [], "tags": ["a"]}).as_object().cloned().unwrap();
        assert!(TypedData::new(mail_domain(), "Group", types, short).digest().is_err());
    }

    #[test]
    fn test_chain_id_changes_digest() {
        let mut other = mail();
        other.domain.chain_id = 137;
        assert_ne!(other.digest().unwrap(), mail().digest().unwrap());
    }

    fn mail_with(types: Types, message: Map<String, Value>) -> TypedData {
        TypedData::new(mail_domain(), "Mail", types, message)
    }
}
