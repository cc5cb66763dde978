// src/utils/serialization.rs
//! Serialization utilities.
//!
//! Provides:
//! - base64 helpers (standard alphabet, padded) for envelope and proof content
//! - compact canonical JSON with lexicographically sorted keys
//! - lenient integer deserialization for timestamps and chain ids

use serde::de::{self, Deserializer, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Encodes bytes as standard padded base64.
pub fn encode_base64<T: AsRef<[u8]>>(data: T) -> String {
    base64::encode(data)
}

/// Decodes standard padded base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::decode(data)
}

/// Serializes a value to compact JSON with object keys sorted at every depth.
///
/// The output does not depend on field declaration order or on the map
/// implementation backing `serde_json::Value`, so two equal values always
/// produce identical bytes.
pub fn canonical_json<T: Serialize>(data: &T) -> Result<Vec<u8>, serde_json::Error> {
    let value = serde_json::to_value(data)?;
    serde_json::to_vec(&Sorted(&value))
}

struct Sorted<'a>(&'a Value);

impl Serialize for Sorted<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut out = serializer.serialize_map(Some(keys.len()))?;
                for key in keys {
                    out.serialize_entry(key, &Sorted(&map[key.as_str()]))?;
                }
                out.end()
            }
            Value::Array(items) => {
                let mut out = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    out.serialize_element(&Sorted(item))?;
                }
                out.end()
            }
            other => other.serialize(serializer),
        }
    }
}

/// Parses an unsigned integer written either as a decimal or a `0x` hex string.
pub fn parse_u64(text: &str) -> Option<u64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Deserializes a `u64` from a JSON number, a decimal string or a `0x` hex string.
pub fn deserialize_lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientU64;

    impl<'de> Visitor<'de> for LenientU64 {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an unsigned integer or integer string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::custom("negative integer"))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            parse_u64(v).ok_or_else(|| E::custom(format!("invalid integer string `{v}`")))
        }
    }

    deserializer.deserialize_any(LenientU64)
}
