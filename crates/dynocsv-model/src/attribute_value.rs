//! DynamoDB `AttributeValue` and its JSON wire form.
//!
//! On the wire every value is an object with exactly one key naming its
//! type, e.g. `{"S": "hello"}` or `{"L": [{"N": "1"}]}`. Binary payloads are
//! base64 text.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single record as returned by `Scan` or `Query`: attribute name to value.
pub type Item = HashMap<String, AttributeValue>;

const TYPE_TAGS: &[&str] = &["S", "N", "B", "SS", "NS", "BS", "BOOL", "NULL", "L", "M"];

/// DynamoDB attribute value.
///
/// Numbers are kept as the decimal text the store returned.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String.
    S(String),
    /// Number, as decimal text.
    N(String),
    /// Binary.
    B(Bytes),
    /// String set, in store order.
    Ss(Vec<String>),
    /// Number set, in store order.
    Ns(Vec<String>),
    /// Binary set.
    Bs(Vec<Bytes>),
    /// Boolean.
    Bool(bool),
    /// Null marker.
    Null(bool),
    /// List of values.
    L(Vec<AttributeValue>),
    /// Map of values.
    M(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Wire type tag of this value (`"S"`, `"NS"`, `"BOOL"`, ...).
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }
}

/// Borrowed payload under the type tag.
#[derive(Serialize)]
#[serde(untagged)]
enum Payload<'a> {
    Text(&'a str),
    Texts(&'a [String]),
    Encoded(String),
    EncodedSet(Vec<String>),
    Flag(bool),
    List(&'a [AttributeValue]),
    Map(&'a HashMap<String, AttributeValue>),
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let payload = match self {
            Self::S(text) | Self::N(text) => Payload::Text(text),
            Self::Ss(texts) | Self::Ns(texts) => Payload::Texts(texts),
            Self::B(bytes) => Payload::Encoded(BASE64.encode(bytes)),
            Self::Bs(set) => Payload::EncodedSet(set.iter().map(|b| BASE64.encode(b)).collect()),
            Self::Bool(flag) | Self::Null(flag) => Payload::Flag(*flag),
            Self::L(list) => Payload::List(list),
            Self::M(map) => Payload::Map(map),
        };
        serializer.collect_map(std::iter::once((self.type_descriptor(), payload)))
    }
}

impl<'de> Deserialize<'de> for AttributeValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(TaggedValueVisitor)
    }
}

struct TaggedValueVisitor;

impl<'de> Visitor<'de> for TaggedValueVisitor {
    type Value = AttributeValue;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an object with exactly one DynamoDB type key")
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let Some(tag) = map.next_key::<String>()? else {
            return Err(de::Error::invalid_length(0, &self));
        };
        let value = read_payload(&tag, &mut map)?;
        if map.next_key::<de::IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(2, &self));
        }
        Ok(value)
    }
}

fn read_payload<'de, M: MapAccess<'de>>(tag: &str, map: &mut M) -> Result<AttributeValue, M::Error> {
    Ok(match tag {
        "S" => AttributeValue::S(map.next_value()?),
        "N" => AttributeValue::N(map.next_value()?),
        "B" => AttributeValue::B(decode_base64::<M::Error>(&map.next_value::<String>()?)?),
        "SS" => AttributeValue::Ss(map.next_value()?),
        "NS" => AttributeValue::Ns(map.next_value()?),
        "BS" => AttributeValue::Bs(
            map.next_value::<Vec<String>>()?
                .iter()
                .map(|e| decode_base64::<M::Error>(e))
                .collect::<Result<_, M::Error>>()?,
        ),
        "BOOL" => AttributeValue::Bool(map.next_value()?),
        "NULL" => AttributeValue::Null(map.next_value()?),
        "L" => AttributeValue::L(map.next_value()?),
        "M" => AttributeValue::M(map.next_value()?),
        other => return Err(de::Error::unknown_field(other, TYPE_TAGS)),
    })
}

fn decode_base64<E: de::Error>(encoded: &str) -> Result<Bytes, E> {
    BASE64.decode(encoded).map(Bytes::from).map_err(E::custom)
}
