//! Flattening of typed attribute values into CSV cell text.
//!
//! Scalars pass through untouched, sets and lists become `[a,b,c]`, and maps
//! become a JSON object whose values are the flattened text of each member
//! (so nested structures end up as JSON strings, not nested JSON).
//! Binary and `NULL` values have no text form: [`encode`] returns `None` and
//! the attribute is left out of the record entirely. Inside a list such a
//! value still occupies its slot as an empty element.
//!
//! Map JSON escapes `<`, `>`, `&`, U+2028 and U+2029 as `\uXXXX`.

use std::collections::{BTreeMap, HashMap};
use std::io;

use dynocsv_model::{AttributeValue, Item};
use serde::Serialize;
use serde_json::ser::Formatter;

const OPEN: &str = "[";
const CLOSE: &str = "]";
const SEPARATOR: &str = ",";

/// Encode one attribute value, or `None` if it cannot be represented.
///
/// Numbers keep the store's decimal text as-is. Set elements keep the
/// store's order.
#[must_use]
pub fn encode(value: &AttributeValue) -> Option<String> {
    match value {
        AttributeValue::Bool(b) => Some(b.to_string()),
        AttributeValue::N(text) | AttributeValue::S(text) => Some(text.clone()),
        AttributeValue::Ss(elements) | AttributeValue::Ns(elements) => {
            Some(bracketed(elements.iter().map(String::as_str)))
        }
        AttributeValue::L(elements) => Some(encode_list(elements)),
        AttributeValue::M(members) => encode_map(members),
        AttributeValue::B(_) | AttributeValue::Bs(_) | AttributeValue::Null(_) => None,
    }
}

/// Encode the attributes of `item` that `keep` accepts, by name.
///
/// Unrepresentable attributes are absent from the result.
pub fn encode_item(item: &Item, mut keep: impl FnMut(&str) -> bool) -> HashMap<String, String> {
    item.iter()
        .filter(|(name, _)| keep(name))
        .filter_map(|(name, value)| encode(value).map(|text| (name.clone(), text)))
        .collect()
}

/// Unrepresentable elements keep their slot as an empty element.
fn encode_list(elements: &[AttributeValue]) -> String {
    let encoded: Vec<String> = elements
        .iter()
        .map(|element| encode(element).unwrap_or_default())
        .collect();
    bracketed(encoded.iter().map(String::as_str))
}

/// Keys come out in ascending order; unrepresentable members are omitted.
fn encode_map(members: &HashMap<String, AttributeValue>) -> Option<String> {
    let flattened: BTreeMap<&str, String> = members
        .iter()
        .filter_map(|(k, v)| encode(v).map(|text| (k.as_str(), text)))
        .collect();

    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, HtmlSafeFormatter);
    flattened.serialize(&mut serializer).ok()?;
    String::from_utf8(out).ok()
}

/// Compact JSON that also escapes HTML-significant characters and the two
/// Unicode line terminators.
struct HtmlSafeFormatter;

impl Formatter for HtmlSafeFormatter {
    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            let escaped = match ch {
                '<' => "\\u003c",
                '>' => "\\u003e",
                '&' => "\\u0026",
                '\u{2028}' => "\\u2028",
                '\u{2029}' => "\\u2029",
                _ => continue,
            };
            writer.write_all(&fragment.as_bytes()[start..i])?;
            writer.write_all(escaped.as_bytes())?;
            start = i + ch.len_utf8();
        }
        writer.write_all(&fragment.as_bytes()[start..])
    }
}

fn bracketed<'a>(elements: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::from(OPEN);
    for (i, element) in elements.enumerate() {
        if i > 0 {
            out.push_str(SEPARATOR);
        }
        out.push_str(element);
    }
    out.push_str(CLOSE);
    out
}
