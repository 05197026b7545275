//! Key-condition expression construction for filtered queries.
//!
//! A query always pins the hash key and may add one condition on the range
//! key. The expression is built as a small AST, rendered with placeholder
//! names (`#h`, `#r`) and values (`:h`, `:r`, `:r2`), and shipped with the
//! matching `ExpressionAttributeNames`/`ExpressionAttributeValues` maps.
//!
//! Values are parsed according to the key's declared scalar type, never by
//! guessing from the text.

use std::collections::HashMap;
use std::fmt;

use dynocsv_model::AttributeValue;
use dynocsv_model::types::ScalarAttributeType;

use crate::error::{ExportError, ExportResult};
use crate::params::{QueryParams, SortCondition};
use crate::schema::{KeySchema, TableSchema};

const HASH_NAME: &str = "#h";
const HASH_VALUE: &str = ":h";
const RANGE_NAME: &str = "#r";
const RANGE_VALUE: &str = ":r";
const RANGE_VALUE_HIGH: &str = ":r2";

/// Comparison operators allowed on a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (`=`).
    Eq,
    /// Less than (`<`).
    Lt,
    /// Less than or equal (`<=`).
    Le,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal (`>=`).
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}

/// Key-condition AST. Operands are placeholder references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyConditionExpr {
    /// `name op value`
    Compare {
        /// Attribute name placeholder.
        name: &'static str,
        /// Comparison operator.
        op: CompareOp,
        /// Value placeholder.
        value: &'static str,
    },
    /// `name BETWEEN low AND high`
    Between {
        /// Attribute name placeholder.
        name: &'static str,
        /// Lower bound placeholder (inclusive).
        low: &'static str,
        /// Upper bound placeholder (inclusive).
        high: &'static str,
    },
    /// `begins_with(name, prefix)`
    BeginsWith {
        /// Attribute name placeholder.
        name: &'static str,
        /// Prefix placeholder.
        prefix: &'static str,
    },
    /// `left AND right`
    And(Box<KeyConditionExpr>, Box<KeyConditionExpr>),
}

impl fmt::Display for KeyConditionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare { name, op, value } => write!(f, "{name} {op} {value}"),
            Self::Between { name, low, high } => write!(f, "{name} BETWEEN {low} AND {high}"),
            Self::BeginsWith { name, prefix } => write!(f, "begins_with({name}, {prefix})"),
            Self::And(left, right) => write!(f, "{left} AND {right}"),
        }
    }
}

/// A rendered key condition with its bound names and values.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    /// The expression tree.
    pub expr: KeyConditionExpr,
    /// `ExpressionAttributeNames`.
    pub names: HashMap<String, String>,
    /// `ExpressionAttributeValues`.
    pub values: HashMap<String, AttributeValue>,
}

impl KeyCondition {
    /// The `KeyConditionExpression` string.
    #[must_use]
    pub fn expression(&self) -> String {
        self.expr.to_string()
    }
}

/// Build `hash = :h [AND range <op> :r[, :r2]]` for `key`.
///
/// `schema` supplies the attribute types used to parse the user's values.
pub fn build_key_condition(
    schema: &TableSchema,
    key: &KeySchema,
    params: &QueryParams,
) -> ExportResult<KeyCondition> {
    let mut names = HashMap::new();
    let mut values = HashMap::new();

    names.insert(HASH_NAME.to_owned(), key.hash_key.clone());
    values.insert(
        HASH_VALUE.to_owned(),
        parse_key_value(schema, &key.hash_key, &params.hash)?,
    );
    let hash_expr = KeyConditionExpr::Compare {
        name: HASH_NAME,
        op: CompareOp::Eq,
        value: HASH_VALUE,
    };

    let Some(sort) = &params.sort else {
        return Ok(KeyCondition {
            expr: hash_expr,
            names,
            values,
        });
    };

    let range_key = key
        .range_key
        .as_deref()
        .ok_or_else(|| ExportError::NoRangeKey(schema_owner(schema, key)))?;
    names.insert(RANGE_NAME.to_owned(), range_key.to_owned());

    let compare = |op| KeyConditionExpr::Compare {
        name: RANGE_NAME,
        op,
        value: RANGE_VALUE,
    };
    let (range_expr, bound) = match sort {
        SortCondition::Eq(v) => (compare(CompareOp::Eq), vec![v]),
        SortCondition::Gt(v) => (compare(CompareOp::Gt), vec![v]),
        SortCondition::Ge(v) => (compare(CompareOp::Ge), vec![v]),
        SortCondition::Lt(v) => (compare(CompareOp::Lt), vec![v]),
        SortCondition::Le(v) => (compare(CompareOp::Le), vec![v]),
        SortCondition::Between(lo, hi) => (
            KeyConditionExpr::Between {
                name: RANGE_NAME,
                low: RANGE_VALUE,
                high: RANGE_VALUE_HIGH,
            },
            vec![lo, hi],
        ),
        SortCondition::BeginsWith(prefix) => {
            values.insert(RANGE_VALUE.to_owned(), AttributeValue::S(prefix.clone()));
            (
                KeyConditionExpr::BeginsWith {
                    name: RANGE_NAME,
                    prefix: RANGE_VALUE,
                },
                vec![],
            )
        }
    };
    for (placeholder, raw) in [RANGE_VALUE, RANGE_VALUE_HIGH].into_iter().zip(bound) {
        values.insert(
            placeholder.to_owned(),
            parse_key_value(schema, range_key, raw)?,
        );
    }

    Ok(KeyCondition {
        expr: KeyConditionExpr::And(Box::new(hash_expr), Box::new(range_expr)),
        names,
        values,
    })
}

fn schema_owner(schema: &TableSchema, key: &KeySchema) -> String {
    schema
        .indexes
        .iter()
        .find(|i| &i.key == key)
        .filter(|_| key != &schema.key)
        .map_or_else(
            || format!("table {}", schema.table_name),
            |i| format!("index {}", i.name),
        )
}

/// Parse `raw` under the declared type of key attribute `attribute`.
fn parse_key_value(
    schema: &TableSchema,
    attribute: &str,
    raw: &str,
) -> ExportResult<AttributeValue> {
    let attribute_type = schema
        .attribute_type(attribute)
        .ok_or_else(|| ExportError::MissingAttributeDefinition(attribute.to_owned()))?;

    let invalid = |reason: String| ExportError::InvalidKeyValue {
        value: raw.to_owned(),
        attribute: attribute.to_owned(),
        attribute_type: attribute_type.to_string(),
        reason,
    };

    match attribute_type {
        ScalarAttributeType::S => Ok(AttributeValue::S(raw.to_owned())),
        ScalarAttributeType::N => raw
            .parse::<i64>()
            .map(|n| AttributeValue::N(n.to_string()))
            .map_err(|e| invalid(e.to_string())),
        ScalarAttributeType::B => parse_bool(raw)
            .map(AttributeValue::Bool)
            .ok_or_else(|| invalid("invalid boolean literal".to_owned())),
        ScalarAttributeType::Unknown(t) => Err(ExportError::UnsupportedKeyType {
            attribute: attribute.to_owned(),
            attribute_type: t.clone(),
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use dynocsv_model::types::{
        AttributeDefinition, GlobalSecondaryIndexDescription, KeySchemaElement, TableDescription,
    };

    use super::*;

    const TS: &str = "1529665668588";

    fn schema(hash_type: ScalarAttributeType, range_type: ScalarAttributeType) -> TableSchema {
        let desc = TableDescription {
            key_schema: vec![
                KeySchemaElement::hash("Attribute1"),
                KeySchemaElement::range("Attribute2"),
            ],
            attribute_definitions: vec![
                AttributeDefinition::new("Attribute1", hash_type),
                AttributeDefinition::new("Attribute2", range_type),
                AttributeDefinition::new("Owner", ScalarAttributeType::S),
            ],
            global_secondary_indexes: vec![GlobalSecondaryIndexDescription {
                index_name: Some("by-owner".to_owned()),
                key_schema: vec![KeySchemaElement::hash("Owner")],
                ..Default::default()
            }],
            ..Default::default()
        };
        TableSchema::from_description("events", &desc).unwrap()
    }

    fn string_schema() -> TableSchema {
        schema(ScalarAttributeType::S, ScalarAttributeType::S)
    }

    fn number_schema() -> TableSchema {
        schema(ScalarAttributeType::N, ScalarAttributeType::N)
    }

    fn build(schema: &TableSchema, params: &QueryParams) -> ExportResult<KeyCondition> {
        build_key_condition(schema, &schema.key, params)
    }

    #[test]
    fn test_should_build_hash_only_condition() {
        let cond = build(&string_schema(), &QueryParams::hash("value1")).unwrap();
        assert_eq!(cond.expression(), "#h = :h");
        assert_eq!(cond.names["#h"], "Attribute1");
        assert_eq!(cond.values[":h"], AttributeValue::S("value1".to_owned()));
        assert_eq!(cond.values.len(), 1);
    }

    #[test]
    fn test_should_parse_number_hash_as_integer() {
        let cond = build(&number_schema(), &QueryParams::hash(TS)).unwrap();
        assert_eq!(cond.values[":h"], AttributeValue::N(TS.to_owned()));
    }

    #[test]
    fn test_should_canonicalize_number_text() {
        let cond = build(&number_schema(), &QueryParams::hash("+007")).unwrap();
        assert_eq!(cond.values[":h"], AttributeValue::N("7".to_owned()));
    }

    #[test]
    fn test_should_render_each_sort_operator() {
        let cases = [
            (SortCondition::Eq("v".to_owned()), "#h = :h AND #r = :r"),
            (SortCondition::Gt("v".to_owned()), "#h = :h AND #r > :r"),
            (SortCondition::Ge("v".to_owned()), "#h = :h AND #r >= :r"),
            (SortCondition::Lt("v".to_owned()), "#h = :h AND #r < :r"),
            (SortCondition::Le("v".to_owned()), "#h = :h AND #r <= :r"),
            (
                SortCondition::BeginsWith("v".to_owned()),
                "#h = :h AND begins_with(#r, :r)",
            ),
            (
                SortCondition::Between("a".to_owned(), "b".to_owned()),
                "#h = :h AND #r BETWEEN :r AND :r2",
            ),
        ];
        let schema = string_schema();
        for (sort, expected) in cases {
            let cond = build(&schema, &QueryParams::hash("value1").with_sort(sort)).unwrap();
            assert_eq!(cond.expression(), expected);
            assert_eq!(cond.names["#r"], "Attribute2");
        }
    }

    #[test]
    fn test_should_parse_between_bounds_in_order() {
        let params = QueryParams::hash("1")
            .with_sort(SortCondition::Between("1529665592540".to_owned(), TS.to_owned()));
        let cond = build(&number_schema(), &params).unwrap();
        assert_eq!(cond.values[":r"], AttributeValue::N("1529665592540".to_owned()));
        assert_eq!(cond.values[":r2"], AttributeValue::N(TS.to_owned()));
    }

    #[test]
    fn test_should_not_type_parse_begins_with() {
        let params = QueryParams::hash("1").with_sort(SortCondition::BeginsWith("15x".to_owned()));
        let cond = build(&number_schema(), &params).unwrap();
        assert_eq!(cond.values[":r"], AttributeValue::S("15x".to_owned()));
    }

    #[test]
    fn test_should_parse_binary_keys_as_booleans() {
        let schema = schema(ScalarAttributeType::B, ScalarAttributeType::B);
        let params = QueryParams::hash("T").with_sort(SortCondition::Eq("0".to_owned()));
        let cond = build(&schema, &params).unwrap();
        assert_eq!(cond.values[":h"], AttributeValue::Bool(true));
        assert_eq!(cond.values[":r"], AttributeValue::Bool(false));
    }

    #[test]
    fn test_should_fail_on_value_incompatible_with_key_type() {
        let err = build(&number_schema(), &QueryParams::hash("abc")).unwrap_err();
        assert!(
            matches!(err, ExportError::InvalidKeyValue { ref attribute, .. } if attribute == "Attribute1")
        );
        assert!(!err.is_usage());

        let schema = schema(ScalarAttributeType::B, ScalarAttributeType::B);
        assert!(matches!(
            build(&schema, &QueryParams::hash("yes")),
            Err(ExportError::InvalidKeyValue { .. })
        ));
    }

    #[test]
    fn test_should_reject_sort_condition_without_range_key() {
        let schema = string_schema();
        let index_key = schema.key_schema_for(Some("by-owner")).unwrap();
        let params = QueryParams::hash("bob").with_sort(SortCondition::Gt("1".to_owned()));
        let err = build_key_condition(&schema, index_key, &params).unwrap_err();
        assert!(matches!(err, ExportError::NoRangeKey(ref owner) if owner == "index by-owner"));
        assert!(err.is_usage());
    }

    #[test]
    fn test_should_query_index_by_hash_only() {
        let schema = string_schema();
        let index_key = schema.key_schema_for(Some("by-owner")).unwrap();
        let cond = build_key_condition(&schema, index_key, &QueryParams::hash("bob")).unwrap();
        assert_eq!(cond.expression(), "#h = :h");
        assert_eq!(cond.names["#h"], "Owner");
    }
}
