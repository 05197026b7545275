//! Parsed key layout of a table and its secondary indexes.

use std::collections::HashMap;

use dynocsv_model::types::{KeySchemaElement, KeyType, ScalarAttributeType, TableDescription};

use crate::error::{ExportError, ExportResult};

/// Hash key name and optional range key name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySchema {
    /// Partition (HASH) key attribute.
    pub hash_key: String,
    /// Optional sort (RANGE) key attribute.
    pub range_key: Option<String>,
}

impl KeySchema {
    /// Parse the key schema elements of a table or index named `owner`.
    pub fn from_elements(owner: &str, elements: &[KeySchemaElement]) -> ExportResult<Self> {
        let mut hash_key = None;
        let mut range_key = None;

        for elem in elements {
            match elem.key_type {
                KeyType::Hash => hash_key = Some(elem.attribute_name.clone()),
                KeyType::Range => range_key = Some(elem.attribute_name.clone()),
            }
        }

        let hash_key = hash_key.ok_or_else(|| ExportError::MissingHashKey(owner.to_owned()))?;
        Ok(Self {
            hash_key,
            range_key,
        })
    }

    /// Key attribute names, hash first.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.hash_key.as_str()).chain(self.range_key.as_deref())
    }
}

/// A named secondary index and its key schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    /// Index name.
    pub name: String,
    /// Index key schema.
    pub key: KeySchema,
}

/// Everything the exporter needs from `DescribeTable`.
#[derive(Debug, Clone)]
pub struct TableSchema {
    /// Table name.
    pub table_name: String,
    /// Primary key of the base table.
    pub key: KeySchema,
    /// Global and local secondary indexes, sorted by name.
    pub indexes: Vec<IndexSchema>,
    attribute_types: HashMap<String, ScalarAttributeType>,
}

impl TableSchema {
    /// Build from a table description.
    ///
    /// Indexes without a name are ignored.
    pub fn from_description(
        table_name: &str,
        desc: &TableDescription,
    ) -> ExportResult<Self> {
        let key = KeySchema::from_elements(table_name, &desc.key_schema)?;

        let global = desc
            .global_secondary_indexes
            .iter()
            .map(|i| (i.index_name.as_deref(), i.key_schema.as_slice()));
        let local = desc
            .local_secondary_indexes
            .iter()
            .map(|i| (i.index_name.as_deref(), i.key_schema.as_slice()));

        let mut indexes = global
            .chain(local)
            .filter_map(|(name, elements)| name.map(|n| (n, elements)))
            .map(|(name, elements)| {
                Ok(IndexSchema {
                    name: name.to_owned(),
                    key: KeySchema::from_elements(name, elements)?,
                })
            })
            .collect::<ExportResult<Vec<_>>>()?;
        indexes.sort_by(|a, b| a.name.cmp(&b.name));

        let attribute_types = desc
            .attribute_definitions
            .iter()
            .map(|d| (d.attribute_name.clone(), d.attribute_type.clone()))
            .collect();

        Ok(Self {
            table_name: table_name.to_owned(),
            key,
            indexes,
            attribute_types,
        })
    }

    /// Look up a secondary index by name.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Key schema a query against `index` (or the base table) must satisfy.
    pub fn key_schema_for(&self, index: Option<&str>) -> ExportResult<&KeySchema> {
        match index {
            None => Ok(&self.key),
            Some(name) => {
                self.index(name)
                    .map(|i| &i.key)
                    .ok_or_else(|| ExportError::UnknownIndex {
                        table: self.table_name.clone(),
                        index: name.to_owned(),
                    })
            }
        }
    }

    /// Declared scalar type of an attribute.
    #[must_use]
    pub fn attribute_type(&self, name: &str) -> Option<&ScalarAttributeType> {
        self.attribute_types.get(name)
    }
}
