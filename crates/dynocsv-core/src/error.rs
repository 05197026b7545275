//! Error types for the export pipeline.

use dynocsv_model::DynamoDBError;

/// Errors that abort an export.
///
/// Usage errors are raised before the store is read. Store errors are
/// propagated as-is; retrying is the client's business.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// More than one sort key operator was supplied.
    #[error("only a single sort condition is supported, but found {}: {}", .0.len(), .0.join(", "))]
    ConflictingSortConditions(Vec<&'static str>),

    /// A sort key operator was supplied without a hash value.
    #[error("sort condition \"{0}\" requires a hash value")]
    SortWithoutHash(&'static str),

    /// The `between` operand was not a `lo,hi` pair.
    #[error("sort-between expects two comma separated values, got \"{0}\"")]
    InvalidBetween(String),

    /// Explicit columns and skip columns are mutually exclusive.
    #[error("\"columns\" and \"skip-columns\" are mutually exclusive, please use one")]
    ColumnsAndSkipColumns,

    /// A sort key operator was supplied but the key schema has no range key.
    #[error("sort condition supplied but {0} has no range key")]
    NoRangeKey(String),

    /// The requested index does not exist on the table.
    #[error("index {index} not found on table {table}")]
    UnknownIndex {
        /// Table name.
        table: String,
        /// Requested index name.
        index: String,
    },

    /// A key schema without a `HASH` element.
    #[error("key schema of {0} has no HASH key")]
    MissingHashKey(String),

    /// A key attribute with no attribute definition.
    #[error("no attribute definition for key attribute {0}")]
    MissingAttributeDefinition(String),

    /// A key attribute declared with a type that cannot be parsed into.
    #[error("key attribute {attribute} has unsupported type {attribute_type}")]
    UnsupportedKeyType {
        /// Key attribute name.
        attribute: String,
        /// Declared scalar type.
        attribute_type: String,
    },

    /// A query value that does not parse under its key's declared type.
    #[error("failed to parse \"{value}\" into the type {attribute_type} of key {attribute}: {reason}")]
    InvalidKeyValue {
        /// The raw value supplied by the user.
        value: String,
        /// Key attribute name.
        attribute: String,
        /// Declared scalar type.
        attribute_type: String,
        /// Parser message.
        reason: String,
    },

    /// The store client failed.
    #[error(transparent)]
    Store(#[from] DynamoDBError),

    /// Writing a CSV record failed.
    #[error("failed to write csv output: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing the destination failed.
    #[error("failed to flush output: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Returns `true` for errors caused by how the export was requested,
    /// as opposed to store or output failures.
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            Self::ConflictingSortConditions(_)
                | Self::SortWithoutHash(_)
                | Self::InvalidBetween(_)
                | Self::ColumnsAndSkipColumns
                | Self::NoRangeKey(_)
                | Self::UnknownIndex { .. }
        )
    }
}

/// Convenience result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;
