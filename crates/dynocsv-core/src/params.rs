//! User-facing export parameters and their validation.

use std::collections::HashSet;

use crate::error::{ExportError, ExportResult};

const BETWEEN_SEPARATOR: char = ',';

/// A single condition on the sort (range) key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortCondition {
    /// `range = value`
    Eq(String),
    /// `range > value`
    Gt(String),
    /// `range >= value`
    Ge(String),
    /// `range < value`
    Lt(String),
    /// `range <= value`
    Le(String),
    /// `begins_with(range, prefix)`
    BeginsWith(String),
    /// `range BETWEEN lo AND hi`
    Between(String, String),
}

impl SortCondition {
    /// Name of the command-line flag that produces this condition.
    #[must_use]
    pub fn flag_name(&self) -> &'static str {
        match self {
            Self::Eq(_) => "sort",
            Self::Gt(_) => "sort-gt",
            Self::Ge(_) => "sort-ge",
            Self::Lt(_) => "sort-lt",
            Self::Le(_) => "sort-le",
            Self::BeginsWith(_) => "sort-begins-with",
            Self::Between(..) => "sort-between",
        }
    }
}

/// Raw sort flags as supplied by the user. Empty strings count as unset.
#[derive(Debug, Clone, Default)]
pub struct SortFlags {
    /// Exact sort value.
    pub sort: Option<String>,
    /// Greater-than bound.
    pub sort_gt: Option<String>,
    /// Greater-or-equal bound.
    pub sort_ge: Option<String>,
    /// Less-than bound.
    pub sort_lt: Option<String>,
    /// Less-or-equal bound.
    pub sort_le: Option<String>,
    /// Prefix.
    pub sort_begins_with: Option<String>,
    /// `lo,hi` pair.
    pub sort_between: Option<String>,
}

impl SortFlags {
    /// Collapse the flags into at most one condition.
    pub fn into_condition(self) -> ExportResult<Option<SortCondition>> {
        let set = |v: Option<String>| v.filter(|s| !s.is_empty());

        let mut conditions = Vec::new();
        if let Some(v) = set(self.sort) {
            conditions.push(SortCondition::Eq(v));
        }
        if let Some(v) = set(self.sort_gt) {
            conditions.push(SortCondition::Gt(v));
        }
        if let Some(v) = set(self.sort_ge) {
            conditions.push(SortCondition::Ge(v));
        }
        if let Some(v) = set(self.sort_lt) {
            conditions.push(SortCondition::Lt(v));
        }
        if let Some(v) = set(self.sort_le) {
            conditions.push(SortCondition::Le(v));
        }
        if let Some(v) = set(self.sort_begins_with) {
            conditions.push(SortCondition::BeginsWith(v));
        }
        if let Some(v) = set(self.sort_between) {
            conditions.push(parse_between(&v)?);
        }

        if conditions.len() > 1 {
            return Err(ExportError::ConflictingSortConditions(
                conditions.iter().map(SortCondition::flag_name).collect(),
            ));
        }
        Ok(conditions.pop())
    }
}

fn parse_between(raw: &str) -> ExportResult<SortCondition> {
    let parts: Vec<&str> = raw.split(BETWEEN_SEPARATOR).collect();
    match parts.as_slice() {
        [lo, hi] => Ok(SortCondition::Between((*lo).to_owned(), (*hi).to_owned())),
        _ => Err(ExportError::InvalidBetween(raw.to_owned())),
    }
}

/// Hash value plus at most one sort condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    /// Required hash key value.
    pub hash: String,
    /// Optional sort key condition.
    pub sort: Option<SortCondition>,
}

impl QueryParams {
    /// Query by hash value only.
    #[must_use]
    pub fn hash(value: impl Into<String>) -> Self {
        Self {
            hash: value.into(),
            sort: None,
        }
    }

    /// Add a sort condition.
    #[must_use]
    pub fn with_sort(mut self, sort: SortCondition) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Validate raw flags. No hash value means a full scan (`Ok(None)`),
    /// which is only legal when no sort flag was given either.
    pub fn from_flags(hash: Option<String>, flags: SortFlags) -> ExportResult<Option<Self>> {
        let sort = flags.into_condition()?;
        match hash.filter(|h| !h.is_empty()) {
            Some(hash) => Ok(Some(Self { hash, sort })),
            None => match sort {
                Some(s) => Err(ExportError::SortWithoutHash(s.flag_name())),
                None => Ok(None),
            },
        }
    }
}

/// How the set and order of CSV columns is decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnPolicy {
    /// The caller fixes the columns up front; discovery is skipped.
    Explicit(Vec<String>),
    /// Columns are discovered from key schemas and the records themselves.
    Discovered {
        /// Attribute names never exported.
        skip: HashSet<String>,
    },
}

impl ColumnPolicy {
    /// Build from the `columns` and `skip-columns` lists.
    pub fn from_lists(columns: Vec<String>, skip: Vec<String>) -> ExportResult<Self> {
        let columns: Vec<String> = columns.into_iter().filter(|c| !c.is_empty()).collect();
        let skip: HashSet<String> = skip.into_iter().filter(|c| !c.is_empty()).collect();
        match (columns.is_empty(), skip.is_empty()) {
            (false, false) => Err(ExportError::ColumnsAndSkipColumns),
            (false, true) => Ok(Self::Explicit(columns)),
            (true, _) => Ok(Self::Discovered { skip }),
        }
    }

    /// Whether columns are discovered rather than given.
    #[must_use]
    pub fn is_discovered(&self) -> bool {
        matches!(self, Self::Discovered { .. })
    }
}

impl Default for ColumnPolicy {
    fn default() -> Self {
        Self::Discovered {
            skip: HashSet::new(),
        }
    }
}
