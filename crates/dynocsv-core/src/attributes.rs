//! Append-only column order.

use std::collections::{HashMap, HashSet};

/// Ordered list of attribute names, duplicate-free unless built verbatim.
///
/// Once a name is pushed its position never changes, so the header and
/// every row built from this order agree on column positions.
#[derive(Debug, Clone, Default)]
pub struct AttributeOrder {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl AttributeOrder {
    /// Create an empty order.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a caller supplied column list as given.
    ///
    /// Repeated names stay repeated, so `a,a` yields two `a` columns. Only
    /// orders built through [`push`](Self::push) are duplicate-free.
    #[must_use]
    pub fn verbatim(names: Vec<String>) -> Self {
        let seen = names.iter().cloned().collect();
        Self { names, seen }
    }

    /// Append `name` unless already present. Returns `true` if it was added.
    pub fn push(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.seen.contains(&name) {
            return false;
        }
        self.seen.insert(name.clone());
        self.names.push(name);
        true
    }

    /// Append `name` unless it is already present or skip-listed.
    pub fn push_unless_skipped(&mut self, name: &str, skip: &HashSet<String>) -> bool {
        if skip.contains(name) {
            return false;
        }
        self.push(name)
    }

    /// Whether `name` is part of the order.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    /// Names in column order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no column has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Consume the order, returning the names.
    #[must_use]
    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}

/// Lay out `values` positionally against `order`; missing attributes become "".
#[must_use]
pub fn positional_row(values: &HashMap<String, String>, order: &[String]) -> Vec<String> {
    order
        .iter()
        .map(|name| values.get(name).cloned().unwrap_or_default())
        .collect()
}
