//! Baseline column discovery.
//!
//! Key attributes come first so that every export leads with the columns
//! that identify a record: the target index's keys, then the table's keys,
//! then the keys of every other index by index name. One sample record then
//! contributes the rest of its attributes in alphabetical order.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::attributes::AttributeOrder;
use crate::client::{StoreClient, fetch_one_sample};
use crate::encoder::encode_item;
use crate::error::ExportResult;
use crate::schema::TableSchema;

/// Seed an order with key attributes only.
///
/// Fails with [`crate::ExportError::UnknownIndex`] if `index` names an index
/// the table does not have.
pub fn seed_key_attributes(
    schema: &TableSchema,
    index: Option<&str>,
    skip: &HashSet<String>,
) -> ExportResult<AttributeOrder> {
    let mut order = AttributeOrder::new();

    if let Some(name) = index {
        for attr in schema.key_schema_for(Some(name))?.attribute_names() {
            order.push_unless_skipped(attr, skip);
        }
    }

    for attr in schema.key.attribute_names() {
        order.push_unless_skipped(attr, skip);
    }

    for other in schema.indexes.iter().filter(|i| Some(i.name.as_str()) != index) {
        for attr in other.key.attribute_names() {
            order.push_unless_skipped(attr, skip);
        }
    }

    Ok(order)
}

/// Append the attributes of an encoded `record` that `order` lacks, in
/// ascending name order. Returns how many were added.
///
/// `record` holds only representable, non-skipped attributes, as produced by
/// [`encode_item`].
pub fn append_new_attributes(order: &mut AttributeOrder, record: &HashMap<String, String>) -> usize {
    let mut fresh: Vec<&str> = record
        .keys()
        .filter(|name| !order.contains(name))
        .map(String::as_str)
        .collect();
    fresh.sort_unstable();

    for name in &fresh {
        order.push(*name);
    }
    fresh.len()
}

/// Discover the baseline column order for an export of `schema`'s table.
///
/// An empty table yields an empty order: without a sample there is nothing
/// to export.
pub async fn discover<C: StoreClient + ?Sized>(
    client: &C,
    schema: &TableSchema,
    index: Option<&str>,
    skip: &HashSet<String>,
) -> ExportResult<AttributeOrder> {
    let mut order = seed_key_attributes(schema, index, skip)?;

    let Some(sample) = fetch_one_sample(client, &schema.table_name, index).await? else {
        debug!(table = %schema.table_name, index, "Empty sample, nothing to discover");
        return Ok(AttributeOrder::new());
    };

    let encoded = encode_item(&sample, |name| !skip.contains(name));
    append_new_attributes(&mut order, &encoded);
    debug!(
        table = %schema.table_name,
        index,
        columns = order.len(),
        "Discovered baseline columns"
    );
    Ok(order)
}
