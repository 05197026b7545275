//! In-memory [`StoreClient`] for unit tests.

use dynocsv_model::input::{DescribeTableInput, QueryInput, ScanInput};
use dynocsv_model::output::{DescribeTableOutput, QueryOutput, ScanOutput};
use dynocsv_model::types::{KeyType, TableDescription};
use dynocsv_model::{AttributeValue, DynamoDBError, DynamoDBErrorCode, Item};
use parking_lot::Mutex;

use crate::client::StoreClient;

/// Build an item from `(name, value)` pairs.
pub(crate) fn item(pairs: &[(&str, AttributeValue)]) -> Item {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

/// A single table held in memory. Pages are cut every `page_size` items.
#[derive(Debug)]
pub(crate) struct MemoryStore {
    table: Option<TableDescription>,
    items: Vec<Item>,
    page_size: usize,
    /// 1-based index of the scan call that fails, discovery sample scan included.
    failing_scan: Option<usize>,
    calls: Mutex<Calls>,
}

#[derive(Debug, Default)]
struct Calls {
    describe: usize,
    scan_limits: Vec<Option<i32>>,
    queries: Vec<QueryInput>,
}

impl MemoryStore {
    pub(crate) fn new(table: TableDescription) -> Self {
        Self {
            table: Some(table),
            items: Vec::new(),
            page_size: 100,
            failing_scan: None,
            calls: Mutex::new(Calls::default()),
        }
    }

    pub(crate) fn with_items(mut self, items: Vec<Item>) -> Self {
        self.items = items;
        self
    }

    pub(crate) fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub(crate) fn with_failing_scan(mut self, call: usize) -> Self {
        self.failing_scan = Some(call);
        self
    }

    pub(crate) fn without_table(mut self) -> Self {
        self.table = None;
        self
    }

    pub(crate) fn describe_calls(&self) -> usize {
        self.calls.lock().describe
    }

    /// `Limit` of every scan issued, in order.
    pub(crate) fn scan_limits(&self) -> Vec<Option<i32>> {
        self.calls.lock().scan_limits.clone()
    }

    pub(crate) fn queries(&self) -> Vec<QueryInput> {
        self.calls.lock().queries.clone()
    }

    fn table_key(&self) -> Vec<String> {
        self.table
            .iter()
            .flat_map(|t| t.key_schema.iter())
            .map(|k| k.attribute_name.clone())
            .collect()
    }

    fn index_hash(&self, index: &str) -> Option<String> {
        let table = self.table.as_ref()?;
        let global = table
            .global_secondary_indexes
            .iter()
            .map(|i| (&i.index_name, &i.key_schema));
        let local = table
            .local_secondary_indexes
            .iter()
            .map(|i| (&i.index_name, &i.key_schema));
        global
            .chain(local)
            .find(|(name, _)| name.as_deref() == Some(index))
            .and_then(|(_, keys)| keys.iter().find(|k| k.key_type == KeyType::Hash))
            .map(|k| k.attribute_name.clone())
    }

    /// Items visible through `index`: a secondary index only holds items
    /// that carry its hash key.
    fn visible(&self, index: Option<&str>) -> Vec<&Item> {
        let hash = index.and_then(|i| self.index_hash(i));
        self.items
            .iter()
            .filter(|item| hash.as_ref().is_none_or(|h| item.contains_key(h)))
            .collect()
    }

    fn page(
        &self,
        candidates: Vec<&Item>,
        limit: Option<i32>,
        start: &Item,
    ) -> (Vec<Item>, Item) {
        let key = self.table_key();
        let offset = if start.is_empty() {
            0
        } else {
            candidates
                .iter()
                .position(|item| key.iter().all(|k| item.get(k) == start.get(k)))
                .map_or(candidates.len(), |p| p + 1)
        };
        let size = limit
            .and_then(|l| usize::try_from(l).ok())
            .map_or(self.page_size, |l| l.min(self.page_size));
        let mut items: Vec<Item> = candidates
            .into_iter()
            .skip(offset)
            .take(size + 1)
            .cloned()
            .collect();

        let last_key = if items.len() > size {
            items.truncate(size);
            items
                .last()
                .map(|last| {
                    key.iter()
                        .filter_map(|k| last.get(k).map(|v| (k.clone(), v.clone())))
                        .collect()
                })
                .unwrap_or_default()
        } else {
            Item::new()
        };
        (items, last_key)
    }
}

fn missing(table: &str) -> DynamoDBError {
    DynamoDBError::resource_not_found(format!("Requested resource not found: Table: {table}"))
}

fn count(items: &[Item]) -> i32 {
    i32::try_from(items.len()).unwrap_or(i32::MAX)
}

#[async_trait::async_trait]
impl StoreClient for MemoryStore {
    async fn describe_table(
        &self,
        input: DescribeTableInput,
    ) -> Result<DescribeTableOutput, DynamoDBError> {
        self.calls.lock().describe += 1;
        let table = self.table.clone().ok_or_else(|| missing(&input.table_name))?;
        Ok(DescribeTableOutput { table: Some(table) })
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError> {
        let call = {
            let mut calls = self.calls.lock();
            calls.scan_limits.push(input.limit);
            calls.scan_limits.len()
        };
        if self.table.is_none() {
            return Err(missing(&input.table_name));
        }
        if self.failing_scan == Some(call) {
            return Err(DynamoDBError::with_message(
                DynamoDBErrorCode::ProvisionedThroughputExceededException,
                "The level of configured provisioned throughput for the table was exceeded",
            ));
        }
        let candidates = self.visible(input.index_name.as_deref());
        let (items, last_evaluated_key) =
            self.page(candidates, input.limit, &input.exclusive_start_key);
        Ok(ScanOutput {
            count: count(&items),
            items,
            last_evaluated_key,
        })
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError> {
        self.calls.lock().queries.push(input.clone());
        if self.table.is_none() {
            return Err(missing(&input.table_name));
        }
        // Only the hash condition is evaluated.
        let hash_name = input.expression_attribute_names.get("#h");
        let hash_value = input.expression_attribute_values.get(":h");
        let candidates = self
            .visible(input.index_name.as_deref())
            .into_iter()
            .filter(|item| match (hash_name, hash_value) {
                (Some(name), Some(value)) => item.get(name) == Some(value),
                _ => false,
            })
            .collect();
        let (items, last_evaluated_key) =
            self.page(candidates, input.limit, &input.exclusive_start_key);
        Ok(QueryOutput {
            count: count(&items),
            items,
            last_evaluated_key,
        })
    }
}
