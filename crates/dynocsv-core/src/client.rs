//! The store client seam and the three reads an export needs from it.
//!
//! [`StoreClient`] mirrors the wire operations one to one. The helpers in
//! this module turn them into what the pipeline actually asks for: the key
//! layout of a table, a single sample item, and one page of records.
//!
//! # Object safety
//!
//! [`StoreClient`] uses `#[async_trait]` so the pipeline can run against a
//! `&dyn StoreClient` as well as a concrete client.

use dynocsv_model::input::{DescribeTableInput, QueryInput, ScanInput};
use dynocsv_model::output::{DescribeTableOutput, QueryOutput, ScanOutput};
use dynocsv_model::{DynamoDBError, Item};
use tracing::debug;

use crate::error::ExportResult;
use crate::schema::TableSchema;

/// Read-side DynamoDB operations used by an export.
///
/// Retries, timeouts and credentials are the implementation's business.
#[async_trait::async_trait]
pub trait StoreClient: Send + Sync {
    /// `DescribeTable`.
    async fn describe_table(
        &self,
        input: DescribeTableInput,
    ) -> Result<DescribeTableOutput, DynamoDBError>;

    /// `Scan`.
    async fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError>;

    /// `Query`.
    async fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError>;
}

/// Describe `table` and parse its key layout.
pub async fn describe_key_schema<C: StoreClient + ?Sized>(
    client: &C,
    table: &str,
) -> ExportResult<TableSchema> {
    let output = client
        .describe_table(DescribeTableInput {
            table_name: table.to_owned(),
        })
        .await?;
    let desc = output
        .table
        .ok_or_else(|| DynamoDBError::resource_not_found(format!("Table: {table} not found")))?;
    TableSchema::from_description(table, &desc)
}

/// Fetch at most one item from `table` (or `index`), used as a schema sample.
pub async fn fetch_one_sample<C: StoreClient + ?Sized>(
    client: &C,
    table: &str,
    index: Option<&str>,
) -> ExportResult<Option<Item>> {
    let output = client
        .scan(ScanInput {
            table_name: table.to_owned(),
            index_name: index.map(str::to_owned),
            limit: Some(1),
            ..Default::default()
        })
        .await?;
    debug!(table, index, count = output.count, "Fetched sample item");
    Ok(output.items.into_iter().next())
}

/// One page of records plus the continuation key, if there is more.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records on this page.
    pub items: Vec<Item>,
    /// `LastEvaluatedKey`; `None` on the last page.
    pub next_key: Option<Item>,
}

/// A scan or query template, re-issued once per page.
#[derive(Debug, Clone)]
pub enum PageRequest {
    /// Unconditional scan of a table or index.
    Scan(ScanInput),
    /// Key-condition query against a table or index.
    Query(QueryInput),
}

impl PageRequest {
    /// Fetch the page starting after `start_key` (`None` for the first page).
    pub async fn fetch<C: StoreClient + ?Sized>(
        &self,
        client: &C,
        start_key: Option<Item>,
    ) -> ExportResult<Page> {
        let start_key = start_key.unwrap_or_default();
        let (items, last_key) = match self {
            Self::Scan(template) => {
                let output = client
                    .scan(ScanInput {
                        exclusive_start_key: start_key,
                        ..template.clone()
                    })
                    .await?;
                (output.items, output.last_evaluated_key)
            }
            Self::Query(template) => {
                let output = client
                    .query(QueryInput {
                        exclusive_start_key: start_key,
                        ..template.clone()
                    })
                    .await?;
                (output.items, output.last_evaluated_key)
            }
        };
        Ok(Page {
            items,
            next_key: (!last_key.is_empty()).then_some(last_key),
        })
    }
}
