//! Pagination driver.
//!
//! An export describes the table, settles the initial column order, then
//! pulls pages one at a time and feeds every record through the encoder into
//! the [`RowBuffer`]. Under discovered columns, attributes first seen on a
//! later page are appended to the order. Rows already written keep their
//! width; if that happens after the header went out, the summary reports
//! `forced_display` so the caller can surface the final column list.

use std::collections::{HashMap, HashSet};
use std::io;

use dynocsv_model::Item;
use dynocsv_model::input::{QueryInput, ScanInput};
use tracing::{debug, info, warn};

use crate::attributes::AttributeOrder;
use crate::buffer::RowBuffer;
use crate::client::{PageRequest, StoreClient, describe_key_schema};
use crate::condition::build_key_condition;
use crate::config::ExportConfig;
use crate::discovery::{append_new_attributes, discover};
use crate::encoder::encode_item;
use crate::error::ExportResult;
use crate::params::{ColumnPolicy, QueryParams};
use crate::schema::TableSchema;

/// What to export.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    /// Table to read.
    pub table_name: String,
    /// Secondary index to scan or query instead of the base table.
    pub index_name: Option<String>,
    /// Key condition; `None` exports the whole table (or index) via scan.
    pub query: Option<QueryParams>,
    /// Column selection.
    pub columns: ColumnPolicy,
    /// Stop after this many records. `None` or `Some(0)` means no limit.
    pub limit: Option<usize>,
}

impl ExportRequest {
    /// Export every record of `table_name` with discovered columns.
    #[must_use]
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            ..Default::default()
        }
    }
}

/// Outcome of a finished export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Final column order, including columns added after the header.
    pub attributes: Vec<String>,
    /// New columns appeared after the header was written, so the header in
    /// the output is narrower than `attributes`.
    pub forced_display: bool,
    /// Records written.
    pub records: usize,
    /// Pages fetched, excluding the discovery sample scan.
    pub pages: usize,
}

/// Run one export, writing CSV into `sink`.
///
/// Nothing is written when discovery finds no columns.
pub async fn export<C, W>(
    client: &C,
    request: &ExportRequest,
    config: &ExportConfig,
    sink: W,
) -> ExportResult<ExportSummary>
where
    C: StoreClient + ?Sized,
    W: io::Write,
{
    let table = request.table_name.as_str();
    let index = request.index_name.as_deref();
    info!(
        table,
        index,
        query = request.query.is_some(),
        "Starting export"
    );

    let schema = describe_key_schema(client, table).await?;
    let template = page_request(&schema, request, config)?;

    let (order, skip, buffer) = match &request.columns {
        ColumnPolicy::Explicit(columns) => {
            let order = AttributeOrder::verbatim(columns.clone());
            let buffer = RowBuffer::with_header(sink, order.names())?;
            (order, None, buffer)
        }
        ColumnPolicy::Discovered { skip } => {
            let order = discover(client, &schema, index, skip).await?;
            if order.is_empty() {
                info!(table, index, "No columns discovered, nothing to export");
                return Ok(ExportSummary::default());
            }
            let buffer = RowBuffer::new(sink, config.buffer_capacity);
            (order, Some(skip), buffer)
        }
    };

    let mut session = ExportSession {
        order,
        skip,
        buffer,
        limit: request.limit.filter(|l| *l > 0),
        records: 0,
        pages: 0,
        forced_display: false,
    };

    let mut start_key = None;
    loop {
        let page = template.fetch(client, start_key).await?;
        if session.process_page(page.items)? {
            debug!(table, records = session.records, "Record limit reached");
            break;
        }
        match page.next_key {
            Some(key) => start_key = Some(key),
            None => break,
        }
    }

    let summary = session.finish()?;
    info!(
        table,
        index,
        records = summary.records,
        pages = summary.pages,
        columns = summary.attributes.len(),
        "Export finished"
    );
    Ok(summary)
}

/// Build the scan or query template for every page of the export.
fn page_request(
    schema: &TableSchema,
    request: &ExportRequest,
    config: &ExportConfig,
) -> ExportResult<PageRequest> {
    let index = request.index_name.as_deref();
    let key = schema.key_schema_for(index)?;

    let Some(params) = &request.query else {
        return Ok(PageRequest::Scan(ScanInput {
            table_name: request.table_name.clone(),
            index_name: request.index_name.clone(),
            limit: config.page_size,
            ..Default::default()
        }));
    };

    let condition = build_key_condition(schema, key, params)?;
    Ok(PageRequest::Query(QueryInput {
        table_name: request.table_name.clone(),
        index_name: request.index_name.clone(),
        key_condition_expression: Some(condition.expression()),
        expression_attribute_names: condition.names,
        expression_attribute_values: condition.values,
        limit: config.page_size,
        ..Default::default()
    }))
}

/// State owned by a single export run.
struct ExportSession<'a, W: io::Write> {
    order: AttributeOrder,
    /// `Some` while columns are being discovered.
    skip: Option<&'a HashSet<String>>,
    buffer: RowBuffer<W>,
    limit: Option<usize>,
    records: usize,
    pages: usize,
    forced_display: bool,
}

impl<W: io::Write> ExportSession<'_, W> {
    /// Feed one page. Returns `true` once the record limit is reached.
    fn process_page(&mut self, items: Vec<Item>) -> ExportResult<bool> {
        self.pages += 1;
        debug!(page = self.pages, records = items.len(), "Processing page");

        for item in items {
            let values = self.encode_record(&item);
            if self.skip.is_some() {
                let added = append_new_attributes(&mut self.order, &values);
                if added > 0 && self.buffer.is_flushed() {
                    if !self.forced_display {
                        warn!(
                            page = self.pages,
                            columns = self.order.len(),
                            "New columns found after the header was written"
                        );
                    }
                    self.forced_display = true;
                }
            }

            self.buffer.offer(&values, self.order.names())?;
            self.records += 1;

            if self.limit.is_some_and(|limit| self.records >= limit) {
                self.buffer.flush(self.order.names())?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Explicit columns keep only the listed attributes; discovery keeps
    /// everything outside the skip list.
    fn encode_record(&self, item: &Item) -> HashMap<String, String> {
        match self.skip {
            Some(skip) => encode_item(item, |name| !skip.contains(name)),
            None => encode_item(item, |name| self.order.contains(name)),
        }
    }

    fn finish(mut self) -> ExportResult<ExportSummary> {
        self.buffer.flush(self.order.names())?;
        self.buffer.finish()?;
        Ok(ExportSummary {
            attributes: self.order.into_names(),
            forced_display: self.forced_display,
            records: self.records,
            pages: self.pages,
        })
    }
}
