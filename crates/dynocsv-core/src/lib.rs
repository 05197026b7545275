//! Core export pipeline for dynocsv.
//!
//! Records in a DynamoDB table carry no fixed schema, while CSV needs one
//! header row and uniform rows. This crate reconciles the two:
//!
//! 1. [`encoder`] flattens one typed attribute value into text.
//! 2. [`condition`] builds the key-condition expression for filtered queries.
//! 3. [`discovery`] seeds the column order from key schemas and a sample item.
//! 4. [`buffer`] holds rows back until the header can be committed.
//! 5. [`export`] drives scan/query pagination and ties the pieces together.
//!
//! The store itself sits behind the [`StoreClient`] trait.
#![allow(clippy::doc_markdown)]

pub mod attributes;
pub mod buffer;
pub mod client;
pub mod condition;
pub mod config;
pub mod discovery;
pub mod encoder;
pub mod error;
pub mod export;
pub mod params;
pub mod schema;

#[cfg(test)]
pub(crate) mod test_support;

pub use attributes::AttributeOrder;
pub use client::StoreClient;
pub use config::ExportConfig;
pub use error::{ExportError, ExportResult};
pub use export::{ExportRequest, ExportSummary, export};
pub use params::{ColumnPolicy, QueryParams, SortCondition, SortFlags};
