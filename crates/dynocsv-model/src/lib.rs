//! DynamoDB model types for dynocsv.
//!
//! Only the slice of the DynamoDB API an exporter needs is modelled here:
//! attribute values, table and index key schemas, and the `DescribeTable`,
//! `Scan` and `Query` request/response shapes. The types follow the
//! `awsJson1_0` wire format so fixtures can be written as plain DynamoDB JSON.
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod error;
pub mod input;
pub mod output;
pub mod types;

pub use attribute_value::{AttributeValue, Item};
pub use error::{DynamoDBError, DynamoDBErrorCode};
