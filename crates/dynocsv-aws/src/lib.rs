//! AWS-backed store client for dynocsv.
//!
//! [`AwsStoreClient`] implements [`dynocsv_core::StoreClient`] on top of
//! `aws-sdk-dynamodb`. [`SessionConfig`] resolves the profile and endpoint
//! and loads the SDK configuration.
#![allow(clippy::doc_markdown)]

pub mod client;
pub mod session;

pub use client::AwsStoreClient;
pub use session::{Runtime, SessionConfig};
