//! [`StoreClient`] backed by `aws-sdk-dynamodb`.
//!
//! Requests and responses are converted between the SDK's types and the
//! model crate's. SDK attribute variants this client does not recognize are
//! dropped on the way in, the same as any other value with no text form.
//! Inside a list they become `NULL` so the element keeps its slot.

use std::collections::HashMap;

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types as sdk;
use dynocsv_core::StoreClient;
use dynocsv_model::input::{DescribeTableInput, QueryInput, ScanInput};
use dynocsv_model::output::{DescribeTableOutput, QueryOutput, ScanOutput};
use dynocsv_model::types::{
    AttributeDefinition, GlobalSecondaryIndexDescription, KeySchemaElement, KeyType,
    LocalSecondaryIndexDescription, ScalarAttributeType, TableDescription,
};
use dynocsv_model::{AttributeValue, DynamoDBError, DynamoDBErrorCode, Item};
use tracing::debug;

/// DynamoDB client for exports.
#[derive(Debug, Clone)]
pub struct AwsStoreClient {
    inner: aws_sdk_dynamodb::Client,
}

impl AwsStoreClient {
    /// Wrap an existing SDK client.
    #[must_use]
    pub fn new(inner: aws_sdk_dynamodb::Client) -> Self {
        Self { inner }
    }

    /// Build a client from a loaded SDK configuration.
    #[must_use]
    pub fn from_conf(config: &aws_config::SdkConfig) -> Self {
        Self::new(aws_sdk_dynamodb::Client::new(config))
    }
}

#[async_trait::async_trait]
impl StoreClient for AwsStoreClient {
    async fn describe_table(
        &self,
        input: DescribeTableInput,
    ) -> Result<DescribeTableOutput, DynamoDBError> {
        debug!(table = %input.table_name, "DescribeTable");
        let output = self
            .inner
            .describe_table()
            .table_name(input.table_name)
            .send()
            .await
            .map_err(store_error)?;
        Ok(DescribeTableOutput {
            table: output.table().map(table_description),
        })
    }

    async fn scan(&self, input: ScanInput) -> Result<ScanOutput, DynamoDBError> {
        debug!(table = %input.table_name, index = ?input.index_name, limit = ?input.limit, "Scan");
        let output = self
            .inner
            .scan()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_limit(input.limit)
            .set_exclusive_start_key(to_sdk_key(&input.exclusive_start_key))
            .send()
            .await
            .map_err(store_error)?;
        Ok(ScanOutput {
            items: output.items().iter().map(to_model_item).collect(),
            count: output.count(),
            last_evaluated_key: output
                .last_evaluated_key()
                .map(to_model_item)
                .unwrap_or_default(),
        })
    }

    async fn query(&self, input: QueryInput) -> Result<QueryOutput, DynamoDBError> {
        debug!(
            table = %input.table_name,
            index = ?input.index_name,
            condition = ?input.key_condition_expression,
            "Query"
        );
        let names = (!input.expression_attribute_names.is_empty())
            .then_some(input.expression_attribute_names);
        let output = self
            .inner
            .query()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_key_condition_expression(input.key_condition_expression)
            .set_expression_attribute_names(names)
            .set_expression_attribute_values(to_sdk_key(&input.expression_attribute_values))
            .set_limit(input.limit)
            .set_exclusive_start_key(to_sdk_key(&input.exclusive_start_key))
            .send()
            .await
            .map_err(store_error)?;
        Ok(QueryOutput {
            items: output.items().iter().map(to_model_item).collect(),
            count: output.count(),
            last_evaluated_key: output
                .last_evaluated_key()
                .map(to_model_item)
                .unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

fn store_error<E, R>(err: SdkError<E, R>) -> DynamoDBError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let context = DisplayErrorContext(&err).to_string();
    let (code, message) = match err.as_service_error() {
        Some(service) => (
            service
                .code()
                .map_or(DynamoDBErrorCode::Unknown, DynamoDBErrorCode::from_code),
            service.message().map_or_else(|| context.clone(), str::to_owned),
        ),
        None => (DynamoDBErrorCode::Transport, context),
    };
    DynamoDBError::with_message(code, message).with_source(err)
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn to_sdk_key(item: &Item) -> Option<HashMap<String, sdk::AttributeValue>> {
    (!item.is_empty()).then(|| {
        item.iter()
            .map(|(k, v)| (k.clone(), to_sdk_value(v)))
            .collect()
    })
}

fn to_sdk_value(value: &AttributeValue) -> sdk::AttributeValue {
    match value {
        AttributeValue::S(s) => sdk::AttributeValue::S(s.clone()),
        AttributeValue::N(n) => sdk::AttributeValue::N(n.clone()),
        AttributeValue::B(b) => sdk::AttributeValue::B(Blob::new(b.to_vec())),
        AttributeValue::Ss(v) => sdk::AttributeValue::Ss(v.clone()),
        AttributeValue::Ns(v) => sdk::AttributeValue::Ns(v.clone()),
        AttributeValue::Bs(v) => {
            sdk::AttributeValue::Bs(v.iter().map(|b| Blob::new(b.to_vec())).collect())
        }
        AttributeValue::Bool(b) => sdk::AttributeValue::Bool(*b),
        AttributeValue::Null(b) => sdk::AttributeValue::Null(*b),
        AttributeValue::L(v) => sdk::AttributeValue::L(v.iter().map(to_sdk_value).collect()),
        AttributeValue::M(m) => sdk::AttributeValue::M(
            m.iter()
                .map(|(k, v)| (k.clone(), to_sdk_value(v)))
                .collect(),
        ),
    }
}

fn to_model_item(item: &HashMap<String, sdk::AttributeValue>) -> Item {
    item.iter()
        .filter_map(|(k, v)| to_model_value(v).map(|v| (k.clone(), v)))
        .collect()
}

fn to_model_value(value: &sdk::AttributeValue) -> Option<AttributeValue> {
    let converted = match value {
        sdk::AttributeValue::S(s) => AttributeValue::S(s.clone()),
        sdk::AttributeValue::N(n) => AttributeValue::N(n.clone()),
        sdk::AttributeValue::B(b) => AttributeValue::B(bytes::Bytes::copy_from_slice(b.as_ref())),
        sdk::AttributeValue::Ss(v) => AttributeValue::Ss(v.clone()),
        sdk::AttributeValue::Ns(v) => AttributeValue::Ns(v.clone()),
        sdk::AttributeValue::Bs(v) => AttributeValue::Bs(
            v.iter()
                .map(|b| bytes::Bytes::copy_from_slice(b.as_ref()))
                .collect(),
        ),
        sdk::AttributeValue::Bool(b) => AttributeValue::Bool(*b),
        sdk::AttributeValue::Null(b) => AttributeValue::Null(*b),
        sdk::AttributeValue::L(v) => AttributeValue::L(
            v.iter()
                .map(|e| to_model_value(e).unwrap_or(AttributeValue::Null(true)))
                .collect(),
        ),
        sdk::AttributeValue::M(m) => AttributeValue::M(to_model_item(m)),
        _ => return None,
    };
    Some(converted)
}

fn table_description(desc: &sdk::TableDescription) -> TableDescription {
    TableDescription {
        table_name: desc.table_name().map(str::to_owned),
        key_schema: key_schema(desc.key_schema()),
        attribute_definitions: desc
            .attribute_definitions()
            .iter()
            .map(|d| {
                AttributeDefinition::new(
                    d.attribute_name(),
                    ScalarAttributeType::from_wire(d.attribute_type().as_str()),
                )
            })
            .collect(),
        global_secondary_indexes: desc
            .global_secondary_indexes()
            .iter()
            .map(|i| GlobalSecondaryIndexDescription {
                index_name: i.index_name().map(str::to_owned),
                key_schema: key_schema(i.key_schema()),
            })
            .collect(),
        local_secondary_indexes: desc
            .local_secondary_indexes()
            .iter()
            .map(|i| LocalSecondaryIndexDescription {
                index_name: i.index_name().map(str::to_owned),
                key_schema: key_schema(i.key_schema()),
            })
            .collect(),
    }
}

fn key_schema(elements: &[sdk::KeySchemaElement]) -> Vec<KeySchemaElement> {
    elements
        .iter()
        .filter_map(|e| {
            let key_type = match e.key_type() {
                sdk::KeyType::Hash => KeyType::Hash,
                sdk::KeyType::Range => KeyType::Range,
                _ => return None,
            };
            Some(KeySchemaElement {
                attribute_name: e.attribute_name().to_owned(),
                key_type,
            })
        })
        .collect()
}
