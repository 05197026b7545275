//! Export integration tests against a running DynamoDB-compatible server.

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::types::{
        AttributeDefinition, AttributeValue, BillingMode, GlobalSecondaryIndex, KeySchemaElement,
        KeyType, Projection, ProjectionType, ScalarAttributeType,
    };
    use dynocsv_core::{
        ColumnPolicy, ExportConfig, ExportError, ExportRequest, QueryParams, SortCondition, export,
    };
    use dynocsv_model::DynamoDBErrorCode;

    use crate::{dynamodb_client, store_client, test_table_name};

    fn key(name: &str, key_type: KeyType) -> KeySchemaElement {
        KeySchemaElement::builder()
            .attribute_name(name)
            .key_type(key_type)
            .build()
            .unwrap()
    }

    fn definition(name: &str, attribute_type: ScalarAttributeType) -> AttributeDefinition {
        AttributeDefinition::builder()
            .attribute_name(name)
            .attribute_type(attribute_type)
            .build()
            .unwrap()
    }

    /// Helper: `Id` (S) hash, `Born` (N) range, `by-kind` index on `Kind`.
    async fn create_animals_table(client: &aws_sdk_dynamodb::Client, table_name: &str) {
        client
            .create_table()
            .table_name(table_name)
            .key_schema(key("Id", KeyType::Hash))
            .key_schema(key("Born", KeyType::Range))
            .attribute_definitions(definition("Id", ScalarAttributeType::S))
            .attribute_definitions(definition("Born", ScalarAttributeType::N))
            .attribute_definitions(definition("Kind", ScalarAttributeType::S))
            .global_secondary_indexes(
                GlobalSecondaryIndex::builder()
                    .index_name("by-kind")
                    .key_schema(key("Kind", KeyType::Hash))
                    .projection(
                        Projection::builder()
                            .projection_type(ProjectionType::All)
                            .build(),
                    )
                    .build()
                    .unwrap(),
            )
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .unwrap_or_else(|e| panic!("failed to create table {table_name}: {e}"));
    }

    async fn put_animal(
        client: &aws_sdk_dynamodb::Client,
        table_name: &str,
        id: &str,
        born: i64,
        kind: &str,
    ) {
        client
            .put_item()
            .table_name(table_name)
            .item("Id", AttributeValue::S(id.to_owned()))
            .item("Born", AttributeValue::N(born.to_string()))
            .item("Kind", AttributeValue::S(kind.to_owned()))
            .item(
                "Tags",
                AttributeValue::Ss(vec!["big".to_owned(), "grey".to_owned()]),
            )
            .send()
            .await
            .unwrap_or_else(|e| panic!("failed to put item {id}: {e}"));
    }

    async fn seeded_table(client: &aws_sdk_dynamodb::Client, prefix: &str) -> String {
        let table = test_table_name(prefix);
        create_animals_table(client, &table).await;
        put_animal(client, &table, "a", 1, "hippo").await;
        put_animal(client, &table, "a", 2, "zebra").await;
        put_animal(client, &table, "b", 3, "zebra").await;
        table
    }

    async fn delete_table(client: &aws_sdk_dynamodb::Client, table_name: &str) {
        let _ = client.delete_table().table_name(table_name).send().await;
    }

    async fn run(
        client: &aws_sdk_dynamodb::Client,
        request: &ExportRequest,
    ) -> (dynocsv_core::ExportSummary, Vec<String>) {
        let mut out = Vec::new();
        let summary = export(
            &store_client(client),
            request,
            &ExportConfig::default(),
            &mut out,
        )
        .await
        .expect("export should succeed");
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect();
        (summary, lines)
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_export_whole_table() {
        let client = dynamodb_client();
        let table = seeded_table(&client, "export-scan").await;

        let (summary, lines) = run(&client, &ExportRequest::new(table.as_str())).await;
        assert_eq!(summary.attributes, ["Id", "Born", "Kind", "Tags"]);
        assert_eq!(summary.records, 3);
        assert_eq!(lines[0], "Id,Born,Kind,Tags");
        assert_eq!(lines.len(), 4);
        assert!(lines.contains(&r#"a,1,hippo,"[big,grey]""#.to_owned()));

        delete_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_export_query_with_sort_condition() {
        let client = dynamodb_client();
        let table = seeded_table(&client, "export-query").await;

        let request = ExportRequest {
            query: Some(QueryParams::hash("a").with_sort(SortCondition::Gt("1".to_owned()))),
            columns: ColumnPolicy::Explicit(vec!["Born".to_owned(), "Kind".to_owned()]),
            ..ExportRequest::new(table.as_str())
        };
        let (summary, lines) = run(&client, &request).await;
        assert_eq!(summary.records, 1);
        assert_eq!(lines, ["Born,Kind", "2,zebra"]);

        delete_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_export_index_query() {
        let client = dynamodb_client();
        let table = seeded_table(&client, "export-index").await;

        let request = ExportRequest {
            index_name: Some("by-kind".to_owned()),
            query: Some(QueryParams::hash("zebra")),
            ..ExportRequest::new(table.as_str())
        };
        let (summary, lines) = run(&client, &request).await;
        assert_eq!(summary.attributes[..3], ["Kind", "Id", "Born"]);
        assert_eq!(summary.records, 2);
        assert_eq!(lines.len(), 3);

        delete_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_respect_limit() {
        let client = dynamodb_client();
        let table = seeded_table(&client, "export-limit").await;

        let request = ExportRequest {
            limit: Some(2),
            ..ExportRequest::new(table.as_str())
        };
        let (summary, lines) = run(&client, &request).await;
        assert_eq!(summary.records, 2);
        assert_eq!(lines.len(), 3);

        delete_table(&client, &table).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_missing_table() {
        let client = dynamodb_client();
        let request = ExportRequest::new(test_table_name("missing"));
        let err = export(
            &store_client(&client),
            &request,
            &ExportConfig::default(),
            Vec::new(),
        )
        .await
        .unwrap_err();
        match err {
            ExportError::Store(e) => assert_eq!(e.code, DynamoDBErrorCode::ResourceNotFoundException),
            other => panic!("expected store error, got {other}"),
        }
    }
}
