use anyhow::Result;
use async_trait::async_trait;
use sheet_federation::config::FederationConfig;
use sheet_federation::{
    FederationRunner, FieldValue, LiveField, LiveSheet, OutputRecord, RecordSink, SheetSource,
    SourceRecord, RECORDS_PER_PAGE,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default, Clone)]
struct MockPlatform {
    sheets_by_workbook: HashMap<String, Vec<LiveSheet>>,
    records_by_sheet: HashMap<String, Vec<SourceRecord>>,
}

impl MockPlatform {
    fn with_sheets(mut self, workbook_id: &str, sheets: Vec<LiveSheet>) -> Self {
        self.sheets_by_workbook
            .insert(workbook_id.to_string(), sheets);
        self
    }

    fn with_records(mut self, sheet_id: &str, records: Vec<SourceRecord>) -> Self {
        self.records_by_sheet
            .insert(sheet_id.to_string(), records);
        self
    }
}

#[async_trait]
impl SheetSource for MockPlatform {
    async fn list_sheets(&self, workbook_id: &str) -> sheet_federation::Result<Vec<LiveSheet>> {
        Ok(self
            .sheets_by_workbook
            .get(workbook_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_records(
        &self,
        sheet_id: &str,
        page: usize,
    ) -> sheet_federation::Result<Vec<SourceRecord>> {
        let records = self
            .records_by_sheet
            .get(sheet_id)
            .cloned()
            .unwrap_or_default();

        let start = (page - 1) * RECORDS_PER_PAGE;
        let end = (start + RECORDS_PER_PAGE).min(records.len());
        if start >= records.len() {
            return Ok(Vec::new());
        }
        Ok(records[start..end].to_vec())
    }
}

#[derive(Default, Clone)]
struct MockSink {
    written: Arc<Mutex<HashMap<String, Vec<OutputRecord>>>>,
}

impl MockSink {
    async fn records_for(&self, sheet_id: &str) -> Option<Vec<OutputRecord>> {
        let written = self.written.lock().await;
        written.get(sheet_id).cloned()
    }
}

#[async_trait]
impl RecordSink for MockSink {
    async fn insert_records(
        &self,
        sheet_id: &str,
        records: Vec<OutputRecord>,
    ) -> sheet_federation::Result<()> {
        let mut written = self.written.lock().await;
        written
            .entry(sheet_id.to_string())
            .or_default()
            .extend(records);
        Ok(())
    }
}

fn live_sheet(id: &str, slug: &str, field_keys: &[&str]) -> LiveSheet {
    LiveSheet {
        id: id.to_string(),
        slug: slug.to_string(),
        name: slug.to_string(),
        fields: field_keys
            .iter()
            .map(|key| LiveField {
                key: key.to_string(),
                label: None,
            })
            .collect(),
    }
}

fn source_record(id: &str, values: &[(&str, serde_json::Value)]) -> SourceRecord {
    SourceRecord {
        id: id.to_string(),
        values: values
            .iter()
            .map(|(key, value)| (key.to_string(), FieldValue::new(value.clone())))
            .collect(),
    }
}

fn orders_config() -> FederationConfig {
    FederationConfig::from_toml_str(
        r#"
source_workbook_name = "Primary"

[federated_workbook]
name = "Federated"

[[federated_workbook.sheets]]
name = "Order Summary"
slug = "order_summary"

[[federated_workbook.sheets.fields]]
key = "total"

[federated_workbook.sheets.fields.federate_config]
source_sheet_slug = "orders"
source_field_key = "amount"

[federated_workbook.sheets.filters]
all_fields_required = ["total"]
"#,
    )
    .unwrap()
}

/// 完整跑一輪：列 sheet、建對應、讀記錄、寫回
#[tokio::test]
async fn test_runner_end_to_end() -> Result<()> {
    let source = MockPlatform::default()
        .with_sheets(
            "wb_source",
            vec![
                live_sheet("src_orders", "orders", &["amount", "status"]),
                live_sheet("src_noise", "noise", &["whatever"]),
            ],
        )
        .with_sheets(
            "wb_federated",
            vec![live_sheet("fed_orders", "order_summary", &["total"])],
        )
        .with_records(
            "src_orders",
            vec![
                source_record(
                    "r1",
                    &[
                        ("amount", serde_json::json!(100)),
                        ("status", serde_json::json!("ok")),
                    ],
                ),
                // amount 缺值的記錄會被 all_fields_required 擋下來
                source_record("r2", &[("status", serde_json::json!("ok"))]),
            ],
        );

    let sink = MockSink::default();
    let runner = FederationRunner::new(source, sink.clone());

    let summary = runner
        .run(orders_config(), "wb_source", "wb_federated")
        .await?;

    assert_eq!(summary.records_read, 2);
    assert_eq!(summary.records_written, 1);
    assert_eq!(summary.sheets_written, 1);
    assert!(summary.finished_at >= summary.started_at);

    let written = sink.records_for("fed_orders").await.unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(
        written[0].field_value("total"),
        Some(&serde_json::json!(100))
    );

    println!("✅ runner end-to-end test passed!");
    Ok(())
}

/// 超過一頁的來源 sheet 要分頁讀完
#[tokio::test]
async fn test_runner_paginates_large_sheets() -> Result<()> {
    let total_records = RECORDS_PER_PAGE + 5;
    let records: Vec<SourceRecord> = (0..total_records)
        .map(|i| {
            source_record(
                &format!("r{}", i),
                &[("amount", serde_json::json!(i as i64))],
            )
        })
        .collect();

    let source = MockPlatform::default()
        .with_sheets(
            "wb_source",
            vec![live_sheet("src_orders", "orders", &["amount"])],
        )
        .with_sheets(
            "wb_federated",
            vec![live_sheet("fed_orders", "order_summary", &["total"])],
        )
        .with_records("src_orders", records);

    let sink = MockSink::default();
    let runner = FederationRunner::new(source, sink.clone());

    let summary = runner
        .run(orders_config(), "wb_source", "wb_federated")
        .await?;

    assert_eq!(summary.records_read, total_records);
    assert_eq!(summary.records_written, total_records);

    let written = sink.records_for("fed_orders").await.unwrap();
    assert_eq!(written.len(), total_records);
    // 分頁邊界不能打亂順序
    assert_eq!(
        written[RECORDS_PER_PAGE].field_value("total"),
        Some(&serde_json::json!(RECORDS_PER_PAGE as i64))
    );

    Ok(())
}

/// 配置有 sheet 但平台上找不到對應 live sheet 時要跳過，不能失敗
#[tokio::test]
async fn test_runner_skips_specs_without_live_sheet() -> Result<()> {
    let source = MockPlatform::default()
        .with_sheets(
            "wb_source",
            vec![live_sheet("src_orders", "orders", &["amount"])],
        )
        // federated workbook 是空的
        .with_sheets("wb_federated", vec![])
        .with_records(
            "src_orders",
            vec![source_record("r1", &[("amount", serde_json::json!(1))])],
        );

    let sink = MockSink::default();
    let runner = FederationRunner::new(source, sink.clone());

    let summary = runner
        .run(orders_config(), "wb_source", "wb_federated")
        .await?;

    // 沒有對應表可以餵，結果就是什麼都沒寫
    assert_eq!(summary.records_written, 0);
    assert_eq!(summary.sheets_written, 0);
    assert!(sink.records_for("fed_orders").await.is_none());

    Ok(())
}

/// 配置錯誤要直接讓整個 run 失敗
#[tokio::test]
async fn test_runner_fails_on_invalid_config() -> Result<()> {
    let config = FederationConfig::from_toml_str(
        r#"
source_workbook_name = "Primary"

[federated_workbook]
name = "Federated"
sheets = []
"#,
    )
    .unwrap();

    let runner = FederationRunner::new(MockPlatform::default(), MockSink::default());
    let err = runner.run(config, "wb_source", "wb_federated").await;

    assert!(err.is_err());
    assert!(err
        .unwrap_err()
        .to_string()
        .contains("at least one sheet"));

    Ok(())
}
