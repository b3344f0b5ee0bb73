use crate::config::FederationConfig;
use crate::core::manager::FederationManager;
use crate::domain::model::LiveSheet;
use crate::domain::ports::{RecordSink, SheetSource, RECORDS_PER_PAGE};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// 一次聯邦轉換的執行摘要
#[derive(Debug, Clone)]
pub struct FederationSummary {
    pub records_read: usize,
    pub records_written: usize,
    pub sheets_written: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// 驅動一次完整的聯邦轉換：建對應表、分頁讀來源、收斂並寫回。
/// 所有對 manager 的呼叫都在這裡序列化。
pub struct FederationRunner<S: SheetSource, K: RecordSink> {
    source: S,
    sink: K,
}

impl<S: SheetSource, K: RecordSink> FederationRunner<S, K> {
    pub fn new(source: S, sink: K) -> Self {
        Self { source, sink }
    }

    pub async fn run(
        &self,
        config: FederationConfig,
        source_workbook_id: &str,
        federated_workbook_id: &str,
    ) -> Result<FederationSummary> {
        let started_at = Utc::now();

        tracing::info!("🚀 Starting federation run");
        let mut manager = FederationManager::new(config)?;

        // 目標 workbook 的實際 sheet，依 slug 對回配置
        let target_sheets = self.source.list_sheets(federated_workbook_id).await?;
        let live_by_slug: HashMap<&str, &LiveSheet> = target_sheets
            .iter()
            .map(|sheet| (sheet.slug.as_str(), sheet))
            .collect();

        let specs = manager.config().federated_workbook.sheets.clone();
        for spec in &specs {
            match live_by_slug.get(spec.slug.as_str()) {
                Some(live) => manager.create_mappings(spec, live),
                None => {
                    tracing::warn!(
                        "🔶 No live sheet found for '{}' in federated workbook, skipping",
                        spec.slug
                    );
                }
            }
        }

        // 逐頁讀取每個被引用到的來源 sheet
        let source_sheets = self.source.list_sheets(source_workbook_id).await?;
        let mut records_read = 0usize;

        for sheet in &source_sheets {
            if !manager.has_source_sheet(&sheet.slug) {
                tracing::debug!("Source sheet '{}' is not referenced, skipping", sheet.slug);
                continue;
            }

            let mut page = 1;
            loop {
                let batch = self.source.fetch_records(&sheet.id, page).await?;
                if batch.is_empty() {
                    break;
                }
                records_read += batch.len();
                manager.add_records(&sheet.slug, &batch);

                // 不足一整頁代表已經到底
                if batch.len() < RECORDS_PER_PAGE {
                    break;
                }
                page += 1;
            }
            tracing::info!("📥 Ingested source sheet '{}'", sheet.slug);
        }

        // 寫回非空的結果
        let mut records_written = 0usize;
        let mut sheets_written = 0usize;
        for (sheet_id, records) in manager.get_records() {
            if records.is_empty() {
                continue;
            }
            records_written += records.len();
            sheets_written += 1;
            tracing::info!("💾 Writing {} records to sheet {}", records.len(), sheet_id);
            self.sink.insert_records(&sheet_id, records).await?;
        }

        let finished_at = Utc::now();
        tracing::info!(
            "✅ Federation run complete: {} records read, {} written across {} sheets",
            records_read,
            records_written,
            sheets_written
        );

        Ok(FederationSummary {
            records_read,
            records_written,
            sheets_written,
            started_at,
            finished_at,
        })
    }
}
