use crate::domain::model::{LiveSheet, OutputRecord, SourceRecord};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 平台單頁最多回傳的記錄數
pub const RECORDS_PER_PAGE: usize = 10_000;

#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn list_sheets(&self, workbook_id: &str) -> Result<Vec<LiveSheet>>;

    /// 分頁讀取記錄，頁碼從 1 開始，每頁最多 [`RECORDS_PER_PAGE`] 筆
    async fn fetch_records(&self, sheet_id: &str, page: usize) -> Result<Vec<SourceRecord>>;
}

#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn insert_records(&self, sheet_id: &str, records: Vec<OutputRecord>) -> Result<()>;
}
