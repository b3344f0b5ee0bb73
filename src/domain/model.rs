use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 平台的欄位值包裝：每個儲存格都是 `{ "value": ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: serde_json::Value,
}

impl FieldValue {
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// 值存在且非 null 才算有效
    pub fn is_present(&self) -> bool {
        !self.value.is_null()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: String,
    pub values: HashMap<String, FieldValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub values: HashMap<String, FieldValue>,
}

impl OutputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 取出存在且非 null 的欄位值
    pub fn field_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.values
            .get(key)
            .filter(|v| v.is_present())
            .map(|v| &v.value)
    }
}

/// 平台上實際存在的 sheet（由 SheetSource 列出）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveSheet {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub fields: Vec<LiveField>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveField {
    pub key: String,
    pub label: Option<String>,
}
