use crate::config::literal_value;
use crate::core::mapping::{FieldMapping, SourceMapping, UnpivotMapping};
use crate::domain::model::{FieldValue, OutputRecord};
use std::collections::HashMap;

/// 把一筆來源記錄套上編譯後的對應，產出零到多筆目標記錄
pub fn process_record(
    values: &HashMap<String, FieldValue>,
    source_slug: &str,
    mapping: &SourceMapping,
) -> Vec<OutputRecord> {
    match mapping {
        SourceMapping::Field(field_mapping) => {
            process_field_mapping(values, source_slug, field_mapping)
        }
        SourceMapping::Unpivot(unpivot_mapping) => {
            process_unpivot_mapping(values, source_slug, unpivot_mapping)
        }
    }
}

fn process_field_mapping(
    values: &HashMap<String, FieldValue>,
    source_slug: &str,
    mapping: &FieldMapping,
) -> Vec<OutputRecord> {
    let mut record = OutputRecord::new();

    for (source_key, target_key) in &mapping.fields {
        // 來源欄位存在且非 null 才複製，整個 {value} 包裝一起搬
        if let Some(value) = values.get(source_key).filter(|v| v.is_present()) {
            record.insert(target_key.clone(), value.clone());
        }
    }

    // 一個欄位都沒產出就不要留下空白列
    if record.is_empty() {
        tracing::debug!(
            slug = %source_slug,
            sheet = %mapping.sheet_slug,
            "record produced no mapped values"
        );
        return Vec::new();
    }

    vec![record]
}

fn process_unpivot_mapping(
    values: &HashMap<String, FieldValue>,
    source_slug: &str,
    mapping: &UnpivotMapping,
) -> Vec<OutputRecord> {
    let mut records = Vec::new();

    for (group_key, group) in &mapping.groups {
        // 每條規則展開成一列
        for rule in &group.field_mappings {
            let mut record = OutputRecord::new();

            for (target_column, rule_value) in rule {
                if let Some(text) = literal_value(rule_value) {
                    record.insert(target_column.clone(), FieldValue::new(text));
                } else if let Some(value) = values.get(rule_value).filter(|v| v.is_present()) {
                    record.insert(target_column.clone(), value.clone());
                }
                // 缺值的欄位直接跳過
            }

            if record.is_empty() {
                tracing::debug!(
                    slug = %source_slug,
                    group = %group_key,
                    "unpivot rule produced no values, dropping row"
                );
                continue;
            }

            // 虛擬欄位複製到展開後的每一列
            for (source_key, virtual_key) in &mapping.virtual_fields {
                if let Some(value) = values.get(source_key).filter(|v| v.is_present()) {
                    record.insert(virtual_key.clone(), value.clone());
                }
            }

            records.push(record);
        }
    }

    records
}
