use crate::config::FilterConfig;
use crate::domain::model::OutputRecord;

/// 欄位值轉字串做比對：字串不帶引號，其他型別用 JSON 表示法
pub(crate) fn value_as_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 一筆記錄要全部條件都通過才保留
pub fn should_include_record(record: &OutputRecord, filters: &FilterConfig) -> bool {
    if filters.is_empty() {
        return true;
    }

    // 1. 列出的欄位全部要存在且非 null
    for field in &filters.all_fields_required {
        if record.field_value(field).is_none() {
            return false;
        }
    }

    // 2. 列出的欄位至少一個存在
    if !filters.any_fields_required.is_empty()
        && !filters
            .any_fields_required
            .iter()
            .any(|field| record.field_value(field).is_some())
    {
        return false;
    }

    // 3. 列出的欄位任何一個存在就淘汰
    if filters
        .any_fields_excluded
        .iter()
        .any(|field| record.field_value(field).is_some())
    {
        return false;
    }

    // 4. 欄位值必須落在允許清單內
    for (field, allowed) in &filters.field_values_required {
        match record.field_value(field) {
            Some(value) => {
                if !allowed.contains(&value_as_string(value)) {
                    return false;
                }
            }
            None => return false,
        }
    }

    // 5. 欄位值落在排除清單就淘汰；欄位不存在不算失敗
    for (field, disallowed) in &filters.field_values_excluded {
        if let Some(value) = record.field_value(field) {
            if disallowed.contains(&value_as_string(value)) {
                return false;
            }
        }
    }

    true
}

/// 沒有過濾設定就原樣回傳，有就逐筆套用並保持順序
pub fn filter_records(
    records: Vec<OutputRecord>,
    filters: Option<&FilterConfig>,
) -> Vec<OutputRecord> {
    match filters {
        Some(filters) if !filters.is_empty() => records
            .into_iter()
            .filter(|record| should_include_record(record, filters))
            .collect(),
        _ => records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::FieldValue;
    use std::collections::HashMap;

    fn record(fields: &[(&str, serde_json::Value)]) -> OutputRecord {
        let mut record = OutputRecord::new();
        for (key, value) in fields {
            record.insert(key.to_string(), FieldValue::new(value.clone()));
        }
        record
    }

    #[test]
    fn test_empty_filter_includes_everything() {
        let filters = FilterConfig::default();
        assert!(should_include_record(&record(&[]), &filters));
    }

    #[test]
    fn test_all_fields_required() {
        let filters = FilterConfig {
            all_fields_required: vec!["total".to_string()],
            ..Default::default()
        };

        assert!(should_include_record(
            &record(&[("total", serde_json::json!(100))]),
            &filters
        ));
        assert!(!should_include_record(&record(&[]), &filters));
        // null 視同不存在
        assert!(!should_include_record(
            &record(&[("total", serde_json::Value::Null)]),
            &filters
        ));
    }

    #[test]
    fn test_any_fields_required() {
        let filters = FilterConfig {
            any_fields_required: vec!["email".to_string(), "phone".to_string()],
            ..Default::default()
        };

        assert!(should_include_record(
            &record(&[("phone", serde_json::json!("555-0100"))]),
            &filters
        ));
        assert!(!should_include_record(
            &record(&[("name", serde_json::json!("Alice"))]),
            &filters
        ));
    }

    #[test]
    fn test_any_fields_excluded() {
        let filters = FilterConfig {
            any_fields_excluded: vec!["deleted_at".to_string()],
            ..Default::default()
        };

        assert!(should_include_record(
            &record(&[("name", serde_json::json!("Alice"))]),
            &filters
        ));
        assert!(!should_include_record(
            &record(&[("deleted_at", serde_json::json!("2024-01-01"))]),
            &filters
        ));
    }

    #[test]
    fn test_field_values_required_preserves_order() {
        let filters = FilterConfig {
            field_values_required: HashMap::from([(
                "status".to_string(),
                vec!["active".to_string()],
            )]),
            ..Default::default()
        };

        let records = vec![
            record(&[("id", serde_json::json!(1)), ("status", serde_json::json!("active"))]),
            record(&[("id", serde_json::json!(2)), ("status", serde_json::json!("inactive"))]),
            record(&[("id", serde_json::json!(3)), ("status", serde_json::json!("active"))]),
        ];

        let filtered = filter_records(records, Some(&filters));

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].field_value("id"), Some(&serde_json::json!(1)));
        assert_eq!(filtered[1].field_value("id"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn test_field_values_excluded_skips_absent_fields() {
        let filters = FilterConfig {
            field_values_excluded: HashMap::from([(
                "status".to_string(),
                vec!["archived".to_string()],
            )]),
            ..Default::default()
        };

        // 欄位不存在不算失敗
        assert!(should_include_record(&record(&[]), &filters));
        assert!(!should_include_record(
            &record(&[("status", serde_json::json!("archived"))]),
            &filters
        ));
    }

    #[test]
    fn test_numeric_values_compare_stringified() {
        let filters = FilterConfig {
            field_values_required: HashMap::from([(
                "count".to_string(),
                vec!["3".to_string()],
            )]),
            ..Default::default()
        };

        assert!(should_include_record(
            &record(&[("count", serde_json::json!(3))]),
            &filters
        ));
        assert!(!should_include_record(
            &record(&[("count", serde_json::json!(4))]),
            &filters
        ));
    }

    #[test]
    fn test_filter_records_without_config_is_identity() {
        let records = vec![record(&[("a", serde_json::json!(1))])];
        let filtered = filter_records(records.clone(), None);
        assert_eq!(filtered, records);
    }
}
