use crate::config::{DedupeConfig, DedupeType, Keep};
use crate::core::filter::value_as_string;
use crate::domain::model::OutputRecord;
use std::collections::HashMap;

/// 依 dedupe 設定把重複記錄收斂；沒有設定就原樣回傳
pub fn merge_records(
    records: Vec<OutputRecord>,
    dedupe: Option<&DedupeConfig>,
) -> Vec<OutputRecord> {
    let Some(dedupe) = dedupe else {
        return records;
    };

    let on = dedupe.on.keys();

    // 依第一次出現的順序分組（複合 key 用逐欄位字串組成）
    let mut order: Vec<Vec<String>> = Vec::new();
    let mut groups: HashMap<Vec<String>, Vec<OutputRecord>> = HashMap::new();

    for record in records {
        let key = group_key(&record, on);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(record);
    }

    order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .filter_map(|members| collapse_group(members, dedupe))
        .collect()
}

fn group_key(record: &OutputRecord, on: &[String]) -> Vec<String> {
    on.iter()
        .map(|field| {
            record
                .field_value(field)
                .map(value_as_string)
                .unwrap_or_default()
        })
        .collect()
}

fn collapse_group(members: Vec<OutputRecord>, dedupe: &DedupeConfig) -> Option<OutputRecord> {
    if members.len() == 1 {
        return members.into_iter().next();
    }

    match dedupe.dedupe_type {
        DedupeType::Delete => match dedupe.keep {
            Keep::First => members.into_iter().next(),
            Keep::Last => members.into_iter().last(),
        },
        // merge：欄位做聯集，衝突欄位由 keep 決定誰贏
        DedupeType::Merge => {
            let mut merged = OutputRecord::new();
            for member in members {
                for (key, value) in member.values {
                    match dedupe.keep {
                        Keep::First => {
                            merged.values.entry(key).or_insert(value);
                        }
                        Keep::Last => {
                            merged.values.insert(key, value);
                        }
                    }
                }
            }
            Some(merged)
        }
    }
}
