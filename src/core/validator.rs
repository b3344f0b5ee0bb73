use crate::config::{
    literal_value, DedupeConfig, DedupeType, FederationConfig, FieldSpec, FilterConfig, SheetSpec,
};
use crate::utils::error::{FederationError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_unique_slug};
use std::collections::{HashMap, HashSet};

const SHEET_VALIDATOR: &str = "SheetValidator";
const FIELD_VALIDATOR: &str = "FieldValidator";
const DEDUPE_VALIDATOR: &str = "DedupeValidator";
const UNPIVOT_VALIDATOR: &str = "UnpivotValidator";
const FILTER_VALIDATOR: &str = "FilterValidator";

/// 驗證整份配置，成功時回傳所有被引用到的來源 sheet slug。
/// 遇到第一個錯誤就中斷，不做彙整回報。
pub fn validate_config(config: &FederationConfig) -> Result<HashSet<String>> {
    let sheets = &config.federated_workbook.sheets;
    if sheets.is_empty() {
        return Err(config_error(
            SHEET_VALIDATOR,
            "Federated workbook must declare at least one sheet".to_string(),
        ));
    }

    let mut seen_slugs = HashSet::new();
    let mut source_slugs = HashSet::new();
    // 各 sheet 的 merge 欄位，留給跨 sheet 檢查用
    let mut merge_fields_by_sheet: HashMap<String, Vec<String>> = HashMap::new();

    for sheet in sheets {
        validate_unique_slug(SHEET_VALIDATOR, &mut seen_slugs, &sheet.slug)?;
        validate_non_empty_string(SHEET_VALIDATOR, "sheet slug", &sheet.slug)?;

        if sheet.fields.is_empty() {
            return Err(config_error(
                SHEET_VALIDATOR,
                format!("Sheet '{}' must declare at least one field", sheet.slug),
            ));
        }

        let field_keys = validate_sheet_fields(config, sheet, &mut source_slugs)?;

        if let Some(dedupe) = &sheet.dedupe_config {
            validate_dedupe_config(sheet, dedupe, &field_keys)?;
            if dedupe.dedupe_type == DedupeType::Merge {
                merge_fields_by_sheet.insert(sheet.slug.clone(), dedupe.on.keys().to_vec());
            }
        }

        if sheet.is_unpivot() {
            validate_unpivot_groups(config, sheet, &mut source_slugs)?;
        }

        if let Some(filters) = &sheet.filters {
            validate_filters(sheet, filters, &field_keys)?;
        }
    }

    if !merge_fields_by_sheet.is_empty() {
        tracing::debug!(
            sheets = merge_fields_by_sheet.len(),
            "collected merge fields for cross-sheet checks"
        );
    }

    Ok(source_slugs)
}

/// 收集實體與虛擬欄位的 key（兩類之間也不能重複），並驗證每個欄位的來源引用
fn validate_sheet_fields(
    config: &FederationConfig,
    sheet: &SheetSpec,
    source_slugs: &mut HashSet<String>,
) -> Result<HashSet<String>> {
    let mut field_keys = HashSet::new();

    for field in &sheet.fields {
        if !field_keys.insert(field.key.clone()) {
            return Err(config_error(
                FIELD_VALIDATOR,
                format!(
                    "Sheet '{}' has duplicate real field '{}'",
                    sheet.slug, field.key
                ),
            ));
        }
        validate_field_source(config, sheet, field, source_slugs)?;
    }

    for field in &sheet.virtual_fields {
        if sheet.fields.iter().any(|real| real.key == field.key) {
            return Err(config_error(
                FIELD_VALIDATOR,
                format!(
                    "Virtual field '{}' in sheet '{}' is a collision with real field '{}'",
                    field.key, sheet.slug, field.key
                ),
            ));
        }
        if !field_keys.insert(field.key.clone()) {
            return Err(config_error(
                FIELD_VALIDATOR,
                format!(
                    "Sheet '{}' has duplicate virtual field '{}'",
                    sheet.slug, field.key
                ),
            ));
        }
        validate_field_source(config, sheet, field, source_slugs)?;
    }

    Ok(field_keys)
}

/// 來源引用的雙向檢查：有 source_field_key 就必須指定來源 sheet，反之亦然
fn validate_field_source(
    config: &FederationConfig,
    sheet: &SheetSpec,
    field: &FieldSpec,
    source_slugs: &mut HashSet<String>,
) -> Result<()> {
    let Some(federate) = &field.federate_config else {
        return Ok(());
    };

    let has_slug = federate.source_sheet_slug.is_some();
    let has_sheet = federate.source_sheet.is_some();
    let has_key = federate.source_field_key.is_some();

    if has_slug && has_sheet {
        return Err(config_error(
            FIELD_VALIDATOR,
            format!(
                "Field '{}' in sheet '{}' must have a source_sheet_slug or a source_sheet, not both",
                field.key, sheet.slug
            ),
        ));
    }

    if has_key && !has_slug && !has_sheet {
        return Err(config_error(
            FIELD_VALIDATOR,
            format!(
                "Field '{}' in sheet '{}' must have a source_sheet_slug or source_sheet when source_field_key is set",
                field.key, sheet.slug
            ),
        ));
    }

    if (has_slug || has_sheet) && !has_key {
        return Err(config_error(
            FIELD_VALIDATOR,
            format!(
                "Field '{}' in sheet '{}' must have a source_field_key when a source sheet is declared",
                field.key, sheet.slug
            ),
        ));
    }

    // 只有內嵌宣告帶欄位列表時才能在本地驗證 source_field_key；
    // slug-only 的引用要等拿到平台上的 sheet 才知道
    if !config.allow_undeclared_source_fields {
        if let (Some(source_sheet), Some(source_key)) =
            (&federate.source_sheet, federate.source_field_key.as_deref())
        {
            if !source_sheet.has_field(source_key) {
                return Err(config_error(
                    FIELD_VALIDATOR,
                    format!(
                        "Field '{}' in sheet '{}' references undeclared source field '{}' on source sheet '{}'",
                        field.key, sheet.slug, source_key, source_sheet.slug
                    ),
                ));
            }
        }
    }

    if let Some(slug) = federate.resolved_slug() {
        source_slugs.insert(slug.to_string());
    }

    Ok(())
}

/// dedupe 的 on 欄位必須存在於該 sheet（實體或虛擬皆可）
fn validate_dedupe_config(
    sheet: &SheetSpec,
    dedupe: &DedupeConfig,
    field_keys: &HashSet<String>,
) -> Result<()> {
    for key in dedupe.on.keys() {
        if !field_keys.contains(key) {
            return Err(config_error(
                DEDUPE_VALIDATOR,
                format!(
                    "Dedupe field '{}' does not exist in sheet '{}'",
                    key, sheet.slug
                ),
            ));
        }
    }
    Ok(())
}

fn validate_unpivot_groups(
    config: &FederationConfig,
    sheet: &SheetSpec,
    source_slugs: &mut HashSet<String>,
) -> Result<()> {
    // unpivot 的輸出欄位只能對到實體欄位
    let real_keys: HashSet<&str> = sheet.fields.iter().map(|f| f.key.as_str()).collect();

    for (group_key, group) in &sheet.unpivot_groups {
        if !group.field_mappings.iter().any(|rule| !rule.is_empty()) {
            return Err(config_error(
                UNPIVOT_VALIDATOR,
                format!(
                    "Unpivot group '{}' in sheet '{}' must declare at least one non-empty field mapping",
                    group_key, sheet.slug
                ),
            ));
        }

        let has_slug = group.source_sheet_slug.is_some();
        let has_sheet = group.source_sheet.is_some();

        if has_slug && has_sheet {
            return Err(config_error(
                UNPIVOT_VALIDATOR,
                format!(
                    "Unpivot group '{}' in sheet '{}' must have a source_sheet_slug or a source_sheet, not both",
                    group_key, sheet.slug
                ),
            ));
        }
        if !has_slug && !has_sheet {
            return Err(config_error(
                UNPIVOT_VALIDATOR,
                format!(
                    "Unpivot group '{}' in sheet '{}' must have a source_sheet_slug or source_sheet",
                    group_key, sheet.slug
                ),
            ));
        }

        for rule in &group.field_mappings {
            for (target_column, rule_value) in rule {
                if !real_keys.contains(target_column.as_str()) {
                    return Err(config_error(
                        UNPIVOT_VALIDATOR,
                        format!(
                            "Unpivot group '{}' in sheet '{}' references unknown target column '{}'",
                            group_key, sheet.slug, target_column
                        ),
                    ));
                }

                // 字面值不用查來源欄位；slug-only 的引用在本地也查不到，略過
                if literal_value(rule_value).is_none() && !config.allow_undeclared_source_fields {
                    if let Some(source_sheet) = &group.source_sheet {
                        if !source_sheet.has_field(rule_value) {
                            return Err(config_error(
                                UNPIVOT_VALIDATOR,
                                format!(
                                    "Unpivot group '{}' in sheet '{}' references undeclared source field '{}' on source sheet '{}'",
                                    group_key, sheet.slug, rule_value, source_sheet.slug
                                ),
                            ));
                        }
                    }
                }
            }
        }

        if let Some(slug) = group.resolved_slug() {
            source_slugs.insert(slug.to_string());
        }
    }

    Ok(())
}

/// 過濾條件引用到的欄位必須存在（實體或虛擬皆可）
fn validate_filters(
    sheet: &SheetSpec,
    filters: &FilterConfig,
    field_keys: &HashSet<String>,
) -> Result<()> {
    for field in filters.referenced_fields() {
        if !field_keys.contains(field) {
            return Err(config_error(
                FILTER_VALIDATOR,
                format!(
                    "Filter references unknown field '{}' in sheet '{}'",
                    field, sheet.slug
                ),
            ));
        }
    }
    Ok(())
}

fn config_error(component: &'static str, message: String) -> FederationError {
    FederationError::ConfigError { component, message }
}
