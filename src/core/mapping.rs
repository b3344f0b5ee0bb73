use crate::config::UnpivotGroup;
use std::collections::HashMap;

/// 編譯後的來源對應：一個來源 sheet 餵進一個目標 sheet
#[derive(Debug, Clone)]
pub enum SourceMapping {
    Field(FieldMapping),
    Unpivot(UnpivotMapping),
}

impl SourceMapping {
    /// 目標 sheet 的平台 id
    pub fn sheet_id(&self) -> &str {
        match self {
            SourceMapping::Field(mapping) => &mapping.sheet_id,
            SourceMapping::Unpivot(mapping) => &mapping.sheet_id,
        }
    }

    /// 目標 sheet 在配置裡的 slug
    pub fn sheet_slug(&self) -> &str {
        match self {
            SourceMapping::Field(mapping) => &mapping.sheet_slug,
            SourceMapping::Unpivot(mapping) => &mapping.sheet_slug,
        }
    }
}

/// 欄位改名表：source_field_key -> target_field_key
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub sheet_id: String,
    pub sheet_slug: String,
    pub fields: HashMap<String, String>,
}

/// 同一個來源 slug 底下的 unpivot 規則，外加虛擬欄位表
#[derive(Debug, Clone)]
pub struct UnpivotMapping {
    pub sheet_id: String,
    pub sheet_slug: String,
    pub groups: Vec<(String, UnpivotGroup)>,
    /// source_field_key -> virtual field key，展開後蓋到每一列上
    pub virtual_fields: HashMap<String, String>,
}
