use crate::utils::error::{FederationError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    pub source_workbook_name: String,
    pub federated_workbook: FederatedWorkbook,
    #[serde(default)]
    pub allow_undeclared_source_fields: bool,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederatedWorkbook {
    pub name: String,
    pub sheets: Vec<SheetSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetSpec {
    pub name: String,
    pub slug: String,
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub virtual_fields: Vec<FieldSpec>,
    /// 依 group key 排序的 unpivot 規則；非空代表此 sheet 走 unpivot 轉換
    #[serde(default)]
    pub unpivot_groups: BTreeMap<String, UnpivotGroup>,
    pub dedupe_config: Option<DedupeConfig>,
    pub filters: Option<FilterConfig>,
}

impl SheetSpec {
    pub fn is_unpivot(&self) -> bool {
        !self.unpivot_groups.is_empty()
    }

    /// 實體欄位加虛擬欄位
    pub fn all_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().chain(self.virtual_fields.iter())
    }

    /// 過濾設定，至少一個條件非空才算有
    pub fn active_filters(&self) -> Option<&FilterConfig> {
        self.filters.as_ref().filter(|f| !f.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
    pub federate_config: Option<FederateConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederateConfig {
    pub source_sheet_slug: Option<String>,
    pub source_sheet: Option<SourceSheet>,
    pub source_field_key: Option<String>,
}

impl FederateConfig {
    /// 來源 sheet slug：直接指定或取內嵌宣告的 slug
    pub fn resolved_slug(&self) -> Option<&str> {
        self.source_sheet_slug
            .as_deref()
            .or_else(|| self.source_sheet.as_ref().map(|s| s.slug.as_str()))
    }
}

/// 內嵌的來源 sheet 宣告，欄位列表可供本地驗證
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSheet {
    pub slug: String,
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Vec<SourceFieldSpec>,
}

impl SourceSheet {
    pub fn has_field(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.key == key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFieldSpec {
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpivotGroup {
    /// 規則列表：每條規則把輸出欄位對應到來源欄位 key 或 `<<文字>>` 字面值
    pub field_mappings: Vec<BTreeMap<String, String>>,
    pub source_sheet_slug: Option<String>,
    pub source_sheet: Option<SourceSheet>,
}

impl UnpivotGroup {
    pub fn resolved_slug(&self) -> Option<&str> {
        self.source_sheet_slug
            .as_deref()
            .or_else(|| self.source_sheet.as_ref().map(|s| s.slug.as_str()))
    }
}

/// `<<文字>>` 代表字面值而不是來源欄位 key
pub fn literal_value(raw: &str) -> Option<&str> {
    raw.strip_prefix("<<")?.strip_suffix(">>")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub all_fields_required: Vec<String>,
    #[serde(default)]
    pub any_fields_required: Vec<String>,
    #[serde(default)]
    pub any_fields_excluded: Vec<String>,
    #[serde(default)]
    pub field_values_required: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub field_values_excluded: HashMap<String, Vec<String>>,
}

impl FilterConfig {
    pub fn is_empty(&self) -> bool {
        self.all_fields_required.is_empty()
            && self.any_fields_required.is_empty()
            && self.any_fields_excluded.is_empty()
            && self.field_values_required.is_empty()
            && self.field_values_excluded.is_empty()
    }

    /// 所有被過濾條件引用到的欄位 key
    pub fn referenced_fields(&self) -> impl Iterator<Item = &String> {
        self.all_fields_required
            .iter()
            .chain(self.any_fields_required.iter())
            .chain(self.any_fields_excluded.iter())
            .chain(self.field_values_required.keys())
            .chain(self.field_values_excluded.keys())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeConfig {
    pub on: DedupeKey,
    #[serde(rename = "type")]
    pub dedupe_type: DedupeType,
    pub keep: Keep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DedupeKey {
    Single(String),
    Multiple(Vec<String>),
}

impl DedupeKey {
    pub fn keys(&self) -> &[String] {
        match self {
            DedupeKey::Single(key) => std::slice::from_ref(key),
            DedupeKey::Multiple(keys) => keys.as_slice(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupeType {
    Delete,
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Keep {
    First,
    Last,
}

impl FederationConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FederationError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| FederationError::ConfigError {
            component: "ConfigLoader",
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SOURCE_WORKBOOK})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 依 slug 取得 sheet 定義
    pub fn find_sheet(&self, slug: &str) -> Option<&SheetSpec> {
        self.federated_workbook
            .sheets
            .iter()
            .find(|sheet| sheet.slug == slug)
    }
}

impl Validate for FederationConfig {
    fn validate(&self) -> Result<()> {
        crate::core::validator::validate_config(self).map(|_| ())
    }
}
