use crate::config::{DedupeConfig, FederationConfig, FilterConfig, SheetSpec};
use crate::core::mapping::{FieldMapping, SourceMapping, UnpivotMapping};
use crate::core::{filter, merge, transformer, validator};
use crate::domain::model::{LiveSheet, OutputRecord, SourceRecord};
use crate::utils::error::Result;
use std::collections::{HashMap, HashSet};

/// 聯邦轉換的協調者：持有一份驗證過的配置，
/// 編譯各來源 sheet 的對應表、累積轉換結果，最後一次收斂輸出。
/// 生命週期綁定單一工作執行，不支援多執行緒同時使用。
#[derive(Debug)]
pub struct FederationManager {
    config: FederationConfig,
    /// 目標 sheet id -> 累積中的輸出記錄
    records_by_sheet_id: HashMap<String, Vec<OutputRecord>>,
    /// 來源 sheet slug -> 編譯後的對應表（一個來源可以餵多個目標）
    source_mappings: HashMap<String, Vec<SourceMapping>>,
    dedupe_configs: HashMap<String, DedupeConfig>,
    sheet_filters: HashMap<String, FilterConfig>,
    /// 目標 sheet id -> 最後要移除的虛擬欄位 key
    virtual_field_keys: HashMap<String, HashSet<String>>,
}

impl FederationManager {
    /// 建構時就跑完整驗證，配置不合法直接失敗
    pub fn new(config: FederationConfig) -> Result<Self> {
        let source_slugs = validator::validate_config(&config)?;

        let source_mappings = source_slugs
            .into_iter()
            .map(|slug| (slug, Vec::new()))
            .collect();

        Ok(Self {
            config,
            records_by_sheet_id: HashMap::new(),
            source_mappings,
            dedupe_configs: HashMap::new(),
            sheet_filters: HashMap::new(),
            virtual_field_keys: HashMap::new(),
        })
    }

    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    pub fn has_source_sheet(&self, slug: &str) -> bool {
        self.source_mappings.contains_key(slug)
    }

    /// 為一個目標 sheet 編譯對應表。每個目標 sheet 在 add_records 之前呼叫一次。
    pub fn create_mappings(&mut self, spec: &SheetSpec, live_sheet: &LiveSheet) {
        self.records_by_sheet_id
            .insert(live_sheet.id.clone(), Vec::new());

        if let Some(dedupe) = &spec.dedupe_config {
            self.dedupe_configs
                .insert(live_sheet.id.clone(), dedupe.clone());
        }

        // 沒有任何條件的過濾設定不存，讓 finalize 走快路徑
        if let Some(filters) = spec.active_filters() {
            self.sheet_filters
                .insert(live_sheet.id.clone(), filters.clone());
        }

        let virtual_keys: HashSet<String> = spec
            .virtual_fields
            .iter()
            .map(|field| field.key.clone())
            .collect();
        self.virtual_field_keys
            .insert(live_sheet.id.clone(), virtual_keys);

        // 每個來源 slug 的虛擬欄位對應（source_field_key -> virtual key），
        // unpivot 展開時要蓋到每一列上
        let mut virtual_maps: HashMap<String, HashMap<String, String>> = HashMap::new();
        for field in &spec.virtual_fields {
            if let Some(federate) = &field.federate_config {
                if let (Some(slug), Some(source_key)) =
                    (federate.resolved_slug(), federate.source_field_key.as_deref())
                {
                    virtual_maps
                        .entry(slug.to_string())
                        .or_default()
                        .insert(source_key.to_string(), field.key.clone());
                }
            }
        }

        if spec.is_unpivot() {
            self.create_unpivot_mappings(spec, live_sheet, &virtual_maps);
        } else {
            self.create_field_mappings(spec, live_sheet);
        }
    }

    /// 標準 sheet：實體加虛擬欄位依來源 slug 分組成改名表
    fn create_field_mappings(&mut self, spec: &SheetSpec, live_sheet: &LiveSheet) {
        let mut fields_by_slug: HashMap<String, HashMap<String, String>> = HashMap::new();

        for field in spec.all_fields() {
            let Some(federate) = &field.federate_config else {
                continue;
            };
            match (federate.resolved_slug(), federate.source_field_key.as_deref()) {
                (Some(slug), Some(source_key)) => {
                    fields_by_slug
                        .entry(slug.to_string())
                        .or_default()
                        .insert(source_key.to_string(), field.key.clone());
                }
                _ => {
                    // 缺一半的引用略過就好，真正的錯誤在驗證階段已經擋掉
                    if self.config.debug {
                        tracing::warn!(
                            sheet = %spec.slug,
                            field = %field.key,
                            "incomplete federate config, skipping field"
                        );
                    }
                }
            }
        }

        for (slug, fields) in fields_by_slug {
            let mapping = SourceMapping::Field(FieldMapping {
                sheet_id: live_sheet.id.clone(),
                sheet_slug: spec.slug.clone(),
                fields,
            });
            self.source_mappings.entry(slug).or_default().push(mapping);
        }
    }

    /// unpivot sheet：規則依來源 slug 分組，各自帶上該 slug 的虛擬欄位表
    fn create_unpivot_mappings(
        &mut self,
        spec: &SheetSpec,
        live_sheet: &LiveSheet,
        virtual_maps: &HashMap<String, HashMap<String, String>>,
    ) {
        let mut groups_by_slug: HashMap<String, Vec<_>> = HashMap::new();

        for (group_key, group) in &spec.unpivot_groups {
            match group.resolved_slug() {
                Some(slug) => {
                    groups_by_slug
                        .entry(slug.to_string())
                        .or_default()
                        .push((group_key.clone(), group.clone()));
                }
                None => {
                    if self.config.debug {
                        tracing::warn!(
                            sheet = %spec.slug,
                            group = %group_key,
                            "unpivot group has no resolvable source sheet, skipping"
                        );
                    }
                }
            }
        }

        for (slug, groups) in groups_by_slug {
            let virtual_fields = virtual_maps.get(&slug).cloned().unwrap_or_default();
            let mapping = SourceMapping::Unpivot(UnpivotMapping {
                sheet_id: live_sheet.id.clone(),
                sheet_slug: spec.slug.clone(),
                groups,
                virtual_fields,
            });
            self.source_mappings.entry(slug).or_default().push(mapping);
        }
    }

    /// 串流累積：外部分頁器每拿到一批記錄就丟進來。
    /// 不認識的 slug 或空批次都當 no-op。
    pub fn add_records(&mut self, source_slug: &str, records: &[SourceRecord]) {
        if records.is_empty() {
            return;
        }
        let Some(mappings) = self.source_mappings.get(source_slug) else {
            tracing::debug!(
                slug = %source_slug,
                "no mappings registered for source sheet, ignoring batch"
            );
            return;
        };

        // 先收集再寫回，避免同時借用對應表和累積區
        let mut produced: Vec<(String, Vec<OutputRecord>)> = Vec::new();
        for mapping in mappings {
            let mut outputs = Vec::new();
            for record in records {
                outputs.extend(transformer::process_record(
                    &record.values,
                    source_slug,
                    mapping,
                ));
            }
            if outputs.is_empty() && self.config.debug {
                tracing::debug!(
                    slug = %source_slug,
                    sheet = %mapping.sheet_slug(),
                    "batch produced no output records"
                );
            }
            produced.push((mapping.sheet_id().to_string(), outputs));
        }

        for (sheet_id, outputs) in produced {
            self.records_by_sheet_id
                .entry(sheet_id)
                .or_default()
                .extend(outputs);
        }
    }

    /// 收斂輸出：每個目標 sheet 依序做合併、過濾、移除虛擬欄位。
    /// 順序是刻意的——合併與過濾可能依賴虛擬欄位，但虛擬欄位不能漏到結果裡。
    pub fn get_records(&self) -> HashMap<String, Vec<OutputRecord>> {
        let mut finalized = HashMap::new();

        for (sheet_id, records) in &self.records_by_sheet_id {
            if records.is_empty() {
                finalized.insert(sheet_id.clone(), Vec::new());
                continue;
            }

            let merged = merge::merge_records(records.clone(), self.dedupe_configs.get(sheet_id));
            let filtered = filter::filter_records(merged, self.sheet_filters.get(sheet_id));
            let stripped = self.strip_virtual_fields(sheet_id, filtered);

            finalized.insert(sheet_id.clone(), stripped);
        }

        finalized
    }

    fn strip_virtual_fields(
        &self,
        sheet_id: &str,
        records: Vec<OutputRecord>,
    ) -> Vec<OutputRecord> {
        let Some(virtual_keys) = self.virtual_field_keys.get(sheet_id) else {
            return records;
        };
        if virtual_keys.is_empty() {
            return records;
        }

        records
            .into_iter()
            .map(|mut record| {
                for key in virtual_keys {
                    record.remove(key);
                }
                record
            })
            .collect()
    }

    /// 由目標 sheet id 反查配置裡的 sheet 定義，找不到回傳 None，不會失敗
    pub fn find_blueprint(&self, sheet_id: &str) -> Option<&SheetSpec> {
        let slug = self
            .source_mappings
            .values()
            .flatten()
            .find(|mapping| mapping.sheet_id() == sheet_id)
            .map(|mapping| mapping.sheet_slug())?;

        self.config.find_sheet(slug)
    }

    /// 清掉累積與衍生狀態，保留已知的來源 slug，同一個 manager 可以重跑
    pub fn clear_mappings(&mut self) {
        self.records_by_sheet_id.clear();
        self.dedupe_configs.clear();
        self.sheet_filters.clear();
        self.virtual_field_keys.clear();
        for mappings in self.source_mappings.values_mut() {
            mappings.clear();
        }
    }
}
