pub mod federation;

pub use federation::{
    literal_value, DedupeConfig, DedupeKey, DedupeType, FederateConfig, FederatedWorkbook,
    FederationConfig, FieldSpec, FilterConfig, Keep, SheetSpec, SourceFieldSpec, SourceSheet,
    UnpivotGroup,
};
