pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::FederationConfig;
pub use core::{FederationManager, FederationRunner, FederationSummary};
pub use domain::model::{FieldValue, LiveField, LiveSheet, OutputRecord, SourceRecord};
pub use domain::ports::{RecordSink, SheetSource, RECORDS_PER_PAGE};
pub use utils::error::{FederationError, Result};
