pub mod model;
pub mod ports;

pub use model::{FieldValue, LiveField, LiveSheet, OutputRecord, SourceRecord};
pub use ports::{RecordSink, SheetSource, RECORDS_PER_PAGE};
