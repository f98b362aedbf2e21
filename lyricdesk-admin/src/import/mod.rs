//! Bulk song import
//!
//! CSV or JSON input → raw records → normalized songs → duplicate filter →
//! batch insert with row-by-row fallback.

pub mod dedup;
pub mod importer;
pub mod normalize;
pub mod source;
pub mod tokenizer;

pub use dedup::{DuplicateDetector, DUPLICATE_REASON, SIBLING_DUPLICATE_REASON};
pub use importer::{
    BatchImporter, ImportOptions, ImportOutcome, ImportTarget, RecordError, RecordSkip,
};
pub use normalize::{normalize, NormalizeContext, ValidationError};
pub use source::{
    records_from_csv, records_from_file, records_from_json_text, records_from_payload,
    CsvRecord, FileFormat, RawRecord, RequestError,
};
