//! Raw import records
//!
//! Turns an uploaded file (or a `bulk_insert` payload) into the ordered list
//! of raw records the importer works on. The position of a record in that
//! list is its original index for outcome reporting.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use super::tokenizer::parse_csv;

/// Malformed top-level request; aborts the whole import
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Missing data array")]
    MissingData,

    #[error("CSV file is empty or missing headers")]
    EmptyCsv,

    #[error("No songs found in JSON")]
    NoSongsInJson,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Unsupported import format: {0}")]
    UnsupportedFormat(String),
}

/// One CSV data row keyed by lower-cased header name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvRecord {
    fields: HashMap<String, String>,
}

impl CsvRecord {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim().to_lowercase(), v.into()))
                .collect(),
        }
    }

    /// Value under `header`; empty when the column is absent
    pub fn get(&self, header: &str) -> &str {
        self.fields.get(header).map(String::as_str).unwrap_or("")
    }
}

/// A record as it arrived, before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    Json(Value),
    Csv(CsvRecord),
}

impl RawRecord {
    pub fn is_csv(&self) -> bool {
        matches!(self, RawRecord::Csv(_))
    }
}

/// Import file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        ext.parse().ok()
    }

    /// Guess the format from a `Content-Type` value
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
        match mime.as_str() {
            "text/csv" | "application/csv" => Some(FileFormat::Csv),
            "application/json" | "text/json" => Some(FileFormat::Json),
            _ => None,
        }
    }
}

impl FromStr for FileFormat {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "json" => Ok(FileFormat::Json),
            other => Err(RequestError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => f.write_str("csv"),
            FileFormat::Json => f.write_str("json"),
        }
    }
}

/// Parse file contents in the given format
pub fn records_from_file(text: &str, format: FileFormat) -> Result<Vec<RawRecord>, RequestError> {
    match format {
        FileFormat::Csv => records_from_csv(text),
        FileFormat::Json => records_from_json_text(text),
    }
}

/// CSV text with a header row; header names are matched case-insensitively
pub fn records_from_csv(text: &str) -> Result<Vec<RawRecord>, RequestError> {
    let mut rows = parse_csv(text).into_iter();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(|h| h.to_lowercase()).collect(),
        None => return Err(RequestError::EmptyCsv),
    };

    let records: Vec<RawRecord> = rows
        .map(|row| {
            RawRecord::Csv(CsvRecord::from_pairs(
                headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (h.as_str(), row.get(i).cloned().unwrap_or_default())),
            ))
        })
        .collect();

    if records.is_empty() {
        return Err(RequestError::EmptyCsv);
    }
    Ok(records)
}

/// JSON text: an array of objects, or an object with a `songs` array
pub fn records_from_json_text(text: &str) -> Result<Vec<RawRecord>, RequestError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| RequestError::InvalidJson(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("songs") {
            Some(Value::Array(items)) => items,
            _ => return Err(RequestError::NoSongsInJson),
        },
        _ => return Err(RequestError::NoSongsInJson),
    };

    if items.is_empty() {
        return Err(RequestError::NoSongsInJson);
    }
    Ok(items.into_iter().map(RawRecord::Json).collect())
}

/// `data` member of a `bulk_insert` request: must be a non-empty array
pub fn records_from_payload(data: Option<Value>) -> Result<Vec<RawRecord>, RequestError> {
    match data {
        Some(Value::Array(items)) if !items.is_empty() => {
            Ok(items.into_iter().map(RawRecord::Json).collect())
        }
        _ => Err(RequestError::MissingData),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_csv_headers_are_case_insensitive() {
        let records = records_from_csv("Song_Title,ARTIST_NAME\nHello,Adele\n").unwrap();
        assert_eq!(records.len(), 1);
        match &records[0] {
            RawRecord::Csv(row) => {
                assert_eq!(row.get("song_title"), "Hello");
                assert_eq!(row.get("artist_name"), "Adele");
                assert_eq!(row.get("album"), "");
            }
            other => panic!("expected CSV record, got {:?}", other),
        }
    }

    #[test]
    fn test_byte_order_mark_does_not_hide_first_header() {
        let records = records_from_csv("\u{feff}song_title,artist_name\nHello,Adele\n").unwrap();
        match &records[0] {
            RawRecord::Csv(row) => {
                assert_eq!(row.get("song_title"), "Hello");
                assert_eq!(row.get("artist_name"), "Adele");
            }
            other => panic!("expected CSV record, got {:?}", other),
        }
    }

    #[test]
    fn test_short_rows_yield_empty_values() {
        let records = records_from_csv("song_title,album,genre\nOnly Title\n").unwrap();
        match &records[0] {
            RawRecord::Csv(row) => {
                assert_eq!(row.get("song_title"), "Only Title");
                assert_eq!(row.get("genre"), "");
            }
            other => panic!("expected CSV record, got {:?}", other),
        }
    }

    #[test]
    fn test_csv_without_data_rows_is_rejected() {
        assert_eq!(records_from_csv(""), Err(RequestError::EmptyCsv));
        assert_eq!(records_from_csv("song_title,artist_name\n"), Err(RequestError::EmptyCsv));
    }

    #[test]
    fn test_json_array_or_songs_object() {
        assert_eq!(records_from_json_text(r#"[{"title":"A"},{"title":"B"}]"#).unwrap().len(), 2);
        assert_eq!(records_from_json_text(r#"{"songs":[{"title":"A"}]}"#).unwrap().len(), 1);
    }

    #[test]
    fn test_json_without_songs_is_rejected() {
        assert_eq!(records_from_json_text(r#"{"items":[]}"#), Err(RequestError::NoSongsInJson));
        assert_eq!(records_from_json_text("[]"), Err(RequestError::NoSongsInJson));
        assert_eq!(records_from_json_text("42"), Err(RequestError::NoSongsInJson));
        assert!(matches!(
            records_from_json_text("{not json"),
            Err(RequestError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_payload_must_be_non_empty_array() {
        assert_eq!(records_from_payload(None), Err(RequestError::MissingData));
        assert_eq!(records_from_payload(Some(json!([]))), Err(RequestError::MissingData));
        assert_eq!(
            records_from_payload(Some(json!("not-an-array"))),
            Err(RequestError::MissingData)
        );
        assert_eq!(records_from_payload(Some(json!([{"title": "A"}]))).unwrap().len(), 1);
    }

    #[test]
    fn test_file_format_detection() {
        assert_eq!(FileFormat::from_path(Path::new("songs.CSV")), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_path(Path::new("dump.json")), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_path(Path::new("notes.txt")), None);
        assert_eq!(
            FileFormat::from_content_type("text/csv; charset=utf-8"),
            Some(FileFormat::Csv)
        );
        assert_eq!(
            "xml".parse::<FileFormat>(),
            Err(RequestError::UnsupportedFormat("xml".to_string()))
        );
    }
}
