//! Validated song field patches
//!
//! Update, moderation and bulk-update requests carry loosely typed JSON
//! objects. They are checked against a fixed column whitelist and coerced into
//! typed values here, so stores can build statements from column names
//! without ever interpolating caller-supplied identifiers.

use serde_json::{Map, Value};

use crate::db::models::SongStatus;
use crate::{Error, Result};

/// Columns that a song patch may touch
pub const SONG_COLUMNS: &[&str] = &[
    "title",
    "artist",
    "album",
    "genre",
    "language",
    "status",
    "featured",
    "lyrics",
    "chords",
    "lyrics_chordpro",
    "cover_url",
    "category_id",
    "duration",
    "pending_lyrics",
    "pending_chords",
    "lyrics_approved",
    "chords_approved",
];

/// Columns a moderation request may touch
pub const MODERATION_COLUMNS: &[&str] = &[
    "lyrics",
    "chords",
    "pending_lyrics",
    "pending_chords",
    "lyrics_approved",
    "chords_approved",
];

/// Typed value of one patched column
#[derive(Debug, Clone, PartialEq)]
pub enum PatchValue {
    Text(Option<String>),
    Flag(bool),
    Number(Option<f64>),
}

impl PatchValue {
    pub fn to_json(&self) -> Value {
        match self {
            PatchValue::Text(Some(s)) => Value::String(s.clone()),
            PatchValue::Flag(b) => Value::Bool(*b),
            PatchValue::Number(Some(n)) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            PatchValue::Text(None) | PatchValue::Number(None) => Value::Null,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ColumnKind {
    Title,
    Status,
    Text,
    Flag,
    Number,
}

fn column_kind(column: &str) -> Option<ColumnKind> {
    match column {
        "title" => Some(ColumnKind::Title),
        "status" => Some(ColumnKind::Status),
        "featured" | "lyrics_approved" | "chords_approved" => Some(ColumnKind::Flag),
        "duration" => Some(ColumnKind::Number),
        c if SONG_COLUMNS.contains(&c) => Some(ColumnKind::Text),
        _ => None,
    }
}

/// Ordered set of column assignments
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SongPatch {
    fields: Vec<(&'static str, PatchValue)>,
}

impl SongPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object, accepting only columns listed in `allowed`
    pub fn from_json(value: &Value, allowed: &[&'static str]) -> Result<Self> {
        let map: &Map<String, Value> = value
            .as_object()
            .ok_or_else(|| Error::InvalidInput("Patch data must be an object".to_string()))?;

        let mut patch = SongPatch::new();
        for (key, raw) in map {
            let column = allowed
                .iter()
                .copied()
                .find(|c| *c == key.as_str())
                .ok_or_else(|| Error::InvalidInput(format!("Unknown column: {}", key)))?;
            let kind = column_kind(column)
                .ok_or_else(|| Error::InvalidInput(format!("Unknown column: {}", key)))?;
            patch = patch.set(column, coerce(column, kind, raw)?);
        }

        if patch.is_empty() {
            return Err(Error::InvalidInput("Patch data is empty".to_string()));
        }
        Ok(patch)
    }

    /// Add or replace an assignment
    pub fn set(mut self, column: &'static str, value: PatchValue) -> Self {
        if let Some(slot) = self.fields.iter_mut().find(|(c, _)| *c == column) {
            slot.1 = value;
        } else {
            self.fields.push((column, value));
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&PatchValue> {
        self.fields.iter().find(|(c, _)| *c == column).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(&'static str, PatchValue)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(c, v)| (c.to_string(), v.to_json()))
                .collect(),
        )
    }
}

fn coerce(column: &str, kind: ColumnKind, raw: &Value) -> Result<PatchValue> {
    let invalid = || Error::InvalidInput(format!("Invalid value for {}: {}", column, raw));
    match kind {
        ColumnKind::Title => match raw.as_str().map(str::trim) {
            Some(t) if !t.is_empty() => Ok(PatchValue::Text(Some(t.to_string()))),
            _ => Err(Error::InvalidInput("title must be a non-empty string".to_string())),
        },
        ColumnKind::Status => {
            let s = raw.as_str().ok_or_else(invalid)?;
            let status: SongStatus = s.parse()?;
            Ok(PatchValue::Text(Some(status.as_str().to_string())))
        }
        ColumnKind::Text => match raw {
            Value::Null => Ok(PatchValue::Text(None)),
            Value::String(s) => Ok(PatchValue::Text(Some(s.clone()))),
            _ => Err(invalid()),
        },
        ColumnKind::Flag => raw.as_bool().map(PatchValue::Flag).ok_or_else(invalid),
        ColumnKind::Number => match raw {
            Value::Null => Ok(PatchValue::Number(None)),
            Value::Number(n) => n
                .as_f64()
                .filter(|d| *d >= 0.0)
                .map(|d| PatchValue::Number(Some(d)))
                .ok_or_else(invalid),
            _ => Err(invalid()),
        },
    }
}
