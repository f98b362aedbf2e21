//! Record normalization
//!
//! Maps a raw record onto the canonical [`NewSong`] shape. JSON records accept
//! a few synonym keys per field (including common misspellings seen in
//! exported spreadsheets); CSV records use the console's header names and
//! resolve the category by name.

use lyricdesk_common::db::{Category, NewSong, SongStatus};
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

use super::source::{CsvRecord, RawRecord};

/// A single record that cannot become a song
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing required field: title")]
    MissingTitle,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid record: expected an object")]
    NotAnObject,
}

const TITLE_KEYS: &[&str] = &["title", "Title"];
const ARTIST_KEYS: &[&str] = &["artist", "singer"];
const ALBUM_KEYS: &[&str] = &["album", "albub", "filim", "film"];
const GENRE_KEYS: &[&str] = &["genre", "gener"];
const COVER_KEYS: &[&str] = &["cover_url", "coverUrl", "cover", "cover image"];

const CSV_TITLE: &[&str] = &["song_title", "title"];
const CSV_ARTIST: &[&str] = &["artist_name", "artist"];
const CSV_COVER: &[&str] = &["cover_image_url", "cover_url"];

/// Lookups shared by every record of one import call
#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    /// Categories fetched once per call, for CSV name resolution
    pub categories: &'a [Category],
    /// Language given to CSV rows without a `language` column
    pub csv_language: &'a str,
}

/// Normalize one raw record
pub fn normalize(record: &RawRecord, ctx: &NormalizeContext<'_>) -> Result<NewSong, ValidationError> {
    match record {
        RawRecord::Json(Value::Object(map)) => normalize_json(map),
        RawRecord::Json(_) => Err(ValidationError::NotAnObject),
        RawRecord::Csv(row) => normalize_csv(row, ctx),
    }
}

// ========================================
// JSON records
// ========================================

fn normalize_json(map: &Map<String, Value>) -> Result<NewSong, ValidationError> {
    let title = first_scalar(map, TITLE_KEYS).ok_or(ValidationError::MissingTitle)?;

    let status = match map.get("status") {
        None | Some(Value::Null) => SongStatus::Draft,
        Some(Value::String(s)) if s.trim().is_empty() => SongStatus::Draft,
        Some(Value::String(s)) => s
            .parse()
            .map_err(|_| ValidationError::InvalidStatus(s.trim().to_string()))?,
        Some(other) => return Err(ValidationError::InvalidStatus(other.to_string())),
    };

    let mut song = NewSong::titled(title);
    song.artist = first_scalar(map, ARTIST_KEYS).or_else(|| joined_artists(map));
    song.album = first_scalar(map, ALBUM_KEYS);
    song.genre = first_scalar(map, GENRE_KEYS);
    song.language = first_scalar(map, &["language"]);
    song.status = status;
    song.featured = map.get("featured").map(truthy).unwrap_or(false);
    song.lyrics = body_text(map, "lyrics");
    song.chords = body_text(map, "chords");
    song.lyrics_chordpro = body_text(map, "lyrics_chordpro");
    song.cover_url = first_scalar(map, COVER_KEYS).filter(|u| is_valid_cover_url(u));
    song.category_id = first_scalar(map, &["category_id"]);
    song.duration = map.get("duration").and_then(duration_of);
    song.pending_lyrics = body_text(map, "pending_lyrics");
    song.pending_chords = body_text(map, "pending_chords");
    song.lyrics_approved = approval_flag(map.get("lyrics_approved"));
    song.chords_approved = approval_flag(map.get("chords_approved"));
    Ok(song)
}

/// First key holding a non-empty scalar, as trimmed text
fn first_scalar(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| map.get(*key).and_then(scalar_text))
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// `artists: ["A", "B"]` becomes `"A, B"`
fn joined_artists(map: &Map<String, Value>) -> Option<String> {
    let names: Vec<String> = map
        .get("artists")?
        .as_array()?
        .iter()
        .filter_map(scalar_text)
        .collect();
    (!names.is_empty()).then(|| names.join(", "))
}

/// Free-text bodies are kept verbatim; empty means absent
fn body_text(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Approval flags default to approved unless explicitly set
fn approval_flag(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => *b,
        Some(other) => truthy(other),
    }
}

fn duration_of(value: &Value) -> Option<f64> {
    let seconds = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_duration(s),
        _ => None,
    };
    seconds.filter(|d| d.is_finite() && *d >= 0.0)
}

/// Numeric text only; anything else is treated as absent
fn parse_duration(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d >= 0.0)
}

// ========================================
// CSV records
// ========================================

fn normalize_csv(row: &CsvRecord, ctx: &NormalizeContext<'_>) -> Result<NewSong, ValidationError> {
    let title = csv_value(row, CSV_TITLE).ok_or(ValidationError::MissingTitle)?;

    let status = match csv_value(row, &["status"]) {
        None => SongStatus::Draft,
        Some(s) => s.parse().map_err(|_| ValidationError::InvalidStatus(s))?,
    };

    let mut song = NewSong::titled(title);
    song.artist = csv_value(row, CSV_ARTIST);
    song.album = csv_value(row, &["album"]);
    song.genre = csv_value(row, &["genre"]);
    song.language =
        csv_value(row, &["language"]).or_else(|| Some(ctx.csv_language.to_string()));
    song.status = status;
    song.featured = csv_value(row, &["featured"]).is_some_and(|v| parse_flag(&v));
    song.lyrics = csv_value(row, &["lyrics"]);
    song.chords = csv_value(row, &["chords"]);
    song.cover_url = csv_value(row, CSV_COVER).filter(|u| is_valid_cover_url(u));
    song.category_id = csv_value(row, &["category"])
        .and_then(|name| resolve_category(ctx.categories, &name));
    song.duration = csv_value(row, &["duration"]).and_then(|d| parse_duration(&d));
    Ok(song)
}

fn csv_value(row: &CsvRecord, headers: &[&str]) -> Option<String> {
    headers
        .iter()
        .map(|h| row.get(h).trim())
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_flag(text: &str) -> bool {
    matches!(text.to_ascii_lowercase().as_str(), "true" | "yes" | "1")
}

/// Case-insensitive exact match on category name
pub fn resolve_category(categories: &[Category], name: &str) -> Option<String> {
    let wanted = name.trim().to_lowercase();
    categories
        .iter()
        .find(|c| c.name.trim().to_lowercase() == wanted)
        .map(|c| c.id.clone())
}

// ========================================
// Cover URLs
// ========================================

/// Absolute http(s) URL with a host, or an inline `data:image/` reference
pub fn is_valid_cover_url(candidate: &str) -> bool {
    let candidate = candidate.trim();
    if candidate
        .get(..11)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:image/"))
    {
        return candidate.len() > 11;
    }

    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_song(value: Value) -> Result<NewSong, ValidationError> {
        let ctx = NormalizeContext {
            categories: &[],
            csv_language: "English",
        };
        normalize(&RawRecord::Json(value), &ctx)
    }

    fn csv_song(pairs: &[(&str, &str)], categories: &[Category]) -> Result<NewSong, ValidationError> {
        let ctx = NormalizeContext {
            categories,
            csv_language: "English",
        };
        normalize(&RawRecord::Csv(CsvRecord::from_pairs(pairs.iter().copied())), &ctx)
    }

    #[test]
    fn test_json_defaults() {
        let song = json_song(json!({"title": "  Amazing Grace "})).unwrap();
        assert_eq!(song.title, "Amazing Grace");
        assert_eq!(song.status, SongStatus::Draft);
        assert!(!song.featured);
        assert!(song.lyrics_approved);
        assert!(song.chords_approved);
        assert_eq!(song.language, None);
        assert_eq!(song.artist, None);
    }

    #[test]
    fn test_missing_title_is_validation_error() {
        assert_eq!(json_song(json!({"artist": "X"})), Err(ValidationError::MissingTitle));
        assert_eq!(json_song(json!({"title": "   "})), Err(ValidationError::MissingTitle));
        assert_eq!(json_song(json!("Song A")), Err(ValidationError::NotAnObject));
        assert_eq!(
            ValidationError::MissingTitle.to_string(),
            "Missing required field: title"
        );
    }

    #[test]
    fn test_json_synonyms() {
        let song = json_song(json!({
            "Title": "Kal Ho Naa Ho",
            "singer": "Sonu Nigam",
            "filim": "Kal Ho Naa Ho",
            "gener": "Bollywood",
            "coverUrl": "https://img.example.com/khnh.jpg"
        }))
        .unwrap();
        assert_eq!(song.title, "Kal Ho Naa Ho");
        assert_eq!(song.artist.as_deref(), Some("Sonu Nigam"));
        assert_eq!(song.album.as_deref(), Some("Kal Ho Naa Ho"));
        assert_eq!(song.genre.as_deref(), Some("Bollywood"));
        assert_eq!(song.cover_url.as_deref(), Some("https://img.example.com/khnh.jpg"));
    }

    #[test]
    fn test_first_non_empty_synonym_wins() {
        let song = json_song(json!({"title": "A", "album": "", "albub": "Typo Album"})).unwrap();
        assert_eq!(song.album.as_deref(), Some("Typo Album"));
    }

    #[test]
    fn test_artists_array_is_joined() {
        let song = json_song(json!({"title": "A", "artists": ["Lata", "Kishore", ""]})).unwrap();
        assert_eq!(song.artist.as_deref(), Some("Lata, Kishore"));

        let scalar_wins = json_song(json!({"title": "A", "artist": "Solo", "artists": ["X"]})).unwrap();
        assert_eq!(scalar_wins.artist.as_deref(), Some("Solo"));
    }

    #[test]
    fn test_duration_coercion() {
        assert_eq!(json_song(json!({"title": "A", "duration": 215})).unwrap().duration, Some(215.0));
        assert_eq!(json_song(json!({"title": "A", "duration": " 3.5 "})).unwrap().duration, Some(3.5));
        assert_eq!(json_song(json!({"title": "A", "duration": "3:35"})).unwrap().duration, None);
        assert_eq!(json_song(json!({"title": "A", "duration": ""})).unwrap().duration, None);
        assert_eq!(json_song(json!({"title": "A", "duration": -1})).unwrap().duration, None);
    }

    #[test]
    fn test_invalid_cover_is_discarded() {
        let song = json_song(json!({"title": "A", "cover": "not a url"})).unwrap();
        assert_eq!(song.cover_url, None);

        let ftp = json_song(json!({"title": "A", "cover_url": "ftp://host/x.png"})).unwrap();
        assert_eq!(ftp.cover_url, None);

        let inline = json_song(json!({"title": "A", "cover": "data:image/png;base64,AAAA"})).unwrap();
        assert_eq!(inline.cover_url.as_deref(), Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn test_flags_and_status() {
        let song = json_song(json!({
            "title": "A",
            "status": "Published",
            "featured": 1,
            "lyrics_approved": false
        }))
        .unwrap();
        assert_eq!(song.status, SongStatus::Published);
        assert!(song.featured);
        assert!(!song.lyrics_approved);
        assert!(song.chords_approved);

        assert_eq!(
            json_song(json!({"title": "A", "status": "live"})),
            Err(ValidationError::InvalidStatus("live".to_string()))
        );
    }

    #[test]
    fn test_csv_row() {
        let categories = vec![
            Category { id: "c-1".into(), name: "Worship".into() },
            Category { id: "c-2".into(), name: "Folk".into() },
        ];
        let song = csv_song(
            &[
                ("song_title", "How Great Thou Art"),
                ("category", "worship"),
                ("artist_name", "Carl Boberg"),
                ("cover_image_url", "http://img.example.com/a.png"),
                ("lyrics", "O Lord my God"),
            ],
            &categories,
        )
        .unwrap();
        assert_eq!(song.title, "How Great Thou Art");
        assert_eq!(song.category_id.as_deref(), Some("c-1"));
        assert_eq!(song.artist.as_deref(), Some("Carl Boberg"));
        assert_eq!(song.cover_url.as_deref(), Some("http://img.example.com/a.png"));
        assert_eq!(song.language.as_deref(), Some("English"));
        assert_eq!(song.lyrics.as_deref(), Some("O Lord my God"));
    }

    #[test]
    fn test_csv_unknown_category_leaves_null() {
        let song = csv_song(&[("song_title", "A"), ("category", "Jazz")], &[]).unwrap();
        assert_eq!(song.category_id, None);
    }

    #[test]
    fn test_csv_missing_title_column() {
        assert_eq!(
            csv_song(&[("artist_name", "X")], &[]),
            Err(ValidationError::MissingTitle)
        );
    }

    #[test]
    fn test_cover_url_validation() {
        assert!(is_valid_cover_url("https://cdn.example.com/c.jpg"));
        assert!(is_valid_cover_url("HTTP://EXAMPLE.COM/c.jpg"));
        assert!(is_valid_cover_url("DATA:image/jpeg;base64,/9j/"));
        assert!(!is_valid_cover_url("data:image/"));
        assert!(!is_valid_cover_url("data:text/plain,hi"));
        assert!(!is_valid_cover_url("/relative/path.png"));
        assert!(!is_valid_cover_url("javascript:alert(1)"));
    }
}
