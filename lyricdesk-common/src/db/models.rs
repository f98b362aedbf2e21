//! Catalog and account models
//!
//! These types are shared by every backend: the local SQLite store maps rows
//! onto them by hand, the hosted store (de)serializes them as JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

// ========================================
// Songs
// ========================================

/// Publication status of a song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl SongStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SongStatus::Draft => "draft",
            SongStatus::Published => "published",
            SongStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for SongStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SongStatus {
    type Err = Error;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(SongStatus::Draft),
            "published" => Ok(SongStatus::Published),
            "archived" => Ok(SongStatus::Archived),
            other => Err(Error::InvalidInput(format!("Invalid status: {}", other))),
        }
    }
}

/// A song ready to be written to the catalog (no id yet)
///
/// This is the canonical record shape produced by the import normalizer and
/// by single-record inserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSong {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub status: SongStatus,
    pub featured: bool,
    pub lyrics: Option<String>,
    pub chords: Option<String>,
    pub lyrics_chordpro: Option<String>,
    pub cover_url: Option<String>,
    pub category_id: Option<String>,
    /// Seconds
    pub duration: Option<f64>,
    pub pending_lyrics: Option<String>,
    pub pending_chords: Option<String>,
    pub lyrics_approved: bool,
    pub chords_approved: bool,
}

impl NewSong {
    /// Song with the given title and every other field at its default
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: None,
            album: None,
            genre: None,
            language: None,
            status: SongStatus::Draft,
            featured: false,
            lyrics: None,
            chords: None,
            lyrics_chordpro: None,
            cover_url: None,
            category_id: None,
            duration: None,
            pending_lyrics: None,
            pending_chords: None,
            lyrics_approved: true,
            chords_approved: true,
        }
    }
}

/// A stored song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub record: NewSong,
}

/// The (title, artist) pair of an already stored song, used for dedup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingSong {
    pub title: String,
    pub artist: Option<String>,
}

/// Case-folded title used for duplicate lookups
///
/// Full Unicode lower-casing; the local store keeps it in `songs.title_key`
/// because SQLite's `lower()` folds ASCII only.
pub fn title_key(title: &str) -> String {
    title.to_lowercase()
}

/// Song listing filter
#[derive(Debug, Clone, Default)]
pub struct SongFilter {
    /// Case-insensitive substring over title, artist and genre
    pub query: Option<String>,
    pub status: Option<SongStatus>,
}

// ========================================
// Categories
// ========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

// ========================================
// Profiles and audit log
// ========================================

/// Console-side profile of an identity-provider user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub invited: bool,
    #[serde(default)]
    pub deactivated: bool,
    #[serde(default)]
    pub banned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Profile {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: Some(email.into()),
            role: None,
            is_admin: false,
            invited: false,
            deactivated: false,
            banned: false,
            created_at: None,
        }
    }
}

/// Partial profile update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_admin: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banned: Option<bool>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.is_admin.is_none()
            && self.deactivated.is_none()
            && self.banned.is_none()
    }
}

/// Profile listing filter (zero-based page)
#[derive(Debug, Clone)]
pub struct ProfileFilter {
    /// Case-insensitive substring over email and role
    pub query: Option<String>,
    pub role: Option<String>,
    pub page: u32,
    pub limit: u32,
}

impl Default for ProfileFilter {
    fn default() -> Self {
        Self {
            query: None,
            role: None,
            page: 0,
            limit: 20,
        }
    }
}

/// One page of results plus the unpaged total
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Administrative action recorded in the audit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLogEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub action: String,
    pub reason: Option<String>,
}
