//! Catalog data access
//!
//! [`CatalogStore`] is the seam between the admin API and wherever the
//! catalog lives: [`SqliteCatalog`] for local mode and tests, [`RestCatalog`]
//! for the hosted database service.

use async_trait::async_trait;
use lyricdesk_common::db::{
    AdminLogEntry, Category, ExistingSong, NewSong, Page, Profile, ProfileFilter, ProfilePatch,
    Song, SongFilter, SongPatch,
};
use lyricdesk_common::Result;

pub mod rest;
pub mod sqlite;

pub use rest::RestCatalog;
pub use sqlite::SqliteCatalog;

/// Songs, categories, profiles and the admin audit log
#[async_trait]
pub trait CatalogStore: Send + Sync {
    // ----- songs -----

    /// Stored (title, artist) pairs whose title is one of `titles`
    async fn find_existing(&self, titles: &[String]) -> Result<Vec<ExistingSong>>;

    /// Insert every song or none
    async fn insert_songs(&self, songs: &[NewSong]) -> Result<()>;

    async fn get_song(&self, id: &str) -> Result<Option<Song>>;

    /// Newest first
    async fn list_songs(&self, filter: &SongFilter) -> Result<Vec<Song>>;

    /// `NotFound` when no song has this id
    async fn update_song(&self, id: &str, patch: &SongPatch) -> Result<()>;

    /// Returns the number of songs updated
    async fn update_songs(&self, ids: &[String], patch: &SongPatch) -> Result<u64>;

    /// `NotFound` when no song has this id
    async fn delete_song(&self, id: &str) -> Result<()>;

    /// Returns the number of songs deleted
    async fn delete_songs(&self, ids: &[String]) -> Result<u64>;

    // ----- categories -----

    /// Ordered by name
    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn create_category(&self, name: &str) -> Result<Category>;

    async fn rename_category(&self, id: &str, name: &str) -> Result<()>;

    /// Songs in the category keep existing with no category
    async fn delete_category(&self, id: &str) -> Result<()>;

    // ----- profiles -----

    /// Newest first, one page at a time
    async fn list_profiles(&self, filter: &ProfileFilter) -> Result<Page<Profile>>;

    /// Insert, or merge into the profile with the same id
    async fn upsert_profile(&self, profile: &Profile) -> Result<()>;

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<()>;

    async fn delete_profile(&self, id: &str) -> Result<()>;

    // ----- audit -----

    async fn log_admin_action(&self, entry: &AdminLogEntry) -> Result<()>;
}
