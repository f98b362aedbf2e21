//! Local SQLite catalog
//!
//! Statements are built with `sqlx::QueryBuilder`; column names come only
//! from the patch whitelists, values are always bound.

use async_trait::async_trait;
use lyricdesk_common::db::{
    title_key, AdminLogEntry, Category, ExistingSong, NewSong, Page, PatchValue, Profile,
    ProfileFilter, ProfilePatch, Song, SongFilter, SongPatch, SongStatus,
};
use lyricdesk_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::CatalogStore;

/// Bound parameters per `IN (...)` list
const IN_CHUNK: usize = 500;

const SONG_SELECT: &str = r#"
    SELECT id, title, artist, album, genre, language, status, featured,
           lyrics, chords, lyrics_chordpro, cover_url, category_id, duration,
           pending_lyrics, pending_chords, lyrics_approved, chords_approved,
           CAST(created_at AS TEXT) AS created_at
    FROM songs
"#;

const PROFILE_SELECT: &str = r#"
    SELECT id, email, role, is_admin, invited, deactivated, banned,
           CAST(created_at AS TEXT) AS created_at
    FROM profiles
"#;

/// Catalog stored in the local SQLite database
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ========================================
// Row mapping
// ========================================

fn song_from_row(row: &SqliteRow) -> Result<Song> {
    let status: String = row.try_get("status")?;
    let status: SongStatus = status.parse()?;

    Ok(Song {
        id: row.try_get("id")?,
        created_at: row.try_get("created_at")?,
        record: NewSong {
            title: row.try_get("title")?,
            artist: row.try_get("artist")?,
            album: row.try_get("album")?,
            genre: row.try_get("genre")?,
            language: row.try_get("language")?,
            status,
            featured: row.try_get("featured")?,
            lyrics: row.try_get("lyrics")?,
            chords: row.try_get("chords")?,
            lyrics_chordpro: row.try_get("lyrics_chordpro")?,
            cover_url: row.try_get("cover_url")?,
            category_id: row.try_get("category_id")?,
            duration: row.try_get("duration")?,
            pending_lyrics: row.try_get("pending_lyrics")?,
            pending_chords: row.try_get("pending_chords")?,
            lyrics_approved: row.try_get("lyrics_approved")?,
            chords_approved: row.try_get("chords_approved")?,
        },
    })
}

fn profile_from_row(row: &SqliteRow) -> Result<Profile> {
    Ok(Profile {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        role: row.try_get("role")?,
        is_admin: row.try_get("is_admin")?,
        invited: row.try_get("invited")?,
        deactivated: row.try_get("deactivated")?,
        banned: row.try_get("banned")?,
        created_at: row.try_get("created_at")?,
    })
}

// ========================================
// Statement helpers
// ========================================

/// `col = ?, ..., updated_at = CURRENT_TIMESTAMP`, plus `title_key` when the
/// title changes
fn push_song_assignments(qb: &mut QueryBuilder<'_, Sqlite>, patch: &SongPatch) {
    for (column, value) in patch.fields() {
        qb.push(*column).push(" = ");
        match value {
            PatchValue::Text(text) => qb.push_bind(text.clone()),
            PatchValue::Flag(flag) => qb.push_bind(*flag),
            PatchValue::Number(number) => qb.push_bind(*number),
        };
        qb.push(", ");

        // title_key follows every title change
        if let ("title", PatchValue::Text(Some(title))) = (*column, value) {
            qb.push("title_key = ").push_bind(title_key(title)).push(", ");
        }
    }
    qb.push("updated_at = CURRENT_TIMESTAMP");
}

/// `(?, ?, ...)`
fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[String]) {
    qb.push("(");
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(id.clone());
    }
    list.push_unseparated(")");
}

fn like_pattern(query: &str) -> String {
    format!("%{}%", query.trim().to_lowercase())
}

fn push_profile_conditions(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ProfileFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = like_pattern(query);
        qb.push(" AND (lower(coalesce(email, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(coalesce(role, '')) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(role) = filter.role.as_deref().filter(|r| !r.trim().is_empty()) {
        qb.push(" AND role = ").push_bind(role.to_string());
    }
}

fn require_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("Category name is required".to_string()));
    }
    Ok(name.to_string())
}

// ========================================
// CatalogStore
// ========================================

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn find_existing(&self, titles: &[String]) -> Result<Vec<ExistingSong>> {
        let mut existing = Vec::new();
        for chunk in titles.chunks(IN_CHUNK) {
            let mut qb =
                QueryBuilder::<Sqlite>::new("SELECT title, artist FROM songs WHERE title_key IN (");
            let mut list = qb.separated(", ");
            for title in chunk {
                list.push_bind(title_key(title));
            }
            list.push_unseparated(")");

            for row in qb.build().fetch_all(&self.pool).await? {
                existing.push(ExistingSong {
                    title: row.try_get("title")?,
                    artist: row.try_get("artist")?,
                });
            }
        }
        debug!(titles = titles.len(), matches = existing.len(), "Existing-song lookup");
        Ok(existing)
    }

    async fn insert_songs(&self, songs: &[NewSong]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for song in songs {
            sqlx::query(
                r#"
                INSERT INTO songs (
                    id, title, title_key, artist, album, genre, language, status, featured,
                    lyrics, chords, lyrics_chordpro, cover_url, category_id, duration,
                    pending_lyrics, pending_chords, lyrics_approved, chords_approved
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&song.title)
            .bind(title_key(&song.title))
            .bind(&song.artist)
            .bind(&song.album)
            .bind(&song.genre)
            .bind(&song.language)
            .bind(song.status.as_str())
            .bind(song.featured)
            .bind(&song.lyrics)
            .bind(&song.chords)
            .bind(&song.lyrics_chordpro)
            .bind(&song.cover_url)
            .bind(&song.category_id)
            .bind(song.duration)
            .bind(&song.pending_lyrics)
            .bind(&song.pending_chords)
            .bind(song.lyrics_approved)
            .bind(song.chords_approved)
            .execute(&mut *tx)
            .await?;
        }

        // Dropping the transaction on an early return rolls everything back
        tx.commit().await?;
        Ok(())
    }

    async fn get_song(&self, id: &str) -> Result<Option<Song>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SONG_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(song_from_row).transpose()
    }

    async fn list_songs(&self, filter: &SongFilter) -> Result<Vec<Song>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SONG_SELECT);
        qb.push(" WHERE 1 = 1");
        if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
            let pattern = like_pattern(query);
            qb.push(" AND (lower(title) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR lower(coalesce(artist, '')) LIKE ")
                .push_bind(pattern.clone())
                .push(" OR lower(coalesce(genre, '')) LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(" ORDER BY created_at DESC, rowid DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(song_from_row).collect()
    }

    async fn update_song(&self, id: &str, patch: &SongPatch) -> Result<()> {
        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE songs SET ");
        push_song_assignments(&mut qb, patch);
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Song not found: {}", id)));
        }
        Ok(())
    }

    async fn update_songs(&self, ids: &[String], patch: &SongPatch) -> Result<u64> {
        let mut updated = 0;
        for chunk in ids.chunks(IN_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new("UPDATE songs SET ");
            push_song_assignments(&mut qb, patch);
            qb.push(" WHERE id IN ");
            push_id_list(&mut qb, chunk);
            updated += qb.build().execute(&self.pool).await?.rows_affected();
        }
        Ok(updated)
    }

    async fn delete_song(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM songs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Song not found: {}", id)));
        }
        Ok(())
    }

    async fn delete_songs(&self, ids: &[String]) -> Result<u64> {
        let mut deleted = 0;
        for chunk in ids.chunks(IN_CHUNK) {
            let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM songs WHERE id IN ");
            push_id_list(&mut qb, chunk);
            deleted += qb.build().execute(&self.pool).await?.rows_affected();
        }
        Ok(deleted)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name COLLATE NOCASE, id")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                Ok(Category {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                })
            })
            .collect()
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: require_name(name)?,
        };
        sqlx::query("INSERT INTO categories (id, name) VALUES (?, ?)")
            .bind(&category.id)
            .bind(&category.name)
            .execute(&self.pool)
            .await?;
        Ok(category)
    }

    async fn rename_category(&self, id: &str, name: &str) -> Result<()> {
        let result = sqlx::query("UPDATE categories SET name = ? WHERE id = ?")
            .bind(require_name(name)?)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Category not found: {}", id)));
        }
        Ok(())
    }

    async fn delete_category(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Category not found: {}", id)));
        }
        Ok(())
    }

    async fn list_profiles(&self, filter: &ProfileFilter) -> Result<Page<Profile>> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM profiles");
        push_profile_conditions(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let limit = filter.limit.max(1);
        let mut qb = QueryBuilder::<Sqlite>::new(PROFILE_SELECT);
        push_profile_conditions(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(i64::from(filter.page) * i64::from(limit));

        let rows = qb.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(profile_from_row).collect::<Result<Vec<_>>>()?;

        Ok(Page { items, total })
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, email, role, is_admin, invited, deactivated, banned)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                role = excluded.role,
                is_admin = excluded.is_admin,
                invited = excluded.invited
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.role)
        .bind(profile.is_admin)
        .bind(profile.invited)
        .bind(profile.deactivated)
        .bind(profile.banned)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<()> {
        if patch.is_empty() {
            return Err(Error::InvalidInput("Nothing to update".to_string()));
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE profiles SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(role) = &patch.role {
                set.push("role = ").push_bind_unseparated(role.clone());
            }
            if let Some(is_admin) = patch.is_admin {
                set.push("is_admin = ").push_bind_unseparated(is_admin);
            }
            if let Some(deactivated) = patch.deactivated {
                set.push("deactivated = ").push_bind_unseparated(deactivated);
            }
            if let Some(banned) = patch.banned {
                set.push("banned = ").push_bind_unseparated(banned);
            }
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Profile not found: {}", id)));
        }
        Ok(())
    }

    async fn delete_profile(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Profile not found: {}", id)));
        }
        Ok(())
    }

    async fn log_admin_action(&self, entry: &AdminLogEntry) -> Result<()> {
        sqlx::query("INSERT INTO invite_logs (user_id, email, action, reason) VALUES (?, ?, ?, ?)")
            .bind(&entry.user_id)
            .bind(&entry.email)
            .bind(&entry.action)
            .bind(&entry.reason)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyricdesk_common::db::{init_memory_database, SONG_COLUMNS};
    use serde_json::json;

    async fn catalog() -> SqliteCatalog {
        SqliteCatalog::new(init_memory_database().await.unwrap())
    }

    fn song(title: &str, artist: Option<&str>) -> NewSong {
        let mut song = NewSong::titled(title);
        song.artist = artist.map(str::to_string);
        song
    }

    #[tokio::test]
    async fn test_insert_and_list_newest_first() {
        let catalog = catalog().await;
        catalog
            .insert_songs(&[song("First", None), song("Second", Some("B"))])
            .await
            .unwrap();

        let songs = catalog.list_songs(&SongFilter::default()).await.unwrap();
        let titles: Vec<&str> = songs.iter().map(|s| s.record.title.as_str()).collect();
        assert_eq!(titles, vec!["Second", "First"]);
        assert!(songs[0].created_at.is_some());
        assert!(songs[0].record.lyrics_approved);
    }

    #[tokio::test]
    async fn test_batch_insert_is_all_or_nothing() {
        let catalog = catalog().await;
        let mut bad = song("Bad", None);
        bad.category_id = Some("missing-category".to_string());

        let result = catalog.insert_songs(&[song("Good", None), bad]).await;
        assert!(result.is_err());
        assert!(catalog.list_songs(&SongFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_existing_ignores_case() {
        let catalog = catalog().await;
        catalog.insert_songs(&[song("Song A", Some("X"))]).await.unwrap();

        let existing = catalog
            .find_existing(&["song a".to_string(), "Other".to_string()])
            .await
            .unwrap();
        assert_eq!(
            existing,
            vec![ExistingSong {
                title: "Song A".to_string(),
                artist: Some("X".to_string())
            }]
        );
    }

    #[tokio::test]
    async fn test_find_existing_folds_non_ascii_case() {
        let catalog = catalog().await;
        catalog.insert_songs(&[song("Éclat", Some("Zaz"))]).await.unwrap();

        let existing = catalog.find_existing(&["éclat".to_string()]).await.unwrap();
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].title, "Éclat");
    }

    #[tokio::test]
    async fn test_title_key_follows_title_updates() {
        let catalog = catalog().await;
        catalog.insert_songs(&[song("Old Name", None)]).await.unwrap();
        let id = catalog.list_songs(&SongFilter::default()).await.unwrap()[0].id.clone();

        let patch = SongPatch::from_json(&json!({"title": "ÜBER"}), SONG_COLUMNS).unwrap();
        catalog.update_song(&id, &patch).await.unwrap();

        assert_eq!(catalog.find_existing(&["über".to_string()]).await.unwrap().len(), 1);
        assert!(catalog.find_existing(&["old name".to_string()]).await.unwrap().is_empty());

        let patch = SongPatch::from_json(&json!({"title": "Renamed Again"}), SONG_COLUMNS).unwrap();
        assert_eq!(catalog.update_songs(&[id], &patch).await.unwrap(), 1);
        assert_eq!(catalog.find_existing(&["RENAMED AGAIN".to_string()]).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_filter_by_query_and_status() {
        let catalog = catalog().await;
        let mut published = song("Blue Moon", Some("Elvis"));
        published.status = SongStatus::Published;
        catalog
            .insert_songs(&[published, song("Moonlight", None), song("Sunrise", Some("MOONS"))])
            .await
            .unwrap();

        let filter = SongFilter {
            query: Some("moon".to_string()),
            status: None,
        };
        assert_eq!(catalog.list_songs(&filter).await.unwrap().len(), 3);

        let filter = SongFilter {
            query: Some("moon".to_string()),
            status: Some(SongStatus::Published),
        };
        let songs = catalog.list_songs(&filter).await.unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].record.title, "Blue Moon");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let catalog = catalog().await;
        catalog.insert_songs(&[song("A", None), song("B", None)]).await.unwrap();
        let ids: Vec<String> = catalog
            .list_songs(&SongFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();

        let patch = SongPatch::from_json(&json!({"status": "published"}), SONG_COLUMNS).unwrap();
        assert_eq!(catalog.update_songs(&ids, &patch).await.unwrap(), 2);

        let patch = SongPatch::from_json(&json!({"title": "A2", "duration": 61.5}), SONG_COLUMNS).unwrap();
        catalog.update_song(&ids[0], &patch).await.unwrap();
        let updated = catalog.get_song(&ids[0]).await.unwrap().unwrap();
        assert_eq!(updated.record.title, "A2");
        assert_eq!(updated.record.duration, Some(61.5));
        assert_eq!(updated.record.status, SongStatus::Published);

        assert!(matches!(
            catalog.update_song("nope", &patch).await,
            Err(Error::NotFound(_))
        ));

        catalog.delete_song(&ids[0]).await.unwrap();
        assert!(catalog.get_song(&ids[0]).await.unwrap().is_none());
        assert_eq!(catalog.delete_songs(&ids).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_deleting_category_unlinks_songs() {
        let catalog = catalog().await;
        let hymns = catalog.create_category("  Hymns ").await.unwrap();
        assert_eq!(hymns.name, "Hymns");

        let mut linked = song("Linked", None);
        linked.category_id = Some(hymns.id.clone());
        catalog.insert_songs(&[linked]).await.unwrap();

        catalog.delete_category(&hymns.id).await.unwrap();
        let songs = catalog.list_songs(&SongFilter::default()).await.unwrap();
        assert_eq!(songs[0].record.category_id, None);
    }

    #[tokio::test]
    async fn test_categories_sorted_by_name() {
        let catalog = catalog().await;
        catalog.create_category("worship").await.unwrap();
        let b = catalog.create_category("Blues").await.unwrap();
        catalog.rename_category(&b.id, "Anthems").await.unwrap();

        let names: Vec<String> = catalog
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Anthems".to_string(), "worship".to_string()]);
        assert!(catalog.create_category("   ").await.is_err());
    }

    #[tokio::test]
    async fn test_profile_paging_and_filters() {
        let catalog = catalog().await;
        for i in 0..5 {
            let mut profile = Profile::new(format!("u{}", i), format!("user{}@example.com", i));
            profile.role = Some(if i % 2 == 0 { "editor" } else { "viewer" }.to_string());
            catalog.upsert_profile(&profile).await.unwrap();
        }

        let page = catalog
            .list_profiles(&ProfileFilter {
                limit: 2,
                page: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);

        let editors = catalog
            .list_profiles(&ProfileFilter {
                role: Some("editor".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(editors.total, 3);

        let search = catalog
            .list_profiles(&ProfileFilter {
                query: Some("USER3@".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.total, 1);
        assert_eq!(search.items[0].id, "u3");
    }

    #[tokio::test]
    async fn test_profile_upsert_merges_and_patch_applies() {
        let catalog = catalog().await;
        let mut profile = Profile::new("u1", "a@example.com");
        profile.invited = true;
        catalog.upsert_profile(&profile).await.unwrap();

        profile.invited = false;
        profile.role = Some("editor".to_string());
        catalog.upsert_profile(&profile).await.unwrap();

        catalog
            .update_profile(
                "u1",
                &ProfilePatch {
                    banned: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let page = catalog.list_profiles(&ProfileFilter::default()).await.unwrap();
        assert_eq!(page.total, 1);
        let stored = &page.items[0];
        assert!(!stored.invited);
        assert!(stored.banned);
        assert_eq!(stored.role.as_deref(), Some("editor"));

        assert!(catalog.update_profile("u1", &ProfilePatch::default()).await.is_err());
        catalog.delete_profile("u1").await.unwrap();
        assert!(matches!(catalog.delete_profile("u1").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_admin_log_entries_are_recorded() {
        let catalog = catalog().await;
        catalog
            .log_admin_action(&AdminLogEntry {
                user_id: Some("u1".to_string()),
                email: None,
                action: "reset_password".to_string(),
                reason: Some("requested".to_string()),
            })
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invite_logs WHERE action = 'reset_password'")
            .fetch_one(catalog.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
