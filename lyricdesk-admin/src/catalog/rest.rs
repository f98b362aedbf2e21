//! Catalog on the hosted database's REST interface
//!
//! Tables are addressed as `/rest/v1/<table>` with `eq.` / `in.` filters.
//! Writes that need to know whether a row matched ask for
//! `return=representation` and inspect the returned rows.

use async_trait::async_trait;
use lyricdesk_common::db::{
    AdminLogEntry, Category, ExistingSong, NewSong, Page, Profile, ProfileFilter, ProfilePatch,
    Song, SongFilter, SongPatch,
};
use lyricdesk_common::{Error, Result};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use super::CatalogStore;
use crate::hosted::{content_range_total, eq, in_list, quote, HostedClient};

/// Values per `in.(...)` filter, keeps URLs short
const IN_CHUNK: usize = 100;

const PREFER: &str = "Prefer";

/// Catalog stored in the hosted database
#[derive(Clone)]
pub struct RestCatalog {
    client: HostedClient,
}

impl RestCatalog {
    pub fn new(client: HostedClient) -> Self {
        Self { client }
    }

    /// PATCH/DELETE rows matching `filter`, returning how many matched
    async fn write_matching(
        &self,
        method: Method,
        table: &str,
        filter: (&str, String),
        body: Option<Value>,
    ) -> Result<u64> {
        let mut request = self
            .client
            .table(method, table)
            .query(&[("select", "id".to_string()), (filter.0, filter.1)])
            .header(PREFER, "return=representation");
        if let Some(body) = body {
            request = request.json(&body);
        }
        let rows: Vec<Value> = self.client.send_json(request).await?;
        Ok(rows.len() as u64)
    }
}

fn ilike_any(columns: &[&str], query: &str) -> String {
    let pattern = quote(&format!("*{}*", query.trim()));
    let parts: Vec<String> = columns
        .iter()
        .map(|c| format!("{}.ilike.{}", c, pattern))
        .collect();
    format!("({})", parts.join(","))
}

/// Whole-title, case-insensitive match on any of `titles`
///
/// LIKE metacharacters are escaped. The REST wildcard `*` cannot be escaped,
/// so it becomes the one-character wildcard `_`; the duplicate detector
/// compares keys exactly afterwards.
fn title_match_any(titles: &[String]) -> String {
    let parts: Vec<String> = titles
        .iter()
        .map(|t| format!("title.ilike.{}", quote(&like_literal(t))))
        .collect();
    format!("({})", parts.join(","))
}

fn like_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '*' => out.push('_'),
            _ => out.push(c),
        }
    }
    out
}

fn not_found(kind: &str, id: &str) -> Error {
    Error::NotFound(format!("{} not found: {}", kind, id))
}

#[async_trait]
impl CatalogStore for RestCatalog {
    async fn find_existing(&self, titles: &[String]) -> Result<Vec<ExistingSong>> {
        let mut existing = Vec::new();
        for chunk in titles.chunks(IN_CHUNK) {
            let request = self
                .client
                .table(Method::GET, "songs")
                .query(&[("select", "title,artist".to_string()), ("or", title_match_any(chunk))]);
            let rows: Vec<ExistingSong> = self.client.send_json(request).await?;
            existing.extend(rows);
        }
        debug!(titles = titles.len(), matches = existing.len(), "Existing-song lookup");
        Ok(existing)
    }

    async fn insert_songs(&self, songs: &[NewSong]) -> Result<()> {
        // A single POST of an array is one statement on the server side
        let request = self
            .client
            .table(Method::POST, "songs")
            .header(PREFER, "return=minimal")
            .json(songs);
        self.client.send(request).await?;
        Ok(())
    }

    async fn get_song(&self, id: &str) -> Result<Option<Song>> {
        let request = self
            .client
            .table(Method::GET, "songs")
            .query(&[("select", "*".to_string()), ("id", eq(id))]);
        let mut rows: Vec<Song> = self.client.send_json(request).await?;
        Ok(rows.pop())
    }

    async fn list_songs(&self, filter: &SongFilter) -> Result<Vec<Song>> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
            params.push(("or", ilike_any(&["title", "artist", "genre"], query)));
        }
        if let Some(status) = filter.status {
            params.push(("status", eq(status.as_str())));
        }

        let request = self.client.table(Method::GET, "songs").query(&params);
        self.client.send_json(request).await
    }

    async fn update_song(&self, id: &str, patch: &SongPatch) -> Result<()> {
        let matched = self
            .write_matching(Method::PATCH, "songs", ("id", eq(id)), Some(patch.to_json()))
            .await?;
        if matched == 0 {
            return Err(not_found("Song", id));
        }
        Ok(())
    }

    async fn update_songs(&self, ids: &[String], patch: &SongPatch) -> Result<u64> {
        let mut updated = 0;
        for chunk in ids.chunks(IN_CHUNK) {
            updated += self
                .write_matching(Method::PATCH, "songs", ("id", in_list(chunk)), Some(patch.to_json()))
                .await?;
        }
        Ok(updated)
    }

    async fn delete_song(&self, id: &str) -> Result<()> {
        let matched = self
            .write_matching(Method::DELETE, "songs", ("id", eq(id)), None)
            .await?;
        if matched == 0 {
            return Err(not_found("Song", id));
        }
        Ok(())
    }

    async fn delete_songs(&self, ids: &[String]) -> Result<u64> {
        let mut deleted = 0;
        for chunk in ids.chunks(IN_CHUNK) {
            deleted += self
                .write_matching(Method::DELETE, "songs", ("id", in_list(chunk)), None)
                .await?;
        }
        Ok(deleted)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let request = self
            .client
            .table(Method::GET, "categories")
            .query(&[("select", "id,name"), ("order", "name.asc")]);
        self.client.send_json(request).await
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Category name is required".to_string()));
        }
        let request = self
            .client
            .table(Method::POST, "categories")
            .query(&[("select", "id,name")])
            .header(PREFER, "return=representation")
            .json(&json!({ "name": name }));
        let mut rows: Vec<Category> = self.client.send_json(request).await?;
        rows.pop()
            .ok_or_else(|| Error::Internal("Category insert returned no row".to_string()))
    }

    async fn rename_category(&self, id: &str, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Category name is required".to_string()));
        }
        let matched = self
            .write_matching(
                Method::PATCH,
                "categories",
                ("id", eq(id)),
                Some(json!({ "name": name })),
            )
            .await?;
        if matched == 0 {
            return Err(not_found("Category", id));
        }
        Ok(())
    }

    async fn delete_category(&self, id: &str) -> Result<()> {
        let matched = self
            .write_matching(Method::DELETE, "categories", ("id", eq(id)), None)
            .await?;
        if matched == 0 {
            return Err(not_found("Category", id));
        }
        Ok(())
    }

    async fn list_profiles(&self, filter: &ProfileFilter) -> Result<Page<Profile>> {
        let limit = filter.limit.max(1);
        let mut params = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("offset", (u64::from(filter.page) * u64::from(limit)).to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
            params.push(("or", ilike_any(&["email", "role"], query)));
        }
        if let Some(role) = filter.role.as_deref().filter(|r| !r.trim().is_empty()) {
            params.push(("role", eq(role)));
        }

        let request = self
            .client
            .table(Method::GET, "profiles")
            .query(&params)
            .header(PREFER, "count=exact");
        let response = self.client.send(request).await?;
        let header_total = content_range_total(
            response
                .headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok()),
        );
        let items: Vec<Profile> = response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("Unexpected profile listing: {}", e)))?;
        let total = header_total.unwrap_or(items.len() as i64);

        Ok(Page { items, total })
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        let body = json!({
            "id": profile.id,
            "email": profile.email,
            "role": profile.role,
            "is_admin": profile.is_admin,
            "invited": profile.invited,
        });
        let request = self
            .client
            .table(Method::POST, "profiles")
            .query(&[("on_conflict", "id")])
            .header(PREFER, "resolution=merge-duplicates,return=minimal")
            .json(&body);
        self.client.send(request).await?;
        Ok(())
    }

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<()> {
        if patch.is_empty() {
            return Err(Error::InvalidInput("Nothing to update".to_string()));
        }
        let body = serde_json::to_value(patch)
            .map_err(|e| Error::Internal(format!("Failed to encode profile patch: {}", e)))?;
        let matched = self
            .write_matching(Method::PATCH, "profiles", ("id", eq(id)), Some(body))
            .await?;
        if matched == 0 {
            return Err(not_found("Profile", id));
        }
        Ok(())
    }

    async fn delete_profile(&self, id: &str) -> Result<()> {
        let matched = self
            .write_matching(Method::DELETE, "profiles", ("id", eq(id)), None)
            .await?;
        if matched == 0 {
            return Err(not_found("Profile", id));
        }
        Ok(())
    }

    async fn log_admin_action(&self, entry: &AdminLogEntry) -> Result<()> {
        let request = self
            .client
            .table(Method::POST, "invite_logs")
            .header(PREFER, "return=minimal")
            .json(entry);
        self.client.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ilike_any_quotes_pattern() {
        assert_eq!(
            ilike_any(&["title", "artist"], " moon, (live) "),
            r#"(title.ilike."*moon, (live)*",artist.ilike."*moon, (live)*")"#
        );
    }

    #[test]
    fn test_title_lookup_ignores_case_and_escapes_wildcards() {
        assert_eq!(
            title_match_any(&["Song A".to_string(), "50% *off_".to_string()]),
            r#"(title.ilike."Song A",title.ilike."50\\% _off\\_")"#
        );
    }
}
