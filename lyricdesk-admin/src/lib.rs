//! lyricdesk-admin library - catalog and account administration service
//!
//! Exposes the admin HTTP API over a catalog store and an identity provider,
//! plus the bulk song importer used by both the API and the CLI.

use axum::Router;
use lyricdesk_common::config::ImportConfig;
use std::sync::Arc;

pub mod api;
pub mod backend;
pub mod catalog;
pub mod error;
pub mod hosted;
pub mod identity;
pub mod import;
pub mod moderation;

pub use error::{ApiError, ApiResult};

use catalog::CatalogStore;
use identity::IdentityAdmin;
use import::ImportOptions;

/// Largest accepted request body (import files included)
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub identity: Arc<dyn IdentityAdmin>,
    /// Shared secret for the admin API; empty disables authentication
    pub admin_key: String,
    pub import: ImportConfig,
}

impl AppState {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        identity: Arc<dyn IdentityAdmin>,
        admin_key: impl Into<String>,
        import: ImportConfig,
    ) -> Self {
        Self {
            catalog,
            identity,
            admin_key: admin_key.into(),
            import,
        }
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions::from(&self.import)
    }
}

/// Build application router
///
/// `/health` is public; everything under `/api` requires the admin key.
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::middleware;
    use axum::routing::{get, patch, post};
    use tower_http::trace::TraceLayer;

    // Protected routes (require authentication)
    let protected = Router::new()
        .route("/api/songs", get(api::list_songs).post(api::song_action))
        .route("/api/songs/import", post(api::import_file))
        .route(
            "/api/categories",
            get(api::list_categories).post(api::create_category),
        )
        .route(
            "/api/categories/:id",
            patch(api::rename_category).delete(api::delete_category),
        )
        .route("/api/invite", post(api::invite_user))
        .route("/api/users", post(api::user_action))
        .route("/api/profiles", get(api::list_profiles))
        .route("/api/profiles/export", get(api::export_profiles))
        .route("/api/profiles/:id", patch(api::update_profile))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no authentication)
    let public = api::health_routes();

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
