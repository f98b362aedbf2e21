//! HTTP API handlers for lyricdesk-admin

pub mod auth;
pub mod categories;
pub mod extract;
pub mod health;
pub mod import;
pub mod profiles;
pub mod songs;
pub mod users;

pub use auth::auth_middleware;
pub use categories::{create_category, delete_category, list_categories, rename_category};
pub use health::health_routes;
pub use import::import_file;
pub use profiles::{export_profiles, list_profiles, update_profile};
pub use songs::{list_songs, song_action};
pub use users::{invite_user, user_action};
