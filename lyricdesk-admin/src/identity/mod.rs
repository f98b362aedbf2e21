//! Identity administration
//!
//! User accounts belong to an identity provider; the console only creates,
//! invites, re-keys and removes them. [`LocalIdentity`] keeps accounts in the
//! local database, [`RestIdentityAdmin`] drives the hosted identity service.

use async_trait::async_trait;
use lyricdesk_common::Result;
use serde::{Deserialize, Serialize};

pub mod local;
pub mod rest;

pub use local::LocalIdentity;
pub use rest::RestIdentityAdmin;

/// Minimum password length accepted by both providers
pub const MIN_PASSWORD_LEN: usize = 6;

/// Account as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    /// Create an account with a password and a confirmed email
    async fn create_user(&self, email: &str, password: &str) -> Result<IdentityUser>;

    /// Create (or re-invite) an account that confirms itself by email
    async fn invite_user(&self, email: &str) -> Result<IdentityUser>;

    async fn set_password(&self, user_id: &str, password: &str) -> Result<()>;

    async fn delete_user(&self, user_id: &str) -> Result<()>;
}
