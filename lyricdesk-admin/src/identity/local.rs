//! Identity accounts in the local SQLite database
//!
//! Passwords are stored as `sha256(salt || password)` with a random 16-byte
//! salt per account. Invitations are recorded but not delivered; a mail relay
//! is outside this service.

use async_trait::async_trait;
use lyricdesk_common::{Error, Result};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use super::{IdentityAdmin, IdentityUser, MIN_PASSWORD_LEN};

const ALREADY_REGISTERED: &str = "A user with this email address has already been registered";

#[derive(Clone)]
pub struct LocalIdentity {
    pool: SqlitePool,
}

impl LocalIdentity {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Check a password against the stored hash
    pub async fn verify_password(&self, email: &str, password: &str) -> Result<bool> {
        let row = sqlx::query("SELECT password_hash, password_salt FROM auth_users WHERE email = ?")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(false);
        };
        let hash: Option<String> = row.try_get("password_hash")?;
        let salt: Option<String> = row.try_get("password_salt")?;
        Ok(match (hash, salt) {
            (Some(hash), Some(salt)) => hash_password(&salt, password) == hash,
            _ => false,
        })
    }

    /// Existing account id and confirmation state for an email
    async fn lookup(&self, email: &str) -> Result<Option<(String, bool)>> {
        let row = sqlx::query("SELECT id, email_confirmed FROM auth_users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some((row.try_get("id")?, row.try_get("email_confirmed")?))),
            None => Ok(None),
        }
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email.to_string()),
        _ => Err(Error::InvalidInput(format!("Invalid email address: {}", email))),
    }
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::InvalidInput(format!(
            "Password should be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl IdentityAdmin for LocalIdentity {
    async fn create_user(&self, email: &str, password: &str) -> Result<IdentityUser> {
        let email = normalize_email(email)?;
        check_password(password)?;
        if self.lookup(&email).await?.is_some() {
            return Err(Error::Backend(ALREADY_REGISTERED.to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let salt = generate_salt();
        sqlx::query(
            r#"
            INSERT INTO auth_users (id, email, password_hash, password_salt, email_confirmed)
            VALUES (?, ?, ?, ?, 1)
            "#,
        )
        .bind(&id)
        .bind(&email)
        .bind(hash_password(&salt, password))
        .bind(&salt)
        .execute(&self.pool)
        .await?;

        info!(user_id = %id, "Created local user");
        Ok(IdentityUser {
            id,
            email: Some(email),
        })
    }

    async fn invite_user(&self, email: &str) -> Result<IdentityUser> {
        let email = normalize_email(email)?;

        let id = match self.lookup(&email).await? {
            Some((_, true)) => return Err(Error::Backend(ALREADY_REGISTERED.to_string())),
            Some((id, false)) => {
                sqlx::query(
                    "UPDATE auth_users SET invited_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
                )
                .bind(&id)
                .execute(&self.pool)
                .await?;
                id
            }
            None => {
                let id = Uuid::new_v4().to_string();
                sqlx::query(
                    "INSERT INTO auth_users (id, email, invited_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
                )
                .bind(&id)
                .bind(&email)
                .execute(&self.pool)
                .await?;
                id
            }
        };

        info!(user_id = %id, "Recorded invitation for local user");
        Ok(IdentityUser {
            id,
            email: Some(email),
        })
    }

    async fn set_password(&self, user_id: &str, password: &str) -> Result<()> {
        check_password(password)?;
        let salt = generate_salt();
        let result = sqlx::query(
            r#"
            UPDATE auth_users
            SET password_hash = ?, password_salt = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(hash_password(&salt, password))
        .bind(&salt)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("User not found: {}", user_id)));
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM auth_users WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("User not found: {}", user_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyricdesk_common::db::init_memory_database;

    async fn identity() -> LocalIdentity {
        LocalIdentity::new(init_memory_database().await.unwrap())
    }

    #[test]
    fn test_hash_depends_on_salt() {
        let a = hash_password("aa", "secret1");
        let b = hash_password("bb", "secret1");
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(generate_salt().len(), 32);
    }

    #[tokio::test]
    async fn test_create_user_and_verify() {
        let identity = identity().await;
        let user = identity.create_user(" Ann@Example.com ", "hunter22").await.unwrap();
        assert_eq!(user.email.as_deref(), Some("Ann@Example.com"));

        assert!(identity.verify_password("ann@example.com", "hunter22").await.unwrap());
        assert!(!identity.verify_password("ann@example.com", "wrong-pass").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let identity = identity().await;
        identity.create_user("ann@example.com", "hunter22").await.unwrap();

        let err = identity.create_user("ANN@example.com", "hunter22").await.unwrap_err();
        assert_eq!(err.to_string(), ALREADY_REGISTERED);
        assert!(identity.invite_user("ann@example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_reinvite_keeps_account() {
        let identity = identity().await;
        let first = identity.invite_user("new@example.com").await.unwrap();
        let second = identity.invite_user("new@example.com").await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_password_rules_and_reset() {
        let identity = identity().await;
        assert!(identity.create_user("a@example.com", "short").await.is_err());
        assert!(identity.create_user("not-an-email", "long-enough").await.is_err());

        let user = identity.invite_user("a@example.com").await.unwrap();
        identity.set_password(&user.id, "brand-new-pass").await.unwrap();
        assert!(identity.verify_password("a@example.com", "brand-new-pass").await.unwrap());

        assert!(matches!(
            identity.set_password("missing", "brand-new-pass").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let identity = identity().await;
        let user = identity.create_user("gone@example.com", "hunter22").await.unwrap();
        identity.delete_user(&user.id).await.unwrap();
        assert!(matches!(identity.delete_user(&user.id).await, Err(Error::NotFound(_))));
    }
}
