//! Hosted identity service admin endpoints

use async_trait::async_trait;
use lyricdesk_common::{Error, Result};
use reqwest::Method;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::{IdentityAdmin, IdentityUser};
use crate::hosted::HostedClient;

/// Admin client for `/auth/v1`
#[derive(Clone)]
pub struct RestIdentityAdmin {
    client: HostedClient,
}

impl RestIdentityAdmin {
    pub fn new(client: HostedClient) -> Self {
        Self { client }
    }
}

/// Hosted user ids are UUIDs; anything else never reaches the URL path
fn user_path(user_id: &str) -> Result<String> {
    let id = Uuid::parse_str(user_id.trim())
        .map_err(|_| Error::InvalidInput(format!("Invalid user id: {}", user_id)))?;
    Ok(format!("admin/users/{}", id))
}

#[async_trait]
impl IdentityAdmin for RestIdentityAdmin {
    async fn create_user(&self, email: &str, password: &str) -> Result<IdentityUser> {
        let request = self
            .client
            .auth(Method::POST, "admin/users")
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            }));
        let user: IdentityUser = self.client.send_json(request).await?;
        info!(user_id = %user.id, "Created user");
        Ok(user)
    }

    async fn invite_user(&self, email: &str) -> Result<IdentityUser> {
        let request = self
            .client
            .auth(Method::POST, "invite")
            .json(&json!({ "email": email }));
        let user: IdentityUser = self.client.send_json(request).await?;
        info!(user_id = %user.id, "Invited user");
        Ok(user)
    }

    async fn set_password(&self, user_id: &str, password: &str) -> Result<()> {
        let request = self
            .client
            .auth(Method::PUT, &user_path(user_id)?)
            .json(&json!({ "password": password }));
        self.client.send(request).await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<()> {
        let request = self.client.auth(Method::DELETE, &user_path(user_id)?);
        self.client.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_path_requires_uuid() {
        assert_eq!(
            user_path("6f1c1d52-2f4e-4c86-9a55-0c3c7d1e9a10").unwrap(),
            "admin/users/6f1c1d52-2f4e-4c86-9a55-0c3c7d1e9a10"
        );
        assert!(user_path("../settings").is_err());
    }
}
