use tracing::debug;

use crate::api::{ApiClient, ApiError, RequestOptions};
use crate::models::{PasswordChange, ProfileUpdate, User};

#[derive(Clone)]
pub struct UserService {
    client: ApiClient,
}

impl UserService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetch the signed-in user's profile
    pub async fn current(&self) -> Result<User, ApiError> {
        self.client.get("/users/me", RequestOptions::new()).await
    }

    /// Update the profile and merge the saved result into the session's user record.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let user: User = self
            .client
            .put("/users/me", update, RequestOptions::new())
            .await?;

        match serde_json::to_value(&user) {
            Ok(serde_json::Value::Object(fields)) => self.client.session().update_user(fields).await,
            _ => debug!("Profile response was not an object, session user left as is"),
        }
        Ok(user)
    }

    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .client
            .post("/auth/change-password", change, RequestOptions::new())
            .await?;
        Ok(())
    }
}
