//! Backend authentication endpoints.
//!
//! These calls go straight to the transport. They never pass through the
//! client's refresh-and-replay pipeline, so a rejected refresh cannot
//! trigger another refresh.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::request::ApiRequest;
use super::transport::Transport;
use super::ApiError;
use crate::models::UserRecord;

#[derive(Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProfile {
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub password: String,
}

impl std::fmt::Debug for RegisterProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterProfile")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response of `/auth/login` and `/auth/register`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserRecord,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Access token lifetime in milliseconds, when the backend reports it
    #[serde(default)]
    pub expires_in: Option<i64>,
}

/// Response of `/auth/refresh`. Extra fields (user, expiry) are ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Login, registration and token refresh against the backend.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, ApiError>;

    async fn register(&self, profile: &RegisterProfile) -> Result<AuthResponse, ApiError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;
}

/// `AuthApi` over a `Transport`, unauthenticated.
#[derive(Clone)]
pub struct HttpAuthApi {
    transport: Arc<dyn Transport>,
}

impl HttpAuthApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn post<B: Serialize + Sync, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::POST, path).json(body)?;
        let response = self.transport.send(&request).await?.error_for_status()?;
        debug!(path = path, "Auth request succeeded");
        response.json()
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse, ApiError> {
        self.post("/auth/login", credentials).await
    }

    async fn register(&self, profile: &RegisterProfile) -> Result<AuthResponse, ApiError> {
        self.post("/auth/register", profile).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.post("/auth/refresh", &RefreshRequest { refresh_token }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_response() {
        let json = r#"{"accessToken":"tok1","refreshToken":"rtok1","tokenType":"Bearer","expiresIn":86400000,"user":{"id":1,"fullName":"A","email":"a@b.com"}}"#;
        let auth: AuthResponse = serde_json::from_str(json).expect("Failed to parse auth JSON");
        assert_eq!(auth.access_token, "tok1");
        assert_eq!(auth.refresh_token, "rtok1");
        assert_eq!(auth.user.id(), Some(1));
        assert_eq!(auth.expires_in, Some(86_400_000));
    }

    #[test]
    fn test_register_body_omits_missing_phone() {
        let profile = RegisterProfile {
            full_name: "A".to_string(),
            email: "a@b.com".to_string(),
            phone: None,
            password: "secret".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&profile).unwrap(),
            serde_json::json!({"fullName": "A", "email": "a@b.com", "password": "secret"})
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = LoginCredentials::new("a@b.com", "secret");
        let printed = format!("{:?}", credentials);
        assert!(printed.contains("a@b.com"));
        assert!(!printed.contains("secret"));
    }
}
