//! API client: the single network egress point for feature code.
//!
//! Every request goes through one pipeline:
//! 1. attach the session's current access token as a bearer credential
//! 2. send
//! 3. on a 401 for a request not yet retried, refresh the session once and
//!    replay the same request with the new credential
//!
//! Anything else (other statuses, a second 401, network failures) is
//! returned to the caller unchanged.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::auth::HttpAuthApi;
use super::request::{ApiRequest, ApiResponse, FilePart, RequestOptions};
use super::transport::{ReqwestTransport, Transport};
use super::ApiError;
use crate::auth::{SessionStorage, SessionStore};
use crate::config::Config;

/// Clone is cheap - transport and session are shared behind `Arc`.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionStore>) -> Self {
        Self { transport, session }
    }

    /// Build the production stack from configuration: reqwest transport,
    /// session restored from `storage`, and a client bound to both.
    pub fn connect(config: &Config, storage: Arc<dyn SessionStorage>) -> Result<Self, ApiError> {
        let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new(
            config.api_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?);
        let auth = Arc::new(HttpAuthApi::new(Arc::clone(&transport)));
        let session = Arc::new(SessionStore::restore(auth, storage));
        Ok(Self::new(transport, session))
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Attach the current credential, if any. Returns the token that was attached.
    async fn authorize(&self, request: &mut ApiRequest) -> Result<Option<String>, ApiError> {
        let token = self.session.access_token().await;
        if let Some(ref token) = token {
            request.set_bearer(token)?;
        }
        Ok(token)
    }

    /// Run a request through the pipeline and return the successful response.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let sent_token = self.authorize(&mut request).await?;
        let response = self.transport.send(&request).await?;

        if response.status != StatusCode::UNAUTHORIZED || request.retried {
            return response.error_for_status();
        }

        let original = ApiError::from_status(response.status, &response.body);
        request.retried = true;
        debug!(method = %request.method, path = %request.path, "Unauthorized, attempting token refresh");

        if self.session.refresh_after_rejection(sent_token.as_deref()).await {
            // Re-read: the credential changed while we were suspended.
            self.authorize(&mut request).await?;
            debug!(method = %request.method, path = %request.path, "Replaying request with refreshed token");
            return self.transport.send(&request).await?.error_for_status();
        }

        warn!(method = %request.method, path = %request.path, "Session could not be refreshed, signing out");
        self.session.logout().await;
        self.session.request_login();
        Err(original)
    }

    // ===== Verb helpers =====

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::GET, path).with_options(options);
        self.execute(request).await?.json()
    }

    /// Binary response mode, e.g. file downloads.
    pub async fn get_bytes(&self, path: &str, options: RequestOptions) -> Result<Vec<u8>, ApiError> {
        let request = ApiRequest::new(Method::GET, path).with_options(options);
        Ok(self.execute(request).await?.into_bytes())
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::POST, path)
            .json(body)?
            .with_options(options);
        self.execute(request).await?.json()
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::PUT, path)
            .json(body)?
            .with_options(options);
        self.execute(request).await?.json()
    }

    /// PUT without a body
    pub async fn put_empty<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::PUT, path).with_options(options);
        self.execute(request).await?.json()
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::PATCH, path)
            .json(body)?
            .with_options(options);
        self.execute(request).await?.json()
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::DELETE, path).with_options(options);
        self.execute(request).await?.json()
    }

    /// Multipart POST with a single file part.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file: FilePart,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::new(Method::POST, path)
            .multipart(file)
            .with_options(options);
        self.execute(request).await?.json()
    }
}
