//! REST API client module for the applylikeprince backend.
//!
//! This module provides the `ApiClient` gateway used by all feature code,
//! the `Transport` seam it sends through, and the unauthenticated
//! `AuthApi` used by the session store for login, registration and refresh.
//!
//! Authenticated calls carry `Authorization: Bearer <access token>`.

pub mod auth;
pub mod client;
pub mod error;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use auth::{AuthApi, AuthResponse, HttpAuthApi, LoginCredentials, RegisterProfile, TokenPair};
pub use client::ApiClient;
pub use error::{ApiError, ErrorBody};
pub use request::{ApiRequest, ApiResponse, FilePart, RequestBody, RequestOptions};
pub use transport::{ReqwestTransport, Transport, REQUEST_TIMEOUT_SECS};
