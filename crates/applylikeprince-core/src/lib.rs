//! Core library for the applylikeprince client.
//!
//! - `auth`: the `SessionStore` (who is signed in) and its persistence backends
//! - `api`: the `ApiClient` gateway with transparent refresh-and-replay on 401
//! - `services`: typed wrappers for users, resumes, platforms and applications
//! - `models`: backend payload types
//! - `config`: on-disk configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{SessionEvent, SessionStore};
pub use config::Config;
