//! Authentication module: who is signed in, and where that survives restarts.
//!
//! This module provides:
//! - `SessionStore`: the single owner of authentication state
//! - `SessionStorage` backends: plain file, OS keychain, encrypted file, memory
//!
//! The persisted record is exactly `{user, accessToken, refreshToken, isAuthenticated}`.

pub mod session;
pub mod storage;

pub use session::{AuthError, SessionEvent, SessionState, SessionStore};
pub use storage::{
    EncryptedFileStorage, FileStorage, KeyringStorage, MemoryStorage, PersistedSession,
    SessionStorage,
};
