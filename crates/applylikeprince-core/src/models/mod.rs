//! Data models for backend payloads.
//!
//! - `UserRecord`: the opaque profile mapping held by the session
//! - `User`, `ProfileUpdate`: typed profile for `/users/me`
//! - `Application`, `ApplicationStatus`, `ApplyRequest`, `DashboardStats`
//! - `Resume`, `Platform`, `PlatformType`
//! - `Page<T>`: paged list envelope

pub mod application;
pub mod page;
pub mod platform;
pub mod resume;
pub mod user;

pub use application::{Application, ApplicationStatus, ApplyRequest, DashboardStats};
pub use page::Page;
pub use platform::{Platform, PlatformType};
pub use resume::Resume;
pub use user::{PasswordChange, ProfileUpdate, User, UserRecord};
