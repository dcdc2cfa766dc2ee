//! Feature services: typed wrappers over `ApiClient`, one per backend resource.
//!
//! Services never handle tokens; the client attaches and renews them.

pub mod applications;
pub mod platforms;
pub mod resumes;
pub mod users;

pub use applications::ApplicationService;
pub use platforms::PlatformService;
pub use resumes::ResumeService;
pub use users::UserService;
