use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlatformType {
    JobPortal,
    CompanyCareerPage,
    Freelance,
    Networking,
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformType::JobPortal => write!(f, "Job Portal"),
            PlatformType::CompanyCareerPage => write!(f, "Career Page"),
            PlatformType::Freelance => write!(f, "Freelance"),
            PlatformType::Networking => write!(f, "Networking"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    pub id: i64,
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "logoUrl", default)]
    pub logo_url: Option<String>,
    #[serde(rename = "baseUrl", default)]
    pub base_url: Option<String>,
    #[serde(rename = "type", default)]
    pub platform_type: Option<PlatformType>,
    #[serde(rename = "requiresLogin", default)]
    pub requires_login: Option<bool>,
}

impl Platform {
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}
