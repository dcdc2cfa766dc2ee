use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An uploaded resume. `extracted_*` fields are filled in by server-side parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resume {
    pub id: i64,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub original_file_name: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub extracted_name: Option<String>,
    #[serde(default)]
    pub extracted_email: Option<String>,
    #[serde(default)]
    pub extracted_phone: Option<String>,
    #[serde(default)]
    pub extracted_skills: Option<String>,
    #[serde(default)]
    pub extracted_experience: Option<String>,
    #[serde(default)]
    pub extracted_education: Option<String>,
    #[serde(default)]
    pub is_primary: Option<bool>,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
}

impl Resume {
    pub fn display_name(&self) -> &str {
        self.original_file_name
            .as_deref()
            .or(self.file_name.as_deref())
            .unwrap_or("resume")
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary.unwrap_or(false)
    }
}
