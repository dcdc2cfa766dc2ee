use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Lifecycle of a job application as tracked by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    InProgress,
    Submitted,
    Failed,
    Viewed,
    InterviewScheduled,
    Rejected,
    OfferReceived,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::Pending,
        ApplicationStatus::InProgress,
        ApplicationStatus::Submitted,
        ApplicationStatus::Failed,
        ApplicationStatus::Viewed,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::Rejected,
        ApplicationStatus::OfferReceived,
    ];

    /// Wire name, as sent in `{"status": ...}`
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::InProgress => "IN_PROGRESS",
            ApplicationStatus::Submitted => "SUBMITTED",
            ApplicationStatus::Failed => "FAILED",
            ApplicationStatus::Viewed => "VIEWED",
            ApplicationStatus::InterviewScheduled => "INTERVIEW_SCHEDULED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::OfferReceived => "OFFER_RECEIVED",
        }
    }

    /// No further automated progress is expected
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Failed | ApplicationStatus::Rejected | ApplicationStatus::OfferReceived
        )
    }
}

impl std::fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationStatus::Pending => write!(f, "Pending"),
            ApplicationStatus::InProgress => write!(f, "In Progress"),
            ApplicationStatus::Submitted => write!(f, "Submitted"),
            ApplicationStatus::Failed => write!(f, "Failed"),
            ApplicationStatus::Viewed => write!(f, "Viewed"),
            ApplicationStatus::InterviewScheduled => write!(f, "Interview Scheduled"),
            ApplicationStatus::Rejected => write!(f, "Rejected"),
            ApplicationStatus::OfferReceived => write!(f, "Offer Received"),
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    /// Accepts the wire name in any case, with `-` or `_` separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        ApplicationStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown application status: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    #[serde(rename = "platformId")]
    pub platform_id: i64,
    #[serde(rename = "platformName", default)]
    pub platform_name: Option<String>,
    #[serde(rename = "resumeId", default)]
    pub resume_id: Option<i64>,
    #[serde(rename = "jobTitle", default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(rename = "jobUrl", default)]
    pub job_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub status: ApplicationStatus,
    #[serde(rename = "coverLetter", default)]
    pub cover_letter: Option<String>,
    #[serde(rename = "appliedAt", default)]
    pub applied_at: Option<NaiveDateTime>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<NaiveDateTime>,
}

impl Application {
    /// "Title @ Company", with placeholders for missing parts
    pub fn headline(&self) -> String {
        let title = self.job_title.as_deref().unwrap_or("Untitled role");
        match self.company.as_deref() {
            Some(company) if !company.is_empty() => format!("{} @ {}", title, company),
            _ => title.to_string(),
        }
    }
}

/// Body of `POST /applications/apply`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub resume_id: i64,
    pub platform_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_cover_letter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_cover_letter: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_applications: i64,
    pub pending_applications: i64,
    pub submitted_applications: i64,
    pub interviews_scheduled: i64,
    pub offers_received: i64,
    pub rejections: i64,
    pub this_week_applications: i32,
    pub this_month_applications: i32,
}
