//! Plain-text rendering of backend records.

use applylikeprince_core::models::{Application, DashboardStats, Platform, Resume, User};
use applylikeprince_core::utils::{format_bytes, truncate};
use chrono::{Local, NaiveDateTime};

/// Width of the headline column in application listings
const HEADLINE_WIDTH: usize = 40;

/// Relative age like "5m ago", "3h ago", "2d ago"
pub fn format_age(then: NaiveDateTime, now: NaiveDateTime) -> String {
    let minutes = (now - then).num_minutes();
    if minutes < 1 {
        // Includes clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / 1440)
    }
}

fn age(then: Option<NaiveDateTime>) -> String {
    then.map(|t| format_age(t, Local::now().naive_local()))
        .unwrap_or_else(|| "-".to_string())
}

pub fn application_row(app: &Application) -> String {
    format!(
        "{:>6}  {:<width$}  {:<14}  {:<20}  {}",
        app.id,
        truncate(&app.headline(), HEADLINE_WIDTH),
        app.platform_name.as_deref().unwrap_or("-"),
        app.status.to_string(),
        age(app.applied_at.or(app.created_at)),
        width = HEADLINE_WIDTH,
    )
}

pub fn application_detail(app: &Application) -> String {
    let mut lines = vec![
        format!("Application #{}", app.id),
        format!("  Role:      {}", app.headline()),
        format!("  Platform:  {}", app.platform_name.as_deref().unwrap_or("-")),
        format!("  Status:    {}", app.status),
    ];
    if let Some(ref location) = app.location {
        lines.push(format!("  Location:  {}", location));
    }
    if let Some(ref url) = app.job_url {
        lines.push(format!("  URL:       {}", url));
    }
    if let Some(resume_id) = app.resume_id {
        lines.push(format!("  Resume:    #{}", resume_id));
    }
    lines.push(format!("  Applied:   {}", age(app.applied_at)));
    if let Some(ref letter) = app.cover_letter {
        lines.push(String::new());
        lines.push(letter.clone());
    }
    lines.join("\n")
}

pub fn resume_row(resume: &Resume) -> String {
    format!(
        "{:>6}  {} {:<36}  {:>9}  {}",
        resume.id,
        if resume.is_primary() { "*" } else { " " },
        truncate(resume.display_name(), 36),
        resume.file_size.map(format_bytes).unwrap_or_default(),
        age(resume.created_at),
    )
}

pub fn resume_detail(resume: &Resume) -> String {
    let fields = [
        ("Name", &resume.extracted_name),
        ("Email", &resume.extracted_email),
        ("Phone", &resume.extracted_phone),
        ("Skills", &resume.extracted_skills),
        ("Experience", &resume.extracted_experience),
        ("Education", &resume.extracted_education),
    ];
    let mut lines = vec![format!(
        "Resume #{} {}{}",
        resume.id,
        resume.display_name(),
        if resume.is_primary() { " (primary)" } else { "" }
    )];
    for (label, value) in fields {
        if let Some(value) = value {
            lines.push(format!("  {:<11} {}", format!("{}:", label), value));
        }
    }
    lines.join("\n")
}

pub fn platform_row(platform: &Platform) -> String {
    format!(
        "{:>4}  {:<24}  {:<12}  {}",
        platform.id,
        platform.label(),
        platform
            .platform_type
            .map(|t| t.to_string())
            .unwrap_or_default(),
        if platform.requires_login.unwrap_or(false) { "login required" } else { "" },
    )
}

pub fn stats_summary(stats: &DashboardStats) -> String {
    format!(
        "Applications: {} total, {} pending, {} submitted\n\
         Interviews:   {}   Offers: {}   Rejections: {}\n\
         This week:    {}   This month: {}",
        stats.total_applications,
        stats.pending_applications,
        stats.submitted_applications,
        stats.interviews_scheduled,
        stats.offers_received,
        stats.rejections,
        stats.this_week_applications,
        stats.this_month_applications,
    )
}

pub fn profile(user: &User) -> String {
    let mut lines = vec![format!("{} <{}>", user.full_name, user.email)];
    let optional = [
        ("Phone", &user.phone),
        ("Skills", &user.skills),
        ("Experience", &user.experience),
        ("LinkedIn", &user.linkedin_url),
        ("GitHub", &user.github_url),
        ("Portfolio", &user.portfolio_url),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            lines.push(format!("  {:<11} {}", format!("{}:", label), value));
        }
    }
    lines.join("\n")
}
