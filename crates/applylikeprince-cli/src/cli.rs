//! Command-line arguments.

use std::path::PathBuf;

use applylikeprince_core::config::StorageKind;
use applylikeprince_core::models::ApplicationStatus;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "applylikeprince", version, about = "Track resumes and job applications from the terminal")]
pub struct Cli {
    /// Backend base URL (overrides config and APPLY_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Session storage backend: file, keyring, encrypted or memory
    #[arg(long, global = true)]
    pub storage: Option<StorageKind>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Sign out and forget stored credentials
    Logout,
    /// Show who is signed in
    Whoami,
    /// Application stats, recent applications and resumes
    Dashboard,
    /// View or edit your profile
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },
    /// Job applications
    #[command(alias = "apps")]
    Applications {
        #[command(subcommand)]
        action: ApplicationCommand,
    },
    /// Uploaded resumes
    Resumes {
        #[command(subcommand)]
        action: ResumeCommand,
    },
    /// Job platforms
    Platforms {
        /// Only platforms currently accepting applications
        #[arg(long)]
        active: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProfileCommand {
    Show,
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        skills: Option<String>,
        #[arg(long)]
        experience: Option<String>,
        #[arg(long)]
        linkedin: Option<String>,
        #[arg(long)]
        github: Option<String>,
        #[arg(long)]
        portfolio: Option<String>,
    },
    /// Change your password (prompts for current and new)
    Password,
}

#[derive(Debug, Subcommand)]
pub enum ApplicationCommand {
    List {
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = applylikeprince_core::services::applications::DEFAULT_PAGE_SIZE)]
        size: u32,
    },
    Show {
        id: i64,
    },
    /// Apply to a job on one or more platforms
    Apply {
        #[arg(long)]
        resume: i64,
        #[arg(long = "platform", required = true)]
        platforms: Vec<i64>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// Let the backend write a cover letter
        #[arg(long)]
        generate_cover_letter: bool,
    },
    Status {
        id: i64,
        status: ApplicationStatus,
    },
    Delete {
        id: i64,
    },
}

#[derive(Debug, Subcommand)]
pub enum ResumeCommand {
    List,
    Show {
        id: i64,
    },
    Upload {
        path: PathBuf,
    },
    Download {
        id: i64,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Make a resume the default for new applications
    Primary {
        id: i64,
    },
    Delete {
        id: i64,
    },
}
