//! Command handlers. Each one is a thin caller of the core services.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use applylikeprince_core::api::{LoginCredentials, RegisterProfile};
use applylikeprince_core::models::{ApplyRequest, PasswordChange, ProfileUpdate};
use applylikeprince_core::services::{
    ApplicationService, PlatformService, ResumeService, UserService,
};
use applylikeprince_core::utils::format_bytes;
use applylikeprince_core::{ApiClient, Config};
use tracing::{info, warn};

use crate::cli::{ApplicationCommand, Command, ProfileCommand, ResumeCommand};
use crate::output;

/// Number of recent applications shown on the dashboard
const DASHBOARD_RECENT_LIMIT: usize = 5;

pub async fn run(command: Command, client: &ApiClient, config: &mut Config) -> Result<()> {
    match command {
        Command::Login { email } => login(client, config, email).await,
        Command::Register { name, email, phone } => register(client, config, name, email, phone).await,
        Command::Logout => {
            client.session().logout().await;
            println!("Signed out.");
            Ok(())
        }
        Command::Whoami => whoami(client).await,
        Command::Dashboard => dashboard(client).await,
        Command::Profile { action } => profile(client, action).await,
        Command::Applications { action } => applications(client, action).await,
        Command::Resumes { action } => resumes(client, action).await,
        Command::Platforms { active } => platforms(client, active).await,
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn remember_email(config: &mut Config, email: &str) {
    config.last_email = Some(email.to_string());
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }
}

async fn login(client: &ApiClient, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = rpassword::prompt_password(format!("Password for {}: ", email))?;

    let session = client.session();
    session.login(&LoginCredentials::new(email.clone(), password)).await?;

    remember_email(config, &email);
    if let Some(user) = session.user().await {
        println!("Signed in as {}.", user.display_name());
    }
    Ok(())
}

async fn register(
    client: &ApiClient,
    config: &mut Config,
    full_name: String,
    email: String,
    phone: Option<String>,
) -> Result<()> {
    let password = rpassword::prompt_password("Choose a password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        bail!("Passwords do not match");
    }

    let profile = RegisterProfile {
        full_name,
        email: email.clone(),
        phone,
        password,
    };
    client.session().register(&profile).await?;

    remember_email(config, &email);
    println!("Account created. Signed in as {}.", email);
    Ok(())
}

async fn whoami(client: &ApiClient) -> Result<()> {
    let state = client.session().snapshot().await;
    match state.user {
        Some(ref user) if state.is_authenticated() => {
            println!("{}", user.display_name());
            if let Some(email) = user.email() {
                println!("{}", email);
            }
        }
        _ => println!("Not signed in."),
    }
    Ok(())
}

async fn dashboard(client: &ApiClient) -> Result<()> {
    let applications = ApplicationService::new(client.clone());
    let resumes = ResumeService::new(client.clone());

    let (stats, recent, resume_list) =
        futures::try_join!(applications.stats(), applications.recent(), resumes.list())?;

    println!("{}", output::stats_summary(&stats));
    println!();
    println!("Recent applications:");
    if recent.is_empty() {
        println!("  none yet");
    }
    for app in recent.iter().take(DASHBOARD_RECENT_LIMIT) {
        println!("{}", output::application_row(app));
    }
    println!();
    println!("Resumes: {}", resume_list.len());
    if let Some(primary) = resume_list.iter().find(|r| r.is_primary()) {
        println!("Primary: {}", primary.display_name());
    }
    Ok(())
}

async fn profile(client: &ApiClient, action: ProfileCommand) -> Result<()> {
    let users = UserService::new(client.clone());
    match action {
        ProfileCommand::Show => {
            let user = users.current().await?;
            println!("{}", output::profile(&user));
        }
        ProfileCommand::Update {
            name,
            phone,
            skills,
            experience,
            linkedin,
            github,
            portfolio,
        } => {
            let update = ProfileUpdate {
                full_name: name,
                phone,
                skills,
                experience,
                linkedin_url: linkedin,
                github_url: github,
                portfolio_url: portfolio,
                additional_info: None,
            };
            let user = users.update_profile(&update).await?;
            println!("{}", output::profile(&user));
        }
        ProfileCommand::Password => {
            let current_password = rpassword::prompt_password("Current password: ")?;
            let new_password = rpassword::prompt_password("New password: ")?;
            users
                .change_password(&PasswordChange {
                    current_password,
                    new_password,
                })
                .await?;
            println!("Password changed.");
        }
    }
    Ok(())
}

async fn applications(client: &ApiClient, action: ApplicationCommand) -> Result<()> {
    let applications = ApplicationService::new(client.clone());
    match action {
        ApplicationCommand::List { page, size } => {
            let page = applications.list(page, size).await?;
            for app in &page.content {
                println!("{}", output::application_row(app));
            }
            println!(
                "Page {} of {} ({} applications)",
                page.number + 1,
                page.total_pages.max(1),
                page.total_elements
            );
        }
        ApplicationCommand::Show { id } => {
            let app = applications.get(id).await?;
            println!("{}", output::application_detail(&app));
        }
        ApplicationCommand::Apply {
            resume,
            platforms,
            title,
            company,
            url,
            location,
            generate_cover_letter,
        } => {
            let request = ApplyRequest {
                resume_id: resume,
                platform_ids: platforms,
                job_title: title,
                company,
                job_url: url,
                location,
                custom_cover_letter: None,
                generate_cover_letter: generate_cover_letter.then_some(true),
            };
            let created = applications.apply(&request).await?;
            info!(count = created.len(), "Applications submitted");
            for app in &created {
                println!("{}", output::application_row(app));
            }
        }
        ApplicationCommand::Status { id, status } => {
            let app = applications.update_status(id, status).await?;
            println!("#{} is now {}", app.id, app.status);
        }
        ApplicationCommand::Delete { id } => {
            applications.delete(id).await?;
            println!("Deleted application #{}.", id);
        }
    }
    Ok(())
}

async fn resumes(client: &ApiClient, action: ResumeCommand) -> Result<()> {
    let resumes = ResumeService::new(client.clone());
    match action {
        ResumeCommand::List => {
            for resume in resumes.list().await? {
                println!("{}", output::resume_row(&resume));
            }
        }
        ResumeCommand::Show { id } => {
            let resume = resumes.get(id).await?;
            println!("{}", output::resume_detail(&resume));
        }
        ResumeCommand::Upload { path } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("resume")
                .to_string();
            let resume = resumes.upload(&file_name, bytes).await?;
            println!("{}", output::resume_detail(&resume));
        }
        ResumeCommand::Download { id, output } => {
            let bytes = resumes.download(id).await?;
            let target = match output {
                Some(path) => path,
                None => {
                    // Only the final component of the server-side name.
                    let resume = resumes.get(id).await?;
                    let name = Path::new(resume.display_name())
                        .file_name()
                        .map(|n| n.to_os_string())
                        .unwrap_or_else(|| format!("resume-{}", id).into());
                    PathBuf::from(name)
                }
            };
            std::fs::write(&target, &bytes)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            println!("Saved {} ({}).", target.display(), format_bytes(bytes.len() as u64));
        }
        ResumeCommand::Primary { id } => {
            let resume = resumes.set_primary(id).await?;
            println!("Primary resume: {}", resume.display_name());
        }
        ResumeCommand::Delete { id } => {
            resumes.delete(id).await?;
            println!("Deleted resume #{}.", id);
        }
    }
    Ok(())
}

async fn platforms(client: &ApiClient, active: bool) -> Result<()> {
    let platforms = PlatformService::new(client.clone());
    let list = if active {
        platforms.active().await?
    } else {
        platforms.list().await?
    };
    for platform in &list {
        println!("{}", output::platform_row(platform));
    }
    Ok(())
}
