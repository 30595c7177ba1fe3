//! Headless commands that run without the terminal UI.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use expensetrack_core::api::{require_session, ExpenseClient, IdentityClient};
use expensetrack_core::auth::{FileSessionStore, SessionManager, SystemClock};
use expensetrack_core::config::Config;
use expensetrack_core::expenses::write_csv;
use expensetrack_core::forms;
use expensetrack_core::utils::{format_money, format_remaining};

use crate::app::user_message;

/// A command given on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Logout,
    Login,
    ExportCsv(String),
}

impl Command {
    /// `None` means start the interactive UI.
    pub fn parse(args: &[String]) -> Result<Option<Self>> {
        match args.get(1).map(String::as_str) {
            None => Ok(None),
            Some("--status") => Ok(Some(Command::Status)),
            Some("--logout") => Ok(Some(Command::Logout)),
            Some("--login") => Ok(Some(Command::Login)),
            Some("--export-csv") => {
                let path = args
                    .get(2)
                    .context("--export-csv needs a destination path")?;
                Ok(Some(Command::ExportCsv(path.clone())))
            }
            Some(other) => anyhow::bail!(
                "Unknown option {}. Use --status, --login, --logout or --export-csv <path>",
                other
            ),
        }
    }
}

fn session_manager(config: &Config) -> Result<SessionManager> {
    Ok(SessionManager::restore(
        Arc::new(FileSessionStore::new(config.cache_dir()?)),
        Arc::new(SystemClock),
        config.session_duration(),
    ))
}

pub async fn run(command: Command, config: Config) -> Result<()> {
    let sessions = session_manager(&config)?;
    let result = match command {
        Command::Status => status(&sessions),
        Command::Logout => {
            sessions.logout();
            println!("Logged out");
            Ok(())
        }
        Command::Login => login(&sessions, &config).await,
        Command::ExportCsv(path) => export_csv(&sessions, &config, Path::new(&path)).await,
    };
    // Keep the persisted session for the next run.
    sessions.shutdown();
    result
}

fn status(sessions: &SessionManager) -> Result<()> {
    match sessions.current_session() {
        Some(session) => println!(
            "Logged in as {} (expires in {})",
            session.user_id,
            format_remaining(session.seconds_until_expiry(sessions.now()))
        ),
        None => println!("Not logged in"),
    }
    Ok(())
}

async fn login(sessions: &SessionManager, config: &Config) -> Result<()> {
    let default_email = config.last_email.clone().unwrap_or_default();
    if default_email.is_empty() {
        print!("Email: ");
    } else {
        print!("Email [{}]: ", default_email);
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let email = match input.trim() {
        "" => default_email,
        typed => typed.to_string(),
    };
    let password = rpassword::prompt_password("Password: ")?;
    forms::validate_login(&email, &password)?;

    println!("\nAuthenticating...");
    let identity = IdentityClient::new(config.identity_url(), config.api_key.clone())?;
    let auth = identity
        .sign_in(&email, &password)
        .await
        .map_err(|e| anyhow::anyhow!(user_message(&e)))?;

    let session = sessions.login(auth.token, auth.user_id);
    if let Ok(path) = Config::config_path() {
        Config::update_file(&path, |c| c.last_email = Some(auth.email))?;
    }
    info!("Headless login complete");
    println!(
        "Login successful! Session valid for {}",
        format_remaining(session.seconds_until_expiry(sessions.now()))
    );
    Ok(())
}

async fn export_csv(sessions: &SessionManager, config: &Config, path: &Path) -> Result<()> {
    let session = require_session(sessions).context("Not logged in. Run with --login first.")?;
    let client = ExpenseClient::new(config.database_url()?)?;
    let expenses = client
        .list(&session)
        .await
        .map_err(|e| anyhow::anyhow!(user_message(&e)))?;

    write_csv(path, &expenses)?;
    let total: f64 = expenses.iter().map(|e| e.money).sum();
    println!(
        "Exported {} expenses (total {}) to {}",
        expenses.len(),
        format_money(total),
        path.display()
    );
    Ok(())
}
