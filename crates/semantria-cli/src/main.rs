//! Semantria CLI - session management and signed calls from the terminal.
//!
//! Logs in once and reuses the cached session on later runs, so scripts can
//! call the API without sending the password every time.

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use semantria_core::auth::signature::{authorization_header, hash_secret};
use semantria_core::{ApiClient, AuthService, Config, HttpExecutor};

const ENV_USERNAME: &str = "SEMANTRIA_USERNAME";
const ENV_PASSWORD: &str = "SEMANTRIA_PASSWORD";

#[derive(Parser)]
#[command(name = "semantria", version, about = "Semantria session and signed request client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Get a session, reusing the cached one when still valid
    Login {
        #[arg(short, long)]
        username: Option<String>,
        /// Always create a new session
        #[arg(long)]
        fresh: bool,
    },
    /// Check a username and password without creating a session
    Check {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// Forget the cached session
    Logout,
    /// Print the Authorization header for a URL
    Sign {
        url: String,
        #[arg(long)]
        key: String,
        #[arg(long)]
        secret: String,
    },
    /// Perform a signed GET against the API host
    Get {
        path: String,
        #[arg(short, long)]
        username: Option<String>,
        /// Write the raw response bytes to stdout
        #[arg(long)]
        binary: bool,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    let config = Config::load()?.apply_env();
    let executor = HttpExecutor::from_config(&config).context("Failed to create HTTP client")?;
    let auth = AuthService::new(executor.clone(), &config);

    match cli.command {
        Command::Login { username, fresh } => {
            let username = resolve_username(username)?;
            let password = resolve_password()?;
            let session = auth.get_session(&username, &password, !fresh).await?;
            info!(username = %username, "Logged in");
            println!("session: {}", session.id);
            println!("key:     {}", session.api_key);
        }
        Command::Check { username } => {
            let username = resolve_username(username)?;
            let password = resolve_password()?;
            auth.authenticate(&username, &password).await?;
            println!("Credentials accepted");
        }
        Command::Logout => {
            auth.invalidate();
            println!("Cached session removed");
        }
        Command::Sign { url, key, secret } => {
            println!("{}", authorization_header(&url, &key, &hash_secret(&secret))?);
        }
        Command::Get { path, username, binary } => {
            let username = resolve_username(username)?;
            let password = resolve_password()?;
            let session = auth.get_session(&username, &password, true).await?;

            let client = ApiClient::new(executor, &config).with_session(session);
            if binary {
                let bytes = client.get_bytes(&path, &[]).await?;
                io::stdout().write_all(&bytes)?;
            } else {
                println!("{}", client.get_text(&path, &[]).await?);
            }
        }
    }

    Ok(())
}

fn resolve_username(username: Option<String>) -> Result<String> {
    if let Some(username) = username.or_else(|| std::env::var(ENV_USERNAME).ok()) {
        return Ok(username);
    }

    print!("Username: ");
    io::stdout().flush()?;

    let mut username = String::new();
    io::stdin().read_line(&mut username)?;
    let username = username.trim().to_string();
    if username.is_empty() {
        anyhow::bail!("Username required");
    }
    Ok(username)
}

fn resolve_password() -> Result<String> {
    if let Ok(password) = std::env::var(ENV_PASSWORD) {
        return Ok(password);
    }
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}
