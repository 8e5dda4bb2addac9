//! Thin command-line front end for the rosterd API.
//!
//! Each command shape-checks its input before calling the server, the same
//! checks a signup form would run. A successful login stores the session in
//! a local JSON file.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Parser)]
#[command(
    name = "roster-cli",
    about = "Command-line client for the rosterd user registry"
)]
struct Cli {
    /// Base URL of the rosterd server.
    #[arg(long, env = "ROSTER_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// Where login session info is kept.
    #[arg(long, env = "ROSTER_SESSION_FILE", default_value = ".roster-session.json")]
    session_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new user.
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Must match --password.
        #[arg(long)]
        confirm_password: String,
    },
    /// Log in and store the session locally.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Reset the password for a registered email.
    ForgotPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        new_password: String,
        /// Must match --new-password.
        #[arg(long)]
        confirm_password: String,
    },
    /// Show the most recently registered user.
    LatestUser,
    /// Show the whole roster, oldest first.
    Users,
    /// Show the locally stored session, if any.
    Whoami,
}

/// Minimal session info, stored explicitly on disk rather than in ambient
/// state.
#[derive(Debug, Serialize, Deserialize)]
struct Session {
    token: String,
    username: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct RosterUser {
    username: String,
    email: String,
    created_at: String,
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_signup(
    username: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> anyhow::Result<()> {
    if username.trim().is_empty() {
        bail!("Invalid username");
    }
    if !is_valid_email(email.trim()) {
        bail!("Invalid email");
    }
    check_new_password(password, confirm_password)
}

fn check_new_password(password: &str, confirm_password: &str) -> anyhow::Result<()> {
    if password.len() < MIN_PASSWORD_LEN {
        bail!("Password must be at least {MIN_PASSWORD_LEN} characters");
    }
    if password != confirm_password {
        bail!("Passwords do not match");
    }
    Ok(())
}

/// Reads the `{"message": ...}` body every endpoint returns; errors carry the
/// server's message so the user sees the same text a form would show.
async fn expect_message(res: reqwest::Response) -> anyhow::Result<String> {
    let status = res.status();
    let body: serde_json::Value = res.json().await.unwrap_or_else(|_| json!({}));
    let message = body
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("no message from server")
        .to_string();
    if status.is_success() {
        Ok(message)
    } else {
        bail!("{message} ({status})")
    }
}

async fn fetch_users(client: &reqwest::Client, api_url: &str) -> anyhow::Result<Vec<RosterUser>> {
    let res = client
        .get(format!("{api_url}/api/users"))
        .send()
        .await
        .context("request users")?;
    if !res.status().is_success() {
        bail!("server returned {}", res.status());
    }
    res.json().await.context("decode users")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Command::Signup {
            username,
            email,
            password,
            confirm_password,
        } => {
            check_signup(&username, &email, &password, &confirm_password)?;
            let res = client
                .post(format!("{}/api/signup", cli.api_url))
                .json(&json!({
                    "username": username.trim(),
                    "email": email.trim(),
                    "password": password,
                }))
                .send()
                .await
                .context("request signup")?;
            println!("{}", expect_message(res).await?);
        }
        Command::Login { username, password } => {
            if username.is_empty() || password.is_empty() {
                bail!("Username and password are required");
            }
            let res = client
                .post(format!("{}/api/login", cli.api_url))
                .json(&json!({ "username": username, "password": password }))
                .send()
                .await
                .context("request login")?;
            let status = res.status();
            let body: serde_json::Value = res.json().await.unwrap_or_else(|_| json!({}));
            if !status.is_success() {
                let message = body
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("no message from server");
                bail!("{message} ({status})");
            }
            let session: Session =
                serde_json::from_value(body).context("decode login response")?;
            std::fs::write(&cli.session_file, serde_json::to_string_pretty(&session)?)
                .with_context(|| format!("write {}", cli.session_file.display()))?;
            println!(
                "Login successful, session saved to {}",
                cli.session_file.display()
            );
        }
        Command::ForgotPassword {
            email,
            new_password,
            confirm_password,
        } => {
            if !is_valid_email(email.trim()) {
                bail!("Invalid email");
            }
            check_new_password(&new_password, &confirm_password)?;
            let res = client
                .post(format!("{}/api/forgot-password", cli.api_url))
                .json(&json!({ "email": email.trim(), "newPassword": new_password }))
                .send()
                .await
                .context("request forgot-password")?;
            println!("{}", expect_message(res).await?);
        }
        Command::LatestUser => {
            let users = fetch_users(&client, &cli.api_url).await?;
            match users.last() {
                Some(u) => println!("{} <{}> registered {}", u.username, u.email, u.created_at),
                None => println!("No users registered yet"),
            }
        }
        Command::Users => {
            let users = fetch_users(&client, &cli.api_url).await?;
            if users.is_empty() {
                println!("No users registered yet");
            }
            for u in users {
                println!("{} <{}> registered {}", u.username, u.email, u.created_at);
            }
        }
        Command::Whoami => {
            let raw = std::fs::read_to_string(&cli.session_file)
                .with_context(|| format!("no session at {}", cli.session_file.display()))?;
            let session: Session = serde_json::from_str(&raw).context("decode session file")?;
            println!("{} <{}> (token: {})", session.username, session.email, session.token);
        }
    }

    Ok(())
}
