use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use url::Url;

use crate::auth::{self, StoredCredentials};
use crate::cli::LoginArgs;
use crate::config::ConfigDir;
use crate::output::{print_error, print_success};

pub async fn login(
    dir: &ConfigDir,
    server: &str,
    args: &LoginArgs,
    profile: &str,
    timeout: Duration,
) -> Result<StoredCredentials> {
    Url::parse(server).with_context(|| format!("Invalid server URL: {server}"))?;

    let creds = match &args.token {
        Some(token) => StoredCredentials::Token {
            server: server.to_string(),
            token: token.clone(),
        },
        None => {
            let username = args
                .username
                .as_deref()
                .context("--username is required (or pass --token)")?;
            let password = args
                .password
                .as_deref()
                .context("--password is required (or pass --token)")?;

            if !args.no_verify {
                println!("Logging in as {username}...");
                let http = reqwest::Client::builder()
                    .timeout(timeout)
                    .build()
                    .context("Failed to build HTTP client")?;
                auth::exchange_token(&http, server, username, password).await?;
            }

            StoredCredentials::Basic {
                server: server.to_string(),
                username: username.to_string(),
                password: password.to_string(),
            }
        }
    };

    auth::save_credentials(dir, profile, &creds)?;
    match &creds {
        StoredCredentials::Basic { username, .. } => print_success(&format!(
            "Saved credentials for {} (user: {})",
            server.cyan(),
            username.cyan()
        )),
        StoredCredentials::Token { .. } => {
            print_success(&format!("Saved session token for {}", server.cyan()))
        }
    }
    Ok(creds)
}

pub fn logout(dir: &ConfigDir, profile: &str) -> Result<()> {
    if auth::remove_credentials(dir, profile)? {
        print_success("Logged out (credentials removed)");
    } else {
        println!("No credentials found for profile \"{profile}\"");
    }
    Ok(())
}

pub fn whoami(dir: &ConfigDir, profile: &str) -> Result<()> {
    match auth::load_credentials(dir, profile)? {
        Some(creds) => {
            println!("{}: {}", "Profile".cyan(), profile);
            println!("{}: {}", "Server".cyan(), creds.server().cyan());
            match &creds {
                StoredCredentials::Basic { username, .. } => {
                    println!("{}: Basic (user: {})", "Auth".cyan(), username);
                }
                StoredCredentials::Token { token, .. } => {
                    println!("{}: Token ({})", "Auth".cyan(), token_preview(token));
                }
            }
        }
        None => {
            print_error(&format!("Not logged in (profile: \"{profile}\")"));
        }
    }
    Ok(())
}

/// First and last eight characters of long tokens, short ones fully masked.
fn token_preview(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() > 20 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 8..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "*".repeat(chars.len())
    }
}
