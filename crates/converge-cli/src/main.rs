mod auth;
mod cli;
mod client;
mod commands;
mod config;
mod desired;
mod logging;
mod output;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use converge_core::ConvergeError;

use cli::{Cli, Commands};
use client::DnacClient;
use config::{ConfigDir, DEFAULT_LOG_LEVEL};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&error_message(&e));
        std::process::exit(1);
    }
}

/// Engine errors already carry their source in the message; everything
/// else prints its full context chain.
fn error_message(e: &anyhow::Error) -> String {
    match e.downcast_ref::<ConvergeError>() {
        Some(err) => {
            tracing::debug!(category = %err.category(), error = %err, "Run failed");
            err.to_string()
        }
        None => format!("{e:#}"),
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let profile = &cli.profile;
    let dir = ConfigDir::locate()?;
    let cfg = dir.load_profile(profile)?;

    let log_level = cli
        .log_level
        .as_deref()
        .or(cfg.log_level.as_deref())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    logging::init_logging(log_level);

    let format = match cli.format {
        Some(format) => format,
        None => cfg.output_format()?.unwrap_or_default(),
    };
    let timeout = cfg.timeout();

    match &cli.command {
        Commands::Apply(args) => {
            let client = make_client(&dir, &cli.server, profile, timeout)?;
            commands::apply::apply(&client, args, format).await?;
        }
        Commands::Plan(args) => {
            let client = make_client(&dir, &cli.server, profile, timeout)?;
            commands::apply::plan(&client, args, format).await?;
        }
        Commands::Inventory(args) => {
            let client = make_client(&dir, &cli.server, profile, timeout)?;
            commands::inventory::list(&client, args, format).await?;
        }
        Commands::Resources => {
            commands::resources::list(format)?;
        }
        Commands::Login(args) => {
            let server = dir.resolve_server(&cli.server, profile)?;
            commands::auth::login(&dir, &server, args, profile, timeout).await?;
        }
        Commands::Logout => {
            commands::auth::logout(&dir, profile)?;
        }
        Commands::Whoami => {
            commands::auth::whoami(&dir, profile)?;
        }
        Commands::Config(args) => match &args.command {
            cli::ConfigCommands::Show => {
                println!("{}: {}", "Profile".cyan(), profile);
                println!("{}: {}", "File".cyan(), dir.config_path().display());
                println!(
                    "{}: {}",
                    "Server".cyan(),
                    cfg.server.as_deref().unwrap_or("(not set)")
                );
                println!(
                    "{}: {}",
                    "Format".cyan(),
                    cfg.format.as_deref().unwrap_or("json")
                );
                println!(
                    "{}: {}",
                    "Log level".cyan(),
                    cfg.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
                );
                println!("{}: {}s", "Timeout".cyan(), cfg.timeout().as_secs());
            }
            cli::ConfigCommands::Set(set_args) => {
                let mut cfg = cfg.clone();
                cfg.set(&set_args.key, &set_args.value)?;
                dir.save_profile(profile, &cfg)?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
            }
        },
    }

    Ok(())
}

fn make_client(
    dir: &ConfigDir,
    cli_server: &Option<String>,
    profile: &str,
    timeout: Duration,
) -> Result<DnacClient> {
    let server = dir.resolve_server(cli_server, profile)?;
    let auth = auth::load_credentials(dir, profile)?.map(|creds| auth::AuthMethod::from(&creds));
    if auth.is_none() {
        tracing::warn!(profile, "No stored credentials, calling the controller unauthenticated");
    }
    DnacClient::new(&server, auth, timeout)
}
