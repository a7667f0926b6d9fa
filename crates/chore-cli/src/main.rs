use anyhow::{anyhow, Context, Result};
use chore_core::db;
use chore_core::error::CoreError;
use chore_core::push::PushDispatcher;
use chore_core::repository::SqliteRepository;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::Config;

mod cli;
mod commands;
mod config;
mod util;
mod views;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(path) = cli.config.as_deref() {
        if !path.exists() {
            return Err(anyhow!("config file {} does not exist", path.display()));
        }
    }
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config);

    // Previews need no database
    if let Commands::Next(command) = cli.command {
        return commands::next::preview_next(command);
    }

    let pool = db::establish_connection(&config.database_path).await?;
    let repo = Arc::new(SqliteRepository::new(pool));
    let dispatcher = Arc::new(PushDispatcher::from_config(repo.clone(), &config.push)?);

    match cli.command {
        Commands::Serve => commands::serve::serve(repo, dispatcher, &config).await,
        Commands::Sweep(command) => commands::sweep::run_sweep(repo, dispatcher, command, &config).await,
        Commands::Complete(command) => commands::complete::complete_task(&*repo, command).await,
        Commands::Next(_) => Ok(()),
        Commands::Nudge(command) => commands::notify::nudge(repo, dispatcher, command).await,
        Commands::Transfer(command) => commands::notify::transfer(repo, dispatcher, command).await,
        Commands::TestPush(command) => commands::notify::test_push(repo, dispatcher, command).await,
        Commands::Household(command) => {
            commands::household::household_command(&*repo, command, &config).await
        }
        Commands::Member(command) => commands::member::member_command(&*repo, command).await,
        Commands::Task(command) => commands::task::task_command(&*repo, command).await,
        Commands::Device(command) => commands::device::device_command(&*repo, command).await,
    }
}

/// Logs go to stderr so command output stays pipeable. `RUST_LOG` wins over
/// the configured level.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", config.log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::AmbiguousId(candidates) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, name) in candidates {
                    eprintln!("  {} ({})", id.yellow(), name);
                }
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidTimezone(tz) => {
                eprintln!(
                    "{} Unknown time zone '{}'. Use an IANA name such as Europe/Zurich.",
                    "Error:".style(error_style),
                    tz.yellow()
                );
            }
            CoreError::CorruptRule(s) => {
                eprintln!("{} Invalid recurrence rule: {}", "Error:".style(error_style), s);
            }
            _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
