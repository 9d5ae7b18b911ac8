use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{DashboardRepository, DashboardViewModel, HttpMarketPulseApi};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod render;

use commands::{parse_command, DashboardCommand, HELP_TEXT};

#[derive(Parser, Debug)]
#[command(name = "marketpulse-dashboard", about = "MarketPulse AI KPI and insights dashboard")]
struct Args {
    /// Backend base URL; overrides the settings file and MARKETPULSE_SERVER_URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Settings file to read instead of ./marketpulse.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Load once, print the dashboard and exit.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = config::load_settings(args.config.as_deref(), args.server_url.as_deref())?;
    let api = HttpMarketPulseApi::new(&settings.server_url)
        .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
    tracing::info!(server_url = %api.base_url(), "starting dashboard");

    let view_model = DashboardViewModel::new(DashboardRepository::new(Arc::new(api)));

    if args.once {
        run_once(&view_model).await
    } else {
        run_interactive(&view_model).await?;
        Ok(ExitCode::SUCCESS)
    }
}

async fn run_once(view_model: &DashboardViewModel) -> Result<ExitCode> {
    let mut rx = view_model.subscribe();
    let state = rx
        .wait_for(|state| !state.is_loading)
        .await
        .context("dashboard closed before loading finished")?
        .clone();

    println!("{}", render::render(&state, view_model.org_id()));
    Ok(if state.error.is_some() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn run_interactive(view_model: &DashboardViewModel) -> Result<()> {
    let mut rx = view_model.subscribe();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    let initial = rx.borrow_and_update().clone();
    println!("{}\n", render::render(&initial, view_model.org_id()));

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                println!("{}\n", render::render(&state, view_model.org_id()));
            }
            line = stdin.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Some(DashboardCommand::Refresh) => view_model.load_dashboard(),
                    Some(DashboardCommand::Quit) => break,
                    Some(DashboardCommand::Help) => println!("{HELP_TEXT}"),
                    Some(DashboardCommand::Unknown(input)) => {
                        println!("Unknown command '{input}'. {HELP_TEXT}");
                    }
                    None => {}
                }
            }
        }
    }

    view_model.cancel();
    Ok(())
}
