//! DIY Bot CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid input (empty description, unknown project, bad config)
//! - 3: Backend unreachable or HTTP failure

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use diy_api::{ApiError, InventoryKind};
use diy_chat::ChatError;

mod commands;
mod views;

use commands::{App, Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_INPUT: u8 = 2;
    pub const BACKEND_ERROR: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let directives = if cli.quiet {
        "error"
    } else if cli.verbose {
        "diybot=debug,diy_api=debug,diy_chat=debug,warn"
    } else {
        "diybot=info,warn"
    };
    // RUST_LOG wins over the flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let result = run(cli).await;

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut app = App::new(cli.client_config()?)?;
    if !matches!(cli.command, Commands::Health(_)) {
        app.inventory.load_all().await;
    }

    match cli.command {
        Commands::Start(args) => commands::start::execute(args, &mut app).await,
        Commands::House(args) => commands::inventory::execute(InventoryKind::House, args, &app).await,
        Commands::Tools(args) => {
            commands::inventory::execute(InventoryKind::Toolroom, args, &app).await
        }
        Commands::Projects(args) => commands::projects::execute(args, &mut app).await,
        Commands::Plan(args) => commands::plan::execute(args, &mut app).await,
        Commands::Execute(args) => commands::execute::execute(args, &mut app).await,
        Commands::Health(args) => commands::health::execute(args, &app).await,
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<ApiError>() {
            return match err {
                ApiError::EmptyDescription
                | ApiError::ProjectNotFound(_)
                | ApiError::NoSteps(_)
                | ApiError::Config(_) => ExitCodes::INVALID_INPUT,
                ApiError::Status { .. } | ApiError::Http(_) | ApiError::Decode { .. } => {
                    ExitCodes::BACKEND_ERROR
                }
                ApiError::Io(_) => ExitCodes::GENERAL_ERROR,
            };
        }
        if let Some(err) = cause.downcast_ref::<ChatError>() {
            return if err.is_input_rejection() {
                ExitCodes::INVALID_INPUT
            } else {
                ExitCodes::BACKEND_ERROR
            };
        }
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("not found") || msg.contains("invalid") {
        ExitCodes::INVALID_INPUT
    } else if msg.contains("backend") || msg.contains("connection") {
        ExitCodes::BACKEND_ERROR
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
