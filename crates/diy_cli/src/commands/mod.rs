//! CLI command definitions.
//!
//! Each subcommand is one view of the DIY Bot client: the landing page,
//! the three inventories, the planning and execution chats, and a backend
//! health check.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use diy_api::config::{ENV_API_URL, ENV_TIMEOUT_SECS, ENV_WS_URL};
use diy_api::{ApiClient, ApiError, ClientConfig, InventoryService, Project};

use crate::views::chat::{self, StdinLines};
use crate::views::Route;

pub mod execute;
pub mod health;
pub mod inventory;
pub mod plan;
pub mod projects;
pub mod start;

/// DIY Bot - AI assistant for home DIY projects
#[derive(Parser)]
#[command(name = "diybot")]
#[command(version, about = "DIY Bot - AI assistant for home DIY projects")]
#[command(long_about = r#"
DIY Bot helps you plan and carry out home DIY projects with an AI assistant
that knows your house and your toolroom.

VIEWS:
  start      → Describe a project and start planning it
  house      → Show the house objects the assistant knows about
  tools      → Show your toolroom
  projects   → List projects, or open one with --select
  plan       → Planning chat for a project (/generate builds the steps)
  execute    → Step-by-step execution chat (/done completes a step)
  health     → Check that the backend is reachable

CONFIGURATION (lowest to highest precedence):
  defaults → .diybot/settings.toml → DIYBOT_* environment → flags

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid input
  3 - Backend unreachable or HTTP failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Backend HTTP base URL
    #[arg(long, global = true, env = ENV_API_URL)]
    pub api_url: Option<String>,

    /// Backend WebSocket URL
    #[arg(long, global = true, env = ENV_WS_URL)]
    pub ws_url: Option<String>,

    /// HTTP request timeout in seconds (0 disables it)
    #[arg(long, global = true, env = ENV_TIMEOUT_SECS)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Describe a new project and start planning it
    Start(start::StartArgs),

    /// Show house objects
    House(inventory::InventoryArgs),

    /// Show the toolroom
    Tools(inventory::InventoryArgs),

    /// List projects or open one
    Projects(projects::ProjectsArgs),

    /// Planning chat for a project
    Plan(plan::PlanArgs),

    /// Execution chat for a project with steps
    Execute(execute::ExecuteArgs),

    /// Check backend health
    Health(health::HealthArgs),
}

impl Cli {
    /// Client configuration with command-line flags applied last.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let root = std::env::current_dir()?;
        let mut config = ClientConfig::load(&root).context("Failed to load configuration")?;

        if let Some(url) = &self.api_url {
            config = config.api_base_url(url);
        }
        if let Some(url) = &self.ws_url {
            config = config.ws_url(url);
        }
        if let Some(secs) = self.timeout {
            config = config.request_timeout_secs(secs);
        }
        Ok(config)
    }
}

/// What every view shares for the life of the process.
pub struct App {
    pub config: ClientConfig,
    /// The one inventory service all views read through
    pub inventory: Arc<InventoryService>,
    /// The one stdin reader all prompts and chats read from
    pub input: StdinLines,
}

impl App {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = ApiClient::new(&config).context("Failed to create API client")?;
        Ok(Self {
            config,
            inventory: Arc::new(InventoryService::new(client)),
            input: chat::stdin_lines(),
        })
    }

    pub fn client(&self) -> &ApiClient {
        self.inventory.client()
    }
}

/// Open the view a route points at.
pub async fn navigate(route: Route, app: &mut App) -> Result<()> {
    match route {
        Route::Home => {
            println!("🏠 Back to home. Run `diybot start` to begin a new project.");
            Ok(())
        }
        Route::Planning {
            project_id,
            initial_message,
        } => plan::run(app, &project_id, initial_message).await,
        Route::Execution { project_id } => execute::run(app, &project_id, None).await,
    }
}

/// Load a project for a chat view, sending the user home when it is gone.
pub(crate) async fn load_project(inventory: &InventoryService, project_id: &str) -> Result<Project> {
    match inventory.find_project(project_id).await {
        Ok(project) => Ok(project),
        Err(e @ ApiError::ProjectNotFound(_)) => {
            println!("🏠 Project not found, returning home.");
            Err(e.into())
        }
        Err(e) => {
            println!("🏠 Could not load the project, returning home.");
            Err(anyhow::Error::new(e).context("Failed to load project"))
        }
    }
}
