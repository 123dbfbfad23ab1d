//! # diy_api - Backend access for DIY Bot
//!
//! Everything the client needs from the backend's HTTP surface:
//!
//! - **Request client**: typed calls for projects, tools, house objects and
//!   step generation
//! - **Inventory service**: one shared, invalidating cache behind the house,
//!   toolroom and projects views
//! - **Step tracker**: progress through a project's execution plan
//! - **Configuration**: backend addresses from defaults, settings file and
//!   environment
//!
//! # Example
//!
//! ```rust,no_run
//! use diy_api::{ApiClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::load(&std::env::current_dir()?)?;
//!     let client = ApiClient::new(&config)?;
//!
//!     let created = client.create_project("replace my kitchen faucet").await?;
//!     println!("{}: {}", created.project_id, created.ai_response);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod inventory;
pub mod models;
pub mod steps;

pub use client::{ApiClient, HealthStatus};
pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use inventory::{InventoryKind, InventoryService, InventorySnapshot, ProjectRoute};
pub use models::*;
pub use steps::{StepAdvance, StepStatus, StepTracker};
