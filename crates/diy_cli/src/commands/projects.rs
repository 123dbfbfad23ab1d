//! Projects command - List projects or open one.

use anyhow::Result;
use clap::Args;
use tracing::info;

use diy_api::{ApiError, InventoryKind};

use super::inventory::{self, InventoryArgs};
use super::App;
use crate::views::Route;

#[derive(Args)]
pub struct ProjectsArgs {
    #[command(flatten)]
    inventory: InventoryArgs,

    /// Open this project in its planning or execution view
    #[arg(long, value_name = "PROJECT_ID")]
    select: Option<String>,
}

pub async fn execute(args: ProjectsArgs, app: &mut App) -> Result<()> {
    let Some(project_id) = args.select else {
        return inventory::show(&app.inventory, InventoryKind::Projects, &args.inventory).await;
    };

    app.inventory.invalidate(InventoryKind::Projects);
    let route = Route::from(app.inventory.select_project(&project_id).await);
    info!("Selected project {} -> {:?}", project_id, route);
    let unknown = route == Route::Home;
    super::navigate(route, app).await?;
    if unknown {
        return Err(ApiError::ProjectNotFound(project_id).into());
    }
    Ok(())
}
