//! House and toolroom commands - Show an inventory.

use anyhow::Result;
use clap::Args;

use diy_api::{InventoryKind, InventoryService};

use super::App;
use crate::views::render;

#[derive(Args)]
pub struct InventoryArgs {
    /// Print the raw records as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(kind: InventoryKind, args: InventoryArgs, app: &App) -> Result<()> {
    show(&app.inventory, kind, &args).await
}

/// Reload one inventory and print it.
pub(crate) async fn show(service: &InventoryService, kind: InventoryKind, args: &InventoryArgs) -> Result<()> {
    let snapshot = service.open(kind).await;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render::inventory(&snapshot));
    }
    Ok(())
}
