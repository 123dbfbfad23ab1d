//! Start command - Describe a project and start planning it.

use anyhow::{Context, Result};
use clap::Args;
use tokio::io::{AsyncBufRead, Lines};
use tracing::info;

use diy_api::{ApiError, InventoryKind};

use super::App;
use crate::views::landing::{Landing, StartOutcome};
use crate::views::Route;

#[derive(Args)]
pub struct StartArgs {
    /// What you want to do, e.g. "fix squeaky door" (prompted for if omitted)
    description: Vec<String>,

    /// Create the project without opening the planning chat
    #[arg(long)]
    no_chat: bool,
}

pub async fn execute(args: StartArgs, app: &mut App) -> Result<()> {
    let description = if args.description.is_empty() {
        prompt_description(&mut app.input).await?
    } else {
        args.description.join(" ")
    };

    let mut landing = Landing::new(app.client().clone());

    println!("🛠️  Creating project...");
    match landing.start_project(&description).await {
        StartOutcome::Ignored => Err(ApiError::EmptyDescription.into()),
        StartOutcome::Failed { alert, cause } => Err(anyhow::Error::new(cause).context(alert)),
        StartOutcome::Navigate(route) => {
            app.inventory.invalidate(InventoryKind::Projects);
            if let Route::Planning { project_id, .. } = &route {
                info!("Project {} ready for planning", project_id);
                println!("✅ Project created: {}", project_id);
                if args.no_chat {
                    println!("   Continue with: diybot plan {}", project_id);
                    return Ok(());
                }
            }
            super::navigate(route, app).await
        }
    }
}

pub(crate) async fn prompt_description<R>(input: &mut Lines<R>) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    println!("What DIY project can I help you with today?");
    println!("(e.g. 'unclog my kitchen sink', 'build a bookshelf', 'fix squeaky door')");
    let line = input
        .next_line()
        .await
        .context("Failed to read project description")?;
    Ok(line.unwrap_or_default())
}
