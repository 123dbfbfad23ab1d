//! Plan command - Planning chat for a project.
//!
//! The assistant asks about the project until the user is ready; `/generate`
//! then builds the step plan and moves to the execution view.

use anyhow::Result;
use clap::Args;
use tracing::{error, info};

use diy_api::{InventoryKind, ProjectStatus};
use diy_chat::{MessageContext, SessionState};

use super::App;
use crate::views::chat::{ChatAction, ChatView};

#[derive(Args)]
pub struct PlanArgs {
    /// Project to plan
    project_id: String,

    /// Assistant greeting to open the chat with
    #[arg(long)]
    message: Option<String>,
}

pub async fn execute(args: PlanArgs, app: &mut App) -> Result<()> {
    run(app, &args.project_id, args.message).await
}

/// Whether step generation may be requested right now.
pub fn can_generate(status: ProjectStatus, session: SessionState) -> bool {
    status == ProjectStatus::Planning && session != SessionState::AwaitingReply
}

pub async fn run(app: &mut App, project_id: &str, initial_message: Option<String>) -> Result<()> {
    let project = super::load_project(&app.inventory, project_id).await?;

    println!("📝 {} ({})", project.title, project.status);
    println!("   {}", project.description);
    if project.is_planning() {
        println!("   Ready for step generation: type /generate when you are done planning.");
    }

    let initial = initial_message.or_else(|| project.initial_ai_message.clone());
    let mut chat = ChatView::open(&app.config, MessageContext::project(&project.id), initial).await;

    loop {
        match chat.next_action(&mut app.input).await? {
            ChatAction::Generate => {
                if !project.is_planning() {
                    println!("ℹ️  Steps were already generated. Run: diybot execute {}", project.id);
                    continue;
                }
                if !can_generate(project.status, chat.session().state()) {
                    println!("⏳ Wait for the assistant to reply first.");
                    continue;
                }

                println!("🔧 Generating steps...");
                let generated = app.client().generate_steps(&project.id).await;
                match generated {
                    Ok(generated) => {
                        info!("Generated steps for project {}", project.id);
                        app.inventory.invalidate(InventoryKind::Projects);
                        chat.close().await;
                        return super::execute::run(app, &project.id, Some(generated)).await;
                    }
                    Err(e) => {
                        error!("Failed to generate steps: {}", e);
                        println!("❌ Failed to generate steps. Please try again.");
                    }
                }
            }
            ChatAction::Done => println!("ℹ️  /done is available once the project has steps."),
            ChatAction::Quit => break,
        }
    }

    chat.close().await;
    Ok(())
}
