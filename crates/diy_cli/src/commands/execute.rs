//! Execute command - Step-by-step execution chat.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use tracing::{debug, info};

use diy_api::{StepAdvance, StepTracker};
use diy_chat::MessageContext;

use super::App;
use crate::views::chat::{ChatAction, ChatView};
use crate::views::render;

#[derive(Args)]
pub struct ExecuteArgs {
    /// Project to work on
    project_id: String,
}

pub async fn execute(args: ExecuteArgs, app: &mut App) -> Result<()> {
    run(app, &args.project_id, None).await
}

/// Open the execution view.
///
/// Steps come from `generated` when it carries any, else from the project.
pub async fn run(app: &mut App, project_id: &str, generated: Option<Value>) -> Result<()> {
    let project = super::load_project(&app.inventory, project_id).await?;

    let from_generated = generated
        .as_ref()
        .and_then(|result| StepTracker::from_generated(&project.id, result).ok());
    let mut tracker = match from_generated {
        Some(tracker) => tracker,
        None => StepTracker::from_project(&project).context("Cannot execute project")?,
    };
    let tools = app.inventory.tools().await;

    println!("🔨 {}", project.title);
    print!("{}", render::step_overview(&tracker));
    println!();
    print!("{}", render::current_step(&tracker, &tools));
    if tracker.is_complete() {
        println!("🎉 All steps are done.");
    } else {
        println!("💡 Type /done when you finish this step.");
    }

    let context = MessageContext::step(&project.id, &tracker.current().id);
    let mut chat = ChatView::open(&app.config, context, None).await;

    loop {
        match chat.next_action(&mut app.input).await? {
            ChatAction::Done => match tracker.complete_current() {
                StepAdvance::Advanced(step_id) => {
                    debug!("Chat context moved to {}", step_id);
                    chat.session_mut().set_step(Some(step_id));
                    let (current, total) = tracker.progress();
                    println!("✅ Step done. Step {} of {}", current, total);
                    print!("{}", render::current_step(&tracker, &tools));
                }
                StepAdvance::ProjectCompleted => {
                    info!("Project {} completed", project.id);
                    println!("🎉 Project complete! Nice work.");
                }
                StepAdvance::AlreadyComplete => println!("🎉 All steps are already done."),
            },
            ChatAction::Generate => println!("ℹ️  This project already has its steps."),
            ChatAction::Quit => break,
        }
    }

    chat.close().await;
    Ok(())
}
