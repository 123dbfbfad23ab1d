//! Plain-text rendering of inventories, transcripts and step plans.

use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, NaiveDateTime};

use diy_api::{HouseObject, InventorySnapshot, Project, StepStatus, StepTracker, Tool};
use diy_chat::{ConversationEntry, EntryOrigin};

/// One inventory view, or its empty state.
pub fn inventory(snapshot: &InventorySnapshot) -> String {
    let mut out = format!("📦 {} ({})\n", snapshot.kind(), snapshot.len());
    let body = match snapshot {
        InventorySnapshot::House(items) if items.is_empty() => {
            "No house objects cataloged yet.\nThe assistant will learn about your house as you chat.\n".to_string()
        }
        InventorySnapshot::Toolroom(items) if items.is_empty() => {
            "No tools in your toolroom yet.\nStart a project and let the AI discover your tools!\n".to_string()
        }
        InventorySnapshot::Projects(items) if items.is_empty() => {
            "No projects started yet.\nCreate your first project to get started!\n".to_string()
        }
        InventorySnapshot::House(items) => items.iter().map(house_object).collect(),
        InventorySnapshot::Toolroom(items) => items.iter().map(tool).collect(),
        InventorySnapshot::Projects(items) => items.iter().map(project).collect(),
    };
    out.push_str(&body);
    out
}

fn house_object(object: &HouseObject) -> String {
    let mut out = format!("🏠 {} ({}) - {}\n", object.name, object.kind, object.location);
    push_properties(&mut out, object.properties.as_ref());
    out
}

fn tool(tool: &Tool) -> String {
    let mut out = format!(
        "🔧 {} [{}] Qty: {} - {}\n",
        tool.name, tool.category, tool.quantity, tool.condition
    );
    push_properties(&mut out, tool.properties.as_ref());
    out
}

fn project(project: &Project) -> String {
    let mut out = format!("🔨 {} [{}] {}\n", project.title, project.id, project.status);
    let _ = writeln!(out, "   {}", project.description);
    if let Some((current, total)) = project.progress() {
        let _ = writeln!(out, "   Step {} of {}", current, total);
    }
    let _ = write!(out, "   Started: {}", date(&project.created_at));
    if let Some(completed) = &project.completed_at {
        let _ = write!(out, "  Completed: {}", date(completed));
    }
    out.push('\n');
    out
}

fn push_properties(out: &mut String, properties: Option<&HashMap<String, String>>) {
    let Some(properties) = properties.filter(|p| !p.is_empty()) else {
        return;
    };
    let mut pairs: Vec<_> = properties.iter().collect();
    pairs.sort();
    let tags: Vec<_> = pairs.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
    let _ = writeln!(out, "   {}", tags.join(", "));
}

/// Calendar date of a backend timestamp; the raw text if it does not parse.
pub fn date(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.format("%Y-%m-%d").to_string();
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(parsed) => parsed.format("%Y-%m-%d").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// One transcript line.
pub fn entry(entry: &ConversationEntry) -> String {
    match entry.origin {
        EntryOrigin::User => format!("[{}] 🧑 You: {}", entry.time_label(), entry.content),
        EntryOrigin::Assistant => format!("[{}] 🤖 {}", entry.time_label(), entry.content),
    }
}

/// Every step with its status marker.
pub fn step_overview(tracker: &StepTracker) -> String {
    let (current, total) = tracker.progress();
    let mut out = format!(
        "📋 Step {} of {} ({:.0}%)\n",
        current,
        total,
        tracker.percent() * 100.0
    );
    for step in tracker.steps() {
        let marker = match StepTracker::status_of(step) {
            StepStatus::Completed => "✅",
            StepStatus::Active => "▶️ ",
            StepStatus::Pending => "○ ",
        };
        let _ = writeln!(out, "  {} {}. {}", marker, step.step_number, step.title);
    }
    out
}

/// The step being worked on, with the tools it needs.
pub fn current_step(tracker: &StepTracker, tools: &[Tool]) -> String {
    let step = tracker.current();
    let mut out = format!("Step {}: {}\n{}\n", step.step_number, step.title, step.description);

    let required = tracker.required_tools(tools);
    if !required.is_empty() {
        out.push_str("🔧 Required Tools:\n");
        for tool in required {
            let _ = writeln!(out, "   - {} ({})", tool.name, tool.condition);
        }
    }
    out
}
