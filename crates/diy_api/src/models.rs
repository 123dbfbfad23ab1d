//! Entity records shared with the backend.
//!
//! Field names follow the backend's snake_case JSON. Older clients sent
//! camelCase for a few fields, so those are accepted as aliases on read.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Condition of a tool in the toolroom.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolCondition {
    Working,
    Broken,
    NeedsMaintenance,
}

impl ToolCondition {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Working => "Working",
            Self::Broken => "Broken",
            Self::NeedsMaintenance => "Needs Maintenance",
        }
    }

    /// Whether the tool can be used as-is.
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Working)
    }
}

impl fmt::Display for ToolCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Planning,
    InProgress,
    Completed,
    Paused,
}

impl ProjectStatus {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Planning => "Planning",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Paused => "Paused",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A tool owned by the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub category: String,
    pub quantity: u32,
    pub condition: ToolCondition,
    #[serde(default, alias = "iconKeywords", skip_serializing_if = "Option::is_none")]
    pub icon_keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, String>>,
}

/// A fixture or appliance in the user's house.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HouseObject {
    pub id: String,
    pub name: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, String>>,
}

/// One step of a project's execution plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectStep {
    pub id: String,
    pub step_number: u32,
    pub title: String,
    pub description: String,
    /// Tool IDs
    #[serde(default)]
    pub required_tools: Vec<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_completed: bool,
}

/// A DIY project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: ProjectStatus,
    #[serde(alias = "createdAt")]
    pub created_at: String,
    #[serde(default, alias = "completedAt", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default, alias = "currentStep", skip_serializing_if = "Option::is_none")]
    pub current_step: Option<u32>,
    #[serde(default, alias = "totalSteps", skip_serializing_if = "Option::is_none")]
    pub total_steps: Option<u32>,
    #[serde(default)]
    pub steps: Vec<ProjectStep>,
    #[serde(default, alias = "initialAiMessage", skip_serializing_if = "Option::is_none")]
    pub initial_ai_message: Option<String>,
}

impl Project {
    /// Whether the project is still being planned.
    pub fn is_planning(&self) -> bool {
        self.status == ProjectStatus::Planning
    }

    /// `(current, total)` when the backend tracks progress.
    pub fn progress(&self) -> Option<(u32, u32)> {
        match (self.current_step, self.total_steps) {
            (Some(current), Some(total)) if total > 0 => Some((current, total)),
            _ => None,
        }
    }
}

/// Body of `POST /api/projects`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateProjectRequest {
    pub description: String,
}

/// Answer to `POST /api/projects`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateProjectResponse {
    pub project_id: String,
    pub ai_response: String,
    pub status: String,
}
