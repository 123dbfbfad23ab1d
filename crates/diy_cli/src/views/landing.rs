//! Landing page: describe a project, create it, move on to planning.

use tracing::{error, info};

use diy_api::{ApiClient, ApiError};

use super::Route;

/// Alert shown when the backend refuses to create a project.
pub const CREATE_FAILED_ALERT: &str = "Failed to create project. Please try again.";

/// Result of submitting the landing form.
#[derive(Debug)]
pub enum StartOutcome {
    /// Blank description; nothing was sent
    Ignored,
    Navigate(Route),
    Failed { alert: String, cause: ApiError },
}

pub struct Landing {
    client: ApiClient,
    is_loading: bool,
}

impl Landing {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            is_loading: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether the submit action is enabled for `description`.
    pub fn can_submit(&self, description: &str) -> bool {
        !self.is_loading && !description.trim().is_empty()
    }

    /// Create a project from the description and route to its planning chat.
    pub async fn start_project(&mut self, description: &str) -> StartOutcome {
        if description.trim().is_empty() {
            return StartOutcome::Ignored;
        }

        self.is_loading = true;
        let result = self.client.create_project(description).await;
        self.is_loading = false;

        match result {
            Ok(created) => {
                info!("Created project {}", created.project_id);
                let initial_message = Some(created.ai_response).filter(|m| !m.trim().is_empty());
                StartOutcome::Navigate(Route::Planning {
                    project_id: created.project_id,
                    initial_message,
                })
            }
            Err(e) => {
                error!("Error creating project: {}", e);
                StartOutcome::Failed {
                    alert: CREATE_FAILED_ALERT.to_string(),
                    cause: e,
                }
            }
        }
    }
}
