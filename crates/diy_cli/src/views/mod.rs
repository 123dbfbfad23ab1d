//! Terminal renditions of the client's views.

use diy_api::ProjectRoute;

pub mod chat;
pub mod landing;
pub mod render;

/// Where the user goes next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Planning {
        project_id: String,
        initial_message: Option<String>,
    },
    Execution {
        project_id: String,
    },
}

impl From<ProjectRoute> for Route {
    fn from(route: ProjectRoute) -> Self {
        match route {
            ProjectRoute::Planning(project_id) => Self::Planning {
                project_id,
                initial_message: None,
            },
            ProjectRoute::Execution(project_id) => Self::Execution { project_id },
            ProjectRoute::Home => Self::Home,
        }
    }
}
