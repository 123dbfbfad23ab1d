//! Shared inventory data-loading service.
//!
//! Every view reads house objects, tools and projects through one service
//! instance instead of fetching on its own. Opening an inventory view
//! invalidates that collection and reloads it, so the view always shows what
//! the backend has now. Load failures are logged and read as empty.

use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error};

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{HouseObject, Project, Tool};

/// The three inventory views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InventoryKind {
    House,
    Toolroom,
    Projects,
}

impl InventoryKind {
    pub fn all() -> [InventoryKind; 3] {
        [Self::House, Self::Toolroom, Self::Projects]
    }

    /// Title shown above the view
    pub fn title(&self) -> &'static str {
        match self {
            Self::House => "House",
            Self::Toolroom => "Toolroom",
            Self::Projects => "Projects",
        }
    }
}

impl fmt::Display for InventoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for InventoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "house" => Ok(Self::House),
            "toolroom" | "tools" => Ok(Self::Toolroom),
            "projects" => Ok(Self::Projects),
            other => Err(format!("unknown inventory: {}", other)),
        }
    }
}

/// Contents of one inventory view at the time it was opened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InventorySnapshot {
    House(Vec<HouseObject>),
    Toolroom(Vec<Tool>),
    Projects(Vec<Project>),
}

impl InventorySnapshot {
    pub fn kind(&self) -> InventoryKind {
        match self {
            Self::House(_) => InventoryKind::House,
            Self::Toolroom(_) => InventoryKind::Toolroom,
            Self::Projects(_) => InventoryKind::Projects,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::House(items) => items.len(),
            Self::Toolroom(items) => items.len(),
            Self::Projects(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where selecting a project leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectRoute {
    /// Project is still being planned
    Planning(String),
    /// Project has moved past planning
    Execution(String),
    /// Unknown project
    Home,
}

#[derive(Default)]
struct Cache {
    house: Option<Vec<HouseObject>>,
    tools: Option<Vec<Tool>>,
    projects: Option<Vec<Project>>,
}

/// Cached, shared access to the backend's inventories.
pub struct InventoryService {
    client: ApiClient,
    cache: RwLock<Cache>,
}

impl InventoryService {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            cache: RwLock::new(Cache::default()),
        }
    }

    /// The underlying request client
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Drop the cached copy of one inventory.
    pub fn invalidate(&self, kind: InventoryKind) {
        let mut cache = self.cache.write();
        match kind {
            InventoryKind::House => cache.house = None,
            InventoryKind::Toolroom => cache.tools = None,
            InventoryKind::Projects => cache.projects = None,
        }
        debug!("Invalidated {} cache", kind);
    }

    /// Whether an inventory is currently cached.
    pub fn is_cached(&self, kind: InventoryKind) -> bool {
        let cache = self.cache.read();
        match kind {
            InventoryKind::House => cache.house.is_some(),
            InventoryKind::Toolroom => cache.tools.is_some(),
            InventoryKind::Projects => cache.projects.is_some(),
        }
    }

    /// Open an inventory view: invalidate, reload, snapshot.
    pub async fn open(&self, kind: InventoryKind) -> InventorySnapshot {
        self.invalidate(kind);
        match kind {
            InventoryKind::House => InventorySnapshot::House(self.house_objects().await),
            InventoryKind::Toolroom => InventorySnapshot::Toolroom(self.tools().await),
            InventoryKind::Projects => InventorySnapshot::Projects(self.projects().await),
        }
    }

    /// Warm all three caches concurrently.
    pub async fn load_all(&self) {
        let _ = tokio::join!(self.house_objects(), self.tools(), self.projects());
    }

    /// House objects, loading on a cold cache.
    pub async fn house_objects(&self) -> Vec<HouseObject> {
        if let Some(items) = self.cache.read().house.clone() {
            return items;
        }
        match self.client.list_house_objects().await {
            Ok(items) => {
                self.cache.write().house = Some(items.clone());
                items
            }
            Err(e) => {
                error!("Failed to load house objects: {}", e);
                Vec::new()
            }
        }
    }

    /// Tools, loading on a cold cache.
    pub async fn tools(&self) -> Vec<Tool> {
        if let Some(items) = self.cache.read().tools.clone() {
            return items;
        }
        match self.client.list_tools().await {
            Ok(items) => {
                self.cache.write().tools = Some(items.clone());
                items
            }
            Err(e) => {
                error!("Failed to load tools: {}", e);
                Vec::new()
            }
        }
    }

    /// Projects, loading on a cold cache.
    pub async fn projects(&self) -> Vec<Project> {
        if let Some(items) = self.cache.read().projects.clone() {
            return items;
        }
        match self.client.list_projects().await {
            Ok(items) => {
                self.cache.write().projects = Some(items.clone());
                items
            }
            Err(e) => {
                error!("Failed to load projects: {}", e);
                Vec::new()
            }
        }
    }

    /// One project by id, from the cache when it holds it.
    ///
    /// A miss refreshes the projects cache. Unlike the listing reads, a
    /// failed refresh is returned rather than read as empty.
    pub async fn find_project(&self, project_id: &str) -> ApiResult<Project> {
        let cached = self
            .cache
            .read()
            .projects
            .as_ref()
            .and_then(|projects| projects.iter().find(|p| p.id == project_id).cloned());
        if let Some(project) = cached {
            return Ok(project);
        }

        debug!("Project {} not cached, refreshing projects", project_id);
        let projects = self.client.list_projects().await?;
        let found = projects.iter().find(|p| p.id == project_id).cloned();
        self.cache.write().projects = Some(projects);
        found.ok_or_else(|| ApiError::ProjectNotFound(project_id.to_string()))
    }

    /// Route for a project picked from the projects view.
    pub async fn select_project(&self, project_id: &str) -> ProjectRoute {
        let projects = self.projects().await;
        match projects.iter().find(|p| p.id == project_id) {
            Some(p) if p.is_planning() => ProjectRoute::Planning(p.id.clone()),
            Some(p) => ProjectRoute::Execution(p.id.clone()),
            None => ProjectRoute::Home,
        }
    }
}
