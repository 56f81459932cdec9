// src/project.rs
use crate::preferences::RenderSettings;
use crate::store::EditorStore;
use crate::timeline::Clip;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Project I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Project JSON invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Project {0} not found")]
    NotFound(String),
    #[error("Invalid project data: {0}")]
    Invalid(String),
    #[error("Backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Backend returned status {status}: {message}")]
    Status { status: u16, message: String },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Rendering,
    Completed,
}

/// Everything persisted for one project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectDocument {
    pub id: String,
    pub name: String,
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub settings: RenderSettings,
    #[serde(default)]
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectDocument {
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            clips: Vec::new(),
            settings: RenderSettings::default(),
            status: ProjectStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Captures the store's clips under its project id, minting one if the
    /// session has never been saved.
    pub fn from_store(store: &EditorStore, previous: Option<&ProjectDocument>) -> Self {
        let now = Utc::now();
        let id = store
            .project_id()
            .map(str::to_string)
            .or_else(|| previous.map(|p| p.id.clone()))
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self {
            id,
            name: store.project_name().to_string(),
            clips: store.sorted_clips(),
            settings: previous
                .map(|p| p.settings.clone())
                .unwrap_or_else(|| store.config().render.clone()),
            status: previous.map(|p| p.status).unwrap_or_default(),
            created_at: previous.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        }
    }

    /// Loads this document into the store, replacing the session. Returns
    /// media handles that became unreferenced.
    pub fn apply_to(&self, store: &mut EditorStore) -> Vec<String> {
        store.reset_project(Some(self.id.clone()), &self.name, self.clips.clone())
    }
}

pub trait ProjectStore {
    fn save(&self, doc: &ProjectDocument) -> Result<String, ProjectError>;
    fn load(&self, id: &str) -> Result<ProjectDocument, ProjectError>;
}

/// One pretty-printed JSON file per project, named by id.
pub struct FileProjectStore {
    dir: PathBuf,
}

impl FileProjectStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn read_file(path: &Path) -> Result<ProjectDocument, ProjectError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn write_file(path: &Path, doc: &ProjectDocument) -> Result<(), ProjectError> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(doc)?)?;
        Ok(())
    }
}

impl ProjectStore for FileProjectStore {
    fn save(&self, doc: &ProjectDocument) -> Result<String, ProjectError> {
        if doc.id.is_empty() || doc.id.contains(['/', '\\']) || doc.id.contains("..") {
            return Err(ProjectError::Invalid(format!("bad project id {:?}", doc.id)));
        }
        let path = self.path_for(&doc.id);
        Self::write_file(&path, doc)?;
        log::info!("💾 Project saved: {:?}", path);
        Ok(doc.id.clone())
    }

    fn load(&self, id: &str) -> Result<ProjectDocument, ProjectError> {
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(ProjectError::NotFound(id.to_string()));
        }
        Self::read_file(&path)
    }
}
