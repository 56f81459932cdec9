// src/backend.rs
//! Blocking client for the project/render HTTP backend.
//!
//! The backend stores clips as `{clipId, sourceUrl, trim: {start, end}}`
//! with source in/out points, and placement separately under
//! `timeline.tracks`. Editor-only fields ride along in an `editor` object so
//! a save/load cycle is lossless.

use crate::ffmpeg::{RenderError, RenderJob};
use crate::project::{ProjectDocument, ProjectError, ProjectStatus, ProjectStore};
use crate::timeline::Clip;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireTrim {
    pub start: f64,
    #[serde(default)]
    pub end: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireClip {
    pub clip_id: String,
    pub source_url: String,
    pub trim: WireTrim,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<Clip>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireTrackEntry {
    pub clip_id: String,
    pub start: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct WireTimeline {
    pub tracks: Vec<WireTrackEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WireProject {
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub project_name: String,
    pub clips: Vec<WireClip>,
    #[serde(default)]
    pub timeline: WireTimeline,
    #[serde(default)]
    pub status: ProjectStatus,
}

impl WireProject {
    pub fn from_document(doc: &ProjectDocument) -> Self {
        let clips = doc
            .clips
            .iter()
            .map(|c| {
                let source_in = c.source_offset + c.trim_start;
                WireClip {
                    clip_id: c.id.clone(),
                    source_url: c.source_ref.clone(),
                    trim: WireTrim {
                        start: source_in,
                        end: Some(source_in + c.effective_duration()),
                    },
                    editor: Some(c.clone()),
                }
            })
            .collect();

        let tracks = doc
            .clips
            .iter()
            .map(|c| WireTrackEntry {
                clip_id: c.id.clone(),
                start: c.start_time,
            })
            .collect();

        Self {
            id: Some(doc.id.clone()),
            project_name: doc.name.clone(),
            clips,
            timeline: WireTimeline { tracks },
            status: doc.status,
        }
    }

    /// Rebuilds editor clips. Entries without an `editor` payload (saved by
    /// other clients) become untrimmed clips covering their in/out window;
    /// a missing out point leaves nothing to place, so they are dropped.
    pub fn into_document(self, fallback_id: &str) -> ProjectDocument {
        let mut doc = ProjectDocument::new(&self.project_name);
        doc.id = self.id.unwrap_or_else(|| fallback_id.to_string());
        doc.status = self.status;

        let placement = |clip_id: &str| {
            self.timeline
                .tracks
                .iter()
                .find(|t| t.clip_id == clip_id)
                .map(|t| t.start)
        };

        for wire in &self.clips {
            let start = placement(&wire.clip_id);
            let clip = match &wire.editor {
                Some(clip) => {
                    let mut clip = clip.clone();
                    if let Some(start) = start {
                        clip.start_time = start;
                    }
                    clip
                }
                None => {
                    let Some(end) = wire.trim.end else {
                        log::warn!("Skipping clip {} without an out point", wire.clip_id);
                        continue;
                    };
                    let name = wire
                        .source_url
                        .rsplit('/')
                        .next()
                        .unwrap_or(&wire.source_url)
                        .to_string();
                    let mut clip = Clip::new(&name, &wire.source_url, start.unwrap_or(0.0), end - wire.trim.start);
                    clip.id = wire.clip_id.clone();
                    clip.source_offset = wire.trim.start;
                    clip
                }
            };
            doc.clips.push(clip);
        }

        doc
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SaveResponse {
    project_id: String,
}

#[derive(Deserialize, Debug)]
struct LoadResponse {
    project: WireProject,
}

#[derive(Deserialize, Debug)]
struct RenderResponse {
    output: String,
}

#[derive(Deserialize, Debug)]
struct FramesResponse {
    #[serde(default)]
    directory: Option<String>,
    #[serde(default, rename = "baseUrl")]
    base_url: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

pub struct BackendClient {
    base_url: String,
    access_token: Option<String>,
    client: Client,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: None,
            client,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api/projects{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn check(response: Response, not_found_id: &str) -> Result<Response, ProjectError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 404 {
            return Err(ProjectError::NotFound(not_found_id.to_string()));
        }
        let body: ErrorBody = response.json().unwrap_or_default();
        Err(ProjectError::Status {
            status: status.as_u16(),
            message: body.message,
        })
    }

    /// Asks the backend to render a saved project; returns the output path
    /// it reports.
    pub fn render(&self, project_id: &str, job: &RenderJob) -> Result<String, RenderError> {
        if job.clips.is_empty() {
            return Err(RenderError::EmptyTimeline);
        }
        log::info!("⏳ Requesting backend render for {}", project_id);

        let response = self
            .authorize(self.client.post(self.url(&format!("/{}/render", project_id))))
            .json(job)
            .send()?;

        if !response.status().is_success() {
            return Err(RenderError::Status(response.status().as_u16()));
        }
        let body: RenderResponse = response.json()?;
        Ok(body.output)
    }

    /// Requests preview frames for a window of the project; returns the base
    /// location the numbered frames live under.
    pub fn request_frames(
        &self,
        project_id: &str,
        fps: u32,
        start: f64,
        end: f64,
    ) -> Result<String, ProjectError> {
        let body = serde_json::json!({ "fps": fps, "start": start, "end": end });
        let response = self
            .authorize(self.client.post(self.url(&format!("/{}/frames", project_id))))
            .json(&body)
            .send()?;

        let frames: FramesResponse = Self::check(response, project_id)?.json()?;
        frames
            .base_url
            .or(frames.directory)
            .ok_or_else(|| ProjectError::Invalid("frames response without a location".to_string()))
    }
}

impl ProjectStore for BackendClient {
    fn save(&self, doc: &ProjectDocument) -> Result<String, ProjectError> {
        if doc.clips.is_empty() {
            return Err(ProjectError::Invalid("backend refuses projects without clips".to_string()));
        }

        let response = self
            .authorize(self.client.post(self.url("/save")))
            .json(&WireProject::from_document(doc))
            .send()?;

        let saved: SaveResponse = Self::check(response, &doc.id)?.json()?;
        log::info!("💾 Project saved to backend as {}", saved.project_id);
        Ok(saved.project_id)
    }

    fn load(&self, id: &str) -> Result<ProjectDocument, ProjectError> {
        let response = self
            .authorize(self.client.get(self.url(&format!("/{}", id))))
            .send()?;

        let loaded: LoadResponse = Self::check(response, id)?.json()?;
        Ok(loaded.project.into_document(id))
    }
}
