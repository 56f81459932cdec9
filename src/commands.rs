// src/commands.rs
//! Application-level commands: each locks the engine, runs store operations
//! and talks to collaborators, returning a fresh `TimelineView` for the UI.

use crate::action_router::{run_raw_edit_plan, RouterError};
use crate::ffmpeg::{RenderError, RenderJob, RenderService};
use crate::media::{MediaError, MediaProvider};
use crate::project::{ProjectDocument, ProjectError, ProjectStore};
use crate::segments::{build_composited_segments, Segment};
use crate::store::{EditorMode, EditorStore, PendingClip, PlaybackState};
use crate::timeline::{ClipWithMeta, TimelineEngine};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Read-only snapshot of everything a timeline UI draws.
#[derive(Serialize, Debug, Clone)]
pub struct TimelineView {
    pub project_id: Option<String>,
    pub project_name: String,
    pub clips: Vec<ClipWithMeta>,
    pub segments: Vec<Segment>,
    pub composited: Vec<Segment>,
    pub pending: Vec<PendingClip>,
    pub playback: PlaybackState,
    pub active_clip_id: Option<String>,
    pub mode: EditorMode,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl TimelineView {
    pub fn from_store(store: &EditorStore) -> Self {
        Self {
            project_id: store.project_id().map(str::to_string),
            project_name: store.project_name().to_string(),
            clips: store.sorted_clips().iter().map(|c| c.with_meta()).collect(),
            segments: store.segments(),
            composited: build_composited_segments(store.clips()),
            pending: store.pending_clips().to_vec(),
            playback: store.playback_state(),
            active_clip_id: store.active_clip_id().map(str::to_string),
            mode: store.mode(),
            can_undo: store.can_undo(),
            can_redo: store.can_redo(),
        }
    }
}

pub fn get_timeline_state(engine: &TimelineEngine) -> Result<TimelineView, RouterError> {
    let store = engine.lock()?;
    Ok(TimelineView::from_store(&store))
}

fn release_all(provider: &dyn MediaProvider, handles: &[String]) {
    for handle in handles {
        provider.release(handle);
    }
}

/// Two-phase import: the media shows up as pending at once, the probe runs
/// without holding the lock, then the pending entry resolves into a clip or
/// is dropped. Returns the new clip id.
pub fn import_video(
    engine: &TimelineEngine,
    provider: &dyn MediaProvider,
    file_path: &Path,
) -> Result<String, CommandError> {
    log::info!("➡️ Importing video: {:?}", file_path);

    let media = provider.ingest(file_path)?;
    let pending_id = engine
        .lock()?
        .add_pending_clip(&media.name, &media.source_ref, media.media_type);

    let probed = provider.probe_duration(&media.source_ref);
    finish_import(engine, provider, &pending_id, probed)
}

/// Async flavour of `import_video` for callers on a tokio runtime: the probe
/// runs on the blocking pool under a timeout.
pub async fn import_video_async(
    engine: Arc<TimelineEngine>,
    provider: Arc<dyn MediaProvider>,
    file_path: PathBuf,
) -> Result<String, CommandError> {
    log::info!("➡️ Importing video: {:?}", file_path);

    let media = provider.ingest(&file_path)?;
    let pending_id = engine
        .lock()?
        .add_pending_clip(&media.name, &media.source_ref, media.media_type);

    let probe_provider = Arc::clone(&provider);
    let source_ref = media.source_ref.clone();
    let task = tokio::task::spawn_blocking(move || probe_provider.probe_duration(&source_ref));

    let probed = match tokio::time::timeout(PROBE_TIMEOUT, task).await {
        Ok(joined) => joined?,
        Err(_) => Err(MediaError::Timeout),
    };
    finish_import(&engine, provider.as_ref(), &pending_id, probed)
}

fn finish_import(
    engine: &TimelineEngine,
    provider: &dyn MediaProvider,
    pending_id: &str,
    probed: Result<f64, MediaError>,
) -> Result<String, CommandError> {
    let mut store = engine.lock()?;

    let duration = match probed {
        Ok(duration) => duration,
        Err(e) => {
            log::warn!("❌ Probe failed for {}: {}", pending_id, e);
            store.reject_pending_clip(pending_id);
            release_all(provider, &store.drain_orphaned_media());
            return Err(e.into());
        }
    };

    match store.resolve_pending_clip(pending_id, duration) {
        Some(clip_id) => {
            log::info!("✅ Video Imported. Duration: {:.2}s", duration);
            Ok(clip_id)
        }
        None => {
            release_all(provider, &store.drain_orphaned_media());
            Err(MediaError::Decode(format!("unusable duration {}", duration)).into())
        }
    }
}

/// Empties the timeline and releases media nothing references any more.
pub fn clear_timeline(
    engine: &TimelineEngine,
    provider: &dyn MediaProvider,
) -> Result<TimelineView, CommandError> {
    let mut store = engine.lock()?;
    let released = store.clear_clips();
    release_all(provider, &released);
    Ok(TimelineView::from_store(&store))
}

/// Parses and applies an edit plan, releasing any media it orphaned.
pub fn apply_edit_plan(
    engine: &TimelineEngine,
    provider: &dyn MediaProvider,
    raw_plan: &str,
) -> Result<TimelineView, CommandError> {
    log::info!("🚀 apply_edit_plan called with input length: {}", raw_plan.len());

    let outcome = run_raw_edit_plan(engine, raw_plan).map_err(|e| {
        log::warn!("Edit plan rejected: {}", e);
        e
    })?;
    release_all(provider, &outcome.released_media);
    Ok(outcome.timeline)
}

pub fn new_project(
    engine: &TimelineEngine,
    provider: &dyn MediaProvider,
    name: &str,
) -> Result<TimelineView, CommandError> {
    let mut store = engine.lock()?;
    let released = store.reset_project(None, name, Vec::new());
    release_all(provider, &released);
    Ok(TimelineView::from_store(&store))
}

pub fn load_project(
    engine: &TimelineEngine,
    provider: &dyn MediaProvider,
    projects: &dyn ProjectStore,
    project_id: &str,
) -> Result<TimelineView, CommandError> {
    let doc = projects.load(project_id)?;
    let mut store = engine.lock()?;
    let released = doc.apply_to(&mut store);
    release_all(provider, &released);
    log::info!("📂 Loaded project {} ({} clips)", doc.id, doc.clips.len());
    Ok(TimelineView::from_store(&store))
}

/// Saves the session and adopts the id the store assigns.
pub fn save_project(
    engine: &TimelineEngine,
    projects: &dyn ProjectStore,
    previous: Option<&ProjectDocument>,
) -> Result<ProjectDocument, CommandError> {
    let mut doc = {
        let store = engine.lock()?;
        ProjectDocument::from_store(&store, previous)
    };

    let id = projects.save(&doc)?;
    doc.id = id;

    let mut store = engine.lock()?;
    let name = store.project_name().to_string();
    store.set_project(&doc.id, &name);
    Ok(doc)
}

pub fn render_timeline(
    engine: &TimelineEngine,
    renderer: &dyn RenderService,
    output_path: &Path,
) -> Result<PathBuf, CommandError> {
    let job = {
        let store = engine.lock()?;
        RenderJob::from_clips(store.clips(), store.config().render.clone())
    };

    renderer.render(&job, output_path)?;
    Ok(output_path.to_path_buf())
}
