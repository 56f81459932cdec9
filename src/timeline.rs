// src/timeline.rs
use crate::action_router::RouterError;
use crate::preferences::EditorConfig;
use crate::store::EditorStore;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Shortest playable window any mutator will leave on a clip (seconds).
pub const MIN_CLIP_LENGTH: f64 = 0.1;

// 1. THE DATA STRUCTURES

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Video,
    Audio,
    Image,
}

/// Parallel track families. Clips only move between tracks of their own group.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrackGroup {
    #[default]
    Video,
    Overlay,
    Audio,
}

impl TrackGroup {
    pub const ALL: [TrackGroup; 3] = [TrackGroup::Video, TrackGroup::Overlay, TrackGroup::Audio];

    /// Compositing rank for visual groups, lower is drawn on top.
    /// Audio never takes part in the picture.
    pub fn visual_rank(self) -> Option<u8> {
        match self {
            TrackGroup::Overlay => Some(0),
            TrackGroup::Video => Some(1),
            TrackGroup::Audio => None,
        }
    }
}

/// A placed, trimmable reference to a media source.
///
/// `start_time` and `duration` describe the untrimmed span; `trim_start` and
/// `trim_end` carve the playable window out of it. `source_offset` is where
/// the span begins inside the media, so seeking stays correct after trims are
/// committed or the clip is split.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Clip {
    pub id: String,
    pub name: String,
    pub source_ref: String,
    pub start_time: f64,
    pub duration: f64,
    pub trim_start: f64,
    pub trim_end: f64,
    #[serde(default)]
    pub source_offset: f64,
    #[serde(default)]
    pub group: TrackGroup,
    #[serde(default)]
    pub track_index: usize,
    #[serde(default)]
    pub media_type: MediaType,
}

/// Half-open `[start, end)` window on the global timeline.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct PlayRange {
    pub start: f64,
    pub end: f64,
}

impl PlayRange {
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 0.0
    }
}

/// A clip together with its derived timing, handy for rendering lists.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ClipWithMeta {
    #[serde(flatten)]
    pub clip: Clip,
    pub effective_duration: f64,
    pub play_start: f64,
    pub play_end: f64,
}

impl Clip {
    /// Fresh untrimmed video clip on the first video track.
    pub fn new(name: &str, source_ref: &str, start_time: f64, duration: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            source_ref: source_ref.to_string(),
            start_time: start_time.max(0.0),
            duration,
            trim_start: 0.0,
            trim_end: 0.0,
            source_offset: 0.0,
            group: TrackGroup::Video,
            track_index: 0,
            media_type: MediaType::Video,
        }
    }

    pub fn on_track(mut self, group: TrackGroup, track_index: usize) -> Self {
        self.group = group;
        self.track_index = track_index;
        self
    }

    pub fn with_media_type(mut self, media_type: MediaType) -> Self {
        self.media_type = media_type;
        self
    }

    /// `duration - trim_start - trim_end`
    pub fn effective_duration(&self) -> f64 {
        self.duration - self.trim_start - self.trim_end
    }

    pub fn play_range(&self) -> PlayRange {
        PlayRange {
            start: self.start_time + self.trim_start,
            end: self.start_time + self.duration - self.trim_end,
        }
    }

    /// End of the untrimmed span.
    pub fn span_end(&self) -> f64 {
        self.start_time + self.duration
    }

    pub fn span_contains(&self, time: f64) -> bool {
        time >= self.start_time && time <= self.span_end()
    }

    pub fn is_time_in_clip(&self, time: f64) -> bool {
        self.play_range().contains(time)
    }

    /// Seconds into the playable window. Negative before it, past
    /// `effective_duration` after it.
    pub fn global_to_local(&self, global_time: f64) -> f64 {
        global_time - self.play_range().start
    }

    pub fn clip_to_global(&self, local_time: f64) -> f64 {
        self.play_range().start + local_time
    }

    /// Position to seek the media element to for a given timeline time.
    pub fn source_seek_time(&self, global_time: f64) -> f64 {
        self.source_offset + self.trim_start + self.global_to_local(global_time)
    }

    pub fn with_meta(&self) -> ClipWithMeta {
        let range = self.play_range();
        ClipWithMeta {
            clip: self.clone(),
            effective_duration: self.effective_duration(),
            play_start: range.start,
            play_end: range.end,
        }
    }
}

/// Maximum playable end over all clips, 0 for an empty timeline.
pub fn total_duration(clips: &[Clip]) -> f64 {
    clips
        .iter()
        .map(|c| c.play_range().end)
        .fold(0.0, f64::max)
}

/// Clips sorted by `start_time`, ties kept in insertion order.
pub fn sorted_by_start(clips: &[Clip]) -> Vec<Clip> {
    let mut sorted = clips.to_vec();
    sort_by_start(&mut sorted);
    sorted
}

pub fn sort_by_start(clips: &mut [Clip]) {
    clips.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
}

// 2. THE ENGINE (Holds the Store for the application root)
pub struct TimelineEngine {
    // Mutex serialises the playback task and command handlers.
    pub state: Mutex<EditorStore>,
}

impl TimelineEngine {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            state: Mutex::new(EditorStore::new(config)),
        }
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, EditorStore>, RouterError> {
        self.state.lock().map_err(|_| RouterError::LockPoisoned)
    }

    pub fn log_state(&self) {
        if let Ok(state) = self.state.lock() {
            log::info!(
                "🎥 CURRENT STATE: {} clips, {:.2}s duration",
                state.clips().len(),
                state.duration()
            );
        }
    }
}

impl Default for TimelineEngine {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
