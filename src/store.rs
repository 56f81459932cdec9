// src/store.rs
//! The editor state store: the single authority over clips, the playback
//! cursor, selection, interaction mode and undo history.
//!
//! Every mutation goes through a named operation that validates its input,
//! keeps clip geometry legal, recomputes the timeline duration and, for
//! tracked operations, snapshots the previous state first. Operations that
//! reference an unknown clip are no-ops and report `false`/`None`.

use crate::history::{EditorSnapshot, HistoryManager};
use crate::preferences::EditorConfig;
use crate::segments::{active_segment, build_segments, Segment};
use crate::time::clamp_time;
use crate::timeline::{sort_by_start, sorted_by_start, total_duration, Clip, MediaType, TrackGroup};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

const EPSILON: f64 = 1e-9;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    #[default]
    Idle,
    Dragging,
    Trimming,
}

/// Named state slices observers can register interest in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slice {
    Clips,
    Playback,
    Selection,
    Zoom,
    Mode,
    History,
    Pending,
    Project,
}

pub type SubscriptionId = u64;

struct Subscription {
    id: SubscriptionId,
    interest: Vec<Slice>,
    listener: Box<dyn FnMut(Slice) + Send>,
}

/// Media whose duration is still being probed. Kept apart from the clip set
/// so every `Clip` always has a real duration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PendingClip {
    pub id: String,
    pub name: String,
    pub source_ref: String,
    pub media_type: MediaType,
}

/// Purely visual drag state, never snapshotted.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct DragFeedback {
    pub clip_id: String,
    pub offset_px: f64,
    pub drop_indicator: f64,
    pub track_index: usize,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct PlaybackState {
    pub current_time: f64,
    pub duration: f64,
    pub is_playing: bool,
    pub zoom: f64,
}

pub struct EditorStore {
    config: EditorConfig,
    project_id: Option<String>,
    project_name: String,
    clips: Vec<Clip>,
    pending: Vec<PendingClip>,
    current_time: f64,
    duration: f64,
    is_playing: bool,
    zoom: f64,
    active_clip_id: Option<String>,
    mode: EditorMode,
    drag: Option<DragFeedback>,
    history: HistoryManager,
    known_media: BTreeSet<String>,
    subscribers: Vec<Subscription>,
    next_subscription: SubscriptionId,
}

impl EditorStore {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            zoom: config.clamp_zoom(config.default_zoom),
            history: HistoryManager::new(config.history_limit),
            config,
            project_id: None,
            project_name: "Untitled Project".to_string(),
            clips: Vec::new(),
            pending: Vec::new(),
            current_time: 0.0,
            duration: 0.0,
            is_playing: false,
            active_clip_id: None,
            mode: EditorMode::Idle,
            drag: None,
            known_media: BTreeSet::new(),
            subscribers: Vec::new(),
            next_subscription: 1,
        }
    }

    // -------- Project --------

    pub fn set_project(&mut self, id: &str, name: &str) {
        self.project_id = Some(id.to_string());
        self.project_name = name.to_string();
        self.notify(&[Slice::Project]);
    }

    /// Replaces the whole session (new or loaded project). History is
    /// discarded; returns media no longer referenced anywhere.
    pub fn reset_project(
        &mut self,
        project_id: Option<String>,
        name: &str,
        clips: Vec<Clip>,
    ) -> Vec<String> {
        self.project_id = project_id;
        self.project_name = name.to_string();
        self.clips = clips
            .into_iter()
            .filter_map(|c| self.sanitize_clip(c))
            .collect();
        sort_by_start(&mut self.clips);
        for clip in &self.clips {
            self.known_media.insert(clip.source_ref.clone());
        }
        self.pending.clear();
        self.current_time = 0.0;
        self.is_playing = false;
        self.active_clip_id = None;
        self.mode = EditorMode::Idle;
        self.drag = None;
        self.history.clear();
        self.refresh_duration();

        log::debug!(
            "Project reset: {} clips, {:.2}s",
            self.clips.len(),
            self.duration
        );
        self.notify(&[
            Slice::Project,
            Slice::Clips,
            Slice::Playback,
            Slice::Selection,
            Slice::Mode,
            Slice::History,
            Slice::Pending,
        ]);
        self.drain_orphaned_media()
    }

    // -------- Clips --------

    /// Appends a clip and selects it. Trims are clamped into range; clips
    /// without a usable duration or with a duplicate id are rejected.
    pub fn add_clip(&mut self, clip: Clip) -> bool {
        if self.clips.iter().any(|c| c.id == clip.id) {
            log::debug!("add_clip: duplicate id {}", clip.id);
            return false;
        }
        let Some(clip) = self.sanitize_clip(clip) else {
            return false;
        };

        self.checkpoint();

        let end = clip.play_range().end;
        log::debug!("add_clip: {} ({:.2}s at {:.2}s)", clip.id, clip.duration, clip.start_time);

        self.known_media.insert(clip.source_ref.clone());
        self.active_clip_id = Some(clip.id.clone());
        self.clips.push(clip);
        self.duration = self.duration.max(end);

        self.notify(&[Slice::Clips, Slice::Selection]);
        true
    }

    pub fn remove_clip(&mut self, id: &str) -> bool {
        let Some(index) = self.index_of(id) else {
            log::debug!("remove_clip: unknown clip {}", id);
            return false;
        };

        self.checkpoint();
        self.clips.remove(index);
        if self.active_clip_id.as_deref() == Some(id) {
            self.active_clip_id = None;
        }
        self.refresh_duration();

        self.notify(&[Slice::Clips, Slice::Selection]);
        true
    }

    /// Copies a clip (trims and media included) to the end of the timeline.
    pub fn duplicate_clip(&mut self, id: &str) -> Option<String> {
        let source = self.clip(id)?.clone();

        let copy = Clip {
            id: Uuid::new_v4().to_string(),
            name: format!("{} (copy)", source.name),
            start_time: self.timeline_end(),
            ..source
        };
        let copy_id = copy.id.clone();

        self.add_clip(copy).then_some(copy_id)
    }

    /// Empties the timeline. Undoable, so media stays alive while history
    /// still references it; the returned handles are safe to release.
    pub fn clear_clips(&mut self) -> Vec<String> {
        self.checkpoint();

        self.clips.clear();
        self.pending.clear();
        self.current_time = 0.0;
        self.duration = 0.0;
        self.is_playing = false;
        self.active_clip_id = None;
        self.mode = EditorMode::Idle;
        self.drag = None;

        log::debug!("clear_clips");
        self.notify(&[
            Slice::Clips,
            Slice::Pending,
            Slice::Playback,
            Slice::Selection,
            Slice::Mode,
        ]);
        self.drain_orphaned_media()
    }

    pub fn select_clip(&mut self, id: Option<&str>) -> bool {
        match id {
            None => {
                self.active_clip_id = None;
            }
            Some(id) if self.index_of(id).is_some() => {
                self.active_clip_id = Some(id.to_string());
            }
            Some(id) => {
                log::debug!("select_clip: unknown clip {}", id);
                return false;
            }
        }
        self.notify(&[Slice::Selection]);
        true
    }

    /// Soft trim of the head, clamped so at least `min_clip_length` stays
    /// playable. Not committed until `apply_trim`.
    pub fn set_trim_start(&mut self, id: &str, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        let min_len = self.config.min_clip_length;
        let Some(clip) = self.clip_mut(id) else {
            log::debug!("set_trim_start: unknown clip {}", id);
            return false;
        };

        let upper = (clip.duration - clip.trim_end - min_len).max(0.0);
        clip.trim_start = clamp_time(value, 0.0, upper);

        self.refresh_duration();
        self.notify(&[Slice::Clips]);
        true
    }

    pub fn set_trim_end(&mut self, id: &str, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        let min_len = self.config.min_clip_length;
        let Some(clip) = self.clip_mut(id) else {
            log::debug!("set_trim_end: unknown clip {}", id);
            return false;
        };

        let upper = (clip.duration - clip.trim_start - min_len).max(0.0);
        clip.trim_end = clamp_time(value, 0.0, upper);

        self.refresh_duration();
        self.notify(&[Slice::Clips]);
        true
    }

    /// Commits the soft trim into the clip geometry. The playable window is
    /// unchanged; the span shrinks to match it.
    pub fn apply_trim(&mut self, id: &str) -> bool {
        let Some(clip) = self.clip(id) else {
            log::debug!("apply_trim: unknown clip {}", id);
            return false;
        };
        if clip.trim_start == 0.0 && clip.trim_end == 0.0 {
            return false;
        }

        self.checkpoint();

        if let Some(clip) = self.clip_mut(id) {
            clip.start_time += clip.trim_start;
            clip.source_offset += clip.trim_start;
            clip.duration -= clip.trim_start + clip.trim_end;
            clip.trim_start = 0.0;
            clip.trim_end = 0.0;
            log::debug!("apply_trim: {} now {:.2}s at {:.2}s", id, clip.duration, clip.start_time);
        }

        sort_by_start(&mut self.clips);
        self.refresh_duration();
        self.notify(&[Slice::Clips]);
        true
    }

    pub fn reposition_clip(&mut self, id: &str, new_start_time: f64) -> bool {
        self.move_clip(id, new_start_time, None)
    }

    /// Moves a clip (optionally onto another track of its group) as one
    /// undoable step. Same-track overlaps are resolved by pushing: the moved
    /// clip skips past a clip it lands inside, and later clips it now covers
    /// are shifted right in a cascade.
    pub fn move_clip(&mut self, id: &str, new_start_time: f64, track_index: Option<usize>) -> bool {
        if !new_start_time.is_finite() || self.index_of(id).is_none() {
            log::debug!("move_clip: ignored for {} at {}", id, new_start_time);
            return false;
        }

        self.checkpoint();

        if let Some(clip) = self.clip_mut(id) {
            clip.start_time = new_start_time.max(0.0);
            if let Some(track) = track_index {
                clip.track_index = track;
            }
        }
        self.resolve_track_overlaps(id);

        sort_by_start(&mut self.clips);
        self.refresh_duration();
        log::debug!("move_clip: {} -> {:.2}s, duration {:.2}s", id, new_start_time, self.duration);
        self.notify(&[Slice::Clips]);
        true
    }

    /// Moves the clip at `from` to `to` (indices in start-time order) and
    /// repacks everything into a gapless run starting at 0.
    pub fn reorder_clips(&mut self, from: usize, to: usize) -> bool {
        let len = self.clips.len();
        if from >= len || to >= len || from == to {
            log::debug!("reorder_clips: ignored {} -> {} ({} clips)", from, to, len);
            return false;
        }

        self.checkpoint();

        let mut ordered = sorted_by_start(&self.clips);
        let moved = ordered.remove(from);
        ordered.insert(to, moved);

        let mut cursor = 0.0;
        for clip in ordered.iter_mut() {
            clip.start_time = cursor;
            cursor += clip.duration;
        }

        self.clips = ordered;
        self.refresh_duration();
        self.notify(&[Slice::Clips]);
        true
    }

    /// Splits the clip under the playhead into two daughters sharing its
    /// media. No-op in a gap, on a boundary, or when either half would be
    /// shorter than `min_clip_length`.
    pub fn split_clip_at_current_time(&mut self) -> bool {
        let time = self.current_time;
        let min_len = self.config.min_clip_length;

        let Some(index) = self.split_candidate(time) else {
            log::debug!("split: nothing under playhead at {:.3}s", time);
            return false;
        };

        let parent = self.clips[index].clone();
        let split_point = time - parent.start_time;
        let head_len = split_point - parent.trim_start;
        let tail_len = parent.duration - parent.trim_end - split_point;
        if head_len < min_len - EPSILON || tail_len < min_len - EPSILON {
            log::debug!("split: too close to a boundary at {:.3}s", time);
            return false;
        }

        self.checkpoint();

        let first = Clip {
            id: Uuid::new_v4().to_string(),
            duration: split_point,
            trim_end: 0.0,
            ..parent.clone()
        };
        let second = Clip {
            id: Uuid::new_v4().to_string(),
            start_time: parent.start_time + split_point,
            duration: parent.duration - split_point,
            trim_start: 0.0,
            source_offset: parent.source_offset + split_point,
            ..parent
        };
        let second_id = second.id.clone();

        self.clips.splice(index..=index, [first, second]);
        sort_by_start(&mut self.clips);
        self.active_clip_id = Some(second_id);
        self.refresh_duration();

        log::debug!("split: at {:.3}s into {} clips", time, self.clips.len());
        self.notify(&[Slice::Clips, Slice::Selection]);
        true
    }

    // -------- Pending ingestion --------

    /// First phase of ingestion: the media is known but its duration is not.
    pub fn add_pending_clip(&mut self, name: &str, source_ref: &str, media_type: MediaType) -> String {
        let pending = PendingClip {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            source_ref: source_ref.to_string(),
            media_type,
        };
        let id = pending.id.clone();

        self.known_media.insert(pending.source_ref.clone());
        self.pending.push(pending);
        self.notify(&[Slice::Pending]);
        id
    }

    /// Second phase: the probe answered. The pending entry becomes a clip
    /// at the end of the timeline, keeping its id.
    pub fn resolve_pending_clip(&mut self, id: &str, duration: f64) -> Option<String> {
        let index = self.pending.iter().position(|p| p.id == id)?;
        if !duration.is_finite() || duration < self.config.min_clip_length {
            log::warn!("Probe for {} returned unusable duration {}", id, duration);
            self.reject_pending_clip(id);
            return None;
        }

        let pending = self.pending.remove(index);
        let group = match pending.media_type {
            MediaType::Audio => TrackGroup::Audio,
            MediaType::Video | MediaType::Image => TrackGroup::Video,
        };
        let mut clip = Clip::new(&pending.name, &pending.source_ref, self.timeline_end(), duration)
            .on_track(group, 0)
            .with_media_type(pending.media_type);
        clip.id = pending.id;

        let clip_id = clip.id.clone();
        self.notify(&[Slice::Pending]);
        self.add_clip(clip).then_some(clip_id)
    }

    pub fn reject_pending_clip(&mut self, id: &str) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != id);
        if self.pending.len() == before {
            return false;
        }
        self.notify(&[Slice::Pending]);
        true
    }

    // -------- Playback --------

    pub fn set_current_time(&mut self, time: f64) {
        if time.is_nan() {
            return;
        }
        self.current_time = time.max(0.0);
        self.notify(&[Slice::Playback]);
    }

    pub fn update_current_time(&mut self, update: impl FnOnce(f64) -> f64) {
        let next = update(self.current_time);
        self.set_current_time(next);
    }

    pub fn seek_to(&mut self, time: f64) {
        self.set_current_time(clamp_time(time, 0.0, self.duration.max(0.0)));
    }

    pub fn seek_forward(&mut self, seconds: f64) {
        self.seek_to(self.current_time + seconds);
    }

    pub fn seek_backward(&mut self, seconds: f64) {
        self.seek_to(self.current_time - seconds);
    }

    pub fn go_to_start(&mut self) {
        self.set_current_time(0.0);
    }

    pub fn go_to_end(&mut self) {
        self.set_current_time(self.duration);
    }

    pub fn go_to_next_clip(&mut self) {
        let current = self.current_time;
        let next = sorted_by_start(&self.clips)
            .iter()
            .map(|c| c.play_range().start)
            .find(|start| *start > current + EPSILON);
        self.set_current_time(next.unwrap_or(self.duration));
    }

    pub fn go_to_previous_clip(&mut self) {
        let current = self.current_time;
        let previous = sorted_by_start(&self.clips)
            .iter()
            .rev()
            .map(|c| c.play_range().start)
            .find(|start| *start < current - EPSILON);
        self.set_current_time(previous.unwrap_or(0.0));
    }

    pub fn play(&mut self) {
        self.is_playing = true;
        self.notify(&[Slice::Playback]);
    }

    pub fn pause(&mut self) {
        self.is_playing = false;
        self.notify(&[Slice::Playback]);
    }

    pub fn toggle_play(&mut self) {
        self.is_playing = !self.is_playing;
        self.notify(&[Slice::Playback]);
    }

    /// Advances the cursor by one clock step. Reaching the end stops
    /// playback and parks the cursor on `duration`. Returns whether playback
    /// should continue.
    pub fn advance_playback(&mut self, delta_secs: f64) -> bool {
        if !self.is_playing {
            return false;
        }

        let delta = if delta_secs.is_finite() { delta_secs.max(0.0) } else { 0.0 };
        let next = self.current_time + delta;

        if next >= self.duration {
            self.current_time = self.duration;
            self.is_playing = false;
            log::debug!("Playback reached end at {:.2}s", self.duration);
        } else {
            self.current_time = next;
        }

        self.notify(&[Slice::Playback]);
        self.is_playing
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = self.config.clamp_zoom(zoom);
        self.notify(&[Slice::Zoom]);
    }

    // -------- Interaction state --------

    pub fn set_mode(&mut self, mode: EditorMode) {
        if self.mode != mode {
            self.mode = mode;
            self.notify(&[Slice::Mode]);
        }
    }

    pub fn set_drag_feedback(&mut self, feedback: Option<DragFeedback>) {
        self.drag = feedback;
        self.notify(&[Slice::Mode]);
    }

    // -------- History --------

    pub fn undo(&mut self) -> bool {
        let current = self.snapshot();
        match self.history.undo(current) {
            Some(previous) => {
                self.restore(previous);
                log::debug!("undo: {} steps left", self.history.undo_depth());
                true
            }
            None => {
                log::debug!("undo: nothing to undo");
                false
            }
        }
    }

    pub fn redo(&mut self) -> bool {
        let current = self.snapshot();
        match self.history.redo(current) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => {
                log::debug!("redo: nothing to redo");
                false
            }
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            clips: self.clips.clone(),
            current_time: self.current_time,
            duration: self.duration,
            zoom: self.zoom,
            active_clip_id: self.active_clip_id.clone(),
        }
    }

    // -------- Media ownership --------

    /// Media handles no longer referenced by a clip, a pending ingestion or
    /// any history entry. They are forgotten here and must be released by
    /// the caller.
    pub fn drain_orphaned_media(&mut self) -> Vec<String> {
        let mut referenced: BTreeSet<&str> = BTreeSet::new();
        referenced.extend(self.clips.iter().map(|c| c.source_ref.as_str()));
        referenced.extend(self.pending.iter().map(|p| p.source_ref.as_str()));
        for snapshot in self.history.snapshots() {
            referenced.extend(snapshot.clips.iter().map(|c| c.source_ref.as_str()));
        }

        let orphaned: Vec<String> = self
            .known_media
            .iter()
            .filter(|m| !referenced.contains(m.as_str()))
            .cloned()
            .collect();

        for media in &orphaned {
            self.known_media.remove(media);
        }
        orphaned
    }

    // -------- Observers --------

    /// Registers a listener for the given slices (all slices when empty).
    pub fn subscribe(
        &mut self,
        interest: &[Slice],
        listener: impl FnMut(Slice) + Send + 'static,
    ) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push(Subscription {
            id,
            interest: interest.to_vec(),
            listener: Box::new(listener),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self, slices: &[Slice]) {
        for sub in self.subscribers.iter_mut() {
            for slice in slices {
                if sub.interest.is_empty() || sub.interest.contains(slice) {
                    (sub.listener)(*slice);
                }
            }
        }
    }

    // -------- Selectors --------

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn sorted_clips(&self) -> Vec<Clip> {
        sorted_by_start(&self.clips)
    }

    pub fn clip(&self, id: &str) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    pub fn pending_clips(&self) -> &[PendingClip] {
        &self.pending
    }

    pub fn active_clip_id(&self) -> Option<&str> {
        self.active_clip_id.as_deref()
    }

    pub fn active_clip(&self) -> Option<&Clip> {
        self.active_clip_id.as_deref().and_then(|id| self.clip(id))
    }

    pub fn has_active_clip(&self) -> bool {
        self.active_clip().is_some()
    }

    pub fn is_clip_selected(&self, id: &str) -> bool {
        self.active_clip_id.as_deref() == Some(id)
    }

    pub fn segments(&self) -> Vec<Segment> {
        build_segments(&self.clips)
    }

    pub fn active_segment(&self) -> Option<Segment> {
        active_segment(&self.segments(), self.current_time).cloned()
    }

    pub fn is_in_gap(&self) -> bool {
        self.active_segment().is_some_and(|s| s.is_gap())
    }

    pub fn is_timeline_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn px_per_second(&self) -> f64 {
        self.config.base_px_per_second * self.zoom
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn drag_feedback(&self) -> Option<&DragFeedback> {
        self.drag.as_ref()
    }

    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            current_time: self.current_time,
            duration: self.duration,
            is_playing: self.is_playing,
            zoom: self.zoom,
        }
    }

    /// End of the furthest untrimmed span; new clips are appended here.
    pub fn timeline_end(&self) -> f64 {
        self.clips.iter().map(Clip::span_end).fold(0.0, f64::max)
    }

    // -------- Internals --------

    fn index_of(&self, id: &str) -> Option<usize> {
        self.clips.iter().position(|c| c.id == id)
    }

    fn clip_mut(&mut self, id: &str) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    fn checkpoint(&mut self) {
        let snapshot = self.snapshot();
        self.history.push(snapshot);
        self.notify(&[Slice::History]);
    }

    fn restore(&mut self, snapshot: EditorSnapshot) {
        self.clips = snapshot.clips;
        self.current_time = snapshot.current_time;
        self.duration = snapshot.duration;
        self.zoom = snapshot.zoom;
        self.active_clip_id = snapshot.active_clip_id;
        self.mode = EditorMode::Idle;
        self.drag = None;

        self.notify(&[
            Slice::Clips,
            Slice::Playback,
            Slice::Zoom,
            Slice::Selection,
            Slice::Mode,
            Slice::History,
        ]);
    }

    fn refresh_duration(&mut self) {
        self.duration = total_duration(&self.clips);
    }

    /// Drops clips without a usable span and pulls trims back into range.
    fn sanitize_clip(&self, mut clip: Clip) -> Option<Clip> {
        let min_len = self.config.min_clip_length;
        if clip.id.is_empty() || !clip.duration.is_finite() || clip.duration < min_len {
            log::debug!("Rejecting clip {:?} with duration {}", clip.id, clip.duration);
            return None;
        }
        if !clip.start_time.is_finite() {
            return None;
        }

        clip.start_time = clip.start_time.max(0.0);
        if !clip.source_offset.is_finite() || clip.source_offset < 0.0 {
            clip.source_offset = 0.0;
        }
        let trim_start = if clip.trim_start.is_finite() { clip.trim_start } else { 0.0 };
        let trim_end = if clip.trim_end.is_finite() { clip.trim_end } else { 0.0 };
        clip.trim_start = clamp_time(trim_start, 0.0, clip.duration - min_len);
        clip.trim_end = clamp_time(trim_end, 0.0, clip.duration - clip.trim_start - min_len);
        Some(clip)
    }

    /// Clip whose playable window strictly contains `time`. The selected
    /// clip wins, then the topmost visual track.
    fn split_candidate(&self, time: f64) -> Option<usize> {
        let inside = |c: &Clip| {
            let range = c.play_range();
            time > range.start && time < range.end
        };

        if let Some(active) = self.active_clip_id.as_deref() {
            if let Some(index) = self.index_of(active) {
                if inside(&self.clips[index]) {
                    return Some(index);
                }
            }
        }

        self.clips
            .iter()
            .enumerate()
            .filter(|(_, c)| inside(c))
            .min_by_key(|(_, c)| (c.group.visual_rank().unwrap_or(u8::MAX), c.track_index))
            .map(|(i, _)| i)
    }

    fn resolve_track_overlaps(&mut self, moved_id: &str) {
        let Some(moved) = self.clip(moved_id).cloned() else {
            return;
        };
        let same_track =
            |c: &Clip| c.id != moved.id && c.group == moved.group && c.track_index == moved.track_index;

        // Skip past any neighbour the new start lands inside.
        let mut start = moved.start_time;
        for _ in 0..=self.clips.len() {
            let blocker = self
                .clips
                .iter()
                .filter(|c| same_track(c))
                .find(|c| c.start_time <= start && start < c.span_end());
            match blocker {
                Some(b) => start = b.span_end(),
                None => break,
            }
        }

        // Cascade later neighbours to the right.
        let mut cursor = start + moved.duration;
        let mut followers: Vec<usize> = self
            .clips
            .iter()
            .enumerate()
            .filter(|(_, c)| same_track(c) && c.start_time >= start)
            .map(|(i, _)| i)
            .collect();
        followers.sort_by(|a, b| self.clips[*a].start_time.total_cmp(&self.clips[*b].start_time));

        for index in followers {
            let clip = &mut self.clips[index];
            if clip.start_time < cursor {
                log::debug!("Pushing {} from {:.2}s to {:.2}s", clip.id, clip.start_time, cursor);
                clip.start_time = cursor;
            }
            cursor = cursor.max(clip.span_end());
        }

        if let Some(clip) = self.clip_mut(moved_id) {
            clip.start_time = start;
        }
    }
}

impl Default for EditorStore {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_add_clip_selects_and_extends_duration() {
        let mut store = EditorStore::default();
        let clip = Clip::new("A", "a.mp4", 0.0, 4.0);
        let id = clip.id.clone();

        assert!(store.add_clip(clip));
        assert_eq!(store.active_clip_id(), Some(id.as_str()));
        assert_eq!(store.duration(), 4.0);
    }

    #[test]
    fn test_add_clip_rejects_bad_input() {
        let mut store = EditorStore::default();
        assert!(!store.add_clip(Clip::new("zero", "z.mp4", 0.0, 0.0)));
        assert!(!store.add_clip(Clip::new("nan", "n.mp4", 0.0, f64::NAN)));

        let clip = Clip::new("A", "a.mp4", 0.0, 4.0);
        assert!(store.add_clip(clip.clone()));
        assert!(!store.add_clip(clip));
        assert_eq!(store.clip_count(), 1);
    }

    #[test]
    fn test_select_unknown_is_noop() {
        let mut store = EditorStore::default();
        let clip = Clip::new("A", "a.mp4", 0.0, 4.0);
        let id = clip.id.clone();
        store.add_clip(clip);

        assert!(!store.select_clip(Some("missing")));
        assert_eq!(store.active_clip_id(), Some(id.as_str()));
        assert!(store.select_clip(None));
        assert!(!store.has_active_clip());
    }

    #[test]
    fn test_set_current_time_never_negative() {
        let mut store = EditorStore::default();
        store.set_current_time(-3.0);
        assert_eq!(store.current_time(), 0.0);
        store.update_current_time(|t| t + 2.5);
        assert_eq!(store.current_time(), 2.5);
    }

    #[test]
    fn test_observers_receive_interesting_slices() {
        let mut store = EditorStore::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = store.subscribe(&[Slice::Zoom], move |slice| sink.lock().unwrap().push(slice));

        store.set_zoom(2.0);
        store.set_current_time(1.0);
        assert_eq!(*seen.lock().unwrap(), vec![Slice::Zoom]);

        assert!(store.unsubscribe(id));
        store.set_zoom(3.0);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_keeps_media_while_undoable() {
        let mut store = EditorStore::default();
        store.add_clip(Clip::new("A", "blob:a", 0.0, 4.0));

        assert!(store.clear_clips().is_empty());
        assert!(store.undo());
        assert_eq!(store.clip_count(), 1);

        let released = store.reset_project(None, "Fresh", vec![]);
        assert_eq!(released, vec!["blob:a".to_string()]);
    }
}
