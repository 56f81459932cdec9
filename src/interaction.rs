// src/interaction.rs
//! Pointer gestures on the timeline, translated into store operations.
//!
//! Each gesture lives in a session value created on pointer-down, updated by
//! pointer-move and consumed on pointer-up (or `cancel_gesture`). Only one
//! gesture may be active; new gestures are refused unless the store is idle.

use crate::preferences::TrackLayoutConfig;
use crate::store::{DragFeedback, EditorMode, EditorStore};
use crate::time::clamp_time;
use crate::timeline::{Clip, TrackGroup};

// --- PURE HELPERS ---

/// `x / px_per_second`; a degenerate scale maps everything to 0.
pub fn pixels_to_time(x: f64, px_per_second: f64) -> f64 {
    if px_per_second <= 0.0 || !px_per_second.is_finite() || !x.is_finite() {
        return 0.0;
    }
    x / px_per_second
}

pub fn time_to_pixels(time: f64, px_per_second: f64) -> f64 {
    time * px_per_second
}

/// Zero plus the span start and end of every clip except `exclude_id`.
pub fn snap_points(clips: &[Clip], exclude_id: &str) -> Vec<f64> {
    let mut points = vec![0.0];
    for clip in clips.iter().filter(|c| c.id != exclude_id) {
        points.push(clip.start_time);
        points.push(clip.span_end());
    }
    points
}

/// Nearest snap point to `target`, if it lies within `threshold_secs`;
/// otherwise `target` unchanged.
pub fn snap_time(target: f64, points: &[f64], threshold_secs: f64) -> f64 {
    let nearest = points
        .iter()
        .copied()
        .min_by(|a, b| (a - target).abs().total_cmp(&(b - target).abs()));

    match nearest {
        Some(point) if (point - target).abs() <= threshold_secs => point,
        _ => target,
    }
}

/// Keeps a scrub target inside a playable window. A time some clip plays
/// at is left alone; otherwise it is pulled into the window of the topmost
/// clip whose span contains it. Times outside every span pass through.
pub fn soft_trim_clamp(clips: &[Clip], time: f64) -> f64 {
    if clips.iter().any(|c| c.is_time_in_clip(time)) {
        return time;
    }

    let owner = clips
        .iter()
        .filter(|c| c.span_contains(time))
        .min_by_key(|c| (c.group.visual_rank().unwrap_or(u8::MAX), c.track_index));

    match owner {
        Some(clip) => {
            let range = clip.play_range();
            clamp_time(time, range.start, range.end)
        }
        None => time,
    }
}

// --- TRACK LAYOUT ---

/// Maps vertical pointer positions onto tracks. Groups are stacked in
/// `TrackGroup::ALL` order, each a header row followed by its tracks.
#[derive(Debug, Clone)]
pub struct TrackLayout {
    config: TrackLayoutConfig,
}

impl TrackLayout {
    pub fn new(config: TrackLayoutConfig) -> Self {
        Self { config }
    }

    pub fn track_count(&self, group: TrackGroup) -> usize {
        let count = match group {
            TrackGroup::Video => self.config.video_tracks,
            TrackGroup::Overlay => self.config.overlay_tracks,
            TrackGroup::Audio => self.config.audio_tracks,
        };
        count.max(1)
    }

    fn group_height(&self, group: TrackGroup) -> f64 {
        self.config.header_height + self.track_count(group) as f64 * self.config.track_height
    }

    pub fn group_top(&self, group: TrackGroup) -> f64 {
        TrackGroup::ALL
            .iter()
            .take_while(|g| **g != group)
            .map(|g| self.group_height(*g))
            .sum()
    }

    pub fn track_top(&self, group: TrackGroup, track_index: usize) -> f64 {
        self.group_top(group) + self.config.header_height + track_index as f64 * self.config.track_height
    }

    /// Track of `group` under `y`, or `None` when `y` is outside that
    /// group's track rows.
    pub fn track_at(&self, group: TrackGroup, y: f64) -> Option<usize> {
        let top = self.group_top(group) + self.config.header_height;
        if !y.is_finite() || y < top || self.config.track_height <= 0.0 {
            return None;
        }
        let index = ((y - top) / self.config.track_height).floor() as usize;
        (index < self.track_count(group)).then_some(index)
    }

    pub fn locate(&self, y: f64) -> Option<(TrackGroup, usize)> {
        TrackGroup::ALL
            .iter()
            .find_map(|g| self.track_at(*g, y).map(|i| (*g, i)))
    }
}

// --- GESTURE SESSIONS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimHandle {
    Start,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScrubSession {
    /// Screen X of timeline time 0 (track area left edge minus scroll).
    pub origin_px: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrimSession {
    pub clip_id: String,
    pub handle: TrimHandle,
    pub start_x: f64,
    pub initial_trim_start: f64,
    pub initial_trim_end: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub clip_id: String,
    pub group: TrackGroup,
    pub start_x: f64,
    pub original_start: f64,
    pub original_track: usize,
    pub candidate_start: f64,
    pub candidate_track: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Scrub(ScrubSession),
    Trim(TrimSession),
    Drag(DragSession),
}

// --- CONTROLLER ---

pub struct InteractionController {
    gesture: Option<Gesture>,
    armed_trim: Option<String>,
    layout: TrackLayout,
}

impl InteractionController {
    pub fn new(layout: TrackLayout) -> Self {
        Self {
            gesture: None,
            armed_trim: None,
            layout,
        }
    }

    pub fn from_store(store: &EditorStore) -> Self {
        Self::new(TrackLayout::new(store.config().layout.clone()))
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    /// Clip whose soft trim will be committed by its next click.
    pub fn armed_trim(&self) -> Option<&str> {
        self.armed_trim.as_deref()
    }

    pub fn layout(&self) -> &TrackLayout {
        &self.layout
    }

    fn can_start(&self, store: &EditorStore) -> bool {
        self.gesture.is_none() && store.mode() == EditorMode::Idle
    }

    // Scrub

    pub fn begin_scrub(&mut self, store: &mut EditorStore, x: f64, origin_px: f64) -> bool {
        if !self.can_start(store) {
            return false;
        }
        self.armed_trim = None;
        self.gesture = Some(Gesture::Scrub(ScrubSession { origin_px }));
        self.scrub_to(store, x, origin_px);
        true
    }

    fn scrub_to(&self, store: &mut EditorStore, x: f64, origin_px: f64) {
        let raw = pixels_to_time(x - origin_px, store.px_per_second());
        let time = soft_trim_clamp(store.clips(), clamp_time(raw, 0.0, store.duration()));
        store.set_current_time(time);
    }

    /// Clicking empty timeline seeks without starting a gesture.
    pub fn timeline_click(&mut self, store: &mut EditorStore, x: f64, origin_px: f64) -> bool {
        if !self.can_start(store) {
            return false;
        }
        self.armed_trim = None;
        let time = pixels_to_time(x - origin_px, store.px_per_second());
        store.seek_to(time);
        true
    }

    // Trim

    pub fn begin_trim(
        &mut self,
        store: &mut EditorStore,
        clip_id: &str,
        handle: TrimHandle,
        x: f64,
    ) -> bool {
        if !self.can_start(store) {
            return false;
        }
        let Some(clip) = store.clip(clip_id) else {
            return false;
        };

        let session = TrimSession {
            clip_id: clip_id.to_string(),
            handle,
            start_x: x,
            initial_trim_start: clip.trim_start,
            initial_trim_end: clip.trim_end,
        };

        self.armed_trim = None;
        store.select_clip(Some(clip_id));
        store.set_mode(EditorMode::Trimming);
        self.gesture = Some(Gesture::Trim(session));
        true
    }

    // Clip press: commit an armed trim, otherwise start a drag.

    pub fn clip_pointer_down(&mut self, store: &mut EditorStore, clip_id: &str, x: f64) -> bool {
        if self.armed_trim.as_deref() == Some(clip_id) && self.gesture.is_none() {
            self.armed_trim = None;
            log::debug!("Committing trim on {}", clip_id);
            return store.apply_trim(clip_id);
        }

        if !self.can_start(store) {
            return false;
        }
        self.armed_trim = None;

        let Some(clip) = store.clip(clip_id) else {
            return false;
        };
        let session = DragSession {
            clip_id: clip_id.to_string(),
            group: clip.group,
            start_x: x,
            original_start: clip.start_time,
            original_track: clip.track_index,
            candidate_start: clip.start_time,
            candidate_track: clip.track_index,
        };

        store.select_clip(Some(clip_id));
        store.set_mode(EditorMode::Dragging);
        store.set_drag_feedback(Some(DragFeedback {
            clip_id: clip_id.to_string(),
            offset_px: 0.0,
            drop_indicator: session.original_start,
            track_index: session.original_track,
        }));
        self.gesture = Some(Gesture::Drag(session));
        true
    }

    // Move / up

    pub fn pointer_move(&mut self, store: &mut EditorStore, x: f64, y: f64) {
        let pps = store.px_per_second();

        match self.gesture.as_mut() {
            Some(Gesture::Scrub(session)) => {
                let origin = session.origin_px;
                self.scrub_to(store, x, origin);
            }
            Some(Gesture::Trim(session)) => {
                let delta = pixels_to_time(x - session.start_x, pps);
                match session.handle {
                    TrimHandle::Start => {
                        store.set_trim_start(&session.clip_id, session.initial_trim_start + delta);
                    }
                    TrimHandle::End => {
                        store.set_trim_end(&session.clip_id, session.initial_trim_end - delta);
                    }
                }
            }
            Some(Gesture::Drag(session)) => {
                let raw = (session.original_start + pixels_to_time(x - session.start_x, pps)).max(0.0);
                let threshold = pixels_to_time(store.config().snap_threshold_px, pps);
                let points = snap_points(store.clips(), &session.clip_id);

                session.candidate_start = snap_time(raw, &points, threshold);
                session.candidate_track = self
                    .layout
                    .track_at(session.group, y)
                    .unwrap_or(session.original_track);

                store.set_drag_feedback(Some(DragFeedback {
                    clip_id: session.clip_id.clone(),
                    offset_px: x - session.start_x,
                    drop_indicator: session.candidate_start,
                    track_index: session.candidate_track,
                }));
            }
            None => {}
        }
    }

    /// Ends the active gesture. Drags commit their snapped position; trims
    /// stay soft and arm the clip for commit on its next click.
    pub fn pointer_up(&mut self, store: &mut EditorStore) -> bool {
        match self.gesture.take() {
            Some(Gesture::Scrub(_)) => true,
            Some(Gesture::Trim(session)) => {
                store.set_mode(EditorMode::Idle);
                let changed = store.clip(&session.clip_id).is_some_and(|c| {
                    c.trim_start != session.initial_trim_start || c.trim_end != session.initial_trim_end
                });
                if changed {
                    self.armed_trim = Some(session.clip_id);
                }
                true
            }
            Some(Gesture::Drag(session)) => {
                store.set_drag_feedback(None);
                store.set_mode(EditorMode::Idle);

                let moved = session.candidate_start != session.original_start
                    || session.candidate_track != session.original_track;
                if !moved {
                    return false;
                }
                let track = (session.candidate_track != session.original_track)
                    .then_some(session.candidate_track);
                store.move_clip(&session.clip_id, session.candidate_start, track)
            }
            None => false,
        }
    }

    /// Escape: trims revert to their gesture-start values, drags are
    /// abandoned, an armed trim is disarmed.
    pub fn cancel_gesture(&mut self, store: &mut EditorStore) -> bool {
        let disarmed = self.armed_trim.take().is_some();

        match self.gesture.take() {
            Some(Gesture::Trim(session)) => {
                match session.handle {
                    TrimHandle::Start => store.set_trim_start(&session.clip_id, session.initial_trim_start),
                    TrimHandle::End => store.set_trim_end(&session.clip_id, session.initial_trim_end),
                };
                store.set_mode(EditorMode::Idle);
                true
            }
            Some(Gesture::Drag(_)) => {
                store.set_drag_feedback(None);
                store.set_mode(EditorMode::Idle);
                true
            }
            Some(Gesture::Scrub(_)) => true,
            None => disarmed,
        }
    }

    pub fn split(&mut self, store: &mut EditorStore) -> bool {
        if self.gesture.is_some() {
            return false;
        }
        self.armed_trim = None;
        store.split_clip_at_current_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(clips: Vec<Clip>) -> (EditorStore, Vec<String>) {
        let mut store = EditorStore::default();
        let ids = clips.iter().map(|c| c.id.clone()).collect();
        for clip in clips {
            store.add_clip(clip);
        }
        (store, ids)
    }

    #[test]
    fn test_pixels_to_time() {
        assert_eq!(pixels_to_time(250.0, 100.0), 2.5);
        assert_eq!(pixels_to_time(250.0, 200.0), 1.25);
        assert_eq!(pixels_to_time(10.0, 0.0), 0.0);
        assert_eq!(time_to_pixels(2.5, 100.0), 250.0);
    }

    #[test]
    fn test_snap_nearest_within_threshold() {
        let points = [0.0, 5.0, 8.0];
        assert_eq!(snap_time(5.08, &points, 0.1), 5.0);
        assert_eq!(snap_time(6.5, &points, 0.1), 6.5);
        assert_eq!(snap_time(7.95, &points, 0.1), 8.0);
        assert_eq!(snap_time(0.05, &points, 0.1), 0.0);
    }

    #[test]
    fn test_snap_points_exclude_dragged_clip() {
        let a = Clip::new("A", "a", 0.0, 5.0);
        let b = Clip::new("B", "b", 8.0, 2.0);
        let points = snap_points(&[a.clone(), b], &a.id);
        assert_eq!(points, vec![0.0, 8.0, 10.0]);
    }

    #[test]
    fn test_soft_trim_clamp() {
        let mut clip = Clip::new("A", "a", 0.0, 10.0);
        clip.trim_start = 2.0;
        clip.trim_end = 1.0;
        let clips = [clip];
        assert_eq!(soft_trim_clamp(&clips, 1.0), 2.0);
        assert_eq!(soft_trim_clamp(&clips, 9.5), 9.0);
        assert_eq!(soft_trim_clamp(&clips, 5.0), 5.0);
        assert_eq!(soft_trim_clamp(&clips, 12.0), 12.0);
    }

    #[test]
    fn test_soft_trim_clamp_follows_track_priority() {
        let mut video = Clip::new("V", "v", 0.0, 10.0);
        video.trim_start = 3.0;
        let mut overlay = Clip::new("O", "o", 0.0, 10.0).on_track(TrackGroup::Overlay, 0);
        overlay.trim_start = 1.0;

        // overlay plays at 2s even though the video clip is still trimmed there
        let clips = [video.clone(), overlay.clone()];
        assert_eq!(soft_trim_clamp(&clips, 2.0), 2.0);

        // nothing plays at 0.5s: the overlay's window wins over the video's
        assert_eq!(soft_trim_clamp(&clips, 0.5), 1.0);
        assert_eq!(soft_trim_clamp(&[overlay, video], 0.5), 1.0);
    }

    #[test]
    fn test_track_layout() {
        let layout = TrackLayout::new(TrackLayoutConfig {
            video_tracks: 2,
            ..TrackLayoutConfig::default()
        });
        // video header 0..28, tracks 28..76, 76..124; overlay header 124..152
        assert_eq!(layout.track_at(TrackGroup::Video, 30.0), Some(0));
        assert_eq!(layout.track_at(TrackGroup::Video, 80.0), Some(1));
        assert_eq!(layout.track_at(TrackGroup::Video, 10.0), None);
        assert_eq!(layout.track_at(TrackGroup::Video, 130.0), None);
        assert_eq!(layout.locate(160.0), Some((TrackGroup::Overlay, 0)));
        assert_eq!(layout.track_top(TrackGroup::Audio, 0), 228.0);
    }

    #[test]
    fn test_scrub_clamps_into_playable_window() {
        let mut clip = Clip::new("A", "a", 0.0, 10.0);
        clip.trim_start = 2.0;
        let (mut store, _) = store_with(vec![clip]);
        let mut ctl = InteractionController::from_store(&store);

        assert!(ctl.begin_scrub(&mut store, 50.0, 0.0));
        assert_eq!(store.current_time(), 2.0);
        ctl.pointer_move(&mut store, 400.0, 0.0);
        assert_eq!(store.current_time(), 4.0);
        ctl.pointer_move(&mut store, -100.0, 0.0);
        assert_eq!(store.current_time(), 2.0);
        assert!(ctl.pointer_up(&mut store));
        assert!(ctl.gesture().is_none());
        assert_eq!(store.mode(), EditorMode::Idle);
    }

    #[test]
    fn test_scrub_past_end_stops_at_duration() {
        let (mut store, _) = store_with(vec![Clip::new("A", "a", 0.0, 5.0)]);
        let mut ctl = InteractionController::from_store(&store);

        assert!(ctl.begin_scrub(&mut store, 0.0, 0.0));
        ctl.pointer_move(&mut store, 2000.0, 0.0);
        assert_eq!(store.current_time(), store.duration());
        assert_eq!(store.current_time(), 5.0);
        ctl.pointer_up(&mut store);
    }

    #[test]
    fn test_trim_then_click_commits() {
        let (mut store, ids) = store_with(vec![Clip::new("A", "a", 0.0, 10.0)]);
        let id = &ids[0];
        let mut ctl = InteractionController::from_store(&store);

        assert!(ctl.begin_trim(&mut store, id, TrimHandle::Start, 0.0));
        assert_eq!(store.mode(), EditorMode::Trimming);
        ctl.pointer_move(&mut store, 200.0, 0.0);
        assert_eq!(store.clip(id).unwrap().trim_start, 2.0);

        ctl.pointer_up(&mut store);
        assert_eq!(store.mode(), EditorMode::Idle);
        assert_eq!(ctl.armed_trim(), Some(id.as_str()));

        assert!(ctl.clip_pointer_down(&mut store, id, 0.0));
        let clip = store.clip(id).unwrap();
        assert_eq!(clip.start_time, 2.0);
        assert_eq!(clip.duration, 8.0);
        assert_eq!(clip.trim_start, 0.0);
        assert!(ctl.armed_trim().is_none());
    }

    #[test]
    fn test_end_handle_moves_left_to_trim() {
        let (mut store, ids) = store_with(vec![Clip::new("A", "a", 0.0, 10.0)]);
        let mut ctl = InteractionController::from_store(&store);

        ctl.begin_trim(&mut store, &ids[0], TrimHandle::End, 1000.0);
        ctl.pointer_move(&mut store, 700.0, 0.0);
        assert_eq!(store.clip(&ids[0]).unwrap().trim_end, 3.0);
        ctl.pointer_move(&mut store, -5000.0, 0.0);
        assert!((store.clip(&ids[0]).unwrap().trim_end - 9.9).abs() < 1e-9);
    }

    #[test]
    fn test_cancel_trim_restores_initial_values() {
        let (mut store, ids) = store_with(vec![Clip::new("A", "a", 0.0, 10.0)]);
        let mut ctl = InteractionController::from_store(&store);

        ctl.begin_trim(&mut store, &ids[0], TrimHandle::Start, 0.0);
        ctl.pointer_move(&mut store, 300.0, 0.0);
        assert!(ctl.cancel_gesture(&mut store));
        assert_eq!(store.clip(&ids[0]).unwrap().trim_start, 0.0);
        assert_eq!(store.mode(), EditorMode::Idle);
        assert!(ctl.armed_trim().is_none());
    }

    #[test]
    fn test_drag_commits_snapped_start() {
        let a = Clip::new("A", "a", 0.0, 5.0);
        let b = Clip::new("B", "b", 10.0, 2.0);
        let (mut store, ids) = store_with(vec![a, b]);
        let mut ctl = InteractionController::from_store(&store);

        assert!(ctl.clip_pointer_down(&mut store, &ids[1], 1000.0));
        assert_eq!(store.mode(), EditorMode::Dragging);
        // 10s - 4.96s = 5.04s, within 0.1s of A's end
        ctl.pointer_move(&mut store, 504.0, 40.0);
        assert_eq!(store.drag_feedback().unwrap().drop_indicator, 5.0);

        assert!(ctl.pointer_up(&mut store));
        assert_eq!(store.clip(&ids[1]).unwrap().start_time, 5.0);
        assert!(store.drag_feedback().is_none());
        assert_eq!(store.mode(), EditorMode::Idle);
    }

    #[test]
    fn test_drag_changes_track_within_group_only() {
        let (mut store, ids) = {
            let mut config = crate::preferences::EditorConfig::default();
            config.layout.video_tracks = 2;
            let mut store = EditorStore::new(config);
            let clip = Clip::new("A", "a", 0.0, 5.0);
            let id = clip.id.clone();
            store.add_clip(clip);
            (store, vec![id])
        };
        let mut ctl = InteractionController::from_store(&store);

        ctl.clip_pointer_down(&mut store, &ids[0], 0.0);
        // second video row
        ctl.pointer_move(&mut store, 0.0, 90.0);
        ctl.pointer_up(&mut store);
        assert_eq!(store.clip(&ids[0]).unwrap().track_index, 1);

        // pointer over the audio rows keeps the clip in its track
        ctl.clip_pointer_down(&mut store, &ids[0], 0.0);
        ctl.pointer_move(&mut store, 0.0, 260.0);
        ctl.pointer_up(&mut store);
        let clip = store.clip(&ids[0]).unwrap();
        assert_eq!(clip.track_index, 1);
        assert_eq!(clip.group, TrackGroup::Video);
    }

    #[test]
    fn test_gesture_blocks_new_gesture() {
        let (mut store, ids) = store_with(vec![Clip::new("A", "a", 0.0, 5.0)]);
        let mut ctl = InteractionController::from_store(&store);

        assert!(ctl.clip_pointer_down(&mut store, &ids[0], 0.0));
        assert!(!ctl.begin_trim(&mut store, &ids[0], TrimHandle::Start, 0.0));
        assert!(!ctl.begin_scrub(&mut store, 0.0, 0.0));
        assert!(ctl.cancel_gesture(&mut store));
        assert!(ctl.begin_scrub(&mut store, 0.0, 0.0));
    }

    #[test]
    fn test_timeline_click_seeks_within_duration() {
        let (mut store, _) = store_with(vec![Clip::new("A", "a", 0.0, 5.0)]);
        let mut ctl = InteractionController::from_store(&store);

        assert!(ctl.timeline_click(&mut store, 320.0, 20.0));
        assert_eq!(store.current_time(), 3.0);
        ctl.timeline_click(&mut store, 2000.0, 0.0);
        assert_eq!(store.current_time(), 5.0);
    }
}
