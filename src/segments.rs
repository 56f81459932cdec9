// src/segments.rs
//! Clip/gap segment sequences derived from the clip set, plus the track
//! grouping helpers the timeline rows are drawn from.

use crate::timeline::{sorted_by_start, Clip, TrackGroup};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Clip { start: f64, end: f64, clip: Clip },
    Gap { start: f64, end: f64 },
}

impl Segment {
    pub fn start(&self) -> f64 {
        match self {
            Segment::Clip { start, .. } | Segment::Gap { start, .. } => *start,
        }
    }

    pub fn end(&self) -> f64 {
        match self {
            Segment::Clip { end, .. } | Segment::Gap { end, .. } => *end,
        }
    }

    fn set_end(&mut self, value: f64) {
        match self {
            Segment::Clip { end, .. } | Segment::Gap { end, .. } => *end = value,
        }
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.start() && time < self.end()
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Segment::Gap { .. })
    }

    pub fn clip(&self) -> Option<&Clip> {
        match self {
            Segment::Clip { clip, .. } => Some(clip),
            Segment::Gap { .. } => None,
        }
    }
}

/// Flattens every clip into one sequence, inserting gaps wherever the next
/// playable window starts after the cursor. Correct for single-track
/// playback; see `build_composited_segments` for stacked tracks.
pub fn build_segments(clips: &[Clip]) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(clips.len() * 2);
    let mut cursor = 0.0;

    for clip in sorted_by_start(clips) {
        let range = clip.play_range();

        if range.start > cursor {
            segments.push(Segment::Gap {
                start: cursor,
                end: range.start,
            });
        }

        cursor = range.end;
        segments.push(Segment::Clip {
            start: range.start,
            end: range.end,
            clip,
        });
    }

    segments
}

/// Linear scan, O(n) per query.
pub fn active_segment(segments: &[Segment], time: f64) -> Option<&Segment> {
    segments.iter().find(|s| s.contains(time))
}

/// Resolves stacked visual tracks into one non-overlapping sequence.
/// Overlay beats video and the lowest track index wins inside a group;
/// audio clips are ignored.
pub fn build_composited_segments(clips: &[Clip]) -> Vec<Segment> {
    let visual: Vec<&Clip> = clips
        .iter()
        .filter(|c| c.group.visual_rank().is_some() && !c.play_range().is_empty())
        .collect();

    let mut bounds: Vec<f64> = vec![0.0];
    for clip in &visual {
        let range = clip.play_range();
        bounds.push(range.start);
        bounds.push(range.end);
    }
    bounds.sort_by(f64::total_cmp);
    bounds.dedup();

    let mut segments: Vec<Segment> = Vec::new();

    for pair in bounds.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let winner = visual
            .iter()
            .filter(|c| {
                let range = c.play_range();
                range.start <= start && range.end >= end
            })
            .min_by_key(|c| (c.group.visual_rank(), c.track_index));

        // Extend the previous segment when the same clip (or another gap) continues.
        let continues = match (segments.last(), winner) {
            (Some(Segment::Clip { clip, .. }), Some(w)) => clip.id == w.id,
            (Some(Segment::Gap { .. }), None) => true,
            _ => false,
        };

        if continues {
            if let Some(last) = segments.last_mut() {
                last.set_end(end);
            }
        } else {
            segments.push(match winner {
                Some(w) => Segment::Clip {
                    start,
                    end,
                    clip: (*w).clone(),
                },
                None => Segment::Gap { start, end },
            });
        }
    }

    segments
}

/// Clips of one group bucketed by track index, ascending.
pub fn group_tracks(clips: &[Clip], group: TrackGroup) -> Vec<Vec<Clip>> {
    let mut tracks: BTreeMap<usize, Vec<Clip>> = BTreeMap::new();
    for clip in clips.iter().filter(|c| c.group == group) {
        tracks.entry(clip.track_index).or_default().push(clip.clone());
    }
    tracks.into_values().collect()
}

pub fn track_indices(clips: &[Clip], group: TrackGroup) -> Vec<usize> {
    let mut indices: Vec<usize> = clips
        .iter()
        .filter(|c| c.group == group)
        .map(|c| c.track_index)
        .collect();
    indices.sort_unstable();
    indices.dedup();
    indices
}

pub fn clips_for_track(clips: &[Clip], group: TrackGroup, track_index: usize) -> Vec<Clip> {
    clips
        .iter()
        .filter(|c| c.group == group && c.track_index == track_index)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::total_duration;

    fn bounds(segments: &[Segment]) -> Vec<(bool, f64, f64)> {
        segments
            .iter()
            .map(|s| (s.is_gap(), s.start(), s.end()))
            .collect()
    }

    #[test]
    fn test_gap_between_clips() {
        let clips = vec![
            Clip::new("A", "a.mp4", 0.0, 5.0),
            Clip::new("B", "b.mp4", 8.0, 5.0),
        ];
        let segments = build_segments(&clips);

        assert_eq!(
            bounds(&segments),
            vec![(false, 0.0, 5.0), (true, 5.0, 8.0), (false, 8.0, 13.0)]
        );
        assert_eq!(total_duration(&clips), segments.last().unwrap().end());
    }

    #[test]
    fn test_leading_gap_from_trim() {
        let mut a = Clip::new("A", "a.mp4", 0.0, 10.0);
        a.trim_start = 2.0;
        let segments = build_segments(&[a]);
        assert_eq!(bounds(&segments), vec![(true, 0.0, 2.0), (false, 2.0, 10.0)]);
    }

    #[test]
    fn test_unsorted_input_is_sorted_and_contiguous() {
        let clips = vec![
            Clip::new("C", "c.mp4", 20.0, 2.0),
            Clip::new("A", "a.mp4", 1.0, 4.0),
            Clip::new("B", "b.mp4", 5.0, 3.0),
        ];
        let segments = build_segments(&clips);

        assert_eq!(segments[0].start(), 0.0);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start());
        }
        assert_eq!(segments.last().unwrap().end(), 22.0);
    }

    #[test]
    fn test_empty_clip_set() {
        assert!(build_segments(&[]).is_empty());
        assert!(build_composited_segments(&[]).is_empty());
    }

    #[test]
    fn test_active_segment_lookup() {
        let clips = vec![
            Clip::new("A", "a.mp4", 0.0, 5.0),
            Clip::new("B", "b.mp4", 8.0, 5.0),
        ];
        let segments = build_segments(&clips);

        assert!(active_segment(&segments, 6.0).unwrap().is_gap());
        assert_eq!(active_segment(&segments, 8.0).unwrap().clip().unwrap().name, "B");
        assert!(active_segment(&segments, 13.0).is_none());
    }

    #[test]
    fn test_composited_overlay_wins() {
        let base = Clip::new("base", "a.mp4", 0.0, 10.0);
        let overlay = Clip::new("logo", "b.png", 2.0, 3.0).on_track(TrackGroup::Overlay, 0);
        let music = Clip::new("music", "c.mp3", 0.0, 20.0).on_track(TrackGroup::Audio, 0);

        let segments = build_composited_segments(&[base, overlay, music]);
        let names: Vec<_> = segments
            .iter()
            .map(|s| s.clip().map(|c| c.name.clone()).unwrap_or_default())
            .collect();

        assert_eq!(names, vec!["base", "logo", "base"]);
        assert_eq!(
            bounds(&segments),
            vec![(false, 0.0, 2.0), (false, 2.0, 5.0), (false, 5.0, 10.0)]
        );
    }

    #[test]
    fn test_composited_lower_track_wins_and_gaps_fill() {
        let upper = Clip::new("v0", "a.mp4", 4.0, 4.0);
        let lower = Clip::new("v1", "b.mp4", 3.0, 2.0).on_track(TrackGroup::Video, 1);

        let segments = build_composited_segments(&[upper, lower]);
        assert_eq!(
            bounds(&segments),
            vec![(true, 0.0, 3.0), (false, 3.0, 4.0), (false, 4.0, 8.0)]
        );
        assert_eq!(segments[1].clip().unwrap().name, "v1");
        assert_eq!(segments[2].clip().unwrap().name, "v0");
    }

    #[test]
    fn test_group_tracks() {
        let clips = vec![
            Clip::new("a", "a", 0.0, 1.0).on_track(TrackGroup::Video, 2),
            Clip::new("b", "b", 0.0, 1.0).on_track(TrackGroup::Video, 0),
            Clip::new("c", "c", 0.0, 1.0).on_track(TrackGroup::Audio, 0),
            Clip::new("d", "d", 3.0, 1.0).on_track(TrackGroup::Video, 2),
        ];

        let tracks = group_tracks(&clips, TrackGroup::Video);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0][0].name, "b");
        assert_eq!(tracks[1].len(), 2);
        assert_eq!(track_indices(&clips, TrackGroup::Video), vec![0, 2]);
        assert_eq!(clips_for_track(&clips, TrackGroup::Audio, 0).len(), 1);
    }
}
