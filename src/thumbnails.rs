// src/thumbnails.rs
use crate::timeline::Clip;
use serde::Serialize;

/// A frame shown in a clip's thumbnail strip.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ThumbnailFrame {
    pub index: u64,
    /// Timeline time the frame is pinned to.
    pub time: f64,
    pub url: String,
}

/// Numbered frame images (`frame_001.jpg`, ...) extracted at `fps` under
/// `base_url`, frame 1 being source time 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailStrip {
    pub base_url: String,
    pub fps: u32,
}

impl ThumbnailStrip {
    pub fn new(base_url: &str, fps: u32) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            fps: fps.max(1),
        }
    }

    /// `floor(seconds * fps)`
    pub fn frame_index(&self, seconds: f64) -> u64 {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        (seconds * self.fps as f64).floor() as u64
    }

    pub fn frame_url(&self, index: u64) -> String {
        format!("{}/frame_{:03}.jpg", self.base_url, index + 1)
    }

    /// Frames covering the clip's playable window, one per frame interval,
    /// measured from the start of the playable window.
    pub fn frames_for_clip(&self, clip: &Clip) -> Vec<ThumbnailFrame> {
        let range = clip.play_range();
        let step = 1.0 / self.fps as f64;
        let length = range.len().max(0.0);

        let count = (length * self.fps as f64).ceil() as u64;
        // floor(i * step * fps) is i; skip the float round trip.
        (0..count)
            .map(|index| ThumbnailFrame {
                index,
                time: range.start + index as f64 * step,
                url: self.frame_url(index),
            })
            .collect()
    }

    /// Width in pixels each frame occupies at the current scale.
    pub fn frame_width(&self, px_per_second: f64) -> f64 {
        px_per_second / self.fps as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_index_and_url() {
        let strip = ThumbnailStrip::new("http://localhost:5000/frames/abc/", 2);
        assert_eq!(strip.frame_index(0.0), 0);
        assert_eq!(strip.frame_index(1.74), 3);
        assert_eq!(strip.frame_index(-1.0), 0);
        assert_eq!(strip.frame_url(0), "http://localhost:5000/frames/abc/frame_001.jpg");
        assert_eq!(strip.frame_url(41), "http://localhost:5000/frames/abc/frame_042.jpg");
    }

    #[test]
    fn test_frames_follow_playable_window() {
        let mut clip = Clip::new("A", "a.mp4", 10.0, 6.0);
        clip.trim_start = 2.0;
        clip.trim_end = 1.5;

        let strip = ThumbnailStrip::new("base", 1);
        let frames = strip.frames_for_clip(&clip);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].time, 12.0);
        assert_eq!(frames[2].index, 2);
        assert_eq!(frames[2].url, "base/frame_003.jpg");
        assert_eq!(strip.frame_width(100.0), 100.0);
    }
}
