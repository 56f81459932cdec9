use crate::preferences::RenderSettings;
use crate::timeline::{Clip, MediaType};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Timeline is empty")]
    EmptyTimeline,
    #[error("Failed to spawn ffmpeg: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("FFmpeg failed: {0}")]
    Failed(String),
    #[error("Render request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Render service returned status {0}")]
    Status(u16),
}

/// One entry of a render job. `trim_start`/`trim_end` are the in and out
/// points inside the source media, in seconds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RenderClip {
    pub source_ref: String,
    pub trim_start: f64,
    pub trim_end: f64,
    pub media_type: MediaType,
}

impl RenderClip {
    pub fn length(&self) -> f64 {
        self.trim_end - self.trim_start
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub clips: Vec<RenderClip>,
    pub settings: RenderSettings,
}

impl RenderJob {
    /// Serializes the visual clips in playable-range order. Trimmed regions
    /// are excluded; audio-only clips have no picture and are skipped.
    pub fn from_clips(clips: &[Clip], settings: RenderSettings) -> Self {
        let mut visual: Vec<&Clip> = clips
            .iter()
            .filter(|c| c.media_type != MediaType::Audio && !c.play_range().is_empty())
            .collect();
        visual.sort_by(|a, b| a.play_range().start.total_cmp(&b.play_range().start));

        let clips = visual
            .into_iter()
            .map(|c| {
                let source_in = c.source_offset + c.trim_start;
                RenderClip {
                    source_ref: c.source_ref.clone(),
                    trim_start: source_in,
                    trim_end: source_in + c.effective_duration(),
                    media_type: c.media_type,
                }
            })
            .collect();

        Self { clips, settings }
    }

    pub fn total_length(&self) -> f64 {
        self.clips.iter().map(RenderClip::length).sum()
    }
}

/// Anything that can turn a render job into an output file.
pub trait RenderService {
    fn render(&self, job: &RenderJob, output_path: &Path) -> Result<(), RenderError>;
}

#[derive(Clone, Debug)]
pub struct FFmpegEngine {
    ffmpeg_path: String,
}

impl FFmpegEngine {
    pub fn new(ffmpeg_path: &str) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.to_string(),
        }
    }

    /// Scale/pad every input to the output frame, cut it to its in/out
    /// points, then concat.
    pub fn build_filter_complex(job: &RenderJob) -> String {
        let RenderSettings {
            width,
            height,
            frame_rate,
            ..
        } = job.settings;

        let mut filter_complex = String::new();
        let mut concat_inputs = String::new();

        for (i, clip) in job.clips.iter().enumerate() {
            let cut = match clip.media_type {
                // Looped stills start at 0
                MediaType::Image => format!("trim=duration={:.4}", clip.length()),
                _ => format!("trim=start={:.4}:end={:.4}", clip.trim_start, clip.trim_end),
            };

            filter_complex.push_str(&format!(
                "[{i}:v]scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,fps={fps},{cut},setpts=PTS-STARTPTS[v{i}];",
                i = i,
                w = width,
                h = height,
                fps = frame_rate,
                cut = cut,
            ));
            concat_inputs.push_str(&format!("[v{}]", i));
        }

        filter_complex.push_str(&format!(
            "{}concat=n={}:v=1:a=0[outv]",
            concat_inputs,
            job.clips.len()
        ));
        filter_complex
    }

    pub fn build_command(&self, job: &RenderJob, output_path: &Path) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-y");

        for clip in &job.clips {
            if clip.media_type == MediaType::Image {
                cmd.arg("-loop").arg("1").arg("-t").arg(format!("{:.4}", clip.length()));
            }
            cmd.arg("-i").arg(&clip.source_ref);
        }

        cmd.arg("-filter_complex").arg(Self::build_filter_complex(job));
        cmd.arg("-map").arg("[outv]");
        cmd.arg("-c:v").arg("libx264");
        cmd.arg("-preset").arg("fast");
        cmd.arg("-pix_fmt").arg("yuv420p");
        cmd.arg(output_path);
        cmd
    }
}

impl Default for FFmpegEngine {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl RenderService for FFmpegEngine {
    fn render(&self, job: &RenderJob, output_path: &Path) -> Result<(), RenderError> {
        if job.clips.is_empty() {
            return Err(RenderError::EmptyTimeline);
        }

        let mut cmd = self.build_command(job, output_path);
        log::info!("🎥 Running FFmpeg: {:?}", cmd);

        let output = cmd.output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Failed(stderr.to_string()));
        }

        log::info!("✅ Render Complete: {:?} ({:.2}s)", output_path, job.total_length());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::TrackGroup;

    #[test]
    fn test_job_uses_source_in_out_points() {
        let mut a = Clip::new("A", "a.mp4", 0.0, 10.0);
        a.trim_start = 2.0;
        a.trim_end = 1.0;
        let mut b = Clip::new("B", "b.mp4", 12.0, 6.0);
        b.source_offset = 3.0;

        let job = RenderJob::from_clips(&[b, a], RenderSettings::default());
        assert_eq!(job.clips.len(), 2);
        assert_eq!(job.clips[0].source_ref, "a.mp4");
        assert_eq!((job.clips[0].trim_start, job.clips[0].trim_end), (2.0, 9.0));
        assert_eq!((job.clips[1].trim_start, job.clips[1].trim_end), (3.0, 9.0));
        assert_eq!(job.total_length(), 13.0);
    }

    #[test]
    fn test_audio_clips_skipped() {
        let music = Clip::new("M", "m.mp3", 0.0, 30.0)
            .on_track(TrackGroup::Audio, 0)
            .with_media_type(MediaType::Audio);
        let job = RenderJob::from_clips(&[music], RenderSettings::default());
        assert!(job.clips.is_empty());
    }

    #[test]
    fn test_filter_complex() {
        let job = RenderJob {
            clips: vec![RenderClip {
                source_ref: "a.mp4".to_string(),
                trim_start: 1.5,
                trim_end: 4.0,
                media_type: MediaType::Video,
            }],
            settings: RenderSettings::default(),
        };
        let filter = FFmpegEngine::build_filter_complex(&job);
        assert!(filter.starts_with("[0:v]scale=1920:1080"));
        assert!(filter.contains("trim=start=1.5000:end=4.0000"));
        assert!(filter.ends_with("[v0]concat=n=1:v=1:a=0[outv]"));
    }

    #[test]
    fn test_empty_job_rejected() {
        let job = RenderJob::from_clips(&[], RenderSettings::default());
        let err = FFmpegEngine::default()
            .render(&job, Path::new("/tmp/out.mp4"))
            .unwrap_err();
        assert!(matches!(err, RenderError::EmptyTimeline));
    }
}
