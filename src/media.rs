// src/media.rs
//! Media ingestion boundary: turning a file into a playable source handle
//! and learning its duration.

use crate::timeline::MediaType;
use std::collections::BTreeSet;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;
use thiserror::Error;

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "mkv", "webm", "avi"];

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Not a video file: {0}")]
    NotVideo(String),
    #[error("Media not found: {0}")]
    NotFound(String),
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },
    #[error("ffprobe failed: {0}")]
    ProbeFailed(String),
    #[error("Failed to decode probe output: {0}")]
    Decode(String),
    #[error("Probe timed out")]
    Timeout,
}

/// A source handle produced by ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedMedia {
    pub source_ref: String,
    pub name: String,
    pub media_type: MediaType,
}

pub trait MediaProvider: Send + Sync {
    /// Accepts a raw upload and hands back a playable reference. Non-video
    /// input is rejected.
    fn ingest(&self, path: &Path) -> Result<IngestedMedia, MediaError>;

    /// Duration in seconds. May be slow; callers run it off the store lock.
    fn probe_duration(&self, source_ref: &str) -> Result<f64, MediaError>;

    /// Gives up a handle the editor no longer references.
    fn release(&self, source_ref: &str);
}

pub fn is_video_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Reads `format.duration` from `ffprobe -of json` output.
pub fn parse_probe_output(stdout: &str) -> Result<f64, MediaError> {
    let json: serde_json::Value =
        serde_json::from_str(stdout).map_err(|e| MediaError::Decode(e.to_string()))?;

    let duration_str = json["format"]["duration"]
        .as_str()
        .ok_or_else(|| MediaError::Decode("Could not find duration in ffprobe output".to_string()))?;

    let duration = duration_str
        .parse::<f64>()
        .map_err(|e| MediaError::Decode(format!("Failed to parse duration as float: {}", e)))?;

    if !duration.is_finite() || duration <= 0.0 {
        return Err(MediaError::Decode(format!("Unusable duration {}", duration)));
    }
    Ok(duration)
}

/// Local-file provider backed by the ffprobe binary. Handles are the file
/// paths themselves; the provider tracks which ones are live.
pub struct FfprobeMediaProvider {
    probe_candidates: Vec<String>,
    live: Mutex<BTreeSet<String>>,
}

impl FfprobeMediaProvider {
    pub fn new(ffprobe_path: &str) -> Self {
        let mut probe_candidates = vec![ffprobe_path.to_string()];
        // Homebrew fallback
        if ffprobe_path == "ffprobe" {
            probe_candidates.push("/opt/homebrew/bin/ffprobe".to_string());
        }
        Self {
            probe_candidates,
            live: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn live_handles(&self) -> Vec<String> {
        match self.live.lock() {
            Ok(live) => live.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    fn run_probe(&self, tool: &str, source_ref: &str) -> Result<f64, MediaError> {
        log::debug!("Trying ffprobe at: {}", tool);
        let output = Command::new(tool)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
                source_ref,
            ])
            .output()
            .map_err(|source| MediaError::Spawn {
                tool: tool.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(MediaError::ProbeFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

impl MediaProvider for FfprobeMediaProvider {
    fn ingest(&self, path: &Path) -> Result<IngestedMedia, MediaError> {
        let display = path.to_string_lossy().to_string();
        if !is_video_path(path) {
            log::warn!("Rejecting non-video upload: {}", display);
            return Err(MediaError::NotVideo(display));
        }
        if !path.is_file() {
            return Err(MediaError::NotFound(display));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| display.clone());

        if let Ok(mut live) = self.live.lock() {
            live.insert(display.clone());
        }
        log::info!("➡️ Ingested media: {}", display);

        Ok(IngestedMedia {
            source_ref: display,
            name,
            media_type: MediaType::Video,
        })
    }

    fn probe_duration(&self, source_ref: &str) -> Result<f64, MediaError> {
        let mut last_err = MediaError::NotFound(source_ref.to_string());
        for tool in &self.probe_candidates {
            match self.run_probe(tool, source_ref) {
                Ok(duration) => return Ok(duration),
                Err(e) => {
                    log::warn!("⚠️ ffprobe at {} failed: {}", tool, e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    fn release(&self, source_ref: &str) {
        if let Ok(mut live) = self.live.lock() {
            if live.remove(source_ref) {
                log::debug!("Released media handle {}", source_ref);
            }
        }
    }
}
