use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

// --- DATA STRUCTURES ---

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to write config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Every tunable the editor core reads. Missing keys fall back to defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub base_px_per_second: f64,
    pub snap_threshold_px: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub default_zoom: f64,
    pub history_limit: usize,
    pub min_clip_length: f64,
    pub thumbnail_fps: u32,
    pub playback_frame_ms: u64,
    pub seek_step_secs: f64,
    pub layout: TrackLayoutConfig,
    pub render: RenderSettings,
    pub backend_url: String,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            base_px_per_second: 100.0,
            snap_threshold_px: 10.0,
            min_zoom: 0.25,
            max_zoom: 4.0,
            default_zoom: 1.0,
            history_limit: 50,
            min_clip_length: crate::timeline::MIN_CLIP_LENGTH,
            thumbnail_fps: 1,
            playback_frame_ms: 16,
            seek_step_secs: 5.0,
            layout: TrackLayoutConfig::default(),
            render: RenderSettings::default(),
            backend_url: "http://localhost:5000".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

/// Vertical geometry of the track area: each group gets a header row
/// followed by its tracks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackLayoutConfig {
    pub header_height: f64,
    pub track_height: f64,
    pub video_tracks: usize,
    pub overlay_tracks: usize,
    pub audio_tracks: usize,
}

impl Default for TrackLayoutConfig {
    fn default() -> Self {
        Self {
            header_height: 28.0,
            track_height: 48.0,
            video_tracks: 1,
            overlay_tracks: 1,
            audio_tracks: 1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub output_format: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: 30,
            output_format: "mp4".to_string(),
        }
    }
}

impl EditorConfig {
    /// Reads `CLIPLINE_*` variables (after loading `.env`, if present) over
    /// the current values.
    pub fn apply_env_overrides(&mut self) {
        dotenv::dotenv().ok();

        if let Ok(url) = std::env::var("CLIPLINE_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Ok(path) = std::env::var("CLIPLINE_FFMPEG") {
            self.ffmpeg_path = path;
        }
        if let Ok(path) = std::env::var("CLIPLINE_FFPROBE") {
            self.ffprobe_path = path;
        }
        if let Ok(limit) = std::env::var("CLIPLINE_HISTORY_LIMIT") {
            match limit.parse() {
                Ok(n) => self.history_limit = n,
                Err(_) => log::warn!("Ignoring CLIPLINE_HISTORY_LIMIT={:?}", limit),
            }
        }
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() {
            return self.default_zoom;
        }
        crate::time::clamp_time(zoom, self.min_zoom, self.max_zoom)
    }
}

// --- MANAGER ---

pub struct PreferenceManager {
    preferences: Mutex<EditorConfig>,
    file_path: PathBuf,
}

impl PreferenceManager {
    /// Loads `path`, falling back to defaults when the file is missing or
    /// does not parse.
    pub fn new(path: &Path) -> Self {
        let preferences = if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    log::warn!("⚠️ Config {:?} unreadable ({}), using defaults", path, e);
                    EditorConfig::default()
                }),
                Err(_) => EditorConfig::default(),
            }
        } else {
            EditorConfig::default()
        };

        Self {
            preferences: Mutex::new(preferences),
            file_path: path.to_path_buf(),
        }
    }

    pub fn new_in_memory() -> Self {
        Self {
            preferences: Mutex::new(EditorConfig::default()),
            file_path: PathBuf::new(),
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        if self.file_path.as_os_str().is_empty() {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.get_preferences())?;
        if let Some(dir) = self.file_path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.file_path, json)?;
        Ok(())
    }

    pub fn update(&self, change: impl FnOnce(&mut EditorConfig)) {
        let mut prefs = match self.preferences.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        change(&mut prefs);
    }

    pub fn get_preferences(&self) -> EditorConfig {
        match self.preferences.lock() {
            Ok(prefs) => prefs.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
