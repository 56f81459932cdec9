// src/lib.rs

pub mod action_router;
pub mod backend;
pub mod commands;
pub mod edit_plan;
pub mod ffmpeg;
pub mod history;
pub mod interaction;
pub mod media;
pub mod playback;
pub mod preferences;
pub mod project;
pub mod segments;
pub mod store;
pub mod thumbnails;
pub mod time;
pub mod timeline;
pub mod validator;
