// src/main.rs
use anyhow::Context;
use clap::Parser;
use clipline_lib::commands::{apply_edit_plan, get_timeline_state, import_video_async, render_timeline};
use clipline_lib::ffmpeg::FFmpegEngine;
use clipline_lib::media::{FfprobeMediaProvider, MediaProvider};
use clipline_lib::playback::PlaybackDriver;
use clipline_lib::preferences::PreferenceManager;
use clipline_lib::project::{FileProjectStore, ProjectDocument};
use clipline_lib::segments::Segment;
use clipline_lib::time::{format_time, format_time_with_ms};
use clipline_lib::timeline::TimelineEngine;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "clipline")]
#[command(about = "Edit, inspect, render and play clip timelines")]
struct Cli {
    /// Project JSON file; created on save if it does not exist
    project: PathBuf,

    /// Edit plan JSON to apply before anything else is printed
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Video files to import (appended to the end of the timeline)
    #[arg(long)]
    import: Vec<PathBuf>,

    /// Render the timeline to this file with ffmpeg
    #[arg(long)]
    render: Option<PathBuf>,

    /// Run the playback clock from the start to the end
    #[arg(long)]
    play: bool,

    /// Editor preferences JSON
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let prefs = match &cli.config {
        Some(path) => PreferenceManager::new(path),
        None => PreferenceManager::new_in_memory(),
    };
    prefs.update(|c| c.apply_env_overrides());
    let config = prefs.get_preferences();

    let engine = Arc::new(TimelineEngine::new(config.clone()));
    let provider: Arc<dyn MediaProvider> = Arc::new(FfprobeMediaProvider::new(&config.ffprobe_path));

    // 1. Load
    let previous = if cli.project.is_file() {
        let doc = FileProjectStore::read_file(&cli.project)
            .with_context(|| format!("reading {:?}", cli.project))?;
        let released = doc.apply_to(&mut *engine.lock()?);
        for handle in released {
            provider.release(&handle);
        }
        log::info!("📂 Loaded {} ({} clips)", doc.name, doc.clips.len());
        doc
    } else {
        let name = cli
            .project
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled Project".to_string());
        let doc = ProjectDocument::new(&name);
        doc.apply_to(&mut *engine.lock()?);
        log::info!("🆕 New project {}", name);
        doc
    };

    // 2. Import
    for path in cli.import {
        let clip_id = import_video_async(Arc::clone(&engine), Arc::clone(&provider), path.clone())
            .await
            .with_context(|| format!("importing {:?}", path))?;
        log::info!("Imported {:?} as {}", path, clip_id);
    }

    // 3. Edit
    if let Some(plan_path) = &cli.plan {
        let raw = std::fs::read_to_string(plan_path)
            .with_context(|| format!("reading plan {:?}", plan_path))?;
        apply_edit_plan(&engine, provider.as_ref(), &raw)?;
    }

    print_timeline(&engine)?;
    engine.log_state();

    // 4. Render
    if let Some(output) = cli.render {
        let renderer = FFmpegEngine::new(&config.ffmpeg_path);
        let render_engine = Arc::clone(&engine);
        let path = tokio::task::spawn_blocking(move || render_timeline(&render_engine, &renderer, &output))
            .await??;
        log::info!("✅ Rendered {:?}", path);
    }

    // 5. Play
    if cli.play {
        let mut driver = PlaybackDriver::new(
            Arc::clone(&engine),
            Duration::from_millis(config.playback_frame_ms),
        );
        engine.lock()?.go_to_start();
        driver.play()?;
        driver.wait().await;
        log::info!("⏹ Playback ended at {}", format_time(engine.lock()?.current_time()));
    }

    // 6. Save
    let doc = {
        let store = engine.lock()?;
        ProjectDocument::from_store(&store, Some(&previous))
    };
    FileProjectStore::write_file(&cli.project, &doc)
        .with_context(|| format!("writing {:?}", cli.project))?;
    log::info!("💾 Saved {:?}", cli.project);

    Ok(())
}

fn print_timeline(engine: &TimelineEngine) -> anyhow::Result<()> {
    let view = get_timeline_state(engine)?;

    println!(
        "{} | {} clips | {}",
        view.project_name,
        view.clips.len(),
        format_time(view.playback.duration)
    );
    for segment in &view.segments {
        let label = match segment {
            Segment::Clip { clip, .. } => clip.name.as_str(),
            Segment::Gap { .. } => "(gap)",
        };
        println!(
            "  {:>9} - {:>9}  {}",
            format_time_with_ms(segment.start()),
            format_time_with_ms(segment.end()),
            label
        );
    }
    Ok(())
}
