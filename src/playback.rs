// src/playback.rs
//! The playback clock: the only place timeline time advances on its own.

use crate::action_router::RouterError;
use crate::store::EditorStore;
use crate::timeline::TimelineEngine;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Turns wall-clock ticks into cursor advances.
#[derive(Debug, Default)]
pub struct PlaybackClock {
    last_tick: Option<Instant>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the store by the time since the previous tick (nothing on
    /// the first one). Returns whether playback is still running.
    pub fn tick(&mut self, store: &mut EditorStore, now: Instant) -> bool {
        let delta = self
            .last_tick
            .map(|prev| now.saturating_duration_since(prev).as_secs_f64())
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        store.advance_playback(delta)
    }

    pub fn reset(&mut self) {
        self.last_tick = None;
    }
}

/// Runs the clock on a tokio interval until playback stops or reaches the
/// end. The task never outlives `is_playing`.
pub fn spawn_playback(engine: Arc<TimelineEngine>, frame: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(frame.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut clock = PlaybackClock::new();

        loop {
            let now = interval.tick().await.into_std();
            let running = match engine.lock() {
                Ok(mut store) => clock.tick(&mut store, now),
                Err(e) => {
                    log::warn!("Playback stopped: {}", e);
                    false
                }
            };
            if !running {
                break;
            }
        }
        log::debug!("Playback task finished");
    })
}

/// Owns the running playback task, if any.
pub struct PlaybackDriver {
    engine: Arc<TimelineEngine>,
    frame: Duration,
    handle: Option<JoinHandle<()>>,
}

impl PlaybackDriver {
    pub fn new(engine: Arc<TimelineEngine>, frame: Duration) -> Self {
        Self {
            engine,
            frame,
            handle: None,
        }
    }

    /// Starts playing; from the top when the cursor is parked at the end.
    pub fn play(&mut self) -> Result<(), RouterError> {
        {
            let mut store = self.engine.lock()?;
            if store.is_timeline_empty() {
                log::debug!("play: timeline is empty");
                return Ok(());
            }
            if store.current_time() >= store.duration() {
                store.go_to_start();
            }
            store.play();
        }

        self.abort();
        self.handle = Some(spawn_playback(Arc::clone(&self.engine), self.frame));
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), RouterError> {
        self.engine.lock()?.pause();
        self.abort();
        Ok(())
    }

    pub fn toggle(&mut self) -> Result<(), RouterError> {
        let playing = self.engine.lock()?.is_playing();
        if playing {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Waits for the current run to reach the end (or be paused elsewhere).
    pub async fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    log::warn!("Playback task failed: {}", e);
                }
            }
        }
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for PlaybackDriver {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Clip;

    #[test]
    fn test_clock_advances_by_wall_delta() {
        let mut store = EditorStore::default();
        store.add_clip(Clip::new("A", "a.mp4", 0.0, 10.0));
        store.play();

        let mut clock = PlaybackClock::new();
        let t0 = Instant::now();
        assert!(clock.tick(&mut store, t0));
        assert_eq!(store.current_time(), 0.0);

        assert!(clock.tick(&mut store, t0 + Duration::from_millis(500)));
        assert!((store.current_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_clock_stops_at_end() {
        let mut store = EditorStore::default();
        store.add_clip(Clip::new("A", "a.mp4", 0.0, 1.0));
        store.play();

        let mut clock = PlaybackClock::new();
        let t0 = Instant::now();
        clock.tick(&mut store, t0);
        assert!(!clock.tick(&mut store, t0 + Duration::from_secs(3)));
        assert_eq!(store.current_time(), 1.0);
        assert!(!store.is_playing());
    }

    #[test]
    fn test_paused_store_does_not_advance() {
        let mut store = EditorStore::default();
        store.add_clip(Clip::new("A", "a.mp4", 0.0, 10.0));

        let mut clock = PlaybackClock::new();
        let t0 = Instant::now();
        assert!(!clock.tick(&mut store, t0));
        assert!(!clock.tick(&mut store, t0 + Duration::from_secs(1)));
        assert_eq!(store.current_time(), 0.0);
    }

    #[tokio::test]
    async fn test_driver_plays_to_end() {
        let engine = Arc::new(TimelineEngine::default());
        engine
            .lock()
            .unwrap()
            .add_clip(Clip::new("A", "a.mp4", 0.0, 0.15));

        let mut driver = PlaybackDriver::new(Arc::clone(&engine), Duration::from_millis(5));
        driver.play().unwrap();
        assert!(engine.lock().unwrap().is_playing());

        tokio::time::timeout(Duration::from_secs(5), driver.wait())
            .await
            .expect("playback should finish");

        let store = engine.lock().unwrap();
        assert!(!store.is_playing());
        assert_eq!(store.current_time(), 0.15);
    }

    #[tokio::test]
    async fn test_driver_pause_aborts_task() {
        let engine = Arc::new(TimelineEngine::default());
        engine
            .lock()
            .unwrap()
            .add_clip(Clip::new("A", "a.mp4", 0.0, 60.0));

        let mut driver = PlaybackDriver::new(Arc::clone(&engine), Duration::from_millis(5));
        driver.play().unwrap();
        driver.pause().unwrap();

        assert!(!driver.is_running());
        assert!(!engine.lock().unwrap().is_playing());
    }
}
