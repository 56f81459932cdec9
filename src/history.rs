// src/history.rs
//! Snapshot-based undo/redo.
//!
//! The store captures an `EditorSnapshot` *before* each tracked mutation and
//! hands it to `push`. `undo` and `redo` take the current state so it can be
//! parked on the opposite stack.

use crate::timeline::Clip;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// The undo-relevant slice of editor state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EditorSnapshot {
    pub clips: Vec<Clip>,
    pub current_time: f64,
    pub duration: f64,
    pub zoom: f64,
    pub active_clip_id: Option<String>,
}

pub struct HistoryManager {
    past: VecDeque<EditorSnapshot>,
    future: Vec<EditorSnapshot>,
    limit: usize,
}

impl HistoryManager {
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            future: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Records the pre-mutation state and forgets any redo branch. The
    /// oldest entry is dropped once the limit is exceeded.
    pub fn push(&mut self, snapshot: EditorSnapshot) {
        self.future.clear();
        self.past.push_back(snapshot);

        while self.past.len() > self.limit {
            self.past.pop_front();
        }

        log::debug!("History entry pushed (undo depth {})", self.past.len());
    }

    pub fn undo(&mut self, current: EditorSnapshot) -> Option<EditorSnapshot> {
        let previous = self.past.pop_back()?;
        self.future.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: EditorSnapshot) -> Option<EditorSnapshot> {
        let next = self.future.pop()?;
        self.past.push_back(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    /// Every snapshot on either stack.
    pub fn snapshots(&self) -> impl Iterator<Item = &EditorSnapshot> {
        self.past.iter().chain(self.future.iter())
    }
}
