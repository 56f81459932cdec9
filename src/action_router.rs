use crate::commands::TimelineView;
use crate::edit_plan::{parse_edit_plan, ActionType, EditAction, EditPlan, EditPlanError};
use crate::store::EditorStore;
use crate::timeline::TimelineEngine;
use crate::validator::{validate_plan, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Plan parse failed: {0}")]
    Parse(#[from] EditPlanError),
    #[error("Plan validation rejected: {0}")]
    Validation(#[from] ValidationError),
    #[error("Failed to acquire state lock")]
    LockPoisoned,
}

/// What a plan run did to the timeline.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// Actions that changed state; the rest were no-ops.
    pub applied: usize,
    /// Media no longer referenced anywhere, to be released by the caller.
    pub released_media: Vec<String>,
    pub timeline: TimelineView,
}

pub fn run_raw_edit_plan(engine: &TimelineEngine, raw: &str) -> Result<PlanOutcome, RouterError> {
    let plan = parse_edit_plan(raw)?;
    run_edit_plan(engine, &plan)
}

/// Validates then applies every action in order under one lock.
pub fn run_edit_plan(engine: &TimelineEngine, plan: &EditPlan) -> Result<PlanOutcome, RouterError> {
    log::info!("🚀 Action Router: executing edit plan with {} actions", plan.actions.len());

    let mut store = engine.lock()?;

    log::debug!(
        "📊 State BEFORE execution: {} clips, {:.2}s",
        store.clip_count(),
        store.duration()
    );

    validate_plan(plan, &store)?;

    let mut applied = 0;
    let mut released_media = Vec::new();
    for action in &plan.actions {
        if apply_action(&mut store, action, &mut released_media) {
            applied += 1;
        } else {
            log::debug!("Action {:?} was a no-op", action.action_type);
        }
    }
    released_media.extend(store.drain_orphaned_media());

    log::debug!(
        "📊 State AFTER execution: {} clips, {:.2}s ({} of {} actions applied)",
        store.clip_count(),
        store.duration(),
        applied,
        plan.actions.len()
    );

    Ok(PlanOutcome {
        applied,
        released_media,
        timeline: TimelineView::from_store(&store),
    })
}

/// Dispatches one action to the matching store operation. Returns whether
/// it changed anything.
pub fn apply_action(store: &mut EditorStore, action: &EditAction, released: &mut Vec<String>) -> bool {
    let params = action.params();
    let target = action.target_clip_id.as_deref();

    match (action.action_type, target) {
        (ActionType::Select, target) => store.select_clip(target),
        (ActionType::Seek, _) => match params.time {
            Some(time) => {
                store.seek_to(time);
                true
            }
            None => false,
        },
        (ActionType::Zoom, _) => match params.zoom {
            Some(zoom) => {
                store.set_zoom(zoom);
                true
            }
            None => false,
        },
        (ActionType::TrimStart, Some(id)) => {
            params.value.is_some_and(|v| store.set_trim_start(id, v))
        }
        (ActionType::TrimEnd, Some(id)) => params.value.is_some_and(|v| store.set_trim_end(id, v)),
        (ActionType::ApplyTrim, Some(id)) => store.apply_trim(id),
        (ActionType::Move, Some(id)) => params
            .new_start_time
            .is_some_and(|start| store.move_clip(id, start, params.track_index)),
        (ActionType::Reorder, _) => match (params.from_index, params.to_index) {
            (Some(from), Some(to)) => store.reorder_clips(from, to),
            _ => false,
        },
        (ActionType::Split, _) => store.split_clip_at_current_time(),
        (ActionType::Remove, Some(id)) => store.remove_clip(id),
        (ActionType::Duplicate, Some(id)) => store.duplicate_clip(id).is_some(),
        (ActionType::Undo, _) => store.undo(),
        (ActionType::Redo, _) => store.redo(),
        (ActionType::Clear, _) => {
            released.extend(store.clear_clips());
            true
        }
        (_, None) => false,
    }
}
