// src/validator.rs
use crate::edit_plan::EditPlan;
use crate::store::EditorStore;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Serialize, PartialEq)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: String,
    pub message: String,
    pub offending_action: Option<usize>,
}

impl ValidationError {
    fn new(code: &str, message: String, offending_action: Option<usize>) -> Self {
        Self {
            code: code.to_string(),
            message,
            offending_action,
        }
    }
}

/// Checks a plan against the current store before anything is applied.
/// Rules: the plan is non-empty, clip-targeting actions name a clip that
/// exists now, and every action carries its required parameters.
pub fn validate_plan(plan: &EditPlan, store: &EditorStore) -> Result<(), ValidationError> {
    if plan.actions.is_empty() {
        return Err(ValidationError::new(
            "EMPTY_PLAN",
            "Plan contains no actions.".to_string(),
            None,
        ));
    }

    for (index, action) in plan.actions.iter().enumerate() {
        match action.target_clip_id.as_deref() {
            Some(id) if store.clip(id).is_none() => {
                return Err(ValidationError::new(
                    "CLIP_NOT_FOUND",
                    format!("Target clip ID '{}' not found in timeline.", id),
                    Some(index),
                ));
            }
            None if action.action_type.needs_clip() => {
                return Err(ValidationError::new(
                    "MISSING_TARGET",
                    format!("{:?} requires target_clip_id.", action.action_type),
                    Some(index),
                ));
            }
            _ => {}
        }

        if let Some(name) = action.missing_parameter() {
            return Err(ValidationError::new(
                "MISSING_PARAMETER",
                format!("{:?} requires parameter '{}'.", action.action_type, name),
                Some(index),
            ));
        }
    }

    Ok(())
}
