use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A scripted batch of editor operations, applied in order.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EditPlan {
    pub actions: Vec<EditAction>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EditAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default)]
    pub target_clip_id: Option<String>,
    #[serde(default)]
    pub parameters: Option<ActionParameters>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Select,
    Seek,
    Zoom,
    TrimStart,
    TrimEnd,
    ApplyTrim,
    Move,
    Reorder,
    Split,
    Remove,
    Duplicate,
    Undo,
    Redo,
    Clear,
}

impl ActionType {
    /// Actions that are meaningless without a target clip. `SELECT` without
    /// a target clears the selection.
    pub fn needs_clip(self) -> bool {
        matches!(
            self,
            ActionType::TrimStart
                | ActionType::TrimEnd
                | ActionType::ApplyTrim
                | ActionType::Move
                | ActionType::Remove
                | ActionType::Duplicate
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ActionParameters {
    pub time: Option<f64>,
    pub zoom: Option<f64>,
    /// Trim seconds for `TRIM_START` / `TRIM_END`.
    pub value: Option<f64>,
    pub new_start_time: Option<f64>,
    pub track_index: Option<usize>,
    pub from_index: Option<usize>,
    pub to_index: Option<usize>,
}

impl EditAction {
    pub fn new(action_type: ActionType) -> Self {
        Self {
            action_type,
            target_clip_id: None,
            parameters: None,
        }
    }

    pub fn on_clip(mut self, clip_id: &str) -> Self {
        self.target_clip_id = Some(clip_id.to_string());
        self
    }

    pub fn with_parameters(mut self, parameters: ActionParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn params(&self) -> ActionParameters {
        self.parameters.clone().unwrap_or_default()
    }

    /// Name of the first required parameter that is absent.
    pub fn missing_parameter(&self) -> Option<&'static str> {
        let p = self.parameters.as_ref();
        let has = |f: fn(&ActionParameters) -> bool| p.is_some_and(f);

        match self.action_type {
            ActionType::Seek if !has(|p| p.time.is_some()) => Some("time"),
            ActionType::Zoom if !has(|p| p.zoom.is_some()) => Some("zoom"),
            ActionType::TrimStart | ActionType::TrimEnd if !has(|p| p.value.is_some()) => Some("value"),
            ActionType::Move if !has(|p| p.new_start_time.is_some()) => Some("new_start_time"),
            ActionType::Reorder if !has(|p| p.from_index.is_some()) => Some("from_index"),
            ActionType::Reorder if !has(|p| p.to_index.is_some()) => Some("to_index"),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum EditPlanError {
    #[error("Empty input")]
    EmptyInput,
    #[error("No JSON found in input")]
    NoJsonFound,
    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),
}

/// Parses a plan out of text that may wrap the JSON in prose or markdown
/// fences: everything between the first `{` and the last `}` is decoded.
pub fn parse_edit_plan(raw: &str) -> Result<EditPlan, EditPlanError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EditPlanError::EmptyInput);
    }

    let start = trimmed.find('{').ok_or(EditPlanError::NoJsonFound)?;
    let end = trimmed.rfind('}').ok_or(EditPlanError::NoJsonFound)?;

    if start > end {
        return Err(EditPlanError::NoJsonFound);
    }

    let plan: EditPlan = serde_json::from_str(&trimmed[start..=end])?;
    Ok(plan)
}
