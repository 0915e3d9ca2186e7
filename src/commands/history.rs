// History commands - generated prompts, newest first
//
// `generate_prompt` is the only way entries get recorded.

use crate::commands::presets::LoadResponse;
use crate::commands::selection::SelectionView;
use crate::commands::session::{lock, persist_history, with_store, AppState};
use crate::prompt::composer::{compose, ComposedPrompt};
use crate::prompt::snapshot::{HistoryEntry, SnapshotOrigin};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPrompt {
    pub entry_id: String,
    pub composed: ComposedPrompt,
}

/// Compose the prompt and record it in history. Empty prompts are rejected.
pub fn generate_prompt(state: &AppState) -> Result<GeneratedPrompt, String> {
    let (composed, snapshot) = with_store(state, |store| (compose(store), store.snapshot()))?;
    if composed.is_empty() {
        return Err("Failed to generate prompt: nothing selected".to_string());
    }

    let (entry_id, all) = {
        let mut history = lock(&state.history, "history")?;
        let id = history
            .record(composed.prompt.clone(), snapshot, Utc::now())
            .id
            .clone();
        (id, history.to_vec())
    };
    persist_history(state, &all)?;

    Ok(GeneratedPrompt { entry_id, composed })
}

pub fn get_history(state: &AppState) -> Result<Vec<HistoryEntry>, String> {
    Ok(lock(&state.history, "history")?.to_vec())
}

/// Restore the selection an entry was generated from.
pub fn load_history_entry(state: &AppState, id: String) -> Result<LoadResponse, String> {
    let entry = lock(&state.history, "history")?
        .get(&id)
        .cloned()
        .ok_or_else(|| format!("Failed to load history entry: not found: {}", id))?;

    with_store(state, |store| {
        let warnings = store.load_snapshot(&entry.snapshot, SnapshotOrigin::History);
        LoadResponse {
            view: SelectionView::of(store),
            warnings,
        }
    })
}

pub fn delete_history_entry(state: &AppState, id: String) -> Result<(), String> {
    let all = {
        let mut history = lock(&state.history, "history")?;
        history
            .remove(&id)
            .map_err(|e| format!("Failed to delete history entry: {}", e))?;
        history.to_vec()
    };
    persist_history(state, &all)
}

pub fn clear_history(state: &AppState) -> Result<(), String> {
    lock(&state.history, "history")?.clear();
    persist_history(state, &[])
}
