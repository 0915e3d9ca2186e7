// Preset commands - named snapshots of the selection
//
// The library is persisted as one JSON array after every change. Name
// validation happens before anything is mutated or written.

use crate::commands::selection::SelectionView;
use crate::commands::session::{lock, persist_presets, with_store, AppState};
use crate::error::PromptError;
use crate::prompt::selection::SnapshotWarning;
use crate::prompt::snapshot::{Preset, SnapshotOrigin};
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    pub view: SelectionView,
    pub warnings: Vec<SnapshotWarning>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPresetsResponse {
    pub imported: usize,
    pub skipped: Vec<String>,
}

pub fn get_presets(state: &AppState) -> Result<Vec<Preset>, String> {
    Ok(lock(&state.presets, "presets")?.presets().to_vec())
}

/// Save the current selection under a new name; it becomes the active preset.
pub fn save_preset(state: &AppState, name: String, description: String) -> Result<Preset, String> {
    let snapshot = with_store(state, |store| store.snapshot())?;
    let (saved, all) = {
        let mut presets = lock(&state.presets, "presets")?;
        let saved = presets
            .save(&name, &description, snapshot, Utc::now())
            .map_err(|e| format!("Failed to save preset: {}", e))?
            .clone();
        (saved, presets.presets().to_vec())
    };
    persist_presets(state, &all)?;
    with_store(state, |store| store.mark_preset_saved(&saved.name))?;
    Ok(saved)
}

/// Overwrite the active preset with the current selection.
pub fn update_active_preset(state: &AppState) -> Result<Preset, String> {
    let (name, snapshot) = with_store(state, |store| {
        store
            .active_preset()
            .map(|active| (active.name.clone(), store.snapshot()))
    })?
    .ok_or_else(|| format!("Failed to update preset: {}", PromptError::NoActivePreset))?;

    let (saved, all) = {
        let mut presets = lock(&state.presets, "presets")?;
        let saved = presets
            .overwrite(&name, snapshot, Utc::now())
            .map_err(|e| format!("Failed to update preset: {}", e))?
            .clone();
        (saved, presets.presets().to_vec())
    };
    persist_presets(state, &all)?;
    with_store(state, |store| store.mark_preset_saved(&saved.name))?;
    Ok(saved)
}

/// Replace the selection with a preset. Tags missing from the taxonomy are
/// dropped and reported.
pub fn load_preset(state: &AppState, name: String) -> Result<LoadResponse, String> {
    let preset = lock(&state.presets, "presets")?
        .get(&name)
        .cloned()
        .ok_or_else(|| format!("Failed to load preset: preset not found: {}", name))?;

    with_store(state, |store| {
        let warnings = store.load_snapshot(&preset.snapshot, SnapshotOrigin::Preset(preset.name.clone()));
        LoadResponse {
            view: SelectionView::of(store),
            warnings,
        }
    })
}

pub fn delete_preset(state: &AppState, name: String) -> Result<(), String> {
    let (deleted, all) = {
        let mut presets = lock(&state.presets, "presets")?;
        let deleted = presets
            .delete(&name)
            .map_err(|e| format!("Failed to delete preset: {}", e))?;
        (deleted, presets.presets().to_vec())
    };
    persist_presets(state, &all)?;
    with_store(state, |store| {
        if store.active_preset().is_some_and(|a| a.name == deleted.name) {
            store.clear_active_preset();
        }
    })
}

pub fn rename_preset(state: &AppState, old_name: String, new_name: String) -> Result<Preset, String> {
    let (previous, renamed, all) = {
        let mut presets = lock(&state.presets, "presets")?;
        let previous = presets
            .get(&old_name)
            .map(|p| p.name.clone())
            .ok_or_else(|| format!("Failed to rename preset: preset not found: {}", old_name))?;
        let renamed = presets
            .rename(&previous, &new_name, Utc::now())
            .map_err(|e| format!("Failed to rename preset: {}", e))?
            .clone();
        (previous, renamed, presets.presets().to_vec())
    };
    persist_presets(state, &all)?;
    with_store(state, |store| store.rename_active_preset(&previous, &renamed.name))?;
    Ok(renamed)
}

pub fn toggle_preset_favorite(state: &AppState, name: String) -> Result<bool, String> {
    let (favorite, all) = {
        let mut presets = lock(&state.presets, "presets")?;
        let favorite = presets
            .toggle_favorite(&name)
            .map_err(|e| format!("Failed to update preset: {}", e))?;
        (favorite, presets.presets().to_vec())
    };
    persist_presets(state, &all)?;
    Ok(favorite)
}

pub fn export_presets(state: &AppState) -> Result<String, String> {
    lock(&state.presets, "presets")?
        .export_json()
        .map_err(|e| format!("Failed to export presets: {}", e))
}

/// Merge presets from an export. Names that already exist are skipped.
pub fn import_presets(state: &AppState, json: String) -> Result<ImportPresetsResponse, String> {
    let (response, all) = {
        let mut presets = lock(&state.presets, "presets")?;
        let before = presets.len();
        let skipped = presets
            .import_json(&json)
            .map_err(|e| format!("Failed to import presets: {}", e))?;
        let response = ImportPresetsResponse {
            imported: presets.len() - before,
            skipped,
        };
        (response, presets.presets().to_vec())
    };
    persist_presets(state, &all)?;
    Ok(response)
}
