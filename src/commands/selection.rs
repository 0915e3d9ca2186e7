// Selection commands - toggling, conflict resolution, locks, text and aux values
//
// Every mutating command returns the refreshed `SelectionView` so the host
// can redraw from a single value.

use crate::commands::session::{persist_category_order, with_store, AppState};
use crate::prompt::composer::{compose, ComposedPrompt};
use crate::prompt::conflict::{Conflict, Resolution, ResolutionRequest};
use crate::prompt::selection::{ActivePreset, AuxParams, SelectionStore, ToggleOutcome};
use crate::prompt::suggestion::{suggestions, suggestions_for_category, Suggestion};
use serde::Serialize;

/// Serializable selected tag for the host
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedTagDTO {
    pub id: String,
    pub label: String,
    pub category_id: String,
    pub is_locked: bool,
}

/// Everything a host needs to render the builder.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionView {
    pub selected: Vec<SelectedTagDTO>,
    pub pending_resolution: Option<ResolutionRequest>,
    pub conflicts: Vec<Conflict>,
    pub active_preset: Option<ActivePreset>,
    pub composed: ComposedPrompt,
}

impl SelectionView {
    pub(crate) fn of(store: &SelectionStore) -> Self {
        let composed = compose(store);
        // Selected tags in display order: categories as ordered, tags in taxonomy order.
        let selected = composed
            .category_order
            .iter()
            .filter_map(|id| store.index().category(id))
            .flat_map(|category| category.tags.iter())
            .filter_map(|tag| store.selected().get(&tag.id))
            .map(|entry| SelectedTagDTO {
                id: entry.tag.id.clone(),
                label: entry.tag.label.clone(),
                category_id: entry.category_id.clone(),
                is_locked: entry.is_locked,
            })
            .collect();

        SelectionView {
            selected,
            pending_resolution: store.resolution().pending().cloned(),
            conflicts: store.conflicts(),
            active_preset: store.active_preset().cloned(),
            composed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    /// "selected", "deselected" or "conflict"
    pub outcome: String,
    pub view: SelectionView,
}

pub fn get_selection(state: &AppState) -> Result<SelectionView, String> {
    with_store(state, |store| SelectionView::of(store))
}

pub fn get_composed_prompt(state: &AppState) -> Result<ComposedPrompt, String> {
    with_store(state, |store| compose(store))
}

/// Select or deselect a tag. A conflict leaves the request pending in the view.
pub fn toggle_tag(state: &AppState, tag_id: String) -> Result<ToggleResponse, String> {
    with_store(state, |store| {
        let outcome = store
            .toggle(&tag_id)
            .map_err(|e| format!("Failed to toggle tag: {}", e))?;
        let outcome = match outcome {
            ToggleOutcome::Selected => "selected",
            ToggleOutcome::Deselected => "deselected",
            ToggleOutcome::ConflictPending(_) => "conflict",
        };
        Ok(ToggleResponse {
            outcome: outcome.to_string(),
            view: SelectionView::of(store),
        })
    })?
}

pub fn resolve_conflict(state: &AppState, resolution: Resolution) -> Result<SelectionView, String> {
    with_store(state, |store| {
        store
            .resolve(resolution)
            .map_err(|e| format!("Failed to resolve conflict: {}", e))?;
        Ok(SelectionView::of(store))
    })?
}

pub fn toggle_tag_lock(state: &AppState, tag_id: String) -> Result<SelectionView, String> {
    with_store(state, |store| {
        if !store.toggle_lock(&tag_id) {
            return Err(format!("Tag is not selected: {}", tag_id));
        }
        Ok(SelectionView::of(store))
    })?
}

pub fn clear_selection(state: &AppState) -> Result<SelectionView, String> {
    with_store(state, |store| {
        store.clear_all();
        SelectionView::of(store)
    })
}

pub fn clear_category(state: &AppState, category_id: String) -> Result<SelectionView, String> {
    with_store(state, |store| {
        store.clear_category(&category_id);
        SelectionView::of(store)
    })
}

pub fn set_text_value(
    state: &AppState,
    category_id: String,
    value: String,
) -> Result<SelectionView, String> {
    with_store(state, |store| {
        store
            .set_text_value(&category_id, &value)
            .map_err(|e| format!("Failed to set text value: {}", e))?;
        Ok(SelectionView::of(store))
    })?
}

pub fn set_aux_params(state: &AppState, aux: AuxParams) -> Result<SelectionView, String> {
    with_store(state, |store| {
        store.set_aux_params(aux);
        SelectionView::of(store)
    })
}

/// Reorder categories and remember the order across sessions.
pub fn reorder_categories(state: &AppState, order: Vec<String>) -> Result<SelectionView, String> {
    let (view, order) = with_store(state, |store| {
        store.reorder_categories(order);
        (SelectionView::of(store), store.category_order().to_vec())
    })?;
    persist_category_order(state, &order)?;
    Ok(view)
}

pub fn randomize_selection(state: &AppState, preserve_locked: bool) -> Result<SelectionView, String> {
    let mut rng = rand::thread_rng();
    with_store(state, |store| {
        if store.resolution().is_pending() {
            return Err("Failed to randomize: resolve the pending conflict first".to_string());
        }
        store.randomize(&mut rng, preserve_locked);
        Ok(SelectionView::of(store))
    })?
}

pub fn get_conflicts(state: &AppState) -> Result<Vec<Conflict>, String> {
    with_store(state, |store| store.conflicts())
}

/// Suggestions for one category, or across all categories when `category_id` is None.
pub fn get_suggestions(
    state: &AppState,
    category_id: Option<String>,
) -> Result<Vec<Suggestion>, String> {
    with_store(state, |store| match category_id {
        Some(id) => suggestions_for_category(store.index(), store.selected(), &id),
        None => suggestions(store.index(), store.selected(), store.category_order()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::session::{test_state, with_db};
    use crate::db::keys;

    #[test]
    fn test_toggle_conflict_then_keep_new() {
        let state = test_state();
        toggle_tag(&state, "v_female".into()).unwrap();

        let response = toggle_tag(&state, "v_instrumental".into()).unwrap();
        assert_eq!(response.outcome, "conflict");
        let pending = response.view.pending_resolution.unwrap();
        assert_eq!(pending.newly_selected_tag.id, "v_instrumental");
        assert_eq!(pending.conflicting_ids(), vec!["v_female"]);

        // Blocked until resolved
        assert!(toggle_tag(&state, "g_techno".into()).is_err());

        let view = resolve_conflict(&state, Resolution::KeepNew).unwrap();
        let ids: Vec<&str> = view.selected.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["v_instrumental"]);
        assert!(view.pending_resolution.is_none());
    }

    #[test]
    fn test_resolve_without_pending_fails() {
        let state = test_state();
        assert!(resolve_conflict(&state, Resolution::Cancel).is_err());
    }

    #[test]
    fn test_keep_both_reports_conflict() {
        let state = test_state();
        toggle_tag(&state, "t_slow".into()).unwrap();
        toggle_tag(&state, "t_fast".into()).unwrap();
        let view = resolve_conflict(&state, Resolution::KeepBoth).unwrap();
        assert_eq!(view.conflicts.len(), 1);
        assert_eq!(get_conflicts(&state).unwrap().len(), 1);
    }

    #[test]
    fn test_view_and_prompt_follow_category_order() {
        let state = test_state();
        toggle_tag(&state, "m_dreamy".into()).unwrap();
        toggle_tag(&state, "g_synthwave".into()).unwrap();
        let view = get_selection(&state).unwrap();
        assert_eq!(view.composed.prompt, "synthwave; dreamy");
        assert_eq!(view.selected[0].id, "g_synthwave");

        reorder_categories(&state, vec!["mood".into(), "genre".into()]).unwrap();
        assert_eq!(get_composed_prompt(&state).unwrap().prompt, "dreamy; synthwave");

        let stored: Option<Vec<String>> =
            with_db(&state, |db| db.get_json(keys::CATEGORY_ORDER), "read").unwrap();
        assert_eq!(&stored.unwrap()[..2], &["mood".to_string(), "genre".to_string()]);
    }

    #[test]
    fn test_lock_requires_selected_tag() {
        let state = test_state();
        assert!(toggle_tag_lock(&state, "g_synthwave".into()).is_err());
        toggle_tag(&state, "g_synthwave".into()).unwrap();
        let view = toggle_tag_lock(&state, "g_synthwave".into()).unwrap();
        assert!(view.selected[0].is_locked);
    }

    #[test]
    fn test_text_and_aux_values_reach_prompt() {
        let state = test_state();
        toggle_tag(&state, "g_lofi".into()).unwrap();
        set_text_value(&state, "lyrics_theme".into(), "rainy window".into()).unwrap();
        let view = set_aux_params(
            &state,
            AuxParams {
                instrumental: true,
                bpm: Some(80),
                musical_key: None,
            },
        )
        .unwrap();
        assert_eq!(view.composed.prompt, "lofi; rainy window; instrumental; 80 bpm");
        assert!(set_text_value(&state, "genre".into(), "x".into()).is_err());
    }

    #[test]
    fn test_randomize_and_clear() {
        let state = test_state();
        let view = randomize_selection(&state, true).unwrap();
        assert!(!view.selected.is_empty());
        let view = clear_selection(&state).unwrap();
        assert!(view.selected.is_empty());
        assert!(view.composed.is_empty());
    }

    #[test]
    fn test_clear_category() {
        let state = test_state();
        toggle_tag(&state, "g_synthwave".into()).unwrap();
        toggle_tag(&state, "m_dreamy".into()).unwrap();
        let view = clear_category(&state, "genre".into()).unwrap();
        let ids: Vec<&str> = view.selected.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["m_dreamy"]);
    }

    #[test]
    fn test_suggestions_per_category_and_global() {
        let state = test_state();
        toggle_tag(&state, "g_synthwave".into()).unwrap();
        let genre = get_suggestions(&state, Some("genre".into())).unwrap();
        assert!(genre.iter().any(|s| s.tag_id == "g_electro"));
        let all = get_suggestions(&state, None).unwrap();
        assert_eq!(all.len(), genre.len());
    }
}
