// Selection store - the mutable set of chosen tags, text values and ordering
//
// Every mutation goes through `commit`, which is also where the active
// preset gets marked dirty. Snapshot loads bypass it; they
// re-associate (or drop) the active preset instead.

use crate::error::PromptError;
use crate::prompt::conflict::{
    find_pre_insertion_conflicts, scan_conflicts, Conflict, Resolution, ResolutionRequest,
    ResolutionState,
};
use crate::prompt::snapshot::{SelectionSnapshot, SnapshotOrigin, SnapshotTag};
use crate::prompt::taxonomy::{CategoryKind, Tag, TaxonomyIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A tag snapshot plus its selection metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedTag {
    pub tag: Tag,
    pub category_id: String,
    pub is_locked: bool,
}

/// Structured song parameters that live outside the taxonomy.
/// The default is a non-instrumental track with no fixed BPM or key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxParams {
    #[serde(default)]
    pub instrumental: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musical_key: Option<String>,
}

/// The preset the current selection was loaded from, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePreset {
    pub name: String,
    pub is_dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Selected,
    Deselected,
    /// Nothing changed; the caller must `resolve` before toggling again.
    ConflictPending(ResolutionRequest),
}

/// Non-fatal problems found while loading a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotWarning {
    UnknownTag { tag_id: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
struct SelectionState {
    selected: BTreeMap<String, SelectedTag>,
    category_order: Vec<String>,
    text_values: BTreeMap<String, String>,
    aux: AuxParams,
}

#[derive(Debug, Clone)]
pub struct SelectionStore {
    index: Arc<TaxonomyIndex>,
    state: SelectionState,
    resolution: ResolutionState,
    active_preset: Option<ActivePreset>,
}

impl SelectionStore {
    pub fn new(index: Arc<TaxonomyIndex>) -> Self {
        let category_order = index.effective_category_order(&[]);
        SelectionStore {
            index,
            state: SelectionState {
                category_order,
                ..Default::default()
            },
            resolution: ResolutionState::Idle,
            active_preset: None,
        }
    }

    // --- Read access ---

    pub fn index(&self) -> &TaxonomyIndex {
        &self.index
    }

    pub fn index_handle(&self) -> Arc<TaxonomyIndex> {
        Arc::clone(&self.index)
    }

    pub fn selected(&self) -> &BTreeMap<String, SelectedTag> {
        &self.state.selected
    }

    pub fn is_selected(&self, tag_id: &str) -> bool {
        self.state.selected.contains_key(tag_id)
    }

    pub fn category_order(&self) -> &[String] {
        &self.state.category_order
    }

    pub fn text_values(&self) -> &BTreeMap<String, String> {
        &self.state.text_values
    }

    pub fn aux(&self) -> &AuxParams {
        &self.state.aux
    }

    pub fn resolution(&self) -> &ResolutionState {
        &self.resolution
    }

    pub fn active_preset(&self) -> Option<&ActivePreset> {
        self.active_preset.as_ref()
    }

    /// Whole-selection conflict scan.
    pub fn conflicts(&self) -> Vec<Conflict> {
        scan_conflicts(&self.state.selected)
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            selected_tags: self
                .state
                .selected
                .iter()
                .map(|(id, entry)| {
                    (
                        id.clone(),
                        SnapshotTag {
                            category_id: entry.category_id.clone(),
                            is_locked: entry.is_locked,
                        },
                    )
                })
                .collect(),
            category_order: self.state.category_order.clone(),
            text_category_values: self.state.text_values.clone(),
        }
    }

    // --- Mutation tracking ---

    /// Apply a mutation and mark the active preset dirty.
    fn commit<R>(&mut self, mutate: impl FnOnce(&mut SelectionState) -> R) -> R {
        let result = mutate(&mut self.state);
        if let Some(active) = self.active_preset.as_mut() {
            active.is_dirty = true;
        }
        result
    }

    /// Associate the current selection with a preset that was just saved or overwritten.
    pub fn mark_preset_saved(&mut self, name: &str) {
        self.active_preset = Some(ActivePreset {
            name: name.to_string(),
            is_dirty: false,
        });
    }

    /// Follow a preset rename, keeping the dirty flag.
    pub fn rename_active_preset(&mut self, old_name: &str, new_name: &str) {
        if let Some(active) = self.active_preset.as_mut() {
            if active.name == old_name {
                active.name = new_name.to_string();
            }
        }
    }

    /// Drop the active preset association (e.g. the preset was deleted).
    pub fn clear_active_preset(&mut self) {
        self.active_preset = None;
    }

    // --- Operations ---

    /// Select or deselect a tag. Deselecting ignores locks. Selecting a tag
    /// whose own `conflictsWith` hits the selection defers the change until
    /// `resolve` is called.
    pub fn toggle(&mut self, tag_id: &str) -> Result<ToggleOutcome, PromptError> {
        if self.resolution.is_pending() {
            return Err(PromptError::ResolutionPending);
        }

        if self.state.selected.contains_key(tag_id) {
            self.commit(|state| state.selected.remove(tag_id));
            return Ok(ToggleOutcome::Deselected);
        }

        let entry = self
            .index
            .get(tag_id)
            .ok_or_else(|| PromptError::UnknownTag(tag_id.to_string()))?;
        let tag = entry.tag.clone();
        let category_id = entry.category_id().to_string();

        // Only the candidate's declared edges block insertion (see conflict.rs).
        let conflicting = find_pre_insertion_conflicts(&tag, &self.state.selected);
        if !conflicting.is_empty() {
            let request = ResolutionRequest {
                newly_selected_tag: tag,
                newly_selected_category_id: category_id,
                conflicting_tags: conflicting,
            };
            debug!(tag_id, conflicts = ?request.conflicting_ids(), "toggle deferred on conflict");
            self.resolution = ResolutionState::PendingResolution(request.clone());
            return Ok(ToggleOutcome::ConflictPending(request));
        }

        self.commit(|state| insert_unlocked(state, tag, category_id));
        Ok(ToggleOutcome::Selected)
    }

    /// Close the pending conflict with one of the three outcomes.
    pub fn resolve(&mut self, resolution: Resolution) -> Result<(), PromptError> {
        let request = match std::mem::take(&mut self.resolution) {
            ResolutionState::PendingResolution(request) => request,
            ResolutionState::Idle => return Err(PromptError::NoPendingResolution),
        };

        debug!(tag_id = %request.newly_selected_tag.id, ?resolution, "conflict resolved");
        match resolution {
            Resolution::KeepNew => self.commit(|state| {
                for conflicting in &request.conflicting_tags {
                    state.selected.remove(&conflicting.id);
                }
                insert_unlocked(
                    state,
                    request.newly_selected_tag,
                    request.newly_selected_category_id,
                );
            }),
            // Leaves an active conflict on purpose; the scan still reports it.
            Resolution::KeepBoth => self.commit(|state| {
                insert_unlocked(
                    state,
                    request.newly_selected_tag,
                    request.newly_selected_category_id,
                )
            }),
            Resolution::Cancel => {}
        }
        Ok(())
    }

    /// Flip the lock of a selected tag. Returns false (and does nothing) if unselected.
    pub fn toggle_lock(&mut self, tag_id: &str) -> bool {
        if !self.state.selected.contains_key(tag_id) {
            return false;
        }
        self.commit(|state| {
            if let Some(entry) = state.selected.get_mut(tag_id) {
                entry.is_locked = !entry.is_locked;
            }
        });
        true
    }

    /// Empty the selection, text values and aux parameters.
    pub fn clear_all(&mut self) {
        self.commit(|state| {
            state.selected.clear();
            state.text_values.clear();
            state.aux = AuxParams::default();
        });
    }

    /// Remove every selected tag of one category. Returns how many were removed.
    pub fn clear_category(&mut self, category_id: &str) -> usize {
        self.commit(|state| {
            let before = state.selected.len();
            state.selected.retain(|_, entry| entry.category_id != category_id);
            before - state.selected.len()
        })
    }

    /// Set (or, when blank, clear) the free-text value of a text or helper-input category.
    pub fn set_text_value(&mut self, category_id: &str, value: &str) -> Result<(), PromptError> {
        let category = self
            .index
            .category(category_id)
            .ok_or_else(|| PromptError::UnknownCategory(category_id.to_string()))?;
        if !category.kind.takes_text() {
            return Err(PromptError::UnknownCategory(format!(
                "{} does not take text values",
                category_id
            )));
        }
        self.commit(|state| {
            if value.trim().is_empty() {
                state.text_values.remove(category_id);
            } else {
                state.text_values.insert(category_id.to_string(), value.to_string());
            }
        });
        Ok(())
    }

    pub fn set_aux_params(&mut self, aux: AuxParams) {
        self.commit(|state| state.aux = aux);
    }

    /// Replace the category order. Unknown ids are kept; known categories
    /// missing from `order` are appended.
    pub fn reorder_categories(&mut self, order: Vec<String>) {
        let mut result: Vec<String> = Vec::with_capacity(order.len());
        for id in order {
            if !result.contains(&id) {
                result.push(id);
            }
        }
        for category in self.index.categories() {
            if !result.contains(&category.id) {
                result.push(category.id.clone());
            }
        }
        self.commit(|state| state.category_order = result);
    }

    /// Replace the selection wholesale from a preset, history entry or AI result.
    ///
    /// Ids missing from the live taxonomy are dropped with one warning each.
    /// The category order becomes the snapshot's order filtered to existing
    /// categories, followed by any categories it did not mention.
    pub fn load_snapshot(
        &mut self,
        snapshot: &SelectionSnapshot,
        origin: SnapshotOrigin,
    ) -> Vec<SnapshotWarning> {
        let mut warnings = Vec::new();
        let mut selected = BTreeMap::new();

        for (tag_id, stored) in &snapshot.selected_tags {
            let Some(entry) = self.index.get(tag_id) else {
                warn!(tag_id = %tag_id, "snapshot references unknown tag, dropping");
                warnings.push(SnapshotWarning::UnknownTag {
                    tag_id: tag_id.clone(),
                });
                continue;
            };
            if entry.category_id() != stored.category_id {
                debug!(tag_id = %tag_id, stored = %stored.category_id, live = %entry.category_id(), "tag moved category");
            }
            selected.insert(
                tag_id.clone(),
                SelectedTag {
                    tag: entry.tag.clone(),
                    category_id: entry.category_id().to_string(),
                    is_locked: stored.is_locked,
                },
            );
        }

        let text_values = snapshot
            .text_category_values
            .iter()
            .filter(|(category_id, value)| {
                let known = self
                    .index
                    .category(category_id)
                    .is_some_and(|c| c.kind.takes_text());
                known && !value.trim().is_empty()
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        self.state.selected = selected;
        self.state.text_values = text_values;
        self.state.category_order = self.index.effective_category_order(&snapshot.category_order);
        self.resolution = ResolutionState::Idle;
        self.active_preset = match origin {
            SnapshotOrigin::Preset(name) => Some(ActivePreset {
                name,
                is_dirty: false,
            }),
            SnapshotOrigin::History | SnapshotOrigin::Ai => None,
        };

        info!(
            tags = self.state.selected.len(),
            dropped = warnings.len(),
            "snapshot loaded"
        );
        warnings
    }

    /// Pick one random tag for every tag category without a kept tag.
    ///
    /// With `preserve_locked`, locked tags survive verbatim and their
    /// categories are left alone; otherwise every category is re-rolled.
    /// Text and helper-input categories are never touched.
    pub fn randomize<R: Rng + ?Sized>(&mut self, rng: &mut R, preserve_locked: bool) {
        let mut next: BTreeMap<String, SelectedTag> = if preserve_locked {
            self.state
                .selected
                .iter()
                .filter(|(_, entry)| entry.is_locked)
                .map(|(id, entry)| (id.clone(), entry.clone()))
                .collect()
        } else {
            BTreeMap::new()
        };

        let locked_categories: HashSet<String> =
            next.values().map(|entry| entry.category_id.clone()).collect();

        for category in self.index.categories() {
            if category.kind != CategoryKind::Tags || locked_categories.contains(&category.id) {
                continue;
            }
            // Duplicate ids are only indexed at their first declaration.
            let candidates: Vec<&Tag> = category
                .tags
                .iter()
                .filter(|tag| self.index.is_indexed(tag))
                .collect();
            if let Some(tag) = candidates.choose(rng).copied() {
                next.insert(
                    tag.id.clone(),
                    SelectedTag {
                        tag: tag.clone(),
                        category_id: category.id.clone(),
                        is_locked: false,
                    },
                );
            }
        }

        self.commit(|state| state.selected = next);
    }

    /// Swap in a new taxonomy. No reference into the old one survives:
    /// selection, text values and aux parameters are reset.
    pub fn replace_taxonomy(&mut self, index: Arc<TaxonomyIndex>) {
        info!(tags = index.tag_count(), "taxonomy replaced, resetting selection");
        let category_order = index.effective_category_order(&self.state.category_order);
        self.index = index;
        self.state = SelectionState {
            category_order,
            ..Default::default()
        };
        self.resolution = ResolutionState::Idle;
        self.active_preset = None;
    }
}

fn insert_unlocked(state: &mut SelectionState, tag: Tag, category_id: String) {
    state.selected.insert(
        tag.id.clone(),
        SelectedTag {
            tag,
            category_id,
            is_locked: false,
        },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::taxonomy::Taxonomy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn store() -> SelectionStore {
        let index = TaxonomyIndex::build(Taxonomy::bundled_default().unwrap());
        SelectionStore::new(Arc::new(index))
    }

    #[test]
    fn test_toggle_on_and_off() {
        let mut store = store();
        assert_eq!(store.toggle("g_synthwave").unwrap(), ToggleOutcome::Selected);
        assert!(!store.selected()["g_synthwave"].is_locked);
        assert_eq!(store.toggle("g_synthwave").unwrap(), ToggleOutcome::Deselected);
        assert!(store.selected().is_empty());
    }

    #[test]
    fn test_toggle_unknown_tag_fails() {
        let mut store = store();
        assert!(matches!(store.toggle("nope"), Err(PromptError::UnknownTag(_))));
    }

    #[test]
    fn test_deselect_ignores_lock() {
        let mut store = store();
        store.toggle("m_dreamy").unwrap();
        assert!(store.toggle_lock("m_dreamy"));
        assert_eq!(store.toggle("m_dreamy").unwrap(), ToggleOutcome::Deselected);
    }

    #[test]
    fn test_conflict_keep_new() {
        let mut store = store();
        store.toggle("v_female").unwrap();

        let outcome = store.toggle("v_instrumental").unwrap();
        let ToggleOutcome::ConflictPending(request) = outcome else {
            panic!("expected a pending conflict");
        };
        assert_eq!(request.newly_selected_tag.id, "v_instrumental");
        assert_eq!(request.conflicting_ids(), vec!["v_female"]);
        // Not mutated yet
        assert!(!store.is_selected("v_instrumental"));
        assert!(store.is_selected("v_female"));

        store.resolve(Resolution::KeepNew).unwrap();
        let ids: Vec<&String> = store.selected().keys().collect();
        assert_eq!(ids, vec!["v_instrumental"]);
        assert!(!store.resolution().is_pending());
    }

    #[test]
    fn test_conflict_keep_both_leaves_conflict_visible() {
        let mut store = store();
        store.toggle("v_female").unwrap();
        store.toggle("v_instrumental").unwrap();
        store.resolve(Resolution::KeepBoth).unwrap();

        assert!(store.is_selected("v_female"));
        assert!(store.is_selected("v_instrumental"));
        let conflicts = store.conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].tag_a, "v_female");
        assert_eq!(conflicts[0].tag_b, "v_instrumental");
    }

    #[test]
    fn test_conflict_cancel_changes_nothing() {
        let mut store = store();
        store.toggle("v_female").unwrap();
        let before = store.snapshot();
        store.toggle("v_instrumental").unwrap();
        store.resolve(Resolution::Cancel).unwrap();
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_toggle_rejected_while_pending() {
        let mut store = store();
        store.toggle("v_female").unwrap();
        store.toggle("v_instrumental").unwrap();
        assert!(matches!(store.toggle("g_techno"), Err(PromptError::ResolutionPending)));
        assert!(matches!(store.toggle("v_female"), Err(PromptError::ResolutionPending)));
        store.resolve(Resolution::Cancel).unwrap();
        assert!(matches!(store.resolve(Resolution::Cancel), Err(PromptError::NoPendingResolution)));
    }

    #[test]
    fn test_asymmetric_edge_does_not_block_insertion() {
        // v_instrumental declares the conflict; v_female does not.
        let mut store = store();
        store.toggle("v_instrumental").unwrap();
        assert_eq!(store.toggle("v_female").unwrap(), ToggleOutcome::Selected);
        assert_eq!(store.conflicts().len(), 1);
    }

    #[test]
    fn test_toggle_lock_unselected_is_noop() {
        let mut store = store();
        store.mark_preset_saved("Chill");
        assert!(!store.toggle_lock("m_chill"));
        assert!(!store.active_preset().unwrap().is_dirty);
    }

    #[test]
    fn test_mutations_mark_active_preset_dirty() {
        let mut store = store();
        store.mark_preset_saved("Chill");
        store.toggle("m_chill").unwrap();
        assert!(store.active_preset().unwrap().is_dirty);
    }

    #[test]
    fn test_clear_all_resets_text_and_aux() {
        let mut store = store();
        store.toggle("g_techno").unwrap();
        store.set_text_value("lyrics_theme", "neon nights").unwrap();
        store.set_aux_params(AuxParams {
            instrumental: true,
            bpm: Some(120),
            musical_key: None,
        });
        store.clear_all();
        assert!(store.selected().is_empty());
        assert!(store.text_values().is_empty());
        assert_eq!(store.aux(), &AuxParams::default());
    }

    #[test]
    fn test_clear_category_leaves_others() {
        let mut store = store();
        store.toggle("g_techno").unwrap();
        store.toggle("g_electro").unwrap();
        store.toggle("m_dreamy").unwrap();
        store.set_text_value("lyrics_theme", "rain").unwrap();

        assert_eq!(store.clear_category("genre"), 2);
        assert!(store.is_selected("m_dreamy"));
        assert_eq!(store.text_values().get("lyrics_theme").map(String::as_str), Some("rain"));
    }

    #[test]
    fn test_set_text_value_rejects_tag_category() {
        let mut store = store();
        assert!(store.set_text_value("genre", "x").is_err());
        assert!(store.set_text_value("missing", "x").is_err());
        store.set_text_value("bpm_helper", "124 BPM").unwrap();
        store.set_text_value("bpm_helper", "  ").unwrap();
        assert!(store.text_values().is_empty());
    }

    #[test]
    fn test_load_snapshot_drops_unknown_ids_with_warning() {
        let mut store = store();
        let mut snapshot = SelectionSnapshot::default();
        snapshot.selected_tags.insert(
            "g_synthwave".into(),
            SnapshotTag { category_id: "genre".into(), is_locked: true },
        );
        snapshot.selected_tags.insert(
            "g_deleted".into(),
            SnapshotTag { category_id: "genre".into(), is_locked: false },
        );

        let warnings = store.load_snapshot(&snapshot, SnapshotOrigin::History);
        assert_eq!(
            warnings,
            vec![SnapshotWarning::UnknownTag { tag_id: "g_deleted".into() }]
        );
        assert!(store.selected()["g_synthwave"].is_locked);
        assert!(!store.snapshot().selected_tags.contains_key("g_deleted"));
    }

    #[test]
    fn test_load_snapshot_rebuilds_category_order() {
        let mut store = store();
        let snapshot = SelectionSnapshot {
            category_order: vec!["mood".into(), "ghost".into(), "genre".into()],
            ..Default::default()
        };
        store.load_snapshot(&snapshot, SnapshotOrigin::Ai);

        let order = store.category_order();
        assert_eq!(&order[..2], &["mood".to_string(), "genre".to_string()]);
        assert!(!order.contains(&"ghost".to_string()));
        assert_eq!(order.len(), store.index().categories().len());
    }

    #[test]
    fn test_load_snapshot_sets_active_preset_by_origin() {
        let mut store = store();
        store.load_snapshot(&SelectionSnapshot::default(), SnapshotOrigin::Preset("Chill".into()));
        assert_eq!(
            store.active_preset(),
            Some(&ActivePreset { name: "Chill".into(), is_dirty: false })
        );
        store.load_snapshot(&SelectionSnapshot::default(), SnapshotOrigin::History);
        assert!(store.active_preset().is_none());
    }

    #[test]
    fn test_reorder_keeps_unknown_and_appends_missing() {
        let mut store = store();
        store.reorder_categories(vec!["future".into(), "mood".into(), "mood".into()]);
        let order = store.category_order();
        assert_eq!(order[0], "future");
        assert_eq!(order[1], "mood");
        assert_eq!(order.len(), store.index().categories().len() + 1);
    }

    #[test]
    fn test_randomize_picks_one_per_tag_category() {
        let mut store = store();
        let mut rng = StdRng::seed_from_u64(7);
        store.randomize(&mut rng, true);

        let tag_categories = store
            .index()
            .categories()
            .iter()
            .filter(|c| c.kind == CategoryKind::Tags && !c.tags.is_empty())
            .count();
        assert_eq!(store.selected().len(), tag_categories);
        for category in store.index().categories() {
            let count = store.selected().values().filter(|e| e.category_id == category.id).count();
            let expected = usize::from(category.kind == CategoryKind::Tags && !category.tags.is_empty());
            assert_eq!(count, expected, "category {}", category.id);
        }
    }

    #[test]
    fn test_randomize_skips_duplicate_ids_owned_elsewhere() {
        let taxonomy = Taxonomy::from_json(
            r#"{"taxonomy":[
                {"id":"a","name":"A","tags":[{"id":"t","label":"T"}]},
                {"id":"b","name":"B","tags":[{"id":"t","label":"T again"},{"id":"u","label":"U"}]}
            ]}"#,
        )
        .unwrap();
        let mut store = SelectionStore::new(Arc::new(TaxonomyIndex::build(taxonomy)));
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            store.randomize(&mut rng, false);
            assert_eq!(store.selected().len(), 2, "seed {}", seed);
            assert_eq!(store.selected()["t"].category_id, "a");
            assert_eq!(store.selected()["u"].category_id, "b");
        }
    }

    #[test]
    fn test_randomize_preserves_locked_tags() {
        let mut store = store();
        store.toggle("m_dreamy").unwrap();
        store.toggle_lock("m_dreamy");
        store.toggle("g_techno").unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        store.randomize(&mut rng, true);
        let entry = &store.selected()["m_dreamy"];
        assert!(entry.is_locked);
        assert_eq!(store.selected().values().filter(|e| e.category_id == "mood").count(), 1);
    }

    #[test]
    fn test_randomize_all_locked_is_noop() {
        let mut store = store();
        let picks: Vec<String> = store
            .index()
            .categories()
            .iter()
            .filter(|c| c.kind == CategoryKind::Tags)
            .filter_map(|c| c.tags.first().map(|t| t.id.clone()))
            .collect();
        for id in &picks {
            // Every first tag is conflict-free with the others in the bundled taxonomy.
            assert_eq!(store.toggle(id).unwrap(), ToggleOutcome::Selected);
            store.toggle_lock(id);
        }
        let before = store.selected().clone();

        let mut rng = StdRng::seed_from_u64(99);
        store.randomize(&mut rng, true);
        assert_eq!(store.selected(), &before);
    }

    #[test]
    fn test_replace_taxonomy_resets_everything() {
        let mut store = store();
        store.toggle("g_techno").unwrap();
        store.set_text_value("lyrics_theme", "x").unwrap();
        store.mark_preset_saved("Chill");

        let smaller = Taxonomy::from_json(
            r#"{"taxonomy":[{"id":"mood","name":"Mood","type":"tags","tags":[{"id":"m_dreamy","label":"Dreamy"}]}]}"#,
        )
        .unwrap();
        store.replace_taxonomy(Arc::new(TaxonomyIndex::build(smaller)));

        assert!(store.selected().is_empty());
        assert!(store.text_values().is_empty());
        assert!(store.active_preset().is_none());
        assert_eq!(store.category_order(), &["mood".to_string()]);
    }
}
