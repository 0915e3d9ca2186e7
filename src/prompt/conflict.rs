// Conflict resolver - pre-insertion checks, the resolution protocol state,
// and the whole-selection conflict scan.
//
// Note the asymmetry: the pre-insertion check only looks at the
// *candidate's* `conflictsWith` list, while the scan treats an edge declared
// on either side as a conflict. A tag that is blocked only by an edge declared
// on an already-selected tag is inserted without a prompt, and then shows up
// in the scan.

use crate::prompt::selection::SelectedTag;
use crate::prompt::taxonomy::Tag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pending request raised when a toggle would select conflicting tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    pub newly_selected_tag: Tag,
    pub newly_selected_category_id: String,
    pub conflicting_tags: Vec<Tag>,
}

impl ResolutionRequest {
    pub fn conflicting_ids(&self) -> Vec<&str> {
        self.conflicting_tags.iter().map(|t| t.id.as_str()).collect()
    }
}

/// The three ways a pending conflict can be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Drop every conflicting tag, then select the new one.
    KeepNew,
    /// Select the new tag and leave the conflict in place.
    KeepBoth,
    Cancel,
}

/// Explicit state of the modal resolution protocol.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResolutionState {
    #[default]
    Idle,
    PendingResolution(ResolutionRequest),
}

impl ResolutionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ResolutionState::PendingResolution(_))
    }

    pub fn pending(&self) -> Option<&ResolutionRequest> {
        match self {
            ResolutionState::PendingResolution(request) => Some(request),
            ResolutionState::Idle => None,
        }
    }
}

/// One unordered conflicting pair in the current selection. `tag_a < tag_b`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub tag_a: String,
    pub tag_b: String,
    pub label_a: String,
    pub label_b: String,
}

/// Selected tags that the candidate declares a conflict with, in the
/// candidate's declaration order.
pub fn find_pre_insertion_conflicts(
    candidate: &Tag,
    selected: &BTreeMap<String, SelectedTag>,
) -> Vec<Tag> {
    let mut conflicting: Vec<Tag> = Vec::new();
    for id in candidate.conflicts_with() {
        if id == &candidate.id || conflicting.iter().any(|t| &t.id == id) {
            continue;
        }
        if let Some(entry) = selected.get(id) {
            conflicting.push(entry.tag.clone());
        }
    }
    conflicting
}

/// Every conflicting pair in the selection, exactly once per unordered pair,
/// whichever side (or both) declares the edge.
pub fn scan_conflicts(selected: &BTreeMap<String, SelectedTag>) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    // BTreeMap iteration is sorted, so `a.id < b.id` for every pair below.
    let entries: Vec<&SelectedTag> = selected.values().collect();
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            if a.tag.declares_conflict_with(&b.tag.id) || b.tag.declares_conflict_with(&a.tag.id) {
                conflicts.push(Conflict {
                    tag_a: a.tag.id.clone(),
                    tag_b: b.tag.id.clone(),
                    label_a: a.tag.label.clone(),
                    label_b: b.tag.label.clone(),
                });
            }
        }
    }
    conflicts
}
