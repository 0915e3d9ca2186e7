// Prompt core - taxonomy graph, selection, conflicts, suggestions, rendering
//
// This module provides:
// - Taxonomy model and id → tag index
// - Label normalizer (the only place label text is cleaned up)
// - Selection store with the conflict-resolution protocol
// - Suggestion list and display tree over `suggests` edges
// - Prompt composer and preset/history snapshots

pub mod composer;
pub mod conflict;
pub mod normalizer;
pub mod selection;
pub mod snapshot;
pub mod suggestion;
pub mod taxonomy;

// Re-export commonly used types
pub use composer::{compose, ComposedPrompt, PREVIEW_SEPARATOR, PROMPT_SEPARATOR};
pub use conflict::{Conflict, Resolution, ResolutionRequest, ResolutionState};
pub use normalizer::normalize;
pub use selection::{ActivePreset, AuxParams, SelectedTag, SelectionStore, SnapshotWarning, ToggleOutcome};
pub use snapshot::{HistoryEntry, HistoryLog, Preset, PresetLibrary, SelectionSnapshot, SnapshotOrigin};
pub use taxonomy::{Category, CategoryKind, Tag, Taxonomy, TaxonomyIndex};
