// Snapshots - presets and history entries
//
// A snapshot stores only relational data (tag id → category id + lock flag),
// never the full tag payload. Loading one re-joins against the live taxonomy
// index, so tags removed from the taxonomy silently fall out of old presets.

use crate::error::PromptError;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info};

/// History keeps at most this many entries, newest first.
pub const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotTag {
    pub category_id: String,
    #[serde(default)]
    pub is_locked: bool,
}

/// Minimal serializable capture of selection + category order + text values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSnapshot {
    #[serde(default)]
    pub selected_tags: BTreeMap<String, SnapshotTag>,
    #[serde(default)]
    pub category_order: Vec<String>,
    #[serde(default)]
    pub text_category_values: BTreeMap<String, String>,
}

/// Where a snapshot being loaded came from. Only a named preset becomes the
/// active preset after loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOrigin {
    Preset(String),
    History,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(flatten)]
    pub snapshot: SelectionSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub prompt_string: String,
    #[serde(flatten)]
    pub snapshot: SelectionSnapshot,
}

/// Named presets, kept in save order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetLibrary {
    presets: Vec<Preset>,
}

impl PresetLibrary {
    pub fn from_presets(presets: Vec<Preset>) -> Self {
        PresetLibrary { presets }
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Case-insensitive lookup by name.
    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.position(name).map(|i| &self.presets[i])
    }

    fn position(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.presets
            .iter()
            .position(|p| p.name.trim().to_lowercase() == wanted)
    }

    fn validate_new_name(&self, name: &str) -> Result<String, PromptError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(PromptError::EmptyPresetName);
        }
        if self.position(trimmed).is_some() {
            return Err(PromptError::DuplicatePresetName(trimmed.to_string()));
        }
        Ok(trimmed.to_string())
    }

    /// Save a new preset. Duplicate names (ignoring case) are rejected
    /// before anything changes.
    pub fn save(
        &mut self,
        name: &str,
        description: &str,
        snapshot: SelectionSnapshot,
        now: DateTime<Utc>,
    ) -> Result<&Preset, PromptError> {
        let name = self.validate_new_name(name)?;
        info!(preset = %name, tags = snapshot.selected_tags.len(), "saving preset");
        self.presets.push(Preset {
            name,
            description: description.trim().to_string(),
            created_at: now,
            updated_at: now,
            is_favorite: false,
            snapshot,
        });
        Ok(&self.presets[self.presets.len() - 1])
    }

    /// Replace the stored selection of an existing preset.
    pub fn overwrite(
        &mut self,
        name: &str,
        snapshot: SelectionSnapshot,
        now: DateTime<Utc>,
    ) -> Result<&Preset, PromptError> {
        let i = self
            .position(name)
            .ok_or_else(|| PromptError::PresetNotFound(name.to_string()))?;
        let preset = &mut self.presets[i];
        preset.snapshot = snapshot;
        preset.updated_at = now;
        Ok(&self.presets[i])
    }

    pub fn delete(&mut self, name: &str) -> Result<Preset, PromptError> {
        let i = self
            .position(name)
            .ok_or_else(|| PromptError::PresetNotFound(name.to_string()))?;
        Ok(self.presets.remove(i))
    }

    pub fn rename(
        &mut self,
        old_name: &str,
        new_name: &str,
        now: DateTime<Utc>,
    ) -> Result<&Preset, PromptError> {
        let i = self
            .position(old_name)
            .ok_or_else(|| PromptError::PresetNotFound(old_name.to_string()))?;
        let trimmed = new_name.trim();
        if trimmed.is_empty() {
            return Err(PromptError::EmptyPresetName);
        }
        // Renaming to a different casing of the same name is allowed.
        if let Some(j) = self.position(trimmed) {
            if j != i {
                return Err(PromptError::DuplicatePresetName(trimmed.to_string()));
            }
        }
        let preset = &mut self.presets[i];
        preset.name = trimmed.to_string();
        preset.updated_at = now;
        Ok(&self.presets[i])
    }

    /// Flip the favorite flag, returning the new value.
    pub fn toggle_favorite(&mut self, name: &str) -> Result<bool, PromptError> {
        let i = self
            .position(name)
            .ok_or_else(|| PromptError::PresetNotFound(name.to_string()))?;
        let preset = &mut self.presets[i];
        preset.is_favorite = !preset.is_favorite;
        Ok(preset.is_favorite)
    }

    pub fn export_json(&self) -> Result<String, PromptError> {
        Ok(serde_json::to_string_pretty(&self.presets)?)
    }

    /// Merge presets from an exported JSON array. Presets whose names already
    /// exist are skipped; their names are returned.
    pub fn import_json(&mut self, json: &str) -> Result<Vec<String>, PromptError> {
        let incoming: Vec<Preset> = serde_json::from_str(json)?;
        let mut skipped = Vec::new();
        for preset in incoming {
            match self.validate_new_name(&preset.name) {
                Ok(name) => self.presets.push(Preset { name, ..preset }),
                Err(_) => skipped.push(preset.name),
            }
        }
        debug!(skipped = skipped.len(), total = self.presets.len(), "presets imported");
        Ok(skipped)
    }
}

/// Generated prompts, newest first, capped at `MAX_HISTORY`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
}

impl HistoryLog {
    /// Rebuild from persisted entries (already newest first), enforcing the cap.
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        let mut entries: VecDeque<HistoryEntry> = entries.into();
        entries.truncate(MAX_HISTORY);
        HistoryLog { entries }
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Record a generated prompt, evicting the oldest entries past the cap.
    pub fn record(
        &mut self,
        prompt_string: String,
        snapshot: SelectionSnapshot,
        now: DateTime<Utc>,
    ) -> &HistoryEntry {
        let id = loop {
            let candidate = new_entry_id();
            if self.get(&candidate).is_none() {
                break candidate;
            }
        };
        self.entries.push_front(HistoryEntry {
            id,
            timestamp: now,
            prompt_string,
            snapshot,
        });
        while self.entries.len() > MAX_HISTORY {
            if let Some(evicted) = self.entries.pop_back() {
                debug!(id = %evicted.id, "history entry evicted");
            }
        }
        &self.entries[0]
    }

    pub fn remove(&mut self, id: &str) -> Result<HistoryEntry, PromptError> {
        let i = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| PromptError::HistoryEntryNotFound(id.to_string()))?;
        self.entries
            .remove(i)
            .ok_or_else(|| PromptError::HistoryEntryNotFound(id.to_string()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Random 64-bit hex id for a history entry.
fn new_entry_id() -> String {
    let mut rng = rand::thread_rng();
    (0..8).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(tag_id: &str) -> SelectionSnapshot {
        let mut snapshot = SelectionSnapshot::default();
        snapshot.selected_tags.insert(
            tag_id.to_string(),
            SnapshotTag {
                category_id: "genre".to_string(),
                is_locked: false,
            },
        );
        snapshot
    }

    #[test]
    fn test_duplicate_preset_name_rejected_case_insensitive() {
        let mut library = PresetLibrary::default();
        library.save("Chill", "", snapshot_with("m_chill"), Utc::now()).unwrap();
        let before = library.clone();

        let err = library.save("chill", "again", snapshot_with("g_metal"), Utc::now()).unwrap_err();
        assert!(matches!(err, PromptError::DuplicatePresetName(_)));
        assert_eq!(library, before);
    }

    #[test]
    fn test_empty_preset_name_rejected() {
        let mut library = PresetLibrary::default();
        let err = library.save("   ", "", SelectionSnapshot::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, PromptError::EmptyPresetName));
        assert!(library.is_empty());
    }

    #[test]
    fn test_rename_checks_duplicates_but_allows_recasing() {
        let mut library = PresetLibrary::default();
        library.save("Chill", "", SelectionSnapshot::default(), Utc::now()).unwrap();
        library.save("Dark", "", SelectionSnapshot::default(), Utc::now()).unwrap();

        assert!(matches!(
            library.rename("Dark", "CHILL", Utc::now()),
            Err(PromptError::DuplicatePresetName(_))
        ));
        library.rename("chill", "CHILL", Utc::now()).unwrap();
        assert_eq!(library.presets()[0].name, "CHILL");
    }

    #[test]
    fn test_toggle_favorite_and_delete() {
        let mut library = PresetLibrary::default();
        library.save("Chill", "", SelectionSnapshot::default(), Utc::now()).unwrap();
        assert!(library.toggle_favorite("Chill").unwrap());
        assert!(!library.toggle_favorite("Chill").unwrap());
        library.delete("CHILL").unwrap();
        assert!(library.get("Chill").is_none());
        assert!(matches!(library.delete("Chill"), Err(PromptError::PresetNotFound(_))));
    }

    #[test]
    fn test_import_skips_existing_names() {
        let mut source = PresetLibrary::default();
        source.save("Chill", "", snapshot_with("m_chill"), Utc::now()).unwrap();
        source.save("Retro", "", snapshot_with("g_synthwave"), Utc::now()).unwrap();
        let exported = source.export_json().unwrap();

        let mut target = PresetLibrary::default();
        target.save("chill", "mine", SelectionSnapshot::default(), Utc::now()).unwrap();
        let skipped = target.import_json(&exported).unwrap();

        assert_eq!(skipped, vec!["Chill".to_string()]);
        assert_eq!(target.len(), 2);
        assert_eq!(target.get("Chill").unwrap().description, "mine");
    }

    #[test]
    fn test_preset_json_shape() {
        let mut library = PresetLibrary::default();
        library.save("Chill", "", snapshot_with("m_chill"), Utc::now()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&library.export_json().unwrap()).unwrap();
        let preset = &json[0];
        assert_eq!(preset["selectedTags"]["m_chill"]["categoryId"], "genre");
        assert_eq!(preset["selectedTags"]["m_chill"]["isLocked"], false);
        assert!(preset["categoryOrder"].is_array());
        assert!(preset["textCategoryValues"].is_object());
        assert_eq!(preset["isFavorite"], false);
    }

    #[test]
    fn test_history_is_newest_first_and_capped() {
        let mut history = HistoryLog::default();
        for i in 0..(MAX_HISTORY + 5) {
            history.record(format!("prompt {}", i), SelectionSnapshot::default(), Utc::now());
        }
        assert_eq!(history.len(), MAX_HISTORY);
        let newest = history.entries().next().unwrap();
        assert_eq!(newest.prompt_string, format!("prompt {}", MAX_HISTORY + 4));
        let oldest = history.entries().last().unwrap();
        assert_eq!(oldest.prompt_string, "prompt 5");
    }

    #[test]
    fn test_history_remove_and_clear() {
        let mut history = HistoryLog::default();
        let id = history.record("a".into(), SelectionSnapshot::default(), Utc::now()).id.clone();
        history.record("b".into(), SelectionSnapshot::default(), Utc::now());

        assert_eq!(history.remove(&id).unwrap().prompt_string, "a");
        assert!(matches!(history.remove(&id), Err(PromptError::HistoryEntryNotFound(_))));
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_history_from_entries_enforces_cap() {
        let mut history = HistoryLog::default();
        for i in 0..MAX_HISTORY {
            history.record(format!("{}", i), SelectionSnapshot::default(), Utc::now());
        }
        let mut entries = history.to_vec();
        entries.extend(entries.clone());
        assert_eq!(HistoryLog::from_entries(entries).len(), MAX_HISTORY);
    }
}
