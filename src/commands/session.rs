// Session commands - app state, startup and shared persistence helpers
//
// Commands are plain functions over `&AppState` returning `Result<T, String>`
// so any host (desktop shell, CLI, test) can call them. Locks are taken one
// at a time; when two are needed the order is store, presets, history, db.

use crate::db::{keys, Database};
use crate::prompt::snapshot::{HistoryEntry, HistoryLog, Preset, PresetLibrary};
use crate::prompt::taxonomy::{Taxonomy, TaxonomyIndex};
use crate::prompt::SelectionStore;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

/// Shared app state
#[derive(Default)]
pub struct AppState {
    pub db: Mutex<Option<Database>>,
    pub store: Mutex<Option<SelectionStore>>,
    pub presets: Mutex<PresetLibrary>,
    pub history: Mutex<HistoryLog>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Initialize the database at `db_path` and load the saved session.
/// Creates parent directories if they don't exist.
pub fn init_database(state: &AppState, db_path: String) -> Result<String, String> {
    let path = Path::new(&db_path);

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create database directory: {}", e))?;
        }
    }

    let db = Database::new(path).map_err(|e| format!("Failed to open database: {}", e))?;
    init_with_database(state, db)?;
    Ok("Database initialized successfully".to_string())
}

/// Initialize with a throwaway in-memory database.
pub fn init_in_memory(state: &AppState) -> Result<(), String> {
    let db = Database::new_in_memory().map_err(|e| format!("Failed to open database: {}", e))?;
    init_with_database(state, db)
}

fn init_with_database(state: &AppState, db: Database) -> Result<(), String> {
    db.run_migrations()
        .map_err(|e| format!("Failed to run migrations: {}", e))?;

    let taxonomy = load_saved_taxonomy(&db)?;
    let presets: Vec<Preset> = db
        .get_json(keys::PRESETS)
        .map_err(|e| format!("Failed to load presets: {}", e))?
        .unwrap_or_default();
    let history: Vec<HistoryEntry> = db
        .get_json(keys::HISTORY)
        .map_err(|e| format!("Failed to load history: {}", e))?
        .unwrap_or_default();
    let category_order: Vec<String> = db
        .get_json(keys::CATEGORY_ORDER)
        .map_err(|e| format!("Failed to load category order: {}", e))?
        .unwrap_or_default();

    let mut store = SelectionStore::new(Arc::new(TaxonomyIndex::build(taxonomy)));
    if !category_order.is_empty() {
        store.reorder_categories(category_order);
    }

    info!(
        tags = store.index().tag_count(),
        presets = presets.len(),
        history = history.len(),
        "session loaded"
    );

    *lock(&state.store, "selection")? = Some(store);
    *lock(&state.presets, "presets")? = PresetLibrary::from_presets(presets);
    *lock(&state.history, "history")? = HistoryLog::from_entries(history);
    *lock(&state.db, "database")? = Some(db);
    Ok(())
}

/// The stored custom taxonomy, or the bundled one. A stored taxonomy that no
/// longer parses is reported and skipped; a broken bundled one is fatal.
fn load_saved_taxonomy(db: &Database) -> Result<Taxonomy, String> {
    let stored = db
        .get_setting(keys::CUSTOM_TAXONOMY)
        .map_err(|e| format!("Failed to load taxonomy: {}", e))?;
    if let Some(json) = stored.filter(|s| !s.trim().is_empty()) {
        match Taxonomy::from_json(&json) {
            Ok(taxonomy) => return Ok(taxonomy),
            Err(e) => warn!(error = %e, "stored taxonomy unusable, falling back to default"),
        }
    }
    Taxonomy::bundled_default().map_err(|e| e.to_string())
}

// --- Shared helpers for the other command modules ---

pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, String> {
    mutex
        .lock()
        .map_err(|e| format!("Failed to lock {}: {}", what, e))
}

/// Run `f` against the open database.
pub(crate) fn with_db<T>(
    state: &AppState,
    f: impl FnOnce(&Database) -> rusqlite::Result<T>,
    context: &str,
) -> Result<T, String> {
    let db_guard = lock(&state.db, "database")?;
    let db = db_guard
        .as_ref()
        .ok_or_else(|| "Database not initialized".to_string())?;
    f(db).map_err(|e| format!("Failed to {}: {}", context, e))
}

/// Run `f` against the live selection store.
pub(crate) fn with_store<T>(
    state: &AppState,
    f: impl FnOnce(&mut SelectionStore) -> T,
) -> Result<T, String> {
    let mut guard = lock(&state.store, "selection")?;
    let store = guard
        .as_mut()
        .ok_or_else(|| "Session not initialized".to_string())?;
    Ok(f(store))
}

pub(crate) fn persist_presets(state: &AppState, presets: &[Preset]) -> Result<(), String> {
    with_db(state, |db| db.set_json(keys::PRESETS, &presets), "save presets")
}

pub(crate) fn persist_history(state: &AppState, entries: &[HistoryEntry]) -> Result<(), String> {
    with_db(state, |db| db.set_json(keys::HISTORY, &entries), "save history")
}

pub(crate) fn persist_category_order(state: &AppState, order: &[String]) -> Result<(), String> {
    with_db(state, |db| db.set_json(keys::CATEGORY_ORDER, &order), "save category order")
}

#[cfg(test)]
pub(crate) fn test_state() -> AppState {
    let state = AppState::new();
    init_in_memory(&state).expect("in-memory session");
    state
}
