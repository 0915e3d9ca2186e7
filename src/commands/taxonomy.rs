// Taxonomy commands - read, import, export and reset the tag vocabulary
//
// Import validates first, then persists, then swaps the index. The swap
// resets the selection since nothing may point into the old taxonomy.

use crate::commands::session::{with_db, with_store, AppState};
use crate::db::keys;
use crate::prompt::suggestion::{ancestor_chain, build_display_tree, TreeNode};
use crate::prompt::taxonomy::{Taxonomy, TaxonomyIndex};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// The live taxonomy.
pub fn get_taxonomy(state: &AppState) -> Result<Taxonomy, String> {
    with_store(state, |store| store.index().taxonomy().clone())
}

/// Export as `{ "taxonomy": [...] }`, unknown fields included.
pub fn export_taxonomy(state: &AppState) -> Result<String, String> {
    get_taxonomy(state)?
        .to_json()
        .map_err(|e| format!("Failed to export taxonomy: {}", e))
}

/// Replace the taxonomy with user-provided JSON. The document is stored as
/// given once it validates.
pub fn import_taxonomy(state: &AppState, json: String) -> Result<usize, String> {
    let taxonomy = Taxonomy::from_json(&json).map_err(|e| format!("Failed to import taxonomy: {}", e))?;
    with_db(state, |db| db.set_setting(keys::CUSTOM_TAXONOMY, &json), "save taxonomy")?;
    swap_taxonomy(state, taxonomy)
}

pub fn import_taxonomy_file(state: &AppState, path: String) -> Result<usize, String> {
    let taxonomy =
        Taxonomy::load_file(Path::new(&path)).map_err(|e| format!("Failed to import taxonomy: {}", e))?;
    // Pretty-printed source document, same value as the file.
    let json = taxonomy
        .to_json()
        .map_err(|e| format!("Failed to import taxonomy: {}", e))?;
    with_db(state, |db| db.set_setting(keys::CUSTOM_TAXONOMY, &json), "save taxonomy")?;
    swap_taxonomy(state, taxonomy)
}

/// Drop the custom taxonomy and go back to the bundled one.
pub fn reset_taxonomy(state: &AppState) -> Result<usize, String> {
    let taxonomy = Taxonomy::bundled_default().map_err(|e| e.to_string())?;
    with_db(state, |db| db.delete_setting(keys::CUSTOM_TAXONOMY), "reset taxonomy")?;
    swap_taxonomy(state, taxonomy)
}

fn swap_taxonomy(state: &AppState, taxonomy: Taxonomy) -> Result<usize, String> {
    let index = Arc::new(TaxonomyIndex::build(taxonomy));
    let count = index.tag_count();
    // Presets and history keep their ids; unknown ones are dropped on load.
    with_store(state, |store| store.replace_taxonomy(index))?;
    info!(tags = count, "taxonomy swapped");
    Ok(count)
}

/// Presentation forest for one category.
pub fn get_display_tree(state: &AppState, category_id: String) -> Result<Vec<TreeNode>, String> {
    with_store(state, |store| {
        store
            .index()
            .category(&category_id)
            .map(build_display_tree)
            .ok_or_else(|| format!("Unknown category: {}", category_id))
    })?
}

/// Display-tree parents of a tag, nearest first.
pub fn get_tag_ancestors(state: &AppState, tag_id: String) -> Result<Vec<String>, String> {
    with_store(state, |store| {
        let index = store.index();
        let entry = index
            .get(&tag_id)
            .ok_or_else(|| format!("Unknown tag: {}", tag_id))?;
        Ok(ancestor_chain(entry.category, &tag_id))
    })?
}
