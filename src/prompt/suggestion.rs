// Suggestion engine - derived views over `suggests` edges
//
// Two views share the same edges: a flat "you might also want" list and a
// presentation tree per category. Edges may be cyclic; nothing here recurses
// along them without a visited set.

use crate::prompt::selection::SelectedTag;
use crate::prompt::taxonomy::{Category, Tag, TaxonomyIndex};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Hard cap for walks up the parent chain.
pub const MAX_ANCESTOR_DEPTH: usize = 32;

/// A suggested tag with the tags that suggested it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub tag_id: String,
    pub label: String,
    pub category_id: String,
    pub suggested_by: Vec<String>,
}

fn collect_suggestions<'a>(
    index: &TaxonomyIndex,
    selected: &BTreeMap<String, SelectedTag>,
    sources: impl Iterator<Item = &'a SelectedTag>,
) -> Vec<Suggestion> {
    let mut out: Vec<Suggestion> = Vec::new();
    for source in sources {
        for target_id in source.tag.suggests() {
            if selected.contains_key(target_id) {
                continue;
            }
            if let Some(existing) = out.iter_mut().find(|s| &s.tag_id == target_id) {
                if !existing.suggested_by.contains(&source.tag.id) {
                    existing.suggested_by.push(source.tag.id.clone());
                }
                continue;
            }
            // Dangling edges are ignored.
            let Some(target) = index.get(target_id) else {
                continue;
            };
            out.push(Suggestion {
                tag_id: target.tag.id.clone(),
                label: target.tag.label.clone(),
                category_id: target.category_id().to_string(),
                suggested_by: vec![source.tag.id.clone()],
            });
        }
    }
    out
}

/// Union of `suggests` across the selected tags of one category, minus
/// anything already selected. Sources are visited in taxonomy order.
pub fn suggestions_for_category(
    index: &TaxonomyIndex,
    selected: &BTreeMap<String, SelectedTag>,
    category_id: &str,
) -> Vec<Suggestion> {
    let Some(category) = index.category(category_id) else {
        return Vec::new();
    };
    let sources = category
        .tags
        .iter()
        .filter_map(|tag| selected.get(&tag.id))
        .filter(|entry| entry.category_id == category_id);
    collect_suggestions(index, selected, sources)
}

/// Suggestions across every category, following the given category order.
pub fn suggestions(
    index: &TaxonomyIndex,
    selected: &BTreeMap<String, SelectedTag>,
    category_order: &[String],
) -> Vec<Suggestion> {
    let mut out: Vec<Suggestion> = Vec::new();
    for category_id in index.effective_category_order(category_order) {
        for suggestion in suggestions_for_category(index, selected, &category_id) {
            match out.iter_mut().find(|s| s.tag_id == suggestion.tag_id) {
                Some(existing) => {
                    for by in suggestion.suggested_by {
                        if !existing.suggested_by.contains(&by) {
                            existing.suggested_by.push(by);
                        }
                    }
                }
                None => out.push(suggestion),
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub tag_id: String,
    pub label: String,
    pub children: Vec<TreeNode>,
}

/// For each tag in the category, the first other tag (scan order) whose
/// `suggests` lists it. Only looks one level up.
fn parent_map(category: &Category) -> HashMap<&str, &str> {
    let mut parents = HashMap::new();
    for child in &category.tags {
        let parent = category
            .tags
            .iter()
            .find(|p| p.id != child.id && p.suggests().iter().any(|id| id == &child.id));
        if let Some(parent) = parent {
            parents.insert(child.id.as_str(), parent.id.as_str());
        }
    }
    parents
}

/// Presentation forest for one category. A tag hangs under the first tag
/// that suggests it; tags with no such parent are roots. Tags only reachable
/// through a cycle are promoted to roots at their first scan position, so
/// every tag appears exactly once.
pub fn build_display_tree(category: &Category) -> Vec<TreeNode> {
    let parents = parent_map(category);
    let mut children: HashMap<&str, Vec<&Tag>> = HashMap::new();
    for tag in &category.tags {
        if let Some(parent) = parents.get(tag.id.as_str()) {
            children.entry(*parent).or_default().push(tag);
        }
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut forest = Vec::new();

    for tag in category.tags.iter().filter(|t| !parents.contains_key(t.id.as_str())) {
        if let Some(node) = build_node(tag, &children, &mut visited) {
            forest.push(node);
        }
    }
    for tag in &category.tags {
        if let Some(node) = build_node(tag, &children, &mut visited) {
            forest.push(node);
        }
    }
    forest
}

fn build_node<'a>(
    tag: &'a Tag,
    children: &HashMap<&str, Vec<&'a Tag>>,
    visited: &mut HashSet<&'a str>,
) -> Option<TreeNode> {
    if !visited.insert(tag.id.as_str()) {
        return None;
    }
    let kids = children
        .get(tag.id.as_str())
        .map(|list| {
            list.iter()
                .filter_map(|child| build_node(*child, children, visited))
                .collect()
        })
        .unwrap_or_default();
    Some(TreeNode {
        tag_id: tag.id.clone(),
        label: tag.label.clone(),
        children: kids,
    })
}

/// Parent chain of a tag in its display tree, nearest first. Stops on a
/// revisit or after `MAX_ANCESTOR_DEPTH` steps.
pub fn ancestor_chain(category: &Category, tag_id: &str) -> Vec<String> {
    let parents = parent_map(category);
    let mut chain = Vec::new();
    let mut seen: HashSet<&str> = HashSet::from([tag_id]);
    let mut current = tag_id;
    while let Some(&parent) = parents.get(current) {
        if !seen.insert(parent) || chain.len() >= MAX_ANCESTOR_DEPTH {
            break;
        }
        chain.push(parent.to_string());
        current = parent;
    }
    chain
}
