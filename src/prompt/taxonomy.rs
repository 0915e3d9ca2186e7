// Taxonomy model - categories, tags and the id → tag index
//
// The taxonomy is immutable once loaded. Edits arrive as a whole new
// taxonomy value, which gets a freshly built index; nothing is patched in place.
// Graph edges (`conflictsWith`, `suggests`) are plain id lists resolved
// through the index at read time, so cycles and one-sided edges need no
// special handling here.

use crate::error::PromptError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Taxonomy bundled with the app, used when no custom taxonomy is stored.
pub const DEFAULT_TAXONOMY_JSON: &str = include_str!("../../resources/default_taxonomy.json");

/// A leaf vocabulary item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts_with: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggests: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(
        default,
        rename = "example_snippet",
        skip_serializing_if = "Option::is_none"
    )]
    pub example_snippet: Option<String>,
    /// Fields this version does not know about, kept for lossless round-trips.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Tag {
    pub fn conflicts_with(&self) -> &[String] {
        self.conflicts_with.as_deref().unwrap_or(&[])
    }

    pub fn suggests(&self) -> &[String] {
        self.suggests.as_deref().unwrap_or(&[])
    }

    pub fn declares_conflict_with(&self, other_id: &str) -> bool {
        self.conflicts_with().iter().any(|id| id == other_id)
    }
}

/// How a category is filled in by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    #[default]
    Tags,
    Text,
    HelperInput,
}

impl CategoryKind {
    /// Categories that hold a free-text value instead of tag picks.
    pub fn takes_text(self) -> bool {
        matches!(self, CategoryKind::Text | CategoryKind::HelperInput)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: CategoryKind,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// On-disk shape: `{ "taxonomy": [Category, ...] }`.
///
/// The typed fields fill in defaults for missing keys. A parsed taxonomy
/// also keeps the document it came from, and that document is what
/// `to_json` writes back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(rename = "taxonomy")]
    pub categories: Vec<Category>,
    #[serde(skip)]
    source: Option<Value>,
}

impl Taxonomy {
    /// Parse a taxonomy document. Malformed or empty input is a configuration failure.
    pub fn from_json(json: &str) -> Result<Self, PromptError> {
        let malformed = |e: serde_json::Error| PromptError::ConfigUnavailable(format!("malformed taxonomy JSON: {}", e));
        let source: Value = serde_json::from_str(json).map_err(malformed)?;
        let mut taxonomy = Taxonomy::deserialize(&source).map_err(malformed)?;
        taxonomy.source = Some(source);

        if taxonomy.categories.is_empty() {
            return Err(PromptError::ConfigUnavailable(
                "taxonomy contains no categories".to_string(),
            ));
        }
        Ok(taxonomy)
    }

    pub fn load_file(path: &Path) -> Result<Self, PromptError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            PromptError::ConfigUnavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn bundled_default() -> Result<Self, PromptError> {
        Self::from_json(DEFAULT_TAXONOMY_JSON)
    }

    /// The source document if there is one, otherwise the typed model.
    pub fn to_json(&self) -> Result<String, PromptError> {
        match &self.source {
            Some(source) => Ok(serde_json::to_string_pretty(source)?),
            None => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }
}

/// Resolved view of one indexed tag.
#[derive(Debug, Clone, Copy)]
pub struct IndexedTag<'a> {
    pub tag: &'a Tag,
    pub category: &'a Category,
}

impl<'a> IndexedTag<'a> {
    pub fn category_id(&self) -> &'a str {
        &self.category.id
    }
}

/// Position of a tag inside the taxonomy arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TagSlot {
    category: usize,
    tag: usize,
}

/// The authoritative id → {tag, categoryId} lookup for one taxonomy.
///
/// Built in a single pass over all tags. Swapping taxonomies means building
/// a new index and dropping the old one.
#[derive(Debug, Clone)]
pub struct TaxonomyIndex {
    taxonomy: Arc<Taxonomy>,
    tags: HashMap<String, TagSlot>,
    categories: HashMap<String, usize>,
}

impl TaxonomyIndex {
    pub fn build(taxonomy: Taxonomy) -> Self {
        let taxonomy = Arc::new(taxonomy);
        let mut tags = HashMap::new();
        let mut categories = HashMap::new();

        for (ci, category) in taxonomy.categories.iter().enumerate() {
            if categories.contains_key(&category.id) {
                warn!(category_id = %category.id, "duplicate category id, keeping first");
            } else {
                categories.insert(category.id.clone(), ci);
            }
            for (ti, tag) in category.tags.iter().enumerate() {
                if tags.contains_key(&tag.id) {
                    warn!(tag_id = %tag.id, category_id = %category.id, "duplicate tag id, keeping first");
                    continue;
                }
                tags.insert(tag.id.clone(), TagSlot { category: ci, tag: ti });
            }
        }

        debug!(
            categories = categories.len(),
            tags = tags.len(),
            "taxonomy index built"
        );
        TaxonomyIndex {
            taxonomy,
            tags,
            categories,
        }
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn get(&self, tag_id: &str) -> Option<IndexedTag<'_>> {
        let slot = self.tags.get(tag_id)?;
        let category = &self.taxonomy.categories[slot.category];
        Some(IndexedTag {
            tag: &category.tags[slot.tag],
            category,
        })
    }

    pub fn contains_tag(&self, tag_id: &str) -> bool {
        self.tags.contains_key(tag_id)
    }

    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories
            .get(category_id)
            .map(|&ci| &self.taxonomy.categories[ci])
    }

    pub fn categories(&self) -> &[Category] {
        &self.taxonomy.categories
    }

    pub fn tag_count(&self) -> usize {
        self.tags.len()
    }

    /// Whether `tag` is the entry indexed under its id, and not a later duplicate.
    pub fn is_indexed(&self, tag: &Tag) -> bool {
        self.get(&tag.id).is_some_and(|entry| std::ptr::eq(entry.tag, tag))
    }

    /// Reconcile a user-controlled category order with the live taxonomy:
    /// known ids keep their order, unknown ids are skipped, and categories
    /// never mentioned are appended in declaration order.
    pub fn effective_category_order(&self, order: &[String]) -> Vec<String> {
        let mut result: Vec<String> = Vec::with_capacity(self.taxonomy.categories.len());
        for id in order {
            if self.categories.contains_key(id) && !result.contains(id) {
                result.push(id.clone());
            }
        }
        for category in &self.taxonomy.categories {
            if !result.contains(&category.id) {
                result.push(category.id.clone());
            }
        }
        result
    }
}
