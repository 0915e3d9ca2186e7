// Taxonomy context builder for AI consumption
//
// Prepares a condensed JSON view of the tag vocabulary so the model can only
// answer with ids that exist. Text categories carry no tags and are left out.

use crate::error::LlmError;
use crate::prompt::taxonomy::{CategoryKind, Tag, TaxonomyIndex};
use serde::{Deserialize, Serialize};

/// Above this many tags the context is filtered by the user's description.
pub const MAX_CONTEXT_TAGS: usize = 400;

/// Condensed tag representation for AI context
#[derive(Debug, Serialize, Deserialize)]
pub struct TagContext {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub conflicts_with: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryContext {
    pub id: String,
    pub name: String,
    pub tags: Vec<TagContext>,
}

/// Complete context sent to AI
#[derive(Debug, Serialize, Deserialize)]
pub struct AIContext {
    pub total_tags: usize,
    pub categories: Vec<CategoryContext>,
}

pub struct TaxonomyContextBuilder;

impl TaxonomyContextBuilder {
    /// Every tag of every tag category.
    pub fn build_full_context(index: &TaxonomyIndex) -> Result<String, LlmError> {
        Self::render(index, |_| true)
    }

    /// Full context for small taxonomies. For large ones, only tags whose
    /// label, synonyms or description share a word with the description;
    /// falls back to the full context when nothing matches.
    pub fn build_smart_context(index: &TaxonomyIndex, description: &str) -> Result<String, LlmError> {
        if index.tag_count() <= MAX_CONTEXT_TAGS {
            return Self::build_full_context(index);
        }

        let words: Vec<String> = description
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.len() > 2)
            .map(str::to_string)
            .collect();

        let any_match = index
            .categories()
            .iter()
            .flat_map(|c| c.tags.iter())
            .any(|tag| Self::matches_keywords(tag, &words));
        if !any_match {
            return Self::build_full_context(index);
        }
        Self::render(index, |tag| Self::matches_keywords(tag, &words))
    }

    fn render(index: &TaxonomyIndex, keep: impl Fn(&Tag) -> bool) -> Result<String, LlmError> {
        let mut total_tags = 0;
        let categories: Vec<CategoryContext> = index
            .categories()
            .iter()
            .filter(|c| c.kind == CategoryKind::Tags)
            .map(|category| {
                let tags: Vec<TagContext> = category
                    .tags
                    .iter()
                    .filter(|tag| keep(tag))
                    .take(MAX_CONTEXT_TAGS.saturating_sub(total_tags))
                    .map(|tag| TagContext {
                        id: tag.id.clone(),
                        label: tag.label.clone(),
                        conflicts_with: tag.conflicts_with().to_vec(),
                    })
                    .collect();
                total_tags += tags.len();
                CategoryContext {
                    id: category.id.clone(),
                    name: category.name.clone(),
                    tags,
                }
            })
            .filter(|c| !c.tags.is_empty())
            .collect();

        let context = AIContext {
            total_tags,
            categories,
        };
        serde_json::to_string(&context)
            .map_err(|e| LlmError::Shape(format!("Failed to serialize context: {}", e)))
    }

    fn matches_keywords(tag: &Tag, words: &[String]) -> bool {
        let mut haystack = format!("{} {}", tag.label, tag.description).to_lowercase();
        for synonym in tag.synonyms.iter().flatten() {
            haystack.push(' ');
            haystack.push_str(&synonym.to_lowercase());
        }
        words.iter().any(|w| haystack.contains(w.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::taxonomy::Taxonomy;

    fn default_index() -> TaxonomyIndex {
        TaxonomyIndex::build(Taxonomy::bundled_default().unwrap())
    }

    #[test]
    fn test_full_context_lists_tag_categories_only() {
        let index = default_index();
        let json = TaxonomyContextBuilder::build_full_context(&index).unwrap();
        let context: AIContext = serde_json::from_str(&json).unwrap();

        assert_eq!(context.total_tags, index.tag_count());
        assert!(context.categories.iter().all(|c| c.id != "lyrics_theme"));
        assert!(json.contains("\"g_synthwave\""));
        // Conflict edges go along so the model can avoid them.
        assert!(json.contains("\"conflicts_with\""));
    }

    #[test]
    fn test_small_taxonomy_smart_context_is_full() {
        let index = default_index();
        let smart = TaxonomyContextBuilder::build_smart_context(&index, "dark techno").unwrap();
        let full = TaxonomyContextBuilder::build_full_context(&index).unwrap();
        assert_eq!(smart, full);
    }

    #[test]
    fn test_large_taxonomy_filtered_by_description() {
        let tags: Vec<String> = (0..MAX_CONTEXT_TAGS + 10)
            .map(|i| format!(r#"{{"id":"t{i}","label":"Filler {i}"}}"#))
            .collect();
        let json = format!(
            r#"{{"taxonomy":[{{"id":"genre","name":"Genre","type":"tags","tags":[
                {{"id":"g_vapor","label":"Vaporwave","synonyms":["vapor"]}},{}]}}]}}"#,
            tags.join(",")
        );
        let index = TaxonomyIndex::build(Taxonomy::from_json(&json).unwrap());

        let smart = TaxonomyContextBuilder::build_smart_context(&index, "some vaporwave please").unwrap();
        let context: AIContext = serde_json::from_str(&smart).unwrap();
        assert_eq!(context.total_tags, 1);
        assert_eq!(context.categories[0].tags[0].id, "g_vapor");

        // No match at all: capped full context
        let fallback = TaxonomyContextBuilder::build_smart_context(&index, "zzz").unwrap();
        let context: AIContext = serde_json::from_str(&fallback).unwrap();
        assert_eq!(context.total_tags, MAX_CONTEXT_TAGS);
    }
}
