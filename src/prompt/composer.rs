// Prompt composer - orders the selection and renders the final prompt
//
// Tag labels go through the normalizer as one list; free-text values are
// appended raw after them, followed by the aux parameter tokens.

use crate::prompt::normalizer::normalize;
use crate::prompt::selection::{AuxParams, SelectionStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical joiner for the prompt string.
pub const PROMPT_SEPARATOR: &str = "; ";
/// Joiner used by compact preview displays.
pub const PREVIEW_SEPARATOR: &str = ", ";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedTag {
    pub id: String,
    pub label: String,
    pub category_id: String,
}

/// The composed prompt, both joined and as structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedPrompt {
    pub prompt: String,
    pub tokens: Vec<String>,
    pub tags: Vec<ComposedTag>,
    pub text_values: BTreeMap<String, String>,
    pub category_order: Vec<String>,
    pub aux: AuxParams,
}

impl ComposedPrompt {
    pub fn joined(&self, separator: &str) -> String {
        self.tokens.join(separator)
    }

    pub fn preview(&self) -> String {
        self.joined(PREVIEW_SEPARATOR)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn aux_tokens(aux: &AuxParams) -> Vec<String> {
    let mut tokens = Vec::new();
    if aux.instrumental {
        tokens.push("instrumental".to_string());
    }
    if let Some(bpm) = aux.bpm {
        tokens.push(format!("{} bpm", bpm));
    }
    if let Some(key) = aux.musical_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        tokens.push(key.to_string());
    }
    tokens
}

/// Compose the prompt for the store's current state.
///
/// Categories follow the user-controlled order (unknown ids skipped, unseen
/// categories appended); tags inside a category keep taxonomy order.
pub fn compose(store: &SelectionStore) -> ComposedPrompt {
    let index = store.index();
    let selected = store.selected();
    let category_order = index.effective_category_order(store.category_order());

    let mut tags = Vec::new();
    let mut text_values = Vec::new();
    for category_id in &category_order {
        let Some(category) = index.category(category_id) else {
            continue;
        };
        if category.kind.takes_text() {
            if let Some(value) = store.text_values().get(category_id) {
                if !value.trim().is_empty() {
                    text_values.push(value.clone());
                }
            }
            continue;
        }
        for tag in &category.tags {
            if let Some(entry) = selected.get(&tag.id) {
                if entry.category_id == *category_id {
                    tags.push(ComposedTag {
                        id: tag.id.clone(),
                        label: tag.label.clone(),
                        category_id: category_id.clone(),
                    });
                }
            }
        }
    }

    let labels: Vec<&str> = tags.iter().map(|t| t.label.as_str()).collect();
    let mut tokens = normalize(&labels);
    tokens.extend(text_values);
    for token in aux_tokens(store.aux()) {
        if !tokens.iter().any(|t| t.eq_ignore_ascii_case(&token)) {
            tokens.push(token);
        }
    }

    ComposedPrompt {
        prompt: tokens.join(PROMPT_SEPARATOR),
        tokens,
        tags,
        text_values: store.text_values().clone(),
        category_order,
        aux: store.aux().clone(),
    }
}
