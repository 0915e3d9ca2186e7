// AI operations over the prompt core
//
// Each operation awaits the collaborator, validates the shape it needs and
// returns plain data. None of them touch a SelectionStore; callers apply the
// validated result afterwards, so a failed call never leaves partial state.

use crate::ai::context_builder::TaxonomyContextBuilder;
use crate::ai::llm_client::LlmClient;
use crate::ai::system_prompt::{LYRICS_PROMPT, TAG_SUGGESTION_PROMPT, THEME_PROMPT, TITLE_PROMPT};
use crate::error::LlmError;
use crate::prompt::selection::SnapshotWarning;
use crate::prompt::snapshot::{SelectionSnapshot, SnapshotTag};
use crate::prompt::taxonomy::TaxonomyIndex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Validated result of a tag suggestion call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSuggestion {
    /// Only ids present in the taxonomy, unlocked.
    pub snapshot: SelectionSnapshot,
    pub warnings: Vec<SnapshotWarning>,
}

/// Pull `field` out of a JSON object as a list of non-empty, trimmed,
/// case-insensitively unique strings. Non-string items are skipped.
fn string_list(value: &Value, field: &str) -> Result<Vec<String>, LlmError> {
    let items = value
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::Shape(format!("expected an object with a \"{}\" array", field)))?;

    let mut out: Vec<String> = Vec::new();
    for item in items {
        let Some(text) = item.as_str() else {
            debug!(field, item = %item, "skipping non-string item");
            continue;
        };
        let text = text.trim();
        if text.is_empty() || out.iter().any(|existing| existing.eq_ignore_ascii_case(text)) {
            continue;
        }
        out.push(text.to_string());
    }
    Ok(out)
}

/// Ask for tags matching a free-form description.
pub async fn suggest_tags(
    client: &dyn LlmClient,
    index: &TaxonomyIndex,
    description: &str,
) -> Result<TagSuggestion, LlmError> {
    let context = TaxonomyContextBuilder::build_smart_context(index, description)?;
    let user_prompt = format!(
        "Tag vocabulary:\n\n{}\n\nDescription: {}\n\nRespond with a JSON object containing tag_ids.",
        context,
        description.trim()
    );

    let value = client
        .call_llm(TAG_SUGGESTION_PROMPT, &user_prompt, false)
        .await?
        .into_json()?;
    let tag_ids = string_list(&value, "tag_ids")?;

    let mut snapshot = SelectionSnapshot::default();
    let mut warnings = Vec::new();
    for tag_id in tag_ids {
        match index.get(&tag_id) {
            Some(entry) => {
                snapshot.selected_tags.insert(
                    tag_id,
                    SnapshotTag {
                        category_id: entry.category_id().to_string(),
                        is_locked: false,
                    },
                );
            }
            None => {
                warn!(tag_id = %tag_id, "AI suggested unknown tag, dropping");
                warnings.push(SnapshotWarning::UnknownTag { tag_id });
            }
        }
    }

    info!(
        accepted = snapshot.selected_tags.len(),
        dropped = warnings.len(),
        "AI tag suggestion validated"
    );
    Ok(TagSuggestion { snapshot, warnings })
}

pub async fn generate_titles(client: &dyn LlmClient, prompt: &str) -> Result<Vec<String>, LlmError> {
    let user_prompt = format!("Style prompt: {}\n\nRespond with a JSON object containing titles.", prompt.trim());
    let value = client.call_llm(TITLE_PROMPT, &user_prompt, false).await?.into_json()?;
    string_list(&value, "titles")
}

pub async fn generate_themes(client: &dyn LlmClient, prompt: &str) -> Result<Vec<String>, LlmError> {
    let user_prompt = format!("Style prompt: {}\n\nRespond with a JSON object containing themes.", prompt.trim());
    let value = client.call_llm(THEME_PROMPT, &user_prompt, false).await?.into_json()?;
    string_list(&value, "themes")
}

/// Freeform lyrics for a style prompt and optional theme.
pub async fn generate_lyrics(
    client: &dyn LlmClient,
    prompt: &str,
    theme: Option<&str>,
) -> Result<String, LlmError> {
    let mut user_prompt = format!("Style prompt: {}", prompt.trim());
    if let Some(theme) = theme.map(str::trim).filter(|t| !t.is_empty()) {
        user_prompt.push_str(&format!("\nTheme: {}", theme));
    }

    let lyrics = client.call_llm(LYRICS_PROMPT, &user_prompt, true).await?.into_text()?;
    let lyrics = lyrics.trim();
    if lyrics.is_empty() {
        return Err(LlmError::Shape("empty lyrics".to_string()));
    }
    Ok(lyrics.to_string())
}
