// Commands for AI features
//
// Provides commands for:
// - API key management (stored in settings DB)
// - Tag suggestions applied to the selection
// - Title, theme and lyrics generation from the composed prompt
//
// No lock is held across an await. The selection is only touched after the
// AI answer has been validated, and only if the taxonomy is still the one the
// request was built against.

use crate::ai::{assistant, ClaudeClient, LlmClient};
use crate::commands::presets::LoadResponse;
use crate::commands::selection::SelectionView;
use crate::commands::session::{with_db, with_store, AppState};
use crate::commands::settings::get_ai_config;
use crate::db::keys;
use crate::prompt::composer::compose;
use crate::prompt::snapshot::{SelectionSnapshot, SnapshotOrigin};
use std::sync::Arc;
use tracing::{info, warn};

/// Helper: get API key from settings DB
fn get_api_key_from_db(state: &AppState) -> Result<Option<String>, String> {
    let key = with_db(state, |db| db.get_setting(keys::AI_API_KEY), "read API key")?;
    Ok(key.filter(|k| !k.trim().is_empty()))
}

/// Helper: Claude client from the stored key and config
fn build_client(state: &AppState) -> Result<ClaudeClient, String> {
    let api_key = get_api_key_from_db(state)?
        .ok_or_else(|| "No API key configured. Please set your Claude API key in Settings.".to_string())?;
    let config = get_ai_config(state)?;
    ClaudeClient::new(api_key, config).map_err(|e| e.to_string())
}

/// Helper: explicit prompt text, or the currently composed prompt
fn prompt_or_current(state: &AppState, prompt: Option<String>) -> Result<String, String> {
    if let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) {
        return Ok(prompt);
    }
    let composed = with_store(state, |store| compose(store))?;
    if composed.is_empty() {
        return Err("Nothing selected yet. Pick some tags or enter a prompt first.".to_string());
    }
    Ok(composed.prompt)
}

// ─── API key ───

/// Set the Claude API key (stores in settings DB)
pub fn set_ai_api_key(state: &AppState, api_key: String) -> Result<(), String> {
    if api_key.trim().is_empty() {
        return Err("API key cannot be empty".to_string());
    }
    with_db(state, |db| db.set_setting(keys::AI_API_KEY, api_key.trim()), "save API key")
}

/// Whether an API key is configured
pub fn get_ai_api_key_status(state: &AppState) -> Result<bool, String> {
    match get_api_key_from_db(state) {
        Ok(key) => Ok(key.is_some()),
        Err(e) => {
            warn!(error = %e, "error checking API key status");
            Ok(false)
        }
    }
}

/// Delete the stored API key
pub fn delete_ai_api_key(state: &AppState) -> Result<(), String> {
    with_db(state, |db| db.delete_setting(keys::AI_API_KEY), "delete API key")
}

// ─── AI operations ───

/// Ask the AI for tags matching a description and load them as the selection.
pub async fn ai_suggest_tags(state: &AppState, description: String) -> Result<LoadResponse, String> {
    let client = build_client(state)?;
    suggest_tags_with(state, &client, description).await
}

pub async fn suggest_tags_with(
    state: &AppState,
    client: &dyn LlmClient,
    description: String,
) -> Result<LoadResponse, String> {
    if description.trim().is_empty() {
        return Err("Description cannot be empty".to_string());
    }

    let index = with_store(state, |store| store.index_handle())?;
    let suggestion = assistant::suggest_tags(client, &index, &description)
        .await
        .map_err(|e| format!("Failed to get AI suggestions: {}", e))?;

    with_store(state, |store| {
        if !Arc::ptr_eq(&store.index_handle(), &index) {
            return Err("Failed to apply AI suggestions: the taxonomy changed while waiting".to_string());
        }
        if store.resolution().is_pending() {
            return Err("Failed to apply AI suggestions: resolve the pending conflict first".to_string());
        }

        // Tags come from the AI; order and text values stay as the user set them.
        let current = store.snapshot();
        let snapshot = SelectionSnapshot {
            selected_tags: suggestion.snapshot.selected_tags,
            category_order: current.category_order,
            text_category_values: current.text_category_values,
        };
        let mut warnings = suggestion.warnings;
        warnings.extend(store.load_snapshot(&snapshot, SnapshotOrigin::Ai));
        info!(tags = store.selected().len(), "AI suggestions applied");

        Ok(LoadResponse {
            view: SelectionView::of(store),
            warnings,
        })
    })?
}

/// Song titles for a prompt (defaults to the composed prompt).
pub async fn ai_generate_titles(state: &AppState, prompt: Option<String>) -> Result<Vec<String>, String> {
    let client = build_client(state)?;
    generate_titles_with(state, &client, prompt).await
}

pub async fn generate_titles_with(
    state: &AppState,
    client: &dyn LlmClient,
    prompt: Option<String>,
) -> Result<Vec<String>, String> {
    let prompt = prompt_or_current(state, prompt)?;
    assistant::generate_titles(client, &prompt)
        .await
        .map_err(|e| format!("Failed to generate titles: {}", e))
}

/// Lyric themes for a prompt (defaults to the composed prompt).
pub async fn ai_generate_themes(state: &AppState, prompt: Option<String>) -> Result<Vec<String>, String> {
    let client = build_client(state)?;
    generate_themes_with(state, &client, prompt).await
}

pub async fn generate_themes_with(
    state: &AppState,
    client: &dyn LlmClient,
    prompt: Option<String>,
) -> Result<Vec<String>, String> {
    let prompt = prompt_or_current(state, prompt)?;
    assistant::generate_themes(client, &prompt)
        .await
        .map_err(|e| format!("Failed to generate themes: {}", e))
}

/// Lyrics for a prompt and optional theme.
pub async fn ai_generate_lyrics(
    state: &AppState,
    prompt: Option<String>,
    theme: Option<String>,
) -> Result<String, String> {
    let client = build_client(state)?;
    generate_lyrics_with(state, &client, prompt, theme).await
}

pub async fn generate_lyrics_with(
    state: &AppState,
    client: &dyn LlmClient,
    prompt: Option<String>,
    theme: Option<String>,
) -> Result<String, String> {
    let prompt = prompt_or_current(state, prompt)?;
    assistant::generate_lyrics(client, &prompt, theme.as_deref())
        .await
        .map_err(|e| format!("Failed to generate lyrics: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::llm_client::testing::ScriptedClient;
    use crate::ai::LlmResponse;
    use crate::commands::selection::{set_text_value, toggle_tag};
    use crate::commands::session::test_state;
    use crate::commands::taxonomy::import_taxonomy;
    use crate::error::LlmError;
    use crate::prompt::selection::SnapshotWarning;
    use serde_json::json;

    #[test]
    fn test_api_key_lifecycle() {
        let state = test_state();
        assert!(!get_ai_api_key_status(&state).unwrap());
        assert!(set_ai_api_key(&state, "   ".into()).is_err());
        assert!(ai_client_error(&state).contains("No API key"));

        set_ai_api_key(&state, "sk-test".into()).unwrap();
        assert!(get_ai_api_key_status(&state).unwrap());
        assert!(build_client(&state).is_ok());

        delete_ai_api_key(&state).unwrap();
        assert!(!get_ai_api_key_status(&state).unwrap());
    }

    fn ai_client_error(state: &AppState) -> String {
        match build_client(state) {
            Ok(_) => String::new(),
            Err(e) => e,
        }
    }

    #[tokio::test]
    async fn test_suggest_tags_replaces_selection_keeps_text() {
        let state = test_state();
        toggle_tag(&state, "g_metal".into()).unwrap();
        set_text_value(&state, "lyrics_theme".into(), "city lights".into()).unwrap();

        let client = ScriptedClient::json(json!({ "tag_ids": ["g_synthwave", "m_dreamy", "nope"] }));
        let response = suggest_tags_with(&state, &client, "retro drive".into()).await.unwrap();

        assert_eq!(response.view.composed.prompt, "synthwave; dreamy; city lights");
        assert_eq!(
            response.warnings,
            vec![SnapshotWarning::UnknownTag { tag_id: "nope".into() }]
        );
        assert!(response.view.active_preset.is_none());
    }

    #[tokio::test]
    async fn test_failed_call_leaves_selection_untouched() {
        let state = test_state();
        toggle_tag(&state, "g_metal".into()).unwrap();

        let client = ScriptedClient::answering(vec![Err(LlmError::parse("bad json", "{ oops"))]);
        let err = suggest_tags_with(&state, &client, "anything".into()).await.unwrap_err();
        assert!(err.contains("oops"));
        assert!(with_store(&state, |s| s.is_selected("g_metal")).unwrap());
    }

    #[tokio::test]
    async fn test_empty_description_skips_call() {
        let state = test_state();
        let client = ScriptedClient::default();
        assert!(suggest_tags_with(&state, &client, "  ".into()).await.is_err());
        assert_eq!(client.call_count(), 0);
    }

    /// Swaps the taxonomy while the "request" is in flight.
    struct SwappingClient<'a> {
        state: &'a AppState,
    }

    #[async_trait::async_trait]
    impl LlmClient for SwappingClient<'_> {
        async fn call_llm(&self, _: &str, _: &str, _: bool) -> Result<LlmResponse, LlmError> {
            import_taxonomy(
                self.state,
                r#"{"taxonomy":[{"id":"genre","name":"Genre","type":"tags","tags":[{"id":"g_synthwave","label":"Synthwave"}]}]}"#.into(),
            )
            .map_err(LlmError::Request)?;
            Ok(LlmResponse::Json(json!({ "tag_ids": ["g_synthwave"] })))
        }
    }

    #[tokio::test]
    async fn test_stale_taxonomy_rejected() {
        let state = test_state();
        let client = SwappingClient { state: &state };
        let err = suggest_tags_with(&state, &client, "synthwave".into()).await.unwrap_err();
        assert!(err.contains("taxonomy changed"));
        assert!(with_store(&state, |s| s.selected().is_empty()).unwrap());
    }

    #[tokio::test]
    async fn test_titles_default_to_composed_prompt() {
        let state = test_state();
        let client = ScriptedClient::json(json!({ "titles": ["Chrome Sky"] }));
        assert!(generate_titles_with(&state, &client, None).await.is_err());

        toggle_tag(&state, "g_synthwave".into()).unwrap();
        let titles = generate_titles_with(&state, &client, None).await.unwrap();
        assert_eq!(titles, vec!["Chrome Sky"]);
        assert!(client.calls.lock().unwrap()[0].1.contains("synthwave"));
    }

    #[tokio::test]
    async fn test_themes_and_lyrics() {
        let state = test_state();
        let client = ScriptedClient::answering(vec![
            Ok(LlmResponse::Json(json!({ "themes": ["rain"] }))),
            Ok(LlmResponse::Text("[Chorus]\nla la".into())),
        ]);
        let themes = generate_themes_with(&state, &client, Some("lofi".into())).await.unwrap();
        assert_eq!(themes, vec!["rain"]);

        let lyrics = generate_lyrics_with(&state, &client, Some("lofi".into()), Some("rain".into()))
            .await
            .unwrap();
        assert!(lyrics.starts_with("[Chorus]"));
    }
}
