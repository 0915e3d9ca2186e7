// Error types shared by the prompt core, the AI layer and the command facade.

use thiserror::Error;

/// Longest slice of unparsable LLM output carried inside a parse error.
pub const SNIPPET_LEN: usize = 200;

/// Errors raised by the prompt-building core.
#[derive(Debug, Error)]
pub enum PromptError {
    /// The taxonomy could not be loaded; nothing can be displayed or composed.
    #[error("Configuration unavailable: {0}")]
    ConfigUnavailable(String),

    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("A conflict resolution is pending; resolve it before toggling again")]
    ResolutionPending,

    #[error("No conflict resolution is pending")]
    NoPendingResolution,

    #[error("A preset named '{0}' already exists")]
    DuplicatePresetName(String),

    #[error("Preset name cannot be empty")]
    EmptyPresetName,

    #[error("Preset not found: {0}")]
    PresetNotFound(String),

    #[error("No active preset to update")]
    NoActivePreset,

    #[error("History entry not found: {0}")]
    HistoryEntryNotFound(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the LLM collaborator.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("No API key configured. Please set your Claude API key in Settings.")]
    MissingApiKey,

    #[error("API request failed: {0}")]
    Request(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse AI response: {message} (near: {snippet:?})")]
    Parse { message: String, snippet: String },

    #[error("Unexpected AI response shape: {0}")]
    Shape(String),
}

impl LlmError {
    /// Build a parse error carrying the head of the offending text.
    pub fn parse(message: impl Into<String>, text: &str) -> Self {
        LlmError::Parse {
            message: message.into(),
            snippet: snippet(text),
        }
    }
}

/// First `SNIPPET_LEN` characters of `text`, with an ellipsis when cut.
pub fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SNIPPET_LEN {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(SNIPPET_LEN).collect();
    out.push('…');
    out
}
