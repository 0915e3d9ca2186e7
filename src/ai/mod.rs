// AI module for LLM-assisted prompt building
//
// This module provides:
// - The LLM collaborator trait and JSON answer extraction
// - Claude API client implementing it
// - Taxonomy context building for AI consumption
// - System prompts and validated AI operations (tags, titles, themes, lyrics)

pub mod assistant;
pub mod claude_client;
pub mod context_builder;
pub mod llm_client;
pub mod system_prompt;

// Re-export commonly used types
pub use assistant::TagSuggestion;
pub use claude_client::ClaudeClient;
pub use context_builder::TaxonomyContextBuilder;
pub use llm_client::{AiConfig, LlmClient, LlmResponse};
