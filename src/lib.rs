// Modules
pub mod ai;
pub mod commands;
pub mod db;
pub mod error;
pub mod prompt;

pub use commands::AppState;
pub use error::{LlmError, PromptError};
pub use prompt::{compose, normalize, ComposedPrompt, SelectionStore, Taxonomy, TaxonomyIndex};
