// Command modules - one function per user action, over a shared AppState

pub mod ai;
pub mod history;
pub mod presets;
pub mod selection;
pub mod session;
pub mod settings;
pub mod taxonomy;

// Re-export commonly used items
pub use presets::LoadResponse;
pub use selection::{SelectedTagDTO, SelectionView};
pub use session::{init_database, init_in_memory, AppState};
