// Settings commands - generic key-value settings and the AI connection config
// All settings are stored in the SQLite `settings` table as strings or JSON.

use crate::ai::AiConfig;
use crate::commands::session::{with_db, AppState};
use crate::db::keys;
use tracing::warn;

// --- Generic settings commands ---

/// Get a setting by key. Returns None if not found.
pub fn get_setting(state: &AppState, key: String) -> Result<Option<String>, String> {
    with_db(state, |db| db.get_setting(&key), &format!("get setting '{}'", key))
}

/// Set a setting value (upsert).
pub fn set_setting(state: &AppState, key: String, value: String) -> Result<(), String> {
    with_db(state, |db| db.set_setting(&key, &value), &format!("set setting '{}'", key))
}

// --- AI connection config ---

/// Stored AI config, or defaults when missing or unreadable.
pub fn get_ai_config(state: &AppState) -> Result<AiConfig, String> {
    let stored: Option<AiConfig> = with_db(state, |db| db.get_json(keys::AI_CONFIG), "load AI config")?;
    Ok(match stored {
        Some(config) => config.sanitized(),
        None => {
            warn!("no AI config stored, using defaults");
            AiConfig::default()
        }
    })
}

pub fn set_ai_config(state: &AppState, config: AiConfig) -> Result<AiConfig, String> {
    let config = config.sanitized();
    with_db(state, |db| db.set_json(keys::AI_CONFIG, &config), "save AI config")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::session::test_state;

    #[test]
    fn test_generic_settings() {
        let state = test_state();
        assert_eq!(get_setting(&state, "theme".into()).unwrap(), None);
        set_setting(&state, "theme".into(), "dark".into()).unwrap();
        assert_eq!(get_setting(&state, "theme".into()).unwrap(), Some("dark".to_string()));
    }

    #[test]
    fn test_ai_config_defaults_then_saved() {
        let state = test_state();
        assert_eq!(get_ai_config(&state).unwrap(), AiConfig::default());

        let saved = set_ai_config(
            &state,
            AiConfig {
                model: "claude-haiku".into(),
                timeout_secs: 0,
                ..AiConfig::default()
            },
        )
        .unwrap();
        assert_eq!(saved.timeout_secs, crate::ai::llm_client::DEFAULT_TIMEOUT_SECS);
        assert_eq!(get_ai_config(&state).unwrap().model, "claude-haiku");
    }

    #[test]
    fn test_corrupt_ai_config_falls_back() {
        let state = test_state();
        set_setting(&state, keys::AI_CONFIG.into(), "not json".into()).unwrap();
        assert_eq!(get_ai_config(&state).unwrap(), AiConfig::default());
    }
}
