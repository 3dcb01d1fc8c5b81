use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::DEFAULT_MODEL_SENTINEL;

/// Environment variable that takes precedence over the stored API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Prompt template and model binding for one command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CommandPreferences {
    pub prompt: String,
    /// Either a concrete model id or `"default"` to defer to the global choice.
    pub model: String,
}

impl CommandPreferences {
    fn with_prompt(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            model: DEFAULT_MODEL_SENTINEL.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CommandsConfig {
    pub comment: CommandPreferences,
    pub explain: CommandPreferences,
    pub ask: CommandPreferences,
    pub translate: CommandPreferences,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            comment: CommandPreferences::with_prompt(
                "Give constructive comments on the following text. Point out unclear wording and suggest improvements.",
            ),
            explain: CommandPreferences::with_prompt(
                "Explain the following text in simple terms.",
            ),
            ask: CommandPreferences::with_prompt(
                "Answer the question using the text that follows it as context.",
            ),
            translate: CommandPreferences::with_prompt(
                "Only reply with the translated text.",
            ),
        }
    }
}

/// User preferences read once at startup and passed into the core.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Preferences {
    pub api_key: Option<String>,
    /// Global default model.
    pub model: String,
    /// Overrides `model` when non-empty.
    pub custom_model: Option<String>,
    pub show_diff: bool,
    pub disable_thinking: bool,
    pub default_target_language: String,
    pub second_target_language: String,
    /// Alternative Gemini endpoint, mostly useful behind a proxy.
    pub api_base_url: Option<String>,
    pub commands: CommandsConfig,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            custom_model: None,
            show_diff: false,
            disable_thinking: false,
            default_target_language: "English".to_string(),
            second_target_language: "Chinese".to_string(),
            api_base_url: None,
            commands: CommandsConfig::default(),
        }
    }
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        let mut prefs = Self::load_from(&config_path)?;

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                prefs.api_key = Some(key);
            }
        }

        Ok(prefs)
    }

    /// Reads preferences from `path`, falling back to defaults when the file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let prefs: Preferences = serde_json::from_str(&content)?;
        Ok(prefs)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No Gemini API key configured. Set {} or run: geminify config --api-key <KEY>",
                    API_KEY_ENV
                )
            })
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("geminify").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let prefs = Preferences::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.commands.translate.model, "default");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut prefs = Preferences::new();
        prefs.custom_model = Some("gemini-exp".to_string());
        prefs.show_diff = true;
        prefs.save_to(&path).unwrap();

        let loaded = Preferences::load_from(&path).unwrap();
        assert_eq!(loaded, prefs);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "api_key": "abc", "disable_thinking": true }"#).unwrap();

        let prefs = Preferences::load_from(&path).unwrap();
        assert_eq!(prefs.api_key.as_deref(), Some("abc"));
        assert!(prefs.disable_thinking);
        assert_eq!(prefs.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_require_api_key_rejects_blank() {
        let mut prefs = Preferences::new();
        assert!(prefs.require_api_key().is_err());
        prefs.api_key = Some("   ".to_string());
        assert!(prefs.require_api_key().is_err());
        prefs.api_key = Some("key".to_string());
        assert_eq!(prefs.require_api_key().unwrap(), "key");
    }
}
