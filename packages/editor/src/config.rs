use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_NAME: &str = "paper.config.json";

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Maximum number of undo events kept
    #[serde(default = "default_history_depth")]
    pub history_depth: usize,

    /// How many characters before the caret input rules look at
    #[serde(default = "default_lookbehind")]
    pub input_rule_lookbehind: usize,

    /// Decides what `Mod` means in key chords
    #[serde(default)]
    pub platform: Platform,

    /// Keep an empty paragraph at the end of the document
    #[serde(default = "default_true")]
    pub trailing_paragraph: bool,

    #[serde(default)]
    pub code_block: CodeBlockConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Mac,
    #[default]
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlockConfig {
    /// Language given to code blocks created without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_language: Option<String>,
}

fn default_history_depth() -> usize {
    100
}

fn default_lookbehind() -> usize {
    500
}

fn default_true() -> bool {
    true
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: default_history_depth(),
            input_rule_lookbehind: default_lookbehind(),
            platform: Platform::default(),
            trailing_paragraph: true,
            code_block: CodeBlockConfig::default(),
        }
    }
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults when the
    /// directory has no config file.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_path = dir.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::File(format!("{}: {}", config_path.display(), e)))?;
            serde_json::from_str(&content)
                .map_err(|e| ConfigError::File(format!("{}: {}", config_path.display(), e)))
        } else {
            Ok(EditorConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "historyDepth": 20,
            "platform": "mac",
            "trailingParagraph": false,
            "codeBlock": { "defaultLanguage": "rust" }
        }"#;

        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.history_depth, 20);
        assert_eq!(config.input_rule_lookbehind, 500);
        assert_eq!(config.platform, Platform::Mac);
        assert!(!config.trailing_paragraph);
        assert_eq!(config.code_block.default_language.as_deref(), Some("rust"));
    }

    #[test]
    fn test_default_config() {
        let config = EditorConfig::default();
        assert_eq!(config.history_depth, 100);
        assert_eq!(config.platform, Platform::Other);
        assert!(config.trailing_paragraph);
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap(), EditorConfig::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{"historyDepth": 3}"#).unwrap();
        assert_eq!(EditorConfig::load(dir.path()).unwrap().history_depth, 3);

        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{oops").unwrap();
        assert!(matches!(
            EditorConfig::load(dir.path()),
            Err(ConfigError::File(_))
        ));
    }
}
