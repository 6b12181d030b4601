//! Project rc-configuration (`.elifrc.json`) loading and normalization.
//!
//! The rc file is optional. Anything missing or malformed falls back to the
//! built-in defaults; problems are reported as [`ConfigError`]s and logged,
//! never returned as hard failures.

use crate::bootstrap::RunIntent;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the rc-configuration, relative to the application root
pub const RC_FILE_NAME: &str = ".elifrc.json";

/// Built-in directory identifiers and their default relative paths
pub const DEFAULT_DIRECTORIES: [(&str, &str); 9] = [
    ("config", "config"),
    ("public", "public"),
    ("database", "database"),
    ("migrations", "database/migrations"),
    ("seeds", "database/seeds"),
    ("resources", "resources"),
    ("views", "resources/views"),
    ("tmp", "tmp"),
    ("start", "start"),
];

/// Autoload alias used when the rc file declares none
pub const DEFAULT_AUTOLOAD_ALIAS: &str = "App";

/// Directory mapped to [`DEFAULT_AUTOLOAD_ALIAS`]
pub const DEFAULT_AUTOLOAD_PATH: &str = "./app";

/// Rc-configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed rc file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, value: &Value, expected: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }
}

/// Whether application sources are consumed as authored or as compiled output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompileMode {
    /// `typescript: true`; authoring formats are resolved
    Source,
    /// Only compiled artifacts are resolved
    #[default]
    Compiled,
}

impl CompileMode {
    pub fn from_typescript(typescript: bool) -> Self {
        if typescript {
            Self::Source
        } else {
            Self::Compiled
        }
    }

    /// File extensions tried, in order, for an extension-less module path
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Source => &["yaml", "yml", "json"],
            Self::Compiled => &["json"],
        }
    }
}

/// A startup script declared in the rc file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadEntry {
    pub file: PathBuf,
    /// Run intents this entry is restricted to; empty means every intent
    pub intents: Vec<String>,
    pub optional: bool,
}

impl PreloadEntry {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            intents: Vec::new(),
            optional: false,
        }
    }

    pub fn for_intent(mut self, intent: impl Into<String>) -> Self {
        self.intents.push(intent.into());
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Check whether the entry runs under the given intent
    pub fn applies_to(&self, intent: RunIntent) -> bool {
        self.intents.is_empty() || self.intents.iter().any(|i| i == intent.as_str())
    }

    fn from_value(index: usize, value: &Value) -> Result<Self, ConfigError> {
        let raw = RawPreload::deserialize(value).map_err(|_| {
            ConfigError::invalid_value(
                format!("preloads[{}]", index),
                value,
                "path string or { file, intent, optional } object",
            )
        })?;

        Ok(match raw {
            RawPreload::Path(file) => Self::new(file),
            RawPreload::Entry { file, intent, optional } => Self {
                file,
                intents: intent.map(IntentList::into_vec).unwrap_or_default(),
                optional,
            },
        })
    }
}

/// Preload entry as written in the rc file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPreload {
    Path(PathBuf),
    Entry {
        file: PathBuf,
        #[serde(default, alias = "environment")]
        intent: Option<IntentList>,
        #[serde(default)]
        optional: bool,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IntentList {
    One(String),
    Many(Vec<String>),
}

impl IntentList {
    fn into_vec(self) -> Vec<String> {
        match self {
            IntentList::One(intent) => vec![intent],
            IntentList::Many(intents) => intents,
        }
    }
}

/// Resolved project configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RcConfig {
    pub typescript: bool,
    pub directories: BTreeMap<String, String>,
    pub autoloads: BTreeMap<String, String>,
    pub preloads: Vec<PreloadEntry>,
    /// The rc document as read, for keys the bootstrapper does not interpret
    pub raw: Value,
}

impl Default for RcConfig {
    fn default() -> Self {
        Self {
            typescript: false,
            directories: default_directories(),
            autoloads: default_autoloads(),
            preloads: Vec::new(),
            raw: Value::Object(Map::new()),
        }
    }
}

impl RcConfig {
    /// Load `.elifrc.json` from the application root and apply defaults.
    ///
    /// A missing file is treated as an empty object. Recovered errors are
    /// logged as warnings.
    pub fn resolve(app_root: &Path) -> Self {
        let (config, errors) = Self::load(app_root);
        for error in &errors {
            tracing::warn!("Rc configuration: {}, falling back to defaults", error);
        }
        config
    }

    /// Same as [`RcConfig::resolve`] but hands back the recovered errors
    pub fn load(app_root: &Path) -> (Self, Vec<ConfigError>) {
        let path = app_root.join(RC_FILE_NAME);

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No {} found under {}", RC_FILE_NAME, app_root.display());
                return (Self::default(), Vec::new());
            }
            Err(source) => return (Self::default(), vec![ConfigError::Read { path, source }]),
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(value) => Self::from_value(value),
            Err(source) => (Self::default(), vec![ConfigError::Parse { path, source }]),
        }
    }

    /// Normalize a raw rc document
    pub fn from_value(raw: Value) -> (Self, Vec<ConfigError>) {
        let mut errors = Vec::new();
        let mut config = Self::default();

        let root = match &raw {
            Value::Object(root) => root,
            other => {
                errors.push(ConfigError::invalid_value("<root>", other, "JSON object"));
                return (config, errors);
            }
        };

        match root.get("typescript") {
            None | Some(Value::Null) => {}
            Some(Value::Bool(typescript)) => config.typescript = *typescript,
            Some(other) => errors.push(ConfigError::invalid_value("typescript", other, "boolean")),
        }

        // Directories merge key-by-key over the defaults.
        match root.get("directories") {
            None | Some(Value::Null) => {}
            Some(Value::Object(directories)) => {
                for (key, value) in directories {
                    match value.as_str() {
                        Some(path) => {
                            config.directories.insert(key.clone(), path.to_string());
                        }
                        None => errors.push(ConfigError::invalid_value(
                            format!("directories.{}", key),
                            value,
                            "relative path string",
                        )),
                    }
                }
            }
            Some(other) => errors.push(ConfigError::invalid_value("directories", other, "object")),
        }

        // Autoloads replace the default wholesale.
        match root.get("autoloads") {
            None | Some(Value::Null) => {}
            Some(Value::Object(autoloads)) => {
                let mut declared = BTreeMap::new();
                for (alias, value) in autoloads {
                    match value.as_str() {
                        Some(path) => {
                            declared.insert(alias.clone(), path.to_string());
                        }
                        None => errors.push(ConfigError::invalid_value(
                            format!("autoloads.{}", alias),
                            value,
                            "relative path string",
                        )),
                    }
                }
                if !declared.is_empty() {
                    config.autoloads = declared;
                }
            }
            Some(other) => errors.push(ConfigError::invalid_value("autoloads", other, "object")),
        }

        match root.get("preloads") {
            None | Some(Value::Null) => {}
            Some(Value::Array(preloads)) => {
                for (index, value) in preloads.iter().enumerate() {
                    match PreloadEntry::from_value(index, value) {
                        Ok(entry) => config.preloads.push(entry),
                        Err(error) => errors.push(error),
                    }
                }
            }
            Some(other) => errors.push(ConfigError::invalid_value("preloads", other, "array")),
        }

        config.raw = raw;
        (config, errors)
    }

    pub fn compile_mode(&self) -> CompileMode {
        CompileMode::from_typescript(self.typescript)
    }

    /// Relative path of a directory identifier
    pub fn directory(&self, identifier: &str) -> Option<&str> {
        self.directories.get(identifier).map(String::as_str)
    }
}

pub fn default_directories() -> BTreeMap<String, String> {
    DEFAULT_DIRECTORIES
        .iter()
        .map(|(id, path)| (id.to_string(), path.to_string()))
        .collect()
}

pub fn default_autoloads() -> BTreeMap<String, String> {
    let mut autoloads = BTreeMap::new();
    autoloads.insert(DEFAULT_AUTOLOAD_ALIAS.to_string(), DEFAULT_AUTOLOAD_PATH.to_string());
    autoloads
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_rc_uses_defaults() {
        let (config, errors) = RcConfig::from_value(json!({}));

        assert!(errors.is_empty());
        assert_eq!(config.directories, default_directories());
        assert_eq!(config.autoloads, default_autoloads());
        assert!(!config.typescript);
        assert!(config.preloads.is_empty());
    }

    #[test]
    fn test_directories_merge_per_key() {
        let (config, _) = RcConfig::from_value(json!({
            "directories": { "views": "templates", "uploads": "storage/uploads" }
        }));

        assert_eq!(config.directory("views"), Some("templates"));
        assert_eq!(config.directory("uploads"), Some("storage/uploads"));
        assert_eq!(config.directory("config"), Some("config"));
        assert_eq!(config.directory("migrations"), Some("database/migrations"));
        assert_eq!(config.directories.len(), DEFAULT_DIRECTORIES.len() + 1);
    }

    #[test]
    fn test_autoloads_replace_default() {
        let (config, _) = RcConfig::from_value(json!({
            "autoloads": { "Domain": "./domain" }
        }));

        assert_eq!(config.autoloads.len(), 1);
        assert_eq!(config.autoloads.get("Domain").map(String::as_str), Some("./domain"));
        assert!(!config.autoloads.contains_key(DEFAULT_AUTOLOAD_ALIAS));
    }

    #[test]
    fn test_empty_autoloads_keep_default() {
        let (config, errors) = RcConfig::from_value(json!({ "autoloads": {} }));

        assert!(errors.is_empty());
        assert_eq!(config.autoloads, default_autoloads());
    }

    #[test]
    fn test_preload_forms() {
        let (config, errors) = RcConfig::from_value(json!({
            "preloads": [
                "./start/routes",
                { "file": "./start/kernel", "intent": "http", "optional": true },
                { "file": "./start/console", "environment": ["ace", "repl"] }
            ]
        }));

        assert!(errors.is_empty());
        assert_eq!(config.preloads.len(), 3);
        assert_eq!(config.preloads[0], PreloadEntry::new("./start/routes"));
        assert_eq!(
            config.preloads[1],
            PreloadEntry::new("./start/kernel").for_intent("http").optional(true)
        );
        assert!(config.preloads[0].applies_to(RunIntent::Http));
        assert!(config.preloads[1].applies_to(RunIntent::Http));
        assert!(!config.preloads[2].applies_to(RunIntent::Http));
        assert!(config.preloads[2].applies_to(RunIntent::Ace));
    }

    #[test]
    fn test_malformed_fields_fall_back() {
        let (config, errors) = RcConfig::from_value(json!({
            "typescript": "yes",
            "directories": ["config"],
            "preloads": [42, "./start/routes"]
        }));

        assert_eq!(errors.len(), 3);
        assert!(!config.typescript);
        assert_eq!(config.directories, default_directories());
        assert_eq!(config.preloads, vec![PreloadEntry::new("./start/routes")]);
    }

    #[test]
    fn test_non_object_root() {
        let (config, errors) = RcConfig::from_value(json!([1, 2]));

        assert_eq!(errors.len(), 1);
        assert_eq!(config, RcConfig::default());
    }

    #[test]
    fn test_compile_mode_extensions() {
        assert_eq!(CompileMode::from_typescript(true), CompileMode::Source);
        assert_eq!(CompileMode::Compiled.extensions(), &["json"]);
        assert!(CompileMode::Source.extensions().contains(&"yaml"));
    }
}
