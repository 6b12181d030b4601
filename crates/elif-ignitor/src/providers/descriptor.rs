use crate::bootstrap::RunIntent;
use crate::error::{IgnitorError, IgnitorResult};
use crate::loader::Module;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

const PROVIDERS: &str = "providers";
const ACE_PROVIDERS: &str = "aceProviders";
const COMMANDS: &str = "commands";
const ALIASES: &str = "aliases";

/// Exports of the application entry module (`<start>/app`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppDescriptor {
    pub providers: Vec<String>,
    pub ace_providers: Vec<String>,
    pub commands: Vec<String>,
    /// Alias to binding name; applied after every provider has registered
    pub aliases: BTreeMap<String, String>,
}

impl AppDescriptor {
    /// Read the descriptor from a loaded entry module.
    ///
    /// `providers`, `aceProviders` and `commands` must be present and truthy;
    /// they are checked in that order and the first miss is reported.
    pub fn from_module(module: &Module, path: &Path) -> IgnitorResult<Self> {
        let exports = match module.as_data() {
            Some(Value::Object(exports)) => exports,
            _ => return Err(IgnitorError::missing_export(PROVIDERS, path)),
        };

        for export in [PROVIDERS, ACE_PROVIDERS, COMMANDS] {
            if !exports.get(export).map(is_truthy).unwrap_or(false) {
                return Err(IgnitorError::missing_export(export, path));
            }
        }

        Ok(Self {
            providers: string_list(exports, PROVIDERS, path)?,
            ace_providers: string_list(exports, ACE_PROVIDERS, path)?,
            commands: string_list(exports, COMMANDS, path)?,
            aliases: alias_map(exports, path)?,
        })
    }

    /// Providers to register for a run intent.
    ///
    /// HTTP runs get `providers`; ace runs get `providers` followed by
    /// `aceProviders`, without de-duplication.
    pub fn providers_for(&self, intent: RunIntent) -> Vec<String> {
        match intent {
            RunIntent::Http => self.providers.clone(),
            RunIntent::Ace => self
                .providers
                .iter()
                .chain(self.ace_providers.iter())
                .cloned()
                .collect(),
        }
    }
}

/// Truthiness of an exported value, as the entry module sees it
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn string_list(exports: &Map<String, Value>, export: &str, path: &Path) -> IgnitorResult<Vec<String>> {
    exports
        .get(export)
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| IgnitorError::invalid_export(export, path, "list of identifier strings"))
}

fn alias_map(exports: &Map<String, Value>, path: &Path) -> IgnitorResult<BTreeMap<String, String>> {
    match exports.get(ALIASES) {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(aliases)) => aliases
            .iter()
            .map(|(alias, target)| {
                target
                    .as_str()
                    .map(|target| (alias.clone(), target.to_string()))
                    .ok_or_else(|| IgnitorError::invalid_export(ALIASES, path, "map of alias to binding name"))
            })
            .collect(),
        Some(_) => Err(IgnitorError::invalid_export(ALIASES, path, "map of alias to binding name")),
    }
}
