//! Module loading with optional-miss semantics.
//!
//! A lookup ends in one of three ways: the module was found, nothing exists
//! at the path, or something exists but could not be loaded. Only the second
//! outcome may be tolerated by callers that opt in.

use crate::config::CompileMode;
use crate::container::Container;
use crate::error::BoxError;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// In-process startup script; the stand-in for executing a file on load
pub type ScriptFn = dyn Fn(&Container) -> Result<(), BoxError> + Send + Sync;

/// Module loading error type
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cannot find module {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("Unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Module {} failed during initialization: {source}", .path.display())]
    Script {
        path: PathBuf,
        #[source]
        source: BoxError,
    },
}

impl LoadError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A loaded module
#[derive(Clone)]
pub enum Module {
    /// Parsed JSON or YAML document
    Data(Value),
    /// Registered startup script
    Script(Arc<ScriptFn>),
}

impl Module {
    /// Data of the module, if it is a document
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Module::Data(value) => Some(value),
            Module::Script(_) => None,
        }
    }

    /// Execute the module against the container. Documents have no side effects.
    pub fn run(&self, path: &Path, container: &Container) -> Result<(), LoadError> {
        match self {
            Module::Data(_) => Ok(()),
            Module::Script(script) => script(container).map_err(|source| LoadError::Script {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Module::Data(value) => f.debug_tuple("Data").field(value).finish(),
            Module::Script(_) => f.debug_tuple("Script").field(&"<script>").finish(),
        }
    }
}

/// Outcome of a single lookup
#[derive(Debug)]
pub enum LoadOutcome {
    Found(Module),
    NotFound,
    Failed(LoadError),
}

/// Module loader adapter
pub trait ModuleLoader: Send + Sync {
    /// Look up a module without applying any policy
    fn load(&self, path: &Path) -> LoadOutcome;

    /// Load a module that must exist
    fn load_required(&self, path: &Path) -> Result<Module, LoadError> {
        match self.load(path) {
            LoadOutcome::Found(module) => Ok(module),
            LoadOutcome::NotFound => Err(LoadError::NotFound {
                path: path.to_path_buf(),
            }),
            LoadOutcome::Failed(error) => Err(error),
        }
    }

    /// Load a module, tolerating a missing file when `optional` is set.
    ///
    /// Broken modules are errors either way.
    fn load_with(&self, path: &Path, optional: bool) -> Result<Option<Module>, LoadError> {
        match self.load(path) {
            LoadOutcome::Found(module) => Ok(Some(module)),
            LoadOutcome::NotFound if optional => Ok(None),
            LoadOutcome::NotFound => Err(LoadError::NotFound {
                path: path.to_path_buf(),
            }),
            LoadOutcome::Failed(error) => Err(error),
        }
    }
}

/// Loader for an application root.
///
/// Modules registered in code are looked up first by their app-relative path
/// without extension (`start/routes`), then the filesystem is consulted using
/// the extensions allowed by the compile mode.
#[derive(Clone)]
pub struct AppLoader {
    app_root: PathBuf,
    mode: CompileMode,
    modules: Arc<RwLock<HashMap<String, Module>>>,
}

impl AppLoader {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self {
            app_root: app_root.into(),
            mode: CompileMode::default(),
            modules: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Loader sharing the same module table under a different compile mode
    pub fn with_mode(&self, mode: CompileMode) -> Self {
        Self {
            app_root: self.app_root.clone(),
            mode,
            modules: Arc::clone(&self.modules),
        }
    }

    pub fn mode(&self) -> CompileMode {
        self.mode
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    /// Register a module in code under an app-relative path
    pub fn register(&self, path: impl AsRef<Path>, module: Module) {
        let key = self.module_key(path.as_ref());
        tracing::debug!("Registering module '{}'", key);
        self.modules
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, module);
    }

    /// Register a startup script under an app-relative path
    pub fn register_script<F>(&self, path: impl AsRef<Path>, script: F)
    where
        F: Fn(&Container) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.register(path, Module::Script(Arc::new(script)));
    }

    /// Register a data module under an app-relative path
    pub fn register_data(&self, path: impl AsRef<Path>, value: Value) {
        self.register(path, Module::Data(value));
    }

    /// Normalized table key: relative to the app root, `/`-separated, no extension
    fn module_key(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.app_root).unwrap_or(path);
        let mut parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        if let Some(last) = parts.last_mut() {
            if let Some((stem, ext)) = last.rsplit_once('.') {
                if !stem.is_empty() && is_module_extension(ext) {
                    *last = stem.to_string();
                }
            }
        }

        parts.join("/")
    }

    /// Filesystem path for a lookup. Paths already under the app root are
    /// used as given, including when the root itself is relative.
    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || path.starts_with(&self.app_root) {
            path.to_path_buf()
        } else {
            resolve_relative(&self.app_root, path)
        }
    }

    /// Files that may satisfy a lookup, in resolution order
    fn candidates(&self, path: &Path) -> Vec<PathBuf> {
        let absolute = self.absolute(path);
        let mut candidates = Vec::new();

        if absolute.extension().is_some() {
            candidates.push(absolute.clone());
        }

        for ext in self.mode.extensions() {
            let mut file = absolute.clone().into_os_string();
            file.push(".");
            file.push(ext);
            candidates.push(PathBuf::from(file));
        }

        candidates
    }

    fn read_file(&self, file: &Path) -> LoadOutcome {
        let contents = match std::fs::read_to_string(file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LoadOutcome::NotFound,
            Err(source) => {
                return LoadOutcome::Failed(LoadError::Io {
                    path: file.to_path_buf(),
                    source,
                })
            }
        };

        let parsed = match file.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str::<Value>(&contents).map_err(|e| e.to_string()),
            Some("yaml") | Some("yml") => serde_yaml::from_str::<Value>(&contents).map_err(|e| e.to_string()),
            _ => Ok(Value::String(contents)),
        };

        match parsed {
            Ok(value) => LoadOutcome::Found(Module::Data(value)),
            Err(message) => LoadOutcome::Failed(LoadError::Parse {
                path: file.to_path_buf(),
                message,
            }),
        }
    }
}

impl ModuleLoader for AppLoader {
    fn load(&self, path: &Path) -> LoadOutcome {
        let key = self.module_key(path);
        let registered = self
            .modules
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&key)
            .cloned();
        if let Some(module) = registered {
            tracing::debug!("Loaded registered module '{}'", key);
            return LoadOutcome::Found(module);
        }

        for candidate in self.candidates(path) {
            if !candidate.is_file() {
                continue;
            }
            tracing::debug!("Loading module from {}", candidate.display());
            match self.read_file(&candidate) {
                LoadOutcome::NotFound => continue,
                outcome => return outcome,
            }
        }

        LoadOutcome::NotFound
    }
}

impl std::fmt::Debug for AppLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let module_count = self.modules.read().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("AppLoader")
            .field("app_root", &self.app_root)
            .field("mode", &self.mode)
            .field("module_count", &module_count)
            .finish()
    }
}

fn is_module_extension(ext: &str) -> bool {
    matches!(ext, "json" | "yaml" | "yml")
}

/// Join an rc-style relative path (`./app`, `start/routes`) onto a root
pub fn resolve_relative(root: &Path, relative: impl AsRef<Path>) -> PathBuf {
    let mut resolved = root.to_path_buf();
    for component in relative.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(part) => resolved.push(part),
            Component::RootDir | Component::Prefix(_) => {
                resolved = PathBuf::from(component.as_os_str());
            }
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_resolve_relative() {
        let root = Path::new("/srv/app");

        assert_eq!(resolve_relative(root, "./app"), PathBuf::from("/srv/app/app"));
        assert_eq!(resolve_relative(root, "start/routes"), PathBuf::from("/srv/app/start/routes"));
        assert_eq!(resolve_relative(root, "../shared"), PathBuf::from("/srv/shared"));
    }

    #[test]
    fn test_relative_root_is_not_prefixed_twice() {
        let loader = AppLoader::new("proj");

        assert_eq!(
            loader.candidates(Path::new("proj/start/app")),
            vec![PathBuf::from("proj/start/app.json")]
        );
        assert_eq!(
            loader.candidates(Path::new("start/app")),
            vec![PathBuf::from("proj/start/app.json")]
        );
    }

    #[test]
    fn test_registered_modules_take_precedence() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("start")).unwrap();
        fs::write(dir.path().join("start/app.json"), r#"{"from": "disk"}"#).unwrap();

        let loader = AppLoader::new(dir.path());
        loader.register_data("./start/app", json!({ "from": "code" }));

        let module = loader.load_required(&dir.path().join("start/app")).unwrap();
        assert_eq!(module.as_data(), Some(&json!({ "from": "code" })));
    }

    #[test]
    fn test_missing_module_policy() {
        let dir = tempfile::tempdir().unwrap();
        let loader = AppLoader::new(dir.path());
        let path = dir.path().join("start/missing");

        assert!(matches!(loader.load(&path), LoadOutcome::NotFound));
        assert!(loader.load_with(&path, true).unwrap().is_none());
        assert!(loader.load_with(&path, false).unwrap_err().is_not_found());
    }

    #[test]
    fn test_broken_module_fails_even_when_optional() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("kernel.json"), "{ not json").unwrap();
        let loader = AppLoader::new(dir.path());

        let error = loader.load_with(&dir.path().join("kernel"), true).unwrap_err();
        assert!(matches!(error, LoadError::Parse { .. }));
    }

    #[test]
    fn test_yaml_only_resolves_in_source_mode() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.yaml"), "providers: []\n").unwrap();
        let compiled = AppLoader::new(dir.path());
        let source = compiled.with_mode(CompileMode::Source);
        let path = dir.path().join("app");

        assert!(matches!(compiled.load(&path), LoadOutcome::NotFound));
        match source.load(&path) {
            LoadOutcome::Found(module) => {
                assert_eq!(module.as_data(), Some(&json!({ "providers": [] })));
            }
            other => panic!("expected module, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_extension_resolves_in_any_mode() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.yml"), "a: 1\n").unwrap();
        let loader = AppLoader::new(dir.path());

        let module = loader.load_required(&dir.path().join("notes.yml")).unwrap();
        assert_eq!(module.as_data(), Some(&json!({ "a": 1 })));
    }

    #[test]
    fn test_failing_script_reports_path() {
        let loader = AppLoader::new("/srv/app");
        loader.register_script("start/kernel", |_| Err("kernel exploded".into()));

        let module = loader.load_required(Path::new("/srv/app/start/kernel")).unwrap();
        let container = Container::new(CompileMode::Compiled);
        let error = module.run(Path::new("start/kernel"), &container).unwrap_err();

        assert!(error.to_string().contains("kernel exploded"));
        assert!(matches!(error, LoadError::Script { .. }));
    }
}
