//! The Helpers service: a read-only view over the application layout.

use crate::config::CompileMode;
use crate::container::Container;
use crate::loader::resolve_relative;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Canonical binding name of [`Helpers`]
pub const HELPERS_BINDING: &str = "Elif/Src/Helpers";

/// Short alias of [`Helpers`]
pub const HELPERS_ALIAS: &str = "Helpers";

/// Resolved application root, directory layout and rc document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Helpers {
    app_root: PathBuf,
    directories: BTreeMap<String, String>,
    rc: Value,
}

impl Helpers {
    pub fn new(app_root: impl Into<PathBuf>, directories: BTreeMap<String, String>) -> Self {
        Self {
            app_root: app_root.into(),
            directories,
            rc: Value::Object(Map::new()),
        }
    }

    /// Attach the rc document as read from disk
    pub fn with_rc(mut self, rc: Value) -> Self {
        self.rc = rc;
        self
    }

    /// The rc document, including keys the bootstrapper does not interpret
    pub fn rc(&self) -> &Value {
        &self.rc
    }

    /// Top-level rc key
    pub fn rc_value(&self, key: &str) -> Option<&Value> {
        self.rc.get(key)
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    pub fn directories(&self) -> &BTreeMap<String, String> {
        &self.directories
    }

    /// Absolute path of a directory identifier
    pub fn directory(&self, identifier: &str) -> Option<PathBuf> {
        self.directories
            .get(identifier)
            .map(|relative| resolve_relative(&self.app_root, relative))
    }

    /// Path inside a directory identifier, falling back to the identifier name
    /// itself when it is not part of the layout
    fn directory_path(&self, identifier: &str, paths: &[&str]) -> PathBuf {
        let mut path = self
            .directory(identifier)
            .unwrap_or_else(|| self.app_root.join(identifier));
        for segment in paths {
            path = resolve_relative(&path, segment);
        }
        path
    }

    pub fn make_path(&self, paths: &[&str]) -> PathBuf {
        paths
            .iter()
            .fold(self.app_root.clone(), |path, segment| resolve_relative(&path, segment))
    }

    pub fn config_path(&self, paths: &[&str]) -> PathBuf {
        self.directory_path("config", paths)
    }

    pub fn public_path(&self, paths: &[&str]) -> PathBuf {
        self.directory_path("public", paths)
    }

    pub fn database_path(&self, paths: &[&str]) -> PathBuf {
        self.directory_path("database", paths)
    }

    pub fn migrations_path(&self, paths: &[&str]) -> PathBuf {
        self.directory_path("migrations", paths)
    }

    pub fn seeds_path(&self, paths: &[&str]) -> PathBuf {
        self.directory_path("seeds", paths)
    }

    pub fn resources_path(&self, paths: &[&str]) -> PathBuf {
        self.directory_path("resources", paths)
    }

    pub fn views_path(&self, paths: &[&str]) -> PathBuf {
        self.directory_path("views", paths)
    }

    pub fn tmp_path(&self, paths: &[&str]) -> PathBuf {
        self.directory_path("tmp", paths)
    }

    pub fn start_path(&self, paths: &[&str]) -> PathBuf {
        self.directory_path("start", paths)
    }
}

/// Construct a fresh container for the resolved compile mode
pub fn create_container(typescript: bool) -> Container {
    let mode = CompileMode::from_typescript(typescript);
    tracing::debug!("Creating container in {:?} mode", mode);
    Container::new(mode)
}

/// Bind [`Helpers`] as a singleton under its canonical name and short alias
pub fn bind_helpers(container: &Container, app_root: &Path, directories: &BTreeMap<String, String>, rc: &Value) {
    let helpers = Helpers::new(app_root, directories.clone()).with_rc(rc.clone());
    container.singleton(HELPERS_BINDING, move |_| Ok(helpers.clone()));
    container.alias(HELPERS_BINDING, HELPERS_ALIAS);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_directories;

    fn helpers() -> Helpers {
        let mut directories = default_directories();
        directories.insert("views".to_string(), "./templates".to_string());
        Helpers::new("/srv/app", directories)
    }

    #[test]
    fn test_directory_paths() {
        let helpers = helpers();

        assert_eq!(helpers.config_path(&["app.json"]), PathBuf::from("/srv/app/config/app.json"));
        assert_eq!(
            helpers.migrations_path(&[]),
            PathBuf::from("/srv/app/database/migrations")
        );
        assert_eq!(
            helpers.views_path(&["welcome.edge"]),
            PathBuf::from("/srv/app/templates/welcome.edge")
        );
        assert_eq!(helpers.make_path(&["storage", "logs"]), PathBuf::from("/srv/app/storage/logs"));
        assert_eq!(helpers.directory("unknown"), None);
    }

    #[test]
    fn test_bind_helpers_under_name_and_alias() {
        let container = create_container(true);
        let rc = serde_json::json!({ "http": { "trustProxy": true } });
        bind_helpers(&container, Path::new("/srv/app"), &default_directories(), &rc);

        let by_name = container.make::<Helpers>(HELPERS_BINDING).unwrap();
        let by_alias = container.make::<Helpers>(HELPERS_ALIAS).unwrap();

        assert!(std::sync::Arc::ptr_eq(&by_name, &by_alias));
        assert_eq!(by_name.app_root(), Path::new("/srv/app"));
        assert_eq!(container.compile_mode(), CompileMode::Source);
        assert_eq!(by_alias.rc_value("http"), Some(&serde_json::json!({ "trustProxy": true })));
        assert_eq!(by_alias.rc_value("missing"), None);
    }
}
