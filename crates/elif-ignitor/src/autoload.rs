use crate::container::Container;
use crate::loader::resolve_relative;
use std::collections::BTreeMap;
use std::path::Path;

/// Tell the container which directory each autoload alias maps to.
///
/// Registrations are independent of each other; running this twice with the
/// same map leaves the container unchanged.
pub fn register_autoloads(container: &Container, app_root: &Path, autoloads: &BTreeMap<String, String>) {
    for (alias, relative) in autoloads {
        let directory = resolve_relative(app_root, relative);
        tracing::debug!("Autoloading '{}' from {}", alias, directory.display());
        container.autoload(directory, alias.clone());
    }
}
