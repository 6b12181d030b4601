use crate::bootstrap::RunIntent;
use crate::config::PreloadEntry;
use crate::container::Container;
use crate::loader::{resolve_relative, LoadError, ModuleLoader};
use std::path::{Path, PathBuf};

/// Files handled by a preload run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadReport {
    /// Files loaded, in the order they ran
    pub loaded: Vec<PathBuf>,
    /// Optional files that did not exist
    pub skipped: Vec<PathBuf>,
    /// Entries excluded by their intent
    pub filtered: usize,
}

/// Load the preload entries that apply to `intent`, in declaration order.
///
/// A missing file is skipped only when its entry is optional. A file that
/// exists but fails to load, or a script that returns an error, always fails
/// the run.
pub fn run_preloads(
    container: &Container,
    loader: &dyn ModuleLoader,
    entries: &[PreloadEntry],
    app_root: &Path,
    intent: RunIntent,
) -> Result<PreloadReport, LoadError> {
    let mut report = PreloadReport::default();

    for entry in entries {
        if !entry.applies_to(intent) {
            report.filtered += 1;
            continue;
        }

        let path = resolve_relative(app_root, &entry.file);
        match loader.load_with(&path, entry.optional)? {
            Some(module) => {
                tracing::debug!("Preloading {}", entry.file.display());
                module.run(&entry.file, container)?;
                report.loaded.push(entry.file.clone());
            }
            None => {
                tracing::warn!("Skipping optional preload {}", entry.file.display());
                report.skipped.push(entry.file.clone());
            }
        }
    }

    Ok(report)
}
