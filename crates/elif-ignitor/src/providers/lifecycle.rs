use crate::bootstrap::RunIntent;
use crate::container::Container;
use crate::error::IgnitorResult;
use crate::loader::ModuleLoader;
use crate::providers::{AppDescriptor, ProviderCatalog, ProviderLifecycleStats, Registrar};
use std::path::Path;
use std::time::Instant;

/// Name of the entry module inside the start directory
pub const APP_ENTRY: &str = "app";

/// What the provider phase did
#[derive(Debug, Clone, Default)]
pub struct ProviderReport {
    /// Provider identifiers in registration order
    pub registered: Vec<String>,
    pub aliases: Vec<(String, String)>,
    pub stats: ProviderLifecycleStats,
}

/// Load the entry descriptor, then register, alias and boot the providers
/// that apply to `intent`.
///
/// User aliases are applied after registration so they win over aliases the
/// providers set up for themselves. Any failure aborts the phase; providers
/// already booted are not rolled back.
pub async fn bootstrap_providers(
    container: &Container,
    loader: &dyn ModuleLoader,
    catalog: &ProviderCatalog,
    app_root: &Path,
    start_dir: &Path,
    intent: RunIntent,
) -> IgnitorResult<ProviderReport> {
    let started = Instant::now();
    let entry = app_root.join(start_dir).join(APP_ENTRY);

    let module = loader.load_required(&entry)?;
    let descriptor = AppDescriptor::from_module(&module, &entry)?;
    let identifiers = descriptor.providers_for(intent);

    tracing::info!(
        "Registering {} providers for {} intent",
        identifiers.len(),
        intent
    );

    let mut registrar = Registrar::new(container, catalog);
    let instances = registrar.use_providers(&identifiers)?.register()?;

    for (alias, name) in &descriptor.aliases {
        tracing::debug!("Aliasing '{}' to '{}'", alias, name);
        container.alias(name.clone(), alias.clone());
    }

    registrar.boot(&instances).await?;

    let stats = registrar.stats().clone();
    tracing::info!(
        "Providers booted in {:?} ({} registered)",
        started.elapsed(),
        stats.provider_count
    );

    Ok(ProviderReport {
        registered: identifiers,
        aliases: descriptor.aliases.into_iter().collect(),
        stats,
    })
}
