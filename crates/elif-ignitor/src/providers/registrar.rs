use crate::container::Container;
use crate::providers::{ProviderError, ServiceProvider};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Constructs a provider instance
pub type ProviderFactory = Arc<dyn Fn() -> Arc<dyn ServiceProvider> + Send + Sync>;

/// Maps provider identifiers, as listed by the application, to factories
#[derive(Clone, Default)]
pub struct ProviderCatalog {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a provider factory under an identifier
    pub fn insert<F, P>(&mut self, identifier: impl Into<String>, factory: F)
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: ServiceProvider + 'static,
    {
        self.factories.insert(
            identifier.into(),
            Arc::new(move || Arc::new(factory()) as Arc<dyn ServiceProvider>),
        );
    }

    /// Builder form of [`ProviderCatalog::insert`]
    pub fn with<F, P>(mut self, identifier: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: ServiceProvider + 'static,
    {
        self.insert(identifier, factory);
        self
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(identifier)
    }

    /// Instantiate the provider behind an identifier
    pub fn instantiate(&self, identifier: &str) -> Result<Arc<dyn ServiceProvider>, ProviderError> {
        self.factories
            .get(identifier)
            .map(|factory| factory())
            .ok_or_else(|| ProviderError::Unknown {
                name: identifier.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ProviderCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut identifiers: Vec<&String> = self.factories.keys().collect();
        identifiers.sort();
        f.debug_struct("ProviderCatalog")
            .field("identifiers", &identifiers)
            .finish()
    }
}

/// Statistics for provider registration and boot
#[derive(Debug, Clone, Default)]
pub struct ProviderLifecycleStats {
    pub provider_count: usize,
    pub registration_time: Duration,
    pub boot_time: Duration,
}

/// Registers and boots an ordered list of providers against a container.
///
/// Order is part of the contract: providers register in list order and boot
/// one after another in that same order. Duplicates in the list are kept.
pub struct Registrar<'a> {
    container: &'a Container,
    catalog: &'a ProviderCatalog,
    providers: Vec<Arc<dyn ServiceProvider>>,
    stats: ProviderLifecycleStats,
}

impl<'a> Registrar<'a> {
    pub fn new(container: &'a Container, catalog: &'a ProviderCatalog) -> Self {
        Self {
            container,
            catalog,
            providers: Vec::new(),
            stats: ProviderLifecycleStats::default(),
        }
    }

    /// Instantiate the providers to register, in order
    pub fn use_providers(&mut self, identifiers: &[String]) -> Result<&mut Self, ProviderError> {
        self.providers = identifiers
            .iter()
            .map(|identifier| self.catalog.instantiate(identifier))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self)
    }

    /// Run every provider's registration hook and return the registered instances
    pub fn register(&mut self) -> Result<Vec<Arc<dyn ServiceProvider>>, ProviderError> {
        let start = Instant::now();

        for provider in &self.providers {
            tracing::debug!("Registering provider: {}", provider.name());
            provider.register(self.container).map_err(|e| match e {
                ProviderError::RegistrationFailed { .. } => e,
                other => ProviderError::registration_failed(provider.name(), other.to_string()),
            })?;
        }

        self.stats.registration_time = start.elapsed();
        self.stats.provider_count = self.providers.len();
        Ok(self.providers.clone())
    }

    /// Boot the registered instances sequentially
    pub async fn boot(&mut self, instances: &[Arc<dyn ServiceProvider>]) -> Result<(), ProviderError> {
        let start = Instant::now();

        for provider in instances {
            tracing::debug!("Booting provider: {}", provider.name());
            provider.boot(self.container).await.map_err(|e| match e {
                ProviderError::BootFailed { .. } => e,
                other => ProviderError::boot_failed(provider.name(), other.to_string()),
            })?;
        }

        self.stats.boot_time = start.elapsed();
        Ok(())
    }

    pub fn stats(&self) -> &ProviderLifecycleStats {
        &self.stats
    }
}
