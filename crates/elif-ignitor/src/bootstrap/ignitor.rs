//! The bootstrap orchestrator.

use super::{BootstrapPhase, BootstrapState, RunIntent};
use crate::autoload::register_autoloads;
use crate::config::{Env, ProcessEnv, RcConfig};
use crate::container::{bind_helpers, create_container};
use crate::error::{BootstrapFailure, IgnitorResult};
use crate::http::{create_http_server, listen, HttpProvider, ServerFactory, HTTP_PROVIDER};
use crate::loader::{AppLoader, Module};
use crate::preload::{run_preloads, PreloadReport};
use crate::providers::{bootstrap_providers, ProviderCatalog, ServiceProvider};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Start directory used when neither the caller nor the rc file names one
const DEFAULT_START_DIR: &str = "start";

/// Summary of a bootstrap run
#[derive(Debug, Clone, Default)]
pub struct BootstrapReport {
    /// Provider identifiers in registration order
    pub providers: Vec<String>,
    /// Autoload aliases registered with the container
    pub autoloads: Vec<String>,
    pub preloads: PreloadReport,
    pub address: Option<SocketAddr>,
    /// Time spent reaching each phase
    pub timings: Vec<(BootstrapPhase, Duration)>,
}

/// Takes an application root from disk to a listening HTTP server.
///
/// # Example
///
/// ```rust,no_run
/// use elif_ignitor::Ignitor;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mut ignitor = Ignitor::new("/srv/app")
///     .with_script("start/routes", |container| {
///         let router = container.make::<elif_ignitor::http::Router>("Route")?;
///         router.get("/", || async { "hello" });
///         Ok(())
///     });
///
/// let state = ignitor.fire_http_server(None).await?;
/// if let Some(server) = state.into_server() {
///     server.join().await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Ignitor {
    app_root: PathBuf,
    start_dir: Option<PathBuf>,
    loader: AppLoader,
    catalog: ProviderCatalog,
    env: Arc<dyn Env>,
    history: Vec<BootstrapPhase>,
    report: BootstrapReport,
}

impl Ignitor {
    /// Create an orchestrator for an application root.
    /// The catalog starts with the HTTP provider under `elif/http`.
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        let app_root = app_root.into();
        let catalog = ProviderCatalog::new().with(HTTP_PROVIDER, || HttpProvider);

        Self {
            loader: AppLoader::new(&app_root),
            app_root,
            start_dir: None,
            catalog,
            env: Arc::new(ProcessEnv),
            history: Vec::new(),
            report: BootstrapReport::default(),
        }
    }

    /// Override the directory holding the entry module
    pub fn with_start_dir(mut self, start_dir: impl Into<PathBuf>) -> Self {
        self.start_dir = Some(start_dir.into());
        self
    }

    /// Use a different environment for `HOST` and `PORT`
    pub fn with_env<E: Env + 'static>(mut self, env: E) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Make a provider available to the entry descriptor under `identifier`
    pub fn with_provider<F, P>(mut self, identifier: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> P + Send + Sync + 'static,
        P: ServiceProvider + 'static,
    {
        self.catalog.insert(identifier, factory);
        self
    }

    /// Register a startup script under an app-relative path such as `start/routes`
    pub fn with_script<F>(self, path: impl AsRef<Path>, script: F) -> Self
    where
        F: Fn(&crate::container::Container) -> Result<(), crate::error::BoxError> + Send + Sync + 'static,
    {
        self.loader.register_script(path, script);
        self
    }

    /// Register a data module under an app-relative path such as `start/app`
    pub fn with_module(self, path: impl AsRef<Path>, value: Value) -> Self {
        self.loader.register(path, Module::Data(value));
        self
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    pub fn loader(&self) -> &AppLoader {
        &self.loader
    }

    pub fn catalog_mut(&mut self) -> &mut ProviderCatalog {
        &mut self.catalog
    }

    /// Phases reached by the last run, ending in `Listening` or `Failed`
    pub fn phase_history(&self) -> &[BootstrapPhase] {
        &self.history
    }

    pub fn report(&self) -> &BootstrapReport {
        &self.report
    }

    /// Run every phase and start the HTTP server.
    ///
    /// `factory` replaces the default TCP transport. On failure the run stops
    /// at the failing phase and nothing is retried; calling this again starts
    /// over from `Unstarted`.
    pub async fn fire_http_server(
        &mut self,
        factory: Option<ServerFactory>,
    ) -> Result<BootstrapState, BootstrapFailure> {
        self.history = vec![BootstrapPhase::Unstarted];
        self.report = BootstrapReport::default();

        tracing::info!("Bootstrap: Igniting {} for http", self.app_root.display());

        match self.ignite(RunIntent::Http, factory).await {
            Ok(state) => Ok(state),
            Err(error) => {
                let reached = self.history.last().copied().unwrap_or(BootstrapPhase::Unstarted);
                self.history.push(BootstrapPhase::Failed);
                tracing::error!("Bootstrap: Failed after {}: {}", reached, error);
                Err(BootstrapFailure::new(reached, error))
            }
        }
    }

    async fn ignite(&mut self, intent: RunIntent, factory: Option<ServerFactory>) -> IgnitorResult<BootstrapState> {
        let state = BootstrapState::new(self.app_root.clone(), intent);

        let started = Instant::now();
        let rc = Arc::new(RcConfig::resolve(&self.app_root));
        let state = state.with_rc(Arc::clone(&rc));
        self.record(state.phase(), started);

        let started = Instant::now();
        let container = Arc::new(create_container(rc.typescript));
        let state = state.with_container(Arc::clone(&container));
        self.record(state.phase(), started);

        let started = Instant::now();
        bind_helpers(&container, &self.app_root, &rc.directories, &rc.raw);
        let state = state.helpers_bound();
        self.record(state.phase(), started);

        let started = Instant::now();
        let loader = self.loader.with_mode(rc.compile_mode());
        let start_dir = self
            .start_dir
            .clone()
            .or_else(|| rc.directory("start").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_START_DIR));
        let providers = bootstrap_providers(&container, &loader, &self.catalog, &self.app_root, &start_dir, intent).await?;
        self.report.providers = providers.registered;
        let state = state.providers_booted();
        self.record(state.phase(), started);

        let started = Instant::now();
        register_autoloads(&container, &self.app_root, &rc.autoloads);
        self.report.autoloads = rc.autoloads.keys().cloned().collect();
        let state = state.autoloads_registered();
        self.record(state.phase(), started);

        let started = Instant::now();
        self.report.preloads = run_preloads(&container, &loader, &rc.preloads, &self.app_root, intent)?;
        let state = state.preloads_run();
        self.record(state.phase(), started);

        let started = Instant::now();
        let transport = create_http_server(&container, intent, factory)?;
        let state = state.http_created();
        self.record(state.phase(), started);

        let started = Instant::now();
        let server = listen(transport, self.env.as_ref()).await?;
        self.report.address = Some(server.local_addr());
        let state = state.listening(server);
        self.record(state.phase(), started);

        Ok(state)
    }

    fn record(&mut self, phase: BootstrapPhase, started: Instant) {
        let elapsed = started.elapsed();
        tracing::info!("Bootstrap: {} in {:?}", phase, elapsed);
        self.history.push(phase);
        self.report.timings.push((phase, elapsed));
    }
}

impl std::fmt::Debug for Ignitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ignitor")
            .field("app_root", &self.app_root)
            .field("start_dir", &self.start_dir)
            .field("loader", &self.loader)
            .field("catalog", &self.catalog)
            .field("history", &self.history)
            .finish()
    }
}
