use crate::config::RcConfig;
use crate::container::Container;
use crate::http::RunningServer;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Which bootstrap variant is running. Fixed for one bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunIntent {
    /// HTTP server
    Http,
    /// Command shell
    Ace,
}

impl RunIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunIntent::Http => "http",
            RunIntent::Ace => "ace",
        }
    }
}

impl std::fmt::Display for RunIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(RunIntent::Http),
            "ace" => Ok(RunIntent::Ace),
            other => Err(format!("unknown run intent '{}'", other)),
        }
    }
}

/// Bootstrap phases, in the only order they can be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BootstrapPhase {
    Unstarted,
    RcLoaded,
    ContainerReady,
    HelpersBound,
    ProvidersBooted,
    AutoloadsRegistered,
    PreloadsRun,
    HttpCreated,
    Listening,
    Failed,
}

impl BootstrapPhase {
    /// The phase that follows on success
    pub fn next(self) -> Option<Self> {
        use BootstrapPhase::*;
        match self {
            Unstarted => Some(RcLoaded),
            RcLoaded => Some(ContainerReady),
            ContainerReady => Some(HelpersBound),
            HelpersBound => Some(ProvidersBooted),
            ProvidersBooted => Some(AutoloadsRegistered),
            AutoloadsRegistered => Some(PreloadsRun),
            PreloadsRun => Some(HttpCreated),
            HttpCreated => Some(Listening),
            Listening | Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BootstrapPhase::Listening | BootstrapPhase::Failed)
    }
}

impl std::fmt::Display for BootstrapPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase = match self {
            BootstrapPhase::Unstarted => "UNSTARTED",
            BootstrapPhase::RcLoaded => "RC_LOADED",
            BootstrapPhase::ContainerReady => "CONTAINER_READY",
            BootstrapPhase::HelpersBound => "HELPERS_BOUND",
            BootstrapPhase::ProvidersBooted => "PROVIDERS_BOOTED",
            BootstrapPhase::AutoloadsRegistered => "AUTOLOADS_REGISTERED",
            BootstrapPhase::PreloadsRun => "PRELOADS_RUN",
            BootstrapPhase::HttpCreated => "HTTP_CREATED",
            BootstrapPhase::Listening => "LISTENING",
            BootstrapPhase::Failed => "FAILED",
        };
        f.write_str(phase)
    }
}

/// Bootstrap state threaded through the phases.
///
/// Each transition consumes the state and returns the next one; fields are
/// only populated by the phase that produces them.
#[derive(Debug)]
pub struct BootstrapState {
    phase: BootstrapPhase,
    app_root: PathBuf,
    intent: RunIntent,
    rc: Option<Arc<RcConfig>>,
    container: Option<Arc<Container>>,
    server: Option<RunningServer>,
}

impl BootstrapState {
    pub fn new(app_root: impl Into<PathBuf>, intent: RunIntent) -> Self {
        Self {
            phase: BootstrapPhase::Unstarted,
            app_root: app_root.into(),
            intent,
            rc: None,
            container: None,
            server: None,
        }
    }

    fn advance(mut self, to: BootstrapPhase) -> Self {
        debug_assert_eq!(self.phase.next(), Some(to), "out of order bootstrap transition");
        self.phase = to;
        self
    }

    pub fn with_rc(mut self, rc: Arc<RcConfig>) -> Self {
        self.rc = Some(rc);
        self.advance(BootstrapPhase::RcLoaded)
    }

    pub fn with_container(mut self, container: Arc<Container>) -> Self {
        self.container = Some(container);
        self.advance(BootstrapPhase::ContainerReady)
    }

    pub fn helpers_bound(self) -> Self {
        self.advance(BootstrapPhase::HelpersBound)
    }

    pub fn providers_booted(self) -> Self {
        self.advance(BootstrapPhase::ProvidersBooted)
    }

    pub fn autoloads_registered(self) -> Self {
        self.advance(BootstrapPhase::AutoloadsRegistered)
    }

    pub fn preloads_run(self) -> Self {
        self.advance(BootstrapPhase::PreloadsRun)
    }

    pub fn http_created(self) -> Self {
        self.advance(BootstrapPhase::HttpCreated)
    }

    pub fn listening(mut self, server: RunningServer) -> Self {
        self.server = Some(server);
        self.advance(BootstrapPhase::Listening)
    }

    pub fn phase(&self) -> BootstrapPhase {
        self.phase
    }

    pub fn app_root(&self) -> &Path {
        &self.app_root
    }

    pub fn intent(&self) -> RunIntent {
        self.intent
    }

    pub fn rc(&self) -> Option<&Arc<RcConfig>> {
        self.rc.as_ref()
    }

    pub fn container(&self) -> Option<&Arc<Container>> {
        self.container.as_ref()
    }

    pub fn server(&self) -> Option<&RunningServer> {
        self.server.as_ref()
    }

    /// Take the running server out of the state
    pub fn into_server(self) -> Option<RunningServer> {
        self.server
    }
}
