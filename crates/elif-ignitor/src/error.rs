use crate::bootstrap::BootstrapPhase;
use crate::container::ContainerError;
use crate::http::HttpError;
use crate::loader::LoadError;
use crate::providers::ProviderError;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed error used for script and provider hook failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the bootstrap sequence.
///
/// Rc-configuration problems never appear here: they are recovered as
/// [`crate::config::ConfigError`]s and logged while the rc file is resolved.
#[derive(Debug, Error)]
pub enum IgnitorError {
    #[error("Missing export '{export}'. Make sure to export it from {}", .path.display())]
    MissingExport { export: String, path: PathBuf },

    #[error("Invalid export '{export}' in {}: expected {expected}", .path.display())]
    InvalidExport {
        export: String,
        path: PathBuf,
        expected: String,
    },

    #[error("Module load error: {0}")]
    ModuleLoad(#[from] LoadError),

    #[error("Provider error: {0}")]
    ProviderBoot(#[from] ProviderError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),

    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),
}

impl IgnitorError {
    /// Create a missing export error
    pub fn missing_export(export: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingExport {
            export: export.into(),
            path: path.into(),
        }
    }

    /// Create an invalid export error
    pub fn invalid_export(
        export: impl Into<String>,
        path: impl Into<PathBuf>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidExport {
            export: export.into(),
            path: path.into(),
            expected: expected.into(),
        }
    }

    /// Create a bind error
    pub fn bind(addr: impl Into<String>, source: std::io::Error) -> Self {
        Self::Bind {
            addr: addr.into(),
            source,
        }
    }

    /// Check if the error is a missing export error
    pub fn is_missing_export(&self) -> bool {
        matches!(self, Self::MissingExport { .. })
    }

    /// Check if the error is a module load error
    pub fn is_module_load(&self) -> bool {
        matches!(self, Self::ModuleLoad(_))
    }

    /// Check if the error is a provider error
    pub fn is_provider(&self) -> bool {
        matches!(self, Self::ProviderBoot(_))
    }

    /// Check if the error is a bind error
    pub fn is_bind(&self) -> bool {
        matches!(self, Self::Bind { .. })
    }
}

/// Result type for bootstrap operations
pub type IgnitorResult<T> = Result<T, IgnitorError>;

/// A bootstrap that stopped before reaching `Listening`
#[derive(Debug, Error)]
#[error("Bootstrap failed after reaching {reached}: {error}")]
pub struct BootstrapFailure {
    /// Last phase completed before the failure
    pub reached: BootstrapPhase,
    #[source]
    pub error: IgnitorError,
}

impl BootstrapFailure {
    pub fn new(reached: BootstrapPhase, error: IgnitorError) -> Self {
        Self { reached, error }
    }
}
