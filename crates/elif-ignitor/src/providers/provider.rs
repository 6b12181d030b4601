use crate::container::{Container, ContainerError};
use async_trait::async_trait;

/// Provider error type
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Unknown provider '{name}'")]
    Unknown { name: String },

    #[error("Provider '{provider}' registration failed: {message}")]
    RegistrationFailed { provider: String, message: String },

    #[error("Provider '{provider}' boot failed: {message}")]
    BootFailed { provider: String, message: String },

    #[error("Container error: {0}")]
    Container(#[from] ContainerError),
}

impl ProviderError {
    pub fn registration_failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RegistrationFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn boot_failed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BootFailed {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// Service provider trait for registering bindings and running boot hooks
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    /// Provider name for identification in logs and errors
    fn name(&self) -> &str;

    /// Register bindings in the container.
    /// Providers registered earlier in the list have already run.
    fn register(&self, container: &Container) -> Result<(), ProviderError>;

    /// Boot the provider after every provider has registered
    async fn boot(&self, container: &Container) -> Result<(), ProviderError> {
        let _ = container;
        Ok(())
    }

    /// Provider description
    fn description(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConfigProvider;

    #[async_trait]
    impl ServiceProvider for ConfigProvider {
        fn name(&self) -> &str {
            "config"
        }

        fn register(&self, container: &Container) -> Result<(), ProviderError> {
            container.singleton("Elif/Src/Config", |_| Ok(42u16));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_boot_is_noop() {
        let container = Container::default();
        let provider = ConfigProvider;

        provider.register(&container).unwrap();
        provider.boot(&container).await.unwrap();

        assert_eq!(*container.make::<u16>("Elif/Src/Config").unwrap(), 42);
        assert!(provider.description().is_none());
    }

    #[test]
    fn test_error_messages_name_the_provider() {
        let error = ProviderError::boot_failed("database", "connection refused");
        assert_eq!(
            error.to_string(),
            "Provider 'database' boot failed: connection refused"
        );
    }
}
