use super::{Router, Server, ROUTER_ALIAS, ROUTER_BINDING, SERVER_ALIAS, SERVER_BINDING};
use crate::container::Container;
use crate::providers::{ProviderError, ServiceProvider};
use async_trait::async_trait;

/// Catalog identifier of [`HttpProvider`]
pub const HTTP_PROVIDER: &str = "elif/http";

/// Binds the application [`Router`] and the [`Server`] dispatching through it
#[derive(Debug, Default)]
pub struct HttpProvider;

#[async_trait]
impl ServiceProvider for HttpProvider {
    fn name(&self) -> &str {
        HTTP_PROVIDER
    }

    fn register(&self, container: &Container) -> Result<(), ProviderError> {
        container.singleton(ROUTER_BINDING, |_| Ok(Router::new()));
        container.alias(ROUTER_BINDING, ROUTER_ALIAS);

        container.singleton(SERVER_BINDING, |c| Ok(Server::new(c.make::<Router>(ROUTER_BINDING)?)));
        container.alias(SERVER_BINDING, SERVER_ALIAS);

        Ok(())
    }

    fn description(&self) -> Option<&str> {
        Some("HTTP router and server bindings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_server_shares_the_bound_router() {
        let container = Container::default();
        HttpProvider.register(&container).unwrap();

        let router = container.make::<Router>(ROUTER_ALIAS).unwrap();
        let server = container.make::<Server>(SERVER_ALIAS).unwrap();

        assert!(Arc::ptr_eq(&router, server.router()));
    }
}
