//! HTTP launch sequence: commit routes, optimize dispatch, build the
//! transport and start listening.

use super::{Router, RunningServer, Server, ServerFactory, TcpTransport, Transport, ROUTER_BINDING, SERVER_BINDING};
use crate::bootstrap::RunIntent;
use crate::config::{Env, DEFAULT_HOST, DEFAULT_PORT, HOST_KEY, PORT_KEY};
use crate::container::Container;
use crate::error::{IgnitorError, IgnitorResult};
use std::io;
use std::net::SocketAddr;

/// Resolve server and router from the container, finalize routing and build
/// the listening transport. `factory` replaces the default TCP transport.
pub fn create_http_server(
    container: &Container,
    intent: RunIntent,
    factory: Option<ServerFactory>,
) -> IgnitorResult<Box<dyn Transport>> {
    let server = container.make::<Server>(SERVER_BINDING)?;
    let router = container.make::<Router>(ROUTER_BINDING)?;

    let committed = router.commit()?;
    server.optimize();
    tracing::info!("Committed {} routes for {} intent", committed, intent);

    let handler = server.handler();
    let transport = match factory {
        Some(factory) => {
            tracing::debug!("Using custom server factory");
            factory(handler)
        }
        None => Box::new(TcpTransport::new(handler)) as Box<dyn Transport>,
    };

    Ok(transport)
}

/// Resolve the listen address from `HOST` and `PORT`
pub async fn resolve_listen_addr(env: &dyn Env) -> IgnitorResult<SocketAddr> {
    let host = env.get(HOST_KEY).unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = match env.get(PORT_KEY) {
        None => DEFAULT_PORT,
        Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
            IgnitorError::bind(
                format!("{}:{}", host, raw),
                io::Error::new(io::ErrorKind::InvalidInput, "PORT must be a number between 0 and 65535"),
            )
        })?,
    };

    let display = format!("{}:{}", host, port);
    let mut addrs = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|e| IgnitorError::bind(display.clone(), e))?;

    addrs.next().ok_or_else(|| {
        IgnitorError::bind(
            display,
            io::Error::new(io::ErrorKind::AddrNotAvailable, "host did not resolve to an address"),
        )
    })
}

/// Start listening; resolves once the transport accepts connections
pub async fn listen(transport: Box<dyn Transport>, env: &dyn Env) -> IgnitorResult<RunningServer> {
    let addr = resolve_listen_addr(env).await?;
    let server = transport
        .listen(addr)
        .await
        .map_err(|e| IgnitorError::bind(addr.to_string(), e))?;

    tracing::info!("Server listening on {}", server.local_addr());
    Ok(server)
}

/// Run the whole launch sequence
pub async fn launch(
    container: &Container,
    env: &dyn Env,
    intent: RunIntent,
    factory: Option<ServerFactory>,
) -> IgnitorResult<RunningServer> {
    let transport = create_http_server(container, intent, factory)?;
    listen(transport, env).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapEnv;
    use crate::http::HttpProvider;
    use crate::providers::ServiceProvider;

    #[tokio::test]
    async fn test_listen_addr_defaults() {
        let addr = resolve_listen_addr(&MapEnv::new()).await.unwrap();
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)));
    }

    #[tokio::test]
    async fn test_invalid_port_is_a_bind_error() {
        let env = MapEnv::new().with(PORT_KEY, "eighty");
        let error = resolve_listen_addr(&env).await.unwrap_err();
        assert!(error.is_bind());
    }

    #[tokio::test]
    async fn test_missing_server_binding_is_fatal() {
        let container = Container::default();
        let result = create_http_server(&container, RunIntent::Http, None);
        assert!(matches!(result, Err(IgnitorError::Container(_))));
    }

    #[tokio::test]
    async fn test_port_in_use_is_a_bind_error() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let container = Container::default();
        HttpProvider.register(&container).unwrap();
        let env = MapEnv::new()
            .with(HOST_KEY, "127.0.0.1")
            .with(PORT_KEY, port.to_string());

        let error = launch(&container, &env, RunIntent::Http, None).await.unwrap_err();
        assert!(error.is_bind());
    }
}
