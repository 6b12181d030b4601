use super::HttpHandler;
use async_trait::async_trait;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Listening transport built around an [`HttpHandler`]
#[async_trait]
pub trait Transport: Send {
    /// Start accepting connections on `addr`.
    /// Resolves once the transport is bound and accepting.
    async fn listen(self: Box<Self>, addr: SocketAddr) -> io::Result<RunningServer>;
}

/// Replaces the default transport; receives the server's request handler
pub type ServerFactory = Box<dyn FnOnce(HttpHandler) -> Box<dyn Transport> + Send>;

/// Default transport: a TCP listener served by axum
pub struct TcpTransport {
    handler: HttpHandler,
}

impl TcpTransport {
    pub fn new(handler: HttpHandler) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn listen(self: Box<Self>, addr: SocketAddr) -> io::Result<RunningServer> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let handler = self.handler;

        let task = tokio::spawn(async move { axum::serve(listener, handler.into_make_service()).await });

        Ok(RunningServer::new(local_addr, task))
    }
}

/// Handle to a transport that is accepting connections
#[derive(Debug)]
pub struct RunningServer {
    local_addr: SocketAddr,
    task: JoinHandle<io::Result<()>>,
}

impl RunningServer {
    pub fn new(local_addr: SocketAddr, task: JoinHandle<io::Result<()>>) -> Self {
        Self { local_addr, task }
    }

    /// Address the transport is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the transport to stop serving
    pub async fn join(self) -> io::Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }
}
