use super::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Canonical binding name of [`Server`]
pub const SERVER_BINDING: &str = "Elif/Src/Server";

/// Short alias of [`Server`]
pub const SERVER_ALIAS: &str = "Server";

/// Standalone request handler handed to a transport
pub type HttpHandler = axum::Router;

/// HTTP server dispatching requests through the application router
pub struct Server {
    router: Arc<Router>,
    dispatch: Mutex<Option<HttpHandler>>,
}

impl Server {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            dispatch: Mutex::new(None),
        }
    }

    /// Cache the router's committed store as the dispatch path.
    ///
    /// Routes committed afterwards are not visible through [`Server::handler`]
    /// until `optimize` runs again.
    pub fn optimize(&self) {
        let snapshot = self.router.committed();
        *self.dispatch.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(snapshot);
        tracing::debug!("Server dispatch path optimized");
    }

    pub fn is_optimized(&self) -> bool {
        self.dispatch
            .lock()
            .map(|dispatch| dispatch.is_some())
            .unwrap_or(false)
    }

    /// The request handler as a standalone value
    pub fn handler(&self) -> HttpHandler {
        let cached = self
            .dispatch
            .lock()
            .ok()
            .and_then(|dispatch| dispatch.clone());
        cached.unwrap_or_else(|| self.router.committed())
    }

    /// Handle a single request
    pub async fn handle(&self, request: Request<Body>) -> Response {
        match self.handler().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("router", &self.router)
            .field("optimized", &self.is_optimized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_handle_dispatches_committed_routes() {
        let router = Arc::new(Router::new());
        router.get("/", || async { "home" });
        router.commit().unwrap();
        let server = Server::new(Arc::clone(&router));

        assert_eq!(server.handle(get("/")).await.status(), StatusCode::OK);
        assert_eq!(server.handle(get("/missing")).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_optimized_dispatch_ignores_later_commits() {
        let router = Arc::new(Router::new());
        router.get("/", || async { "home" });
        router.commit().unwrap();
        let server = Server::new(Arc::clone(&router));
        server.optimize();

        router.get("/late", || async { "late" });
        router.commit().unwrap();
        assert_eq!(server.handle(get("/late")).await.status(), StatusCode::NOT_FOUND);

        server.optimize();
        assert_eq!(server.handle(get("/late")).await.status(), StatusCode::OK);
    }
}
