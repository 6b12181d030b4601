//! Route collection with an explicit commit step.

use super::{HttpError, HttpResult};
use axum::handler::Handler;
use axum::routing::{self, MethodRouter};
use std::any::Any;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};

/// Canonical binding name of [`Router`]
pub const ROUTER_BINDING: &str = "Elif/Src/Route";

/// Short alias of [`Router`]
pub const ROUTER_ALIAS: &str = "Route";

/// HTTP methods a route can be defined for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let method = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        write!(f, "{}", method)
    }
}

/// A committed route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: HttpMethod,
    pub path: String,
}

struct PendingRoute {
    method: HttpMethod,
    path: String,
    handler: MethodRouter,
}

struct RouterState {
    pending: Vec<PendingRoute>,
    committed: axum::Router,
    routes: Vec<RouteInfo>,
}

/// Application router.
///
/// Route definitions accumulate until [`Router::commit`] moves them into the
/// dispatch-ready store. Definitions made after a commit wait for the next one.
pub struct Router {
    state: Mutex<RouterState>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RouterState {
                pending: Vec::new(),
                committed: axum::Router::new(),
                routes: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn add(&self, method: HttpMethod, path: &str, handler: MethodRouter) -> &Self {
        self.state().pending.push(PendingRoute {
            method,
            path: path.to_string(),
            handler,
        });
        self
    }

    /// Define a GET route
    pub fn get<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(HttpMethod::Get, path, routing::get(handler))
    }

    /// Define a POST route
    pub fn post<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(HttpMethod::Post, path, routing::post(handler))
    }

    /// Define a PUT route
    pub fn put<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(HttpMethod::Put, path, routing::put(handler))
    }

    /// Define a PATCH route
    pub fn patch<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(HttpMethod::Patch, path, routing::patch(handler))
    }

    /// Define a DELETE route
    pub fn delete<H, T>(&self, path: &str, handler: H) -> &Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.add(HttpMethod::Delete, path, routing::delete(handler))
    }

    /// Move pending definitions into the dispatch-ready store.
    ///
    /// Returns the number of routes committed. Nothing is committed if any
    /// pending definition is invalid, already defined, or conflicts with
    /// another route; the pending definitions are kept in that case.
    pub fn commit(&self) -> HttpResult<usize> {
        let mut state = self.state();

        let mut seen: HashSet<(HttpMethod, String)> = state
            .routes
            .iter()
            .map(|route| (route.method, route.path.clone()))
            .collect();

        for route in &state.pending {
            if !route.path.starts_with('/') {
                return Err(HttpError::InvalidPath {
                    path: route.path.clone(),
                    message: "paths must start with '/'".to_string(),
                });
            }
            if !seen.insert((route.method, route.path.clone())) {
                return Err(HttpError::DuplicateRoute {
                    method: route.method,
                    path: route.path.clone(),
                });
            }
        }

        // Build on a copy so a rejected definition leaves both stores intact.
        let mut candidate = state.committed.clone();
        for route in &state.pending {
            let current = candidate.clone();
            let handler = route.handler.clone();
            candidate = catch_unwind(AssertUnwindSafe(|| current.route(&route.path, handler))).map_err(|panic_info| {
                HttpError::InvalidPath {
                    path: route.path.clone(),
                    message: panic_message(panic_info.as_ref()),
                }
            })?;
        }

        let pending = std::mem::take(&mut state.pending);
        let count = pending.len();
        for route in pending {
            tracing::debug!("Committing route {} {}", route.method, route.path);
            state.routes.push(RouteInfo {
                method: route.method,
                path: route.path,
            });
        }

        state.committed = candidate;
        Ok(count)
    }

    /// Snapshot of the dispatch-ready store
    pub fn committed(&self) -> axum::Router {
        self.state().committed.clone()
    }

    /// Committed routes in definition order
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.state().routes.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }
}

fn panic_message(panic_info: &(dyn Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "route rejected by the router".to_string()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Router")
            .field("routes", &state.routes)
            .field("pending", &state.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_moves_pending_routes() {
        let router = Router::new();
        router.get("/", || async { "home" }).post("/users", || async { "created" });

        assert_eq!(router.pending_count(), 2);
        assert_eq!(router.commit().unwrap(), 2);
        assert_eq!(router.pending_count(), 0);
        assert_eq!(
            router.routes(),
            vec![
                RouteInfo { method: HttpMethod::Get, path: "/".to_string() },
                RouteInfo { method: HttpMethod::Post, path: "/users".to_string() },
            ]
        );
    }

    #[test]
    fn test_same_path_different_methods() {
        let router = Router::new();
        router.get("/users", || async { "list" }).post("/users", || async { "create" });

        assert_eq!(router.commit().unwrap(), 2);
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let router = Router::new();
        router.get("/", || async { "one" });
        router.commit().unwrap();
        router.get("/", || async { "two" });

        let error = router.commit().unwrap_err();
        assert!(matches!(error, HttpError::DuplicateRoute { method: HttpMethod::Get, .. }));
        assert_eq!(router.routes().len(), 1);
    }

    #[test]
    fn test_conflicting_parameters_rejected_without_losing_routes() {
        let router = Router::new();
        router.get("/", || async { "home" });
        router.commit().unwrap();

        router.get("/users/:id", || async { "by id" });
        router.post("/users/:name", || async { "by name" });

        let error = router.commit().unwrap_err();
        match error {
            HttpError::InvalidPath { path, message } => {
                assert_eq!(path, "/users/:name");
                assert!(message.contains("conflict"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(router.routes().len(), 1);
        assert_eq!(router.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_rejected_commit_keeps_committed_store() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let router = Router::new();
        router.get("/", || async { "home" });
        router.commit().unwrap();
        router.get("/posts/:id", || async { "by id" });
        router.delete("/posts/:slug", || async { "by slug" });
        assert!(router.commit().is_err());

        let response = router
            .committed()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_invalid_path_rejected() {
        let router = Router::new();
        router.get("health", || async { "ok" });

        assert!(matches!(router.commit(), Err(HttpError::InvalidPath { .. })));
    }
}
