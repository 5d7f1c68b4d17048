//! Registered routes, keyed by path pattern.
//!
//! # Design Decisions
//! - Readers take a lock-free snapshot (`ArcSwap`); a request keeps the
//!   snapshot it matched against even if the table is replaced mid-flight
//! - Writers serialize on a mutex and publish a modified copy
//! - Iteration order is registration order (matcher tie-break relies on it)

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;

use crate::routing::error::RouteError;
use crate::routing::matcher::find_best_match;
use crate::routing::route::Route;

#[derive(Debug, Default)]
struct RouteTable {
    routes: Vec<Arc<Route>>,
}

impl RouteTable {
    fn position(&self, path: &str) -> Option<usize> {
        self.routes.iter().position(|route| route.path() == path)
    }
}

/// Path → route mapping shared by the dispatcher and registration callers.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    table: ArcSwap<RouteTable>,
    writer: Mutex<()>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `route`, replacing (in place) any route with the same path.
    pub fn insert(&self, route: Route) -> Arc<Route> {
        let route = Arc::new(route);
        self.modify(|table| match table.position(route.path()) {
            Some(index) => table.routes[index] = route.clone(),
            None => table.routes.push(route.clone()),
        });
        tracing::info!(route = %route.path(), handler = route.handler().short_name(), "Route registered");
        route
    }

    /// Remove the route for `path`; absent paths are ignored.
    pub fn remove(&self, path: &str) -> Option<Arc<Route>> {
        let mut removed = None;
        self.modify(|table| {
            if let Some(index) = table.position(path) {
                removed = Some(table.routes.remove(index));
            }
        });
        if removed.is_some() {
            tracing::info!(route = %path, "Route unregistered");
        }
        removed
    }

    /// Apply `change` to a copy of the route for `path` and publish the copy.
    ///
    /// The registered route is left untouched when `change` fails.
    pub fn update<F>(&self, path: &str, change: F) -> Result<Arc<Route>, RouteError>
    where
        F: FnOnce(&mut Route) -> Result<(), RouteError>,
    {
        let _guard = self.lock();
        let current = self.table.load_full();
        let index = current
            .position(path)
            .ok_or_else(|| RouteError::NotFound(path.to_string()))?;

        let mut route = Route::clone(&current.routes[index]);
        change(&mut route)?;
        let route = Arc::new(route);

        let mut routes = current.routes.clone();
        routes[index] = route.clone();
        self.table.store(Arc::new(RouteTable { routes }));
        tracing::debug!(route = %path, "Route updated");
        Ok(route)
    }

    /// Replace the whole table.
    pub fn replace_all(&self, routes: Vec<Route>) {
        let routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();
        let count = routes.len();
        let _guard = self.lock();
        self.table.store(Arc::new(RouteTable { routes }));
        tracing::info!(routes = count, "Route table replaced");
    }

    pub fn get(&self, path: &str) -> Option<Arc<Route>> {
        let table = self.table.load();
        table.position(path).map(|index| table.routes[index].clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.table.load().position(path).is_some()
    }

    /// Registered paths in registration order.
    pub fn paths(&self) -> Vec<String> {
        self.table
            .load()
            .routes
            .iter()
            .map(|route| route.path().to_string())
            .collect()
    }

    /// Snapshot of the registered routes in registration order.
    pub fn routes(&self) -> Vec<Arc<Route>> {
        self.table.load().routes.clone()
    }

    /// Best-matching route for a request path.
    pub fn find(&self, requested: &str) -> Option<Arc<Route>> {
        let table = self.table.load();
        let patterns = table.routes.iter().map(|route| route.pattern());
        find_best_match(requested, patterns)
            .and_then(|pattern| table.position(pattern.as_str()))
            .map(|index| table.routes[index].clone())
    }

    pub fn len(&self) -> usize {
        self.table.load().routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn modify(&self, apply: impl FnOnce(&mut RouteTable)) {
        let _guard = self.lock();
        let mut table = RouteTable {
            routes: self.table.load().routes.clone(),
        };
        apply(&mut table);
        self.table.store(Arc::new(table));
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Container, TypeKey};
    use crate::pipeline::RouteHandler;

    fn route(container: &Container, path: &str) -> Route {
        Route::new(container, path, TypeKey::of::<RouteHandler>()).unwrap()
    }

    #[test]
    fn test_register_get_list() {
        let container = Container::new();
        let registry = RouteRegistry::new();
        registry.insert(route(&container, "/b"));
        registry.insert(route(&container, "/a"));

        assert_eq!(registry.paths(), vec!["/b", "/a"]);
        assert!(registry.get("/a").is_some());
        assert!(registry.get("/missing").is_none());
    }

    #[test]
    fn test_reregister_replaces_in_place() {
        let container = Container::new();
        let registry = RouteRegistry::new();
        registry.insert(route(&container, "/a"));
        registry.insert(route(&container, "/b"));
        let replacement = registry.insert(route(&container, "/a"));

        assert_eq!(registry.paths(), vec!["/a", "/b"]);
        assert!(Arc::ptr_eq(&registry.get("/a").unwrap(), &replacement));
    }

    #[test]
    fn test_unregister_missing_is_noop() {
        let container = Container::new();
        let registry = RouteRegistry::new();
        registry.insert(route(&container, "/a"));
        assert!(registry.remove("/nope").is_none());
        assert_eq!(registry.len(), 1);
        assert!(registry.remove("/a").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_failure_leaves_route() {
        let container = Container::new();
        let registry = RouteRegistry::new();
        let original = registry.insert(route(&container, "/a"));

        let err = registry
            .update("/a", |route| route.add_middlewares(&container, [TypeKey::of::<String>()]))
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidArgument { .. }));
        assert!(Arc::ptr_eq(&registry.get("/a").unwrap(), &original));

        let err = registry.update("/missing", |_| Ok(())).unwrap_err();
        assert_eq!(err, RouteError::NotFound("/missing".to_string()));
    }

    #[test]
    fn test_snapshot_survives_replacement() {
        let container = Container::new();
        let registry = RouteRegistry::new();
        registry.insert(route(&container, "/a"));
        let snapshot = registry.routes();
        registry.replace_all(vec![route(&container, "/x"), route(&container, "/y")]);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.paths(), vec!["/x", "/y"]);
    }

    #[test]
    fn test_find_uses_best_match() {
        let container = Container::new();
        let registry = RouteRegistry::new();
        registry.insert(route(&container, "/"));
        registry.insert(route(&container, "/users/%id"));
        registry.insert(route(&container, "/users/me"));

        assert_eq!(registry.find("/users/me").unwrap().path(), "/users/me");
        assert_eq!(registry.find("/users/7").unwrap().path(), "/users/%id");
        assert_eq!(registry.find("/elsewhere").unwrap().path(), "/");
    }
}
