//! Declarative operation binding: explicit registration of named operations
//! to request builders.
//!
//! This is the consumed seam between a declarative interface layer and the
//! dispatch core — a registration table instead of runtime reflection. The
//! mapping rules (URL templates, verb conventions, body encodings) belong to
//! whatever layer registers the routes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::request::RequestSpec;

type SpecBuilder = Arc<dyn Fn() -> RequestSpec + Send + Sync>;

/// Registry of named operations.
#[derive(Default, Clone)]
pub struct Routes {
    table: HashMap<String, SpecBuilder>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `operation`, replacing any previous registration.
    pub fn route<F>(mut self, operation: impl Into<String>, builder: F) -> Self
    where
        F: Fn() -> RequestSpec + Send + Sync + 'static,
    {
        self.table.insert(operation.into(), Arc::new(builder));
        self
    }

    /// Build a fresh [`RequestSpec`] for `operation`, if registered.
    pub fn build_spec(&self, operation: &str) -> Option<RequestSpec> {
        self.table.get(operation).map(|f| f())
    }

    pub fn contains(&self, operation: &str) -> bool {
        self.table.contains_key(operation)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn registered_operations_build_fresh_specs() {
        let routes = Routes::new()
            .route("find_order", || RequestSpec::get("/icecream/orders/1"))
            .route("make_order", || {
                RequestSpec::new(Method::POST, "/icecream/orders")
            });

        assert_eq!(routes.len(), 2);
        let spec = routes.build_spec("find_order").expect("registered");
        assert_eq!(spec.method(), &Method::GET);
        assert_eq!(spec.path(), "/icecream/orders/1");
        assert!(routes.build_spec("eat_order").is_none());
    }

    #[test]
    fn re_registration_replaces_the_previous_builder() {
        let routes = Routes::new()
            .route("ping", || RequestSpec::get("/ping"))
            .route("ping", || RequestSpec::get("/ping/v2"));
        assert_eq!(routes.len(), 1);
        assert_eq!(routes.build_spec("ping").unwrap().path(), "/ping/v2");
    }
}
