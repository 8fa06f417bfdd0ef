//! Method-aware route table.

use crate::r#match::{AllowedMethods, RouteLookup, RouteMatch};
use crate::method::Method;
use crate::path::PathTemplate;

#[derive(Debug)]
struct Entry<T> {
    template: PathTemplate,
    methods: Vec<Method>,
    value: T,
}

/// A route table mapping `(method, path)` to a payload.
///
/// Routes are tried in registration order; among routes whose template
/// matches, templates with more static segments win so that `/items/new`
/// shadows `/items/{id}` regardless of which was added first.
#[derive(Debug)]
pub struct Router<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Router<T> {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route. `rule` may use `<conv:name>` or `{name}` placeholders.
    pub fn add(&mut self, rule: &str, methods: &[Method], value: T) {
        self.entries.push(Entry {
            template: PathTemplate::parse(rule),
            methods: methods.to_vec(),
            value,
        });
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a route with the same normalized template already serves `method`.
    #[must_use]
    pub fn contains(&self, rule: &str, method: Method) -> bool {
        let template = PathTemplate::parse(rule);
        self.entries
            .iter()
            .any(|e| e.template.as_str() == template.as_str() && e.methods.contains(&method))
    }

    /// Look up a route. `HEAD` falls back to `GET` routes.
    #[must_use]
    pub fn lookup(&self, method: Method, path: &str) -> RouteLookup<'_, T> {
        let mut best: Option<(usize, &Entry<T>, Vec<(String, String)>)> = None;
        let mut allowed = Vec::new();

        for entry in &self.entries {
            let Some(captured) = entry.template.capture(path) else {
                continue;
            };
            allowed.extend_from_slice(&entry.methods);

            let serves = entry.methods.contains(&method)
                || (method == Method::Head && entry.methods.contains(&Method::Get));
            if !serves {
                continue;
            }

            let statics = entry.template.segments().len() - captured.len();
            if best.as_ref().is_none_or(|(s, _, _)| statics > *s) {
                let params = captured
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect();
                best = Some((statics, entry, params));
            }
        }

        match best {
            Some((_, entry, params)) => RouteLookup::Match(RouteMatch {
                route: &entry.value,
                template: entry.template.as_str(),
                params,
            }),
            None if allowed.is_empty() => RouteLookup::NotFound,
            None => RouteLookup::MethodNotAllowed {
                allowed: AllowedMethods::new(allowed),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router<&'static str> {
        let mut router = Router::new();
        router.add("/items/<int:item_id>", &[Method::Get, Method::Put], "item");
        router.add("/items/new", &[Method::Get], "new");
        router.add("/items", &[Method::Post], "create");
        router
    }

    #[test]
    fn test_lookup_match_with_params() {
        let router = router();
        match router.lookup(Method::Get, "/items/42") {
            RouteLookup::Match(m) => {
                assert_eq!(*m.route, "item");
                assert_eq!(m.template, "/items/{item_id}");
                assert_eq!(m.get_param("item_id"), Some("42"));
                assert_eq!(m.get_param("missing"), None);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_static_route_preferred() {
        let router = router();
        match router.lookup(Method::Get, "/items/new") {
            RouteLookup::Match(m) => assert_eq!(*m.route, "new"),
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn test_method_not_allowed() {
        let router = router();
        match router.lookup(Method::Delete, "/items/42") {
            RouteLookup::MethodNotAllowed { allowed } => {
                assert_eq!(allowed.header_value(), "GET, HEAD, PUT");
            }
            other => panic!("expected 405, got {other:?}"),
        }
    }

    #[test]
    fn test_not_found() {
        let router = router();
        assert!(matches!(
            router.lookup(Method::Get, "/nothing"),
            RouteLookup::NotFound
        ));
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let router = router();
        assert!(matches!(
            router.lookup(Method::Head, "/items/1"),
            RouteLookup::Match(_)
        ));
    }

    #[test]
    fn test_contains_normalizes_rule() {
        let router = router();
        assert!(router.contains("/items/{item_id}", Method::Put));
        assert!(!router.contains("/items/{item_id}", Method::Post));
        assert_eq!(router.len(), 3);
        assert!(!router.is_empty());
    }
}
