//! Route matching result.

use crate::method::Method;

/// A matched route with extracted parameters.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    /// The matched route payload.
    pub route: &'a T,
    /// Normalized template of the matched route.
    pub template: &'a str,
    /// Extracted path parameters, in template order.
    pub params: Vec<(String, String)>,
}

impl<T> RouteMatch<'_, T> {
    /// Get a parameter value by name.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Result of attempting to locate a route by path and method.
#[derive(Debug)]
pub enum RouteLookup<'a, T> {
    /// A route matched by path and method.
    Match(RouteMatch<'a, T>),
    /// Path matched, but method is not allowed.
    MethodNotAllowed { allowed: AllowedMethods },
    /// No route matched the path.
    NotFound,
}

/// Allowed methods for a matched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedMethods {
    methods: Vec<Method>,
}

impl AllowedMethods {
    /// Create a normalized allow list.
    ///
    /// Adds `HEAD` when `GET` is present, then sorts and de-duplicates.
    #[must_use]
    pub fn new(mut methods: Vec<Method>) -> Self {
        if methods.contains(&Method::Get) && !methods.contains(&Method::Head) {
            methods.push(Method::Head);
        }
        methods.sort_unstable();
        methods.dedup();
        Self { methods }
    }

    /// Access the normalized methods.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Check whether a method is allowed.
    #[must_use]
    pub fn contains(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }

    /// Format as an HTTP `Allow` header value.
    #[must_use]
    pub fn header_value(&self) -> String {
        self.methods
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_methods_adds_head() {
        let allowed = AllowedMethods::new(vec![Method::Post, Method::Get]);
        assert_eq!(allowed.methods(), &[Method::Get, Method::Head, Method::Post]);
        assert_eq!(allowed.header_value(), "GET, HEAD, POST");
    }

    #[test]
    fn test_allowed_methods_dedup() {
        let allowed = AllowedMethods::new(vec![Method::Put, Method::Put, Method::Delete]);
        assert_eq!(allowed.methods(), &[Method::Put, Method::Delete]);
        assert!(allowed.contains(Method::Delete));
        assert!(!allowed.contains(Method::Head));
    }
}
