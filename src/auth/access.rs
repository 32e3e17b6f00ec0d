// Route allow-list: which requests may proceed without an authenticated identity

use axum::http::Method;

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPattern {
    /// Matches the path exactly
    Exact(String),
    /// `/base/**`: matches `/base` and everything below it
    Subtree(String),
}

impl PathPattern {
    fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/**") {
            Some(base) => PathPattern::Subtree(base.to_string()),
            None => PathPattern::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Subtree(base) => {
                path == base
                    || path
                        .strip_prefix(base.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct PublicRoute {
    method: Option<Method>,
    pattern: PathPattern,
}

/// Set of public routes; every route not listed requires an authenticated context
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    public: Vec<PublicRoute>,
}

impl AccessPolicy {
    /// A policy with no public routes
    pub fn new() -> Self {
        Self::default()
    }

    /// The routes the API exposes without authentication:
    /// registration, the auth endpoints and the API documentation.
    pub fn standard() -> Self {
        Self::new()
            .permit_method(Method::POST, "/api/users")
            .permit("/api/auth/**")
            .permit("/swagger-ui")
            .permit("/swagger-ui/**")
            .permit("/api-docs/**")
    }

    /// Make `pattern` public for every method
    pub fn permit(mut self, pattern: &str) -> Self {
        self.public.push(PublicRoute {
            method: None,
            pattern: PathPattern::parse(pattern),
        });
        self
    }

    /// Make `pattern` public for one method only
    pub fn permit_method(mut self, method: Method, pattern: &str) -> Self {
        self.public.push(PublicRoute {
            method: Some(method),
            pattern: PathPattern::parse(pattern),
        });
        self
    }

    pub fn is_public(&self, method: &Method, path: &str) -> bool {
        self.public.iter().any(|route| {
            route.method.as_ref().map_or(true, |m| m == method) && route.pattern.matches(path)
        })
    }
}
