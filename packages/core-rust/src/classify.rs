//! Request classification: decides whether a request needs the store.
//!
//! Classification is an ordered rule table evaluated top to bottom. The first
//! rule whose method filter and path pattern both match decides the outcome;
//! a request matching no rule requires the store.

/// How a rule matches the request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodFilter {
    /// Matches every method.
    Any,
    /// Matches exactly this upper-case method token.
    Only(&'static str),
}

impl MethodFilter {
    fn matches(self, method: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(expected) => method == expected,
        }
    }
}

/// How a rule matches the request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPattern {
    /// Matches every path.
    Any,
    /// Matches this exact path.
    Exact(&'static str),
    /// Matches any path starting with this prefix.
    Prefix(&'static str),
}

impl PathPattern {
    fn matches(self, path: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => path == expected,
            Self::Prefix(prefix) => path.starts_with(prefix),
        }
    }
}

/// What a matching rule decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreRequirement {
    /// The store must be initialized before the request is routed.
    Required,
    /// The request is routed without touching the store gate.
    Skip,
}

/// Single entry of the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyRule {
    /// Short label used in logs and tests.
    pub name: &'static str,
    pub method: MethodFilter,
    pub path: PathPattern,
    pub outcome: StoreRequirement,
}

impl ClassifyRule {
    const fn skip(name: &'static str, method: MethodFilter, path: PathPattern) -> Self {
        Self {
            name,
            method,
            path,
            outcome: StoreRequirement::Skip,
        }
    }

    /// Returns `true` when both the method filter and path pattern match.
    #[must_use]
    pub fn matches(&self, method: &str, path: &str) -> bool {
        self.method.matches(method) && self.path.matches(path)
    }
}

const GET: MethodFilter = MethodFilter::Only("GET");

/// Requests that never need the store, in precedence order.
///
/// 1. CORS pre-flight
/// 2. Static assets and the devtools descriptor
/// 3. Notification hub traffic
/// 4. Informational config/version endpoints
pub const SKIP_RULES: &[ClassifyRule] = &[
    ClassifyRule::skip("preflight", MethodFilter::Only("OPTIONS"), PathPattern::Any),
    ClassifyRule::skip("favicon-ico", GET, PathPattern::Exact("/favicon.ico")),
    ClassifyRule::skip("favicon-svg", GET, PathPattern::Exact("/favicon.svg")),
    ClassifyRule::skip(
        "devtools-descriptor",
        GET,
        PathPattern::Exact("/.well-known/appspecific/com.chrome.devtools.json"),
    ),
    ClassifyRule::skip("icons", GET, PathPattern::Prefix("/icons/")),
    ClassifyRule::skip("notifications", MethodFilter::Any, PathPattern::Prefix("/notifications/")),
    ClassifyRule::skip("config", GET, PathPattern::Exact("/config")),
    ClassifyRule::skip("api-config", GET, PathPattern::Exact("/api/config")),
    ClassifyRule::skip("api-version", GET, PathPattern::Exact("/api/version")),
];

/// Evaluates an ordered rule table against a request.
#[derive(Debug, Clone, Copy)]
pub struct PathClassifier {
    rules: &'static [ClassifyRule],
}

impl PathClassifier {
    /// Creates a classifier over the built-in [`SKIP_RULES`] table.
    #[must_use]
    pub const fn new() -> Self {
        Self { rules: SKIP_RULES }
    }

    /// Creates a classifier over a custom table.
    #[must_use]
    pub const fn with_rules(rules: &'static [ClassifyRule]) -> Self {
        Self { rules }
    }

    /// Returns the first rule matching the request, if any.
    #[must_use]
    pub fn matching_rule(&self, method: &str, path: &str) -> Option<&'static ClassifyRule> {
        self.rules.iter().find(|rule| rule.matches(method, path))
    }

    /// Classifies the request. Unmatched requests require the store.
    #[must_use]
    pub fn classify(&self, method: &str, path: &str) -> StoreRequirement {
        self.matching_rule(method, path)
            .map_or(StoreRequirement::Required, |rule| rule.outcome)
    }

    /// Returns `true` if the request must wait for the store to be ready.
    #[must_use]
    pub fn requires_store(&self, method: &str, path: &str) -> bool {
        self.classify(method, path) == StoreRequirement::Required
    }
}

impl Default for PathClassifier {
    fn default() -> Self {
        Self::new()
    }
}
