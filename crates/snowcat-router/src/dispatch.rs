//! First-match-wins request dispatch.
//!
//! Routes are scanned in table order (document order, then declaration
//! order). The first route whose method and pattern both match answers the
//! request. When a matching (method, pattern) pair declares several
//! responses, the first declared one wins unless the caller asks for a
//! specific status and one of the matching routes declares it.

use snowcat_blueprint::Header;

use crate::table::{RouteDescriptor, RouteTable};

/// The response a mock server sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<Header>,
    pub body: String,
}

impl MockResponse {
    /// The response for requests no route matches: 404 with no body.
    pub fn not_found() -> Self {
        Self {
            status: 404,
            headers: Vec::new(),
            body: String::new(),
        }
    }
}

impl From<&RouteDescriptor> for MockResponse {
    fn from(route: &RouteDescriptor) -> Self {
        Self {
            status: route.status,
            headers: route.headers.clone(),
            body: route.body.clone(),
        }
    }
}

/// A route selected for a request, with captured path variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a RouteDescriptor,
    pub params: Vec<(String, String)>,
}

/// Answers requests from an immutable route table.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    table: RouteTable,
}

impl Dispatcher {
    pub fn new(table: RouteTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Find the route answering `method path`, if any.
    ///
    /// `HEAD` falls back to the matching `GET` route when no `HEAD` route is
    /// declared.
    pub fn lookup(&self, method: &str, path: &str, prefer: Option<u16>) -> Option<RouteMatch<'_>> {
        self.find(method, path, prefer).or_else(|| {
            if method.eq_ignore_ascii_case("HEAD") {
                self.find("GET", path, prefer)
            } else {
                None
            }
        })
    }

    /// Dispatch a request, answering 404 when nothing matches.
    pub fn dispatch(&self, method: &str, path: &str) -> MockResponse {
        self.dispatch_preferring(method, path, None)
    }

    /// Dispatch a request, choosing the response with status `prefer` when
    /// the matching route declares one.
    pub fn dispatch_preferring(&self, method: &str, path: &str, prefer: Option<u16>) -> MockResponse {
        match self.lookup(method, path, prefer) {
            Some(found) => MockResponse::from(found.route),
            None => MockResponse::not_found(),
        }
    }

    fn find(&self, method: &str, path: &str, prefer: Option<u16>) -> Option<RouteMatch<'_>> {
        let mut first: Option<RouteMatch<'_>> = None;

        for route in self.table.iter() {
            if !route.method.eq_ignore_ascii_case(method) {
                continue;
            }
            let Some(params) = route.pattern.captures(path) else {
                continue;
            };

            if let Some(winner) = &first {
                // Only variants of the winning (method, pattern) pair are eligible.
                if prefer == Some(route.status)
                    && route.document == winner.route.document
                    && route.pattern == winner.route.pattern
                {
                    return Some(RouteMatch { route, params });
                }
                continue;
            }

            if prefer.is_none() || prefer == Some(route.status) {
                return Some(RouteMatch { route, params });
            }
            first = Some(RouteMatch { route, params });
        }

        first
    }
}

/// Parse a `Prefer: status=NNN` header value.
pub fn preferred_status(value: &str) -> Option<u16> {
    value
        .split([',', ';'])
        .filter_map(|part| part.trim().strip_prefix("status="))
        .find_map(|status| status.trim().parse().ok())
}
