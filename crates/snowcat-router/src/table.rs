//! Route extraction and multi-document merge.

use serde::Serialize;
use snowcat_blueprint::{Document, Header};

use crate::pattern::Pattern;

/// One mockable (method, path pattern) pair with its canned response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDescriptor {
    /// Uppercase HTTP method.
    pub method: String,
    /// Compiled path pattern.
    #[serde(serialize_with = "serialize_pattern")]
    pub pattern: Pattern,
    /// Declared response status.
    pub status: u16,
    /// Declared response headers.
    pub headers: Vec<Header>,
    /// Declared response body, possibly empty.
    pub body: String,
    /// Index of the originating document in the merged input.
    pub document: usize,
}

fn serialize_pattern<S: serde::Serializer>(pattern: &Pattern, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(pattern.as_str())
}

/// Routes grouped by originating document, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteTable {
    documents: Vec<Vec<RouteDescriptor>>,
}

impl RouteTable {
    /// Route groups, one per input document (possibly empty).
    pub fn documents(&self) -> &[Vec<RouteDescriptor>] {
        &self.documents
    }

    /// All routes in priority order: document order, then declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.documents.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.documents.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extract the routes declared by one document.
///
/// Every (action, response) pair yields a descriptor, so an action with
/// several responses contributes several routes sharing one pattern.
pub fn routes_for(document: &Document, index: usize) -> Vec<RouteDescriptor> {
    let mut routes = Vec::new();

    for resource in document.resources() {
        for action in &resource.actions {
            let template = action
                .uri_template
                .as_deref()
                .unwrap_or(&resource.uri_template);
            let pattern = Pattern::parse(template);

            for response in action.responses() {
                routes.push(RouteDescriptor {
                    method: action.method.to_ascii_uppercase(),
                    pattern: pattern.clone(),
                    status: response.status,
                    headers: response.headers.clone(),
                    body: response.body.clone(),
                    document: index,
                });
            }
        }
    }

    routes
}

/// Merge several documents into one table, keeping their order.
pub fn merge(documents: &[Document]) -> RouteTable {
    RouteTable {
        documents: documents
            .iter()
            .enumerate()
            .map(|(index, document)| routes_for(document, index))
            .collect(),
    }
}
