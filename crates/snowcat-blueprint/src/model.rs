use serde::Serialize;

/// A parsed API Blueprint document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    /// The API name from the first heading.
    pub name: String,
    /// Free-form text following the API name.
    pub description: String,
    /// Leading `Key: Value` metadata (e.g. `FORMAT: 1A`).
    pub metadata: Vec<(String, String)>,
    /// Resource groups in declaration order. Resources declared before any
    /// `# Group` heading land in an unnamed group.
    pub groups: Vec<ResourceGroup>,
}

impl Document {
    /// Iterate every resource across all groups, in declaration order.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.groups.iter().flat_map(|g| g.resources.iter())
    }

    /// Look up a metadata value by key (case-insensitive).
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// A `# Group` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResourceGroup {
    pub name: String,
    pub description: String,
    pub resources: Vec<Resource>,
}

/// A resource identified by a URI template (e.g. `/notes/{id}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub name: String,
    pub uri_template: String,
    pub description: String,
    pub actions: Vec<Action>,
}

/// An HTTP action on a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Action {
    pub name: String,
    /// Uppercase HTTP method.
    pub method: String,
    /// Action-level URI override (`### Name [GET /other]`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri_template: Option<String>,
    pub description: String,
    pub transactions: Vec<Transaction>,
}

impl Action {
    /// Iterate every declared response, in declaration order.
    pub fn responses(&self) -> impl Iterator<Item = &Response> {
        self.transactions.iter().flat_map(|t| t.responses.iter())
    }
}

/// A request paired with the responses that may answer it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Payload>,
    pub responses: Vec<Response>,
}

/// An example request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Payload {
    pub name: String,
    pub headers: Vec<Header>,
    pub body: String,
}

/// An example response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<Header>,
    pub body: String,
}

impl Response {
    /// The declared `Content-Type`, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("content-type"))
            .map(|h| h.value.as_str())
    }
}

/// A single HTTP header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
