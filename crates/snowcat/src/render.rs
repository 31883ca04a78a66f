//! Document rendering: HTML through a template, JSON, and expanded blueprint.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use snowcat_blueprint::{Action, Document, Header, Payload, Resource, Response};

const TITLE_PLACEHOLDER: &str = "{{title}}";
const CONTENT_PLACEHOLDER: &str = "{{content}}";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("alpha", include_str!("../templates/alpha.html")),
    ("plain", include_str!("../templates/plain.html")),
];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown template '{0}' (not a file and not one of: alpha, plain)")]
    UnknownTemplate(String),

    #[error("failed to read template {}: {source}", path.display())]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output format of a render pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Html,
    Json,
    Apib,
}

impl Format {
    /// Name used in "has been generated!" notices.
    pub fn label(&self) -> &'static str {
        match self {
            Format::Html => "HTML",
            Format::Json => "API element JSON",
            Format::Apib => "API blueprint",
        }
    }
}

/// Where an HTML template comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Builtin(&'static str),
    File(PathBuf),
}

impl TemplateSource {
    /// Resolve `-t <name|path>`: an existing file wins over a built-in name.
    pub fn resolve(name: &str) -> Result<Self, RenderError> {
        let path = Path::new(name);
        if path.is_file() {
            return Ok(Self::File(path.to_path_buf()));
        }
        BUILTIN_TEMPLATES
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(builtin, _)| Self::Builtin(builtin))
            .ok_or_else(|| RenderError::UnknownTemplate(name.to_string()))
    }

    /// The file to watch, for file templates.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Builtin(_) => None,
            Self::File(path) => Some(path),
        }
    }

    /// Template text. File templates are re-read on every call.
    pub fn load(&self) -> Result<String, RenderError> {
        match self {
            Self::Builtin(name) => Ok(BUILTIN_TEMPLATES
                .iter()
                .find(|(builtin, _)| builtin == name)
                .map(|(_, content)| content.to_string())
                .unwrap_or_default()),
            Self::File(path) => fs::read_to_string(path).map_err(|source| RenderError::Template {
                path: path.clone(),
                source,
            }),
        }
    }
}

impl Default for TemplateSource {
    fn default() -> Self {
        Self::Builtin("alpha")
    }
}

/// Render a document into `template` at its `{{title}}` and `{{content}}`
/// placeholders.
pub fn html(template: &str, document: &Document) -> String {
    let title = if document.name.is_empty() {
        "API Documentation".to_string()
    } else {
        escape(&document.name)
    };
    template
        .replace(TITLE_PLACEHOLDER, &title)
        .replace(CONTENT_PLACEHOLDER, &html_body(document))
}

/// Pretty-printed JSON of the document model.
pub fn json(document: &Document) -> Result<String, RenderError> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// The include-expanded blueprint source.
pub fn apib(source: &str) -> String {
    source.to_string()
}

fn html_body(document: &Document) -> String {
    let mut out = String::new();

    if !document.description.is_empty() {
        let _ = writeln!(out, "<div class=\"description\">{}</div>", paragraphs(&document.description));
    }

    for group in &document.groups {
        out.push_str("<section class=\"group\">\n");
        if !group.name.is_empty() {
            let _ = writeln!(out, "<h2>{}</h2>", escape(&group.name));
        }
        if !group.description.is_empty() {
            let _ = writeln!(out, "{}", paragraphs(&group.description));
        }
        for resource in &group.resources {
            render_resource(&mut out, resource);
        }
        out.push_str("</section>\n");
    }

    out
}

fn render_resource(out: &mut String, resource: &Resource) {
    out.push_str("<article class=\"resource\">\n");
    let _ = writeln!(
        out,
        "<h3>{} <code>{}</code></h3>",
        escape(&resource.name),
        escape(&resource.uri_template)
    );
    if !resource.description.is_empty() {
        let _ = writeln!(out, "{}", paragraphs(&resource.description));
    }
    for action in &resource.actions {
        render_action(out, resource, action);
    }
    out.push_str("</article>\n");
}

fn render_action(out: &mut String, resource: &Resource, action: &Action) {
    let uri = action.uri_template.as_deref().unwrap_or(&resource.uri_template);
    out.push_str("<div class=\"action\">\n");
    let _ = writeln!(
        out,
        "<h4><span class=\"method {}\">{}</span> <code>{}</code> {}</h4>",
        action.method.to_ascii_lowercase(),
        escape(&action.method),
        escape(uri),
        escape(&action.name)
    );
    out.push_str("<div class=\"body\">\n");
    if !action.description.is_empty() {
        let _ = writeln!(out, "{}", paragraphs(&action.description));
    }
    for transaction in &action.transactions {
        if let Some(request) = &transaction.request {
            render_request(out, request);
        }
        for response in &transaction.responses {
            render_response(out, response);
        }
    }
    out.push_str("</div>\n</div>\n");
}

fn render_request(out: &mut String, request: &Payload) {
    if request.name.is_empty() {
        out.push_str("<h5>Request</h5>\n");
    } else {
        let _ = writeln!(out, "<h5>Request {}</h5>", escape(&request.name));
    }
    render_payload(out, &request.headers, &request.body);
}

fn render_response(out: &mut String, response: &Response) {
    let _ = writeln!(out, "<h5>Response {}</h5>", response.status);
    render_payload(out, &response.headers, &response.body);
}

fn render_payload(out: &mut String, headers: &[Header], body: &str) {
    if !headers.is_empty() {
        out.push_str("<table class=\"headers\">\n");
        for header in headers {
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(&header.name),
                escape(&header.value)
            );
        }
        out.push_str("</table>\n");
    }
    if !body.is_empty() {
        let _ = writeln!(out, "<pre><code>{}</code></pre>", escape(body.trim_end()));
    }
}

fn paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", escape(p)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Escape text for HTML element and attribute content.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
