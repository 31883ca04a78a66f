use std::sync::OnceLock;

use regex_lite::{Captures, Regex};

use crate::error::ParseError;
use crate::model::{Action, Document, Header, Payload, Resource, ResourceGroup, Response, Transaction};
use crate::report::Report;

/// HTTP methods accepted in action headings.
const HTTP_METHODS: &[&str] = &[
    "GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS", "TRACE", "CONNECT",
];

/// List-item sections that carry no mockable data and are skipped whole.
const SKIPPED_SECTIONS: &[&str] = &["Parameters", "Attributes", "Model", "Schema", "Relation"];

/// Version string reported by [`BlueprintParser`].
pub const PARSER_VERSION: &str = concat!("snowcat-blueprint ", env!("CARGO_PKG_VERSION"));

/// A blueprint parsing engine.
///
/// Components that need to parse documents receive a parser explicitly
/// (usually as `Arc<dyn Parser>`), which keeps tests free to substitute a
/// fake implementation.
pub trait Parser: Send + Sync {
    /// Parse a fully expanded source into a document.
    ///
    /// Fails with [`ParseError::Invalid`] when the source carries any
    /// error-level annotation.
    fn parse(&self, source: &str) -> Result<Document, ParseError>;

    /// Validate a source without building a document.
    fn validate(&self, source: &str) -> Report;

    /// Human-readable engine version.
    fn version(&self) -> &str;
}

/// The built-in line-oriented API Blueprint parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlueprintParser;

impl BlueprintParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a source, returning the document together with every annotation.
    pub fn analyze(&self, source: &str) -> (Document, Report) {
        Analyzer::new(source).run()
    }
}

impl Parser for BlueprintParser {
    fn parse(&self, source: &str) -> Result<Document, ParseError> {
        if source.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let (document, report) = self.analyze(source);
        if report.has_errors() {
            return Err(ParseError::Invalid(report));
        }

        for warning in &report.annotations {
            tracing::debug!(
                row = warning.row,
                col = warning.col,
                "blueprint warning: {}",
                warning.description
            );
        }

        Ok(document)
    }

    fn validate(&self, source: &str) -> Report {
        if source.trim().is_empty() {
            let mut report = Report::default();
            report.error(1, 1, "blueprint is empty");
            return report;
        }
        self.analyze(source).1
    }

    fn version(&self) -> &str {
        PARSER_VERSION
    }
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern is valid"))
}

fn metadata_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^([A-Za-z][A-Za-z0-9_-]*):\s*(.*)$")
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^(#{1,6})\s+(.*?)\s*#*\s*$")
}

fn group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^Group\s+(.+)$")
}

fn resource_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^(.*?)\s*\[\s*(/[^\]\s]*)\s*\]$")
}

fn action_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^(.*?)\s*\[\s*([A-Za-z]+)(?:\s+(/[^\]\s]*))?\s*\]$")
}

fn endpoint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^([A-Z]+)\s+(/\S*)$")
}

fn list_item_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^([ \t]*)[+*-]\s+(.*)$")
}

fn response_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^Response(?:\s+([^\s(]+))?\s*(?:\(([^)]*)\))?\s*$")
}

fn request_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^Request(?:\s+([^(]*?))?\s*(?:\(([^)]*)\))?\s*$")
}

fn header_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    regex(&RE, r"^([A-Za-z0-9!#$%&'*+.^_`|~-]+)\s*:\s*(.*)$")
}

/// Where descriptive text and list items currently attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Document,
    Group,
    Resource,
    Action,
    /// Inside a section we do not model (e.g. `# Data Structures`).
    Ignored,
}

/// Post-parse checks anchored at the heading that declared the element.
enum Check {
    Resource { group: usize, resource: usize, row: usize },
    Action { group: usize, resource: usize, action: usize, row: usize },
}

struct Analyzer<'a> {
    lines: Vec<&'a str>,
    doc: Document,
    report: Report,
    context: Context,
    checks: Vec<Check>,
}

impl<'a> Analyzer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines().collect(),
            doc: Document::default(),
            report: Report::default(),
            context: Context::Document,
            checks: Vec::new(),
        }
    }

    fn run(mut self) -> (Document, Report) {
        let mut i = self.read_metadata();

        while i < self.lines.len() {
            let line = self.lines[i];
            let row = i + 1;

            if let Some(caps) = heading_re().captures(line) {
                let text = caps.get(2).map_or("", |m| m.as_str());
                self.heading(row, line, text);
                i += 1;
                continue;
            }

            if self.context == Context::Ignored {
                i += 1;
                continue;
            }

            if let Some(caps) = list_item_re().captures(line) {
                let indent = caps[1].len();
                let text = caps[2].trim().to_string();
                if self.claims_list_item(&text) {
                    i = self.list_item(i, indent, &text);
                    continue;
                }
            }

            self.describe(line);
            i += 1;
        }

        self.finish()
    }

    /// Consume leading `Key: Value` lines. Returns the first unconsumed line.
    fn read_metadata(&mut self) -> usize {
        let mut i = 0;
        while i < self.lines.len() && self.lines[i].trim().is_empty() {
            i += 1;
        }
        while i < self.lines.len() {
            let Some(caps) = metadata_re().captures(self.lines[i]) else {
                break;
            };
            self.doc
                .metadata
                .push((caps[1].to_string(), caps[2].trim().to_string()));
            i += 1;
        }
        i
    }

    fn heading(&mut self, row: usize, line: &str, text: &str) {
        if let Some(caps) = group_re().captures(text) {
            self.doc.groups.push(ResourceGroup {
                name: caps[1].trim().to_string(),
                ..Default::default()
            });
            self.context = Context::Group;
            return;
        }

        if let Some(caps) = resource_re().captures(text) {
            self.push_resource(row, caps[1].trim(), &caps[2]);
            return;
        }

        if let Some(caps) = action_re().captures(text) {
            if self.action_heading(row, &caps) {
                return;
            }
        }

        if let Some(caps) = endpoint_re().captures(text) {
            let method = &caps[1];
            if HTTP_METHODS.contains(&method) {
                self.push_resource(row, "", &caps[2]);
                self.push_action(row, "", method, None);
                return;
            }
        }

        if text.eq_ignore_ascii_case("Data Structures") {
            self.context = Context::Ignored;
            return;
        }

        if self.context == Context::Document && self.doc.name.is_empty() && self.doc.groups.is_empty()
        {
            self.doc.name = text.to_string();
            return;
        }

        if self.context != Context::Ignored {
            self.describe(line);
        }
    }

    /// Handle `Name [METHOD]` / `Name [METHOD /uri]`. Returns false when the
    /// bracket does not hold something method-like and the heading is plain text.
    fn action_heading(&mut self, row: usize, caps: &Captures<'_>) -> bool {
        let name = caps[1].trim();
        let method = &caps[2];
        let uri = caps.get(3).map(|m| m.as_str().to_string());

        if method != method.to_uppercase() {
            return false;
        }

        if !HTTP_METHODS.contains(&method) {
            self.report
                .error(row, 1, format!("unknown HTTP method '{method}'"));
        }

        if !self.in_resource() {
            match &uri {
                Some(uri) => self.push_resource(row, "", uri),
                None => {
                    self.report.error(
                        row,
                        1,
                        format!("action '{name}' is not inside a resource"),
                    );
                    self.push_resource(row, "", "");
                }
            }
        }

        self.push_action(row, name, method, uri);
        true
    }

    fn in_resource(&self) -> bool {
        matches!(self.context, Context::Resource | Context::Action)
    }

    fn push_resource(&mut self, row: usize, name: &str, uri: &str) {
        if self.doc.groups.is_empty() {
            self.doc.groups.push(ResourceGroup::default());
        }
        let group = self.doc.groups.len() - 1;
        let resources = &mut self.doc.groups[group].resources;
        resources.push(Resource {
            name: name.to_string(),
            uri_template: uri.to_string(),
            ..Default::default()
        });
        self.checks.push(Check::Resource {
            group,
            resource: resources.len() - 1,
            row,
        });
        self.context = Context::Resource;
    }

    fn push_action(&mut self, row: usize, name: &str, method: &str, uri: Option<String>) {
        let group = self.doc.groups.len() - 1;
        let resource = self.doc.groups[group].resources.len() - 1;
        let actions = &mut self.doc.groups[group].resources[resource].actions;
        actions.push(Action {
            name: name.to_string(),
            method: method.to_string(),
            uri_template: uri,
            ..Default::default()
        });
        self.checks.push(Check::Action {
            group,
            resource,
            action: actions.len() - 1,
            row,
        });
        self.context = Context::Action;
    }

    fn current_action(&mut self) -> Option<&mut Action> {
        if self.context != Context::Action {
            return None;
        }
        self.doc
            .groups
            .last_mut()?
            .resources
            .last_mut()?
            .actions
            .last_mut()
    }

    fn claims_list_item(&self, text: &str) -> bool {
        let keyword = first_word(text);
        self.context == Context::Action
            || keyword == "Request"
            || keyword == "Response"
            || SKIPPED_SECTIONS.contains(&keyword)
    }

    /// Handle a list item and its indented block. Returns the next line index.
    fn list_item(&mut self, start: usize, indent: usize, text: &str) -> usize {
        let row = start + 1;
        let col = indent + 1;
        let end = self.block_end(start, indent);
        let block: Vec<&str> = self.lines[start + 1..end].to_vec();
        let keyword = first_word(text);

        match keyword {
            "Request" | "Response" if self.context != Context::Action => {
                self.report.error(
                    row,
                    col,
                    format!("{} outside of an action", keyword.to_lowercase()),
                );
            }
            "Request" => {
                let (name, media_type) = match request_re().captures(text) {
                    Some(caps) => (
                        caps.get(1).map_or("", |m| m.as_str()).trim().to_string(),
                        caps.get(2).map(|m| m.as_str().trim().to_string()),
                    ),
                    None => (String::new(), None),
                };
                let (headers, body) = self.payload(&block, start + 1, media_type);
                self.push_request(Payload { name, headers, body });
            }
            "Response" => {
                let caps = response_re().captures(text);
                let status_text = caps
                    .as_ref()
                    .and_then(|c| c.get(1))
                    .map_or("200", |m| m.as_str());
                let media_type = caps
                    .as_ref()
                    .and_then(|c| c.get(2))
                    .map(|m| m.as_str().trim().to_string());

                let status = match status_text.parse::<u16>() {
                    Ok(code) if (100..=599).contains(&code) => code,
                    _ => {
                        self.report.error(
                            row,
                            col,
                            format!("invalid response status code '{status_text}'"),
                        );
                        500
                    }
                };

                let (headers, body) = self.payload(&block, start + 1, media_type);
                self.push_response(Response {
                    status,
                    headers,
                    body,
                });
            }
            k if SKIPPED_SECTIONS.contains(&k) => {}
            _ if indent == 0 => {
                self.report
                    .warn(row, col, format!("ignoring unrecognized section '{text}'"));
            }
            _ => {
                self.describe(self.lines[start]);
                return start + 1;
            }
        }

        end
    }

    /// Index one past the block nested under the list item at `start`.
    fn block_end(&self, start: usize, indent: usize) -> usize {
        let mut end = start + 1;
        let mut last_content = start + 1;
        while end < self.lines.len() {
            let line = self.lines[end];
            if line.trim().is_empty() {
                end += 1;
                continue;
            }
            if indentation(line) <= indent {
                break;
            }
            end += 1;
            last_content = end;
        }
        last_content
    }

    /// Split a payload block into headers and body. `first_row` is the
    /// 1-based row of the list item owning the block.
    fn payload(
        &mut self,
        block: &[&str],
        first_row: usize,
        media_type: Option<String>,
    ) -> (Vec<Header>, String) {
        let mut headers = Vec::new();
        if let Some(media_type) = media_type.filter(|m| !m.is_empty()) {
            headers.push(Header::new("Content-Type", media_type));
        }

        let base = block
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| indentation(l))
            .min();
        let Some(base) = base else {
            return (headers, String::new());
        };

        let sectioned = block
            .iter()
            .find(|l| !l.trim().is_empty())
            .is_some_and(|l| list_item_re().is_match(l));
        if !sectioned {
            return (headers, dedent(block));
        }

        let mut body = String::new();
        let mut k = 0;
        while k < block.len() {
            let line = block[k];
            let caps = (indentation(line) == base)
                .then(|| list_item_re().captures(line))
                .flatten();
            let Some(caps) = caps else {
                k += 1;
                continue;
            };

            let section = caps[2].trim().to_string();
            let mut end = k + 1;
            while end < block.len()
                && (block[end].trim().is_empty() || indentation(block[end]) > base)
            {
                end += 1;
            }
            let content = &block[k + 1..end];

            match first_word(&section) {
                "Headers" => {
                    for (offset, raw) in content.iter().enumerate() {
                        let trimmed = raw.trim();
                        if trimmed.is_empty() {
                            continue;
                        }
                        match header_line_re().captures(trimmed) {
                            Some(h) => {
                                let header = Header::new(&h[1], h[2].trim());
                                // An explicit header overrides the media type shorthand.
                                headers.retain(|x| !x.name.eq_ignore_ascii_case(&header.name));
                                headers.push(header);
                            }
                            None => self.report.warn(
                                first_row + k + offset + 2,
                                indentation(raw) + 1,
                                format!("malformed header line '{trimmed}'"),
                            ),
                        }
                    }
                }
                "Body" => body = dedent(content),
                s if SKIPPED_SECTIONS.contains(&s) => {}
                _ => self.report.warn(
                    first_row + k + 1,
                    base + 1,
                    format!("ignoring unrecognized section '{section}'"),
                ),
            }

            k = end;
        }

        (headers, body)
    }

    fn push_request(&mut self, request: Payload) {
        let Some(action) = self.current_action() else {
            return;
        };
        let reuse = action
            .transactions
            .last()
            .is_some_and(|t| t.request.is_none() && t.responses.is_empty());
        if reuse {
            if let Some(last) = action.transactions.last_mut() {
                last.request = Some(request);
            }
        } else {
            action.transactions.push(Transaction {
                request: Some(request),
                responses: Vec::new(),
            });
        }
    }

    fn push_response(&mut self, response: Response) {
        let Some(action) = self.current_action() else {
            return;
        };
        match action.transactions.last_mut() {
            Some(transaction) => transaction.responses.push(response),
            None => action.transactions.push(Transaction {
                request: None,
                responses: vec![response],
            }),
        }
    }

    /// Append a line of free text to the innermost element.
    fn describe(&mut self, line: &str) {
        let target = match self.context {
            Context::Ignored => return,
            Context::Document => Some(&mut self.doc.description),
            Context::Group => self.doc.groups.last_mut().map(|g| &mut g.description),
            Context::Resource => self
                .doc
                .groups
                .last_mut()
                .and_then(|g| g.resources.last_mut())
                .map(|r| &mut r.description),
            Context::Action => self
                .doc
                .groups
                .last_mut()
                .and_then(|g| g.resources.last_mut())
                .and_then(|r| r.actions.last_mut())
                .map(|a| &mut a.description),
        };

        if let Some(text) = target {
            if text.is_empty() && line.trim().is_empty() {
                return;
            }
            text.push_str(line);
            text.push('\n');
        }
    }

    fn finish(mut self) -> (Document, Report) {
        for check in &self.checks {
            match *check {
                Check::Resource {
                    group,
                    resource,
                    row,
                } => {
                    let r = &self.doc.groups[group].resources[resource];
                    if r.actions.is_empty() {
                        self.report.warn(
                            row,
                            1,
                            format!("resource '{}' has no actions", r.uri_template),
                        );
                    }
                }
                Check::Action {
                    group,
                    resource,
                    action,
                    row,
                } => {
                    let r = &self.doc.groups[group].resources[resource];
                    let a = &r.actions[action];
                    if a.responses().next().is_none() {
                        let uri = a.uri_template.as_deref().unwrap_or(&r.uri_template);
                        self.report.warn(
                            row,
                            1,
                            format!("action '{} {}' has no responses", a.method, uri),
                        );
                    }
                }
            }
        }

        trim_description(&mut self.doc.description);
        for group in &mut self.doc.groups {
            trim_description(&mut group.description);
            for resource in &mut group.resources {
                trim_description(&mut resource.description);
                for action in &mut resource.actions {
                    trim_description(&mut action.description);
                }
            }
        }

        (self.doc, self.report)
    }
}

fn first_word(text: &str) -> &str {
    text.split_whitespace().next().unwrap_or("")
}

/// Width of the leading space/tab run.
fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// Strip the common indentation and surrounding blank lines. Non-empty
/// results end with a newline.
fn dedent(lines: &[&str]) -> String {
    let base = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indentation(l))
        .min()
        .unwrap_or(0);

    let stripped: Vec<&str> = lines
        .iter()
        .map(|l| if l.trim().is_empty() { "" } else { &l[base..] })
        .collect();

    let first = stripped.iter().position(|l| !l.is_empty());
    let last = stripped.iter().rposition(|l| !l.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => {
            let mut body = stripped[first..=last].join("\n");
            body.push('\n');
            body
        }
        _ => String::new(),
    }
}

fn trim_description(text: &mut String) {
    let trimmed = text.trim_end();
    if trimmed.len() != text.len() {
        text.truncate(trimmed.len());
    }
}
