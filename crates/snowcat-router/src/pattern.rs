//! URI-template path patterns.
//!
//! Supported segment forms:
//! - `users`: literal
//! - `{id}`: any single segment
//! - `{id}.json`, `v{n}`: one variable with a literal prefix or suffix
//! - `{+path}`, `{path+}`: all remaining segments (at least one)
//!
//! Query (`{?a,b}`, `{&c}`) and fragment (`{#f}`) expressions are dropped,
//! since request matching ignores the query string.

use std::fmt;

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Template with query/fragment expressions removed.
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Param(String),
    /// One variable surrounded by literal text within a single segment.
    Partial {
        prefix: String,
        name: String,
        suffix: String,
    },
    /// Matches all remaining segments joined by `/`. Must be the last segment.
    Wildcard(String),
}

impl Pattern {
    /// Compile a URI template such as `/notes/{id}{?fields}`.
    pub fn parse(template: &str) -> Self {
        let source = strip_query(template);
        let segments = source
            .split('/')
            .filter(|s| !s.is_empty())
            .map(parse_segment)
            .collect();

        let source = if source.is_empty() {
            "/".to_string()
        } else if source.starts_with('/') {
            source
        } else {
            format!("/{source}")
        };

        Self { source, segments }
    }

    /// The template this pattern was compiled from, without query expressions.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match a request path (query string allowed) and capture variables.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let normalized = normalize_path(path);
        let parts: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();

        let mut params = Vec::new();
        let mut i = 0;
        for segment in &self.segments {
            if let Segment::Wildcard(name) = segment {
                if i >= parts.len() {
                    return None;
                }
                params.push((name.clone(), parts[i..].join("/")));
                return Some(params);
            }

            let part = parts.get(i)?;
            match segment {
                Segment::Static(literal) if literal != part => return None,
                Segment::Param(name) => params.push((name.clone(), part.to_string())),
                Segment::Partial {
                    prefix,
                    name,
                    suffix,
                } => {
                    let value = part
                        .strip_prefix(prefix.as_str())
                        .and_then(|rest| rest.strip_suffix(suffix.as_str()))
                        .filter(|value| !value.is_empty())?;
                    params.push((name.clone(), value.to_string()));
                }
                _ => {}
            }
            i += 1;
        }

        (i == parts.len()).then_some(params)
    }

    /// Whether the request path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.captures(path).is_some()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Remove `{?...}`, `{&...}`, `{#...}` expressions and any literal query part.
fn strip_query(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let (before, after) = rest.split_at(open);
        // A literal `?` before the next expression ends the path.
        if let Some(q) = before.find('?') {
            out.push_str(&before[..q]);
            return out;
        }
        out.push_str(before);

        let Some(close) = after.find('}') else {
            out.push_str(after);
            return out;
        };
        let expression = &after[..=close];
        if !matches!(expression.as_bytes().get(1), Some(b'?' | b'&' | b'#')) {
            out.push_str(expression);
        }
        rest = &after[close + 1..];
    }

    match rest.find('?') {
        Some(q) => out.push_str(&rest[..q]),
        None => out.push_str(rest),
    }
    out
}

fn parse_segment(segment: &str) -> Segment {
    let (Some(open), Some(close)) = (segment.find('{'), segment.rfind('}')) else {
        return Segment::Static(segment.to_string());
    };
    if close < open {
        return Segment::Static(segment.to_string());
    }

    let inner = &segment[open + 1..close];
    let prefix = &segment[..open];
    let suffix = &segment[close + 1..];

    if let Some(name) = inner.strip_prefix('+').or_else(|| inner.strip_suffix('+')) {
        return Segment::Wildcard(name.to_string());
    }

    // Several expressions in one segment: fall back to a whole-segment match.
    if inner.contains('{') || inner.contains('}') {
        return Segment::Param(inner.replace(['{', '}'], ""));
    }

    if prefix.is_empty() && suffix.is_empty() {
        Segment::Param(inner.to_string())
    } else {
        Segment::Partial {
            prefix: prefix.to_string(),
            name: inner.to_string(),
            suffix: suffix.to_string(),
        }
    }
}

/// Normalize a request path: strip trailing slashes, collapse double slashes.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut prev_slash = false;

    for ch in path.chars() {
        if ch == '/' {
            if !prev_slash {
                normalized.push('/');
            }
            prev_slash = true;
        } else {
            normalized.push(ch);
            prev_slash = false;
        }
    }

    // Strip trailing slash (but keep root "/")
    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    if normalized.is_empty() {
        "/".to_string()
    } else {
        normalized
    }
}
