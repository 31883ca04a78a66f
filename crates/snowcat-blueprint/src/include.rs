//! `<!-- include(path) -->` expansion and seed discovery.
//!
//! Include paths are resolved relative to the directory of the file that
//! contains the directive. Expansion is recursive; a file that ends up
//! including itself is rejected.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex_lite::Regex;

use crate::error::ParseError;
use crate::model::Document;
use crate::parser::Parser;

fn include_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([ \t]*)<!--\s*include\((.+?)\)\s*-->\s*$").expect("static pattern is valid")
    })
}

/// Read a blueprint and expand all of its includes.
pub fn read(path: &Path) -> Result<String, ParseError> {
    let mut stack = Vec::new();
    expand(path, &mut stack)
}

/// Read, expand, and parse a blueprint.
pub fn load(path: &Path, parser: &dyn Parser) -> Result<Document, ParseError> {
    let source = read(path)?;
    parser.parse(&source)
}

/// Every file transitively included by `path`, in discovery order.
///
/// Missing or unreadable includes are skipped; the primary path itself is
/// never part of the result.
pub fn seeds(path: &Path) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    if let Some(primary) = canonical(path) {
        seen.insert(primary);
    }
    collect_seeds(path, &mut seen, &mut found);
    found
}

fn collect_seeds(path: &Path, seen: &mut HashSet<PathBuf>, found: &mut Vec<PathBuf>) {
    let Ok(source) = fs::read_to_string(path) else {
        return;
    };

    for line in source.lines() {
        let Some(target) = include_target(path, line) else {
            continue;
        };
        let Some(key) = canonical(&target) else {
            tracing::debug!(include = %target.display(), "skipping missing include");
            continue;
        };
        if seen.insert(key) {
            found.push(target.clone());
            collect_seeds(&target, seen, found);
        }
    }
}

fn expand(path: &Path, stack: &mut Vec<PathBuf>) -> Result<String, ParseError> {
    check_file(path)?;

    let key = canonical(path).unwrap_or_else(|| path.to_path_buf());
    if stack.contains(&key) {
        return Err(ParseError::IncludeCycle(path.to_path_buf()));
    }

    let source = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    stack.push(key);
    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        match include_re().captures(line) {
            Some(caps) => {
                let indent = &caps[1];
                let target = resolve(path, caps[2].trim());
                let included = expand(&target, stack)?;
                for included_line in included.lines() {
                    if !included_line.is_empty() {
                        out.push_str(indent);
                    }
                    out.push_str(included_line);
                    out.push('\n');
                }
            }
            None => {
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    stack.pop();

    Ok(out)
}

/// Reject missing paths and directories before reading.
fn check_file(path: &Path) -> Result<(), ParseError> {
    let metadata =
        fs::metadata(path).map_err(|_| ParseError::NotFound(path.to_path_buf()))?;
    if metadata.is_dir() {
        return Err(ParseError::IsDirectory(path.to_path_buf()));
    }
    Ok(())
}

fn include_target(including: &Path, line: &str) -> Option<PathBuf> {
    let caps = include_re().captures(line)?;
    Some(resolve(including, caps[2].trim()))
}

fn resolve(including: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        return target.to_path_buf();
    }
    including
        .parent()
        .map(|dir| dir.join(target))
        .unwrap_or_else(|| target.to_path_buf())
}

fn canonical(path: &Path) -> Option<PathBuf> {
    fs::canonicalize(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::BlueprintParser;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn read_expands_nested_includes() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "api.apib", "# API\n\n<!-- include(parts/users.apib) -->\n");
        write(
            &dir,
            "parts/users.apib",
            "## Users [/users]\n\n<!-- include(list.apib) -->\n",
        );
        write(&dir, "parts/list.apib", "### List [GET]\n\n+ Response 200\n");

        let source = read(&main).unwrap();
        assert!(source.contains("## Users [/users]"));
        assert!(source.contains("+ Response 200"));
        assert!(!source.contains("include("));
    }

    #[test]
    fn read_indents_included_lines() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "api.apib", "    <!-- include(body.json) -->\n");
        write(&dir, "body.json", "{\n  \"a\": 1\n}\n");

        assert_eq!(read(&main).unwrap(), "    {\n      \"a\": 1\n    }\n");
    }

    #[test]
    fn read_rejects_missing_file_and_directory() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read(&dir.path().join("nope.apib")),
            Err(ParseError::NotFound(_))
        ));
        assert!(matches!(read(dir.path()), Err(ParseError::IsDirectory(_))));
    }

    #[test]
    fn read_rejects_missing_include() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "api.apib", "<!-- include(gone.apib) -->\n");
        assert!(matches!(read(&main), Err(ParseError::NotFound(_))));
    }

    #[test]
    fn read_detects_include_cycles() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.apib", "<!-- include(b.apib) -->\n");
        write(&dir, "b.apib", "<!-- include(a.apib) -->\n");
        assert!(matches!(read(&a), Err(ParseError::IncludeCycle(_))));
    }

    #[test]
    fn seeds_lists_transitive_includes_once() {
        let dir = TempDir::new().unwrap();
        let main = write(
            &dir,
            "api.apib",
            "<!-- include(a.apib) -->\n<!-- include(b.apib) -->\n<!-- include(missing.apib) -->\n",
        );
        let a = write(&dir, "a.apib", "<!-- include(b.apib) -->\n");
        let b = write(&dir, "b.apib", "<!-- include(api.apib) -->\n");

        assert_eq!(seeds(&main), vec![a, b]);
    }

    #[test]
    fn seeds_of_plain_document_is_empty() {
        let dir = TempDir::new().unwrap();
        let main = write(&dir, "api.apib", "# API\n");
        assert!(seeds(&main).is_empty());
    }

    #[test]
    fn load_parses_expanded_source() {
        let dir = TempDir::new().unwrap();
        let main = write(
            &dir,
            "api.apib",
            "# API\n\n## Users [/users]\n\n<!-- include(list.apib) -->\n",
        );
        write(&dir, "list.apib", "### List [GET]\n\n+ Response 200\n");

        let doc = load(&main, &BlueprintParser::new()).unwrap();
        assert_eq!(doc.groups[0].resources[0].actions[0].method, "GET");
    }
}
