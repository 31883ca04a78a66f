//! The `lint` command: validate a blueprint and tabulate its annotations.

use std::path::Path;

use snowcat_blueprint::{ParseError, Parser, Report};

const HEADER: &str = "Char Index";
const MIN_WIDTH: usize = 8;
const RULE: &str = "--------";

/// Read (with includes expanded) and validate a blueprint.
pub fn lint(path: &Path, parser: &dyn Parser) -> Result<Report, ParseError> {
    let source = snowcat_blueprint::read(path)?;
    Ok(parser.validate(&source))
}

/// Format annotations as a `row:col | description` table.
pub fn format_report(report: &Report) -> String {
    let positions: Vec<String> = report
        .annotations
        .iter()
        .map(|a| format!("{}:{}", a.row, a.col))
        .collect();

    let width = positions
        .iter()
        .map(String::len)
        .chain([HEADER.len(), MIN_WIDTH])
        .max()
        .unwrap_or(MIN_WIDTH);

    let mut out = String::new();
    out.push_str(&format!("{HEADER:<width$}|Description\n"));
    out.push_str(&format!("{}|{}\n", "-".repeat(width), RULE.repeat(8)));
    for (position, annotation) in positions.iter().zip(&report.annotations) {
        out.push_str(&format!("{position:<width$}|{}\n", annotation.description));
    }
    out
}
