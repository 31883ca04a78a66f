use std::fmt;

use serde::Serialize;

/// How serious an annotation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// A problem found in the source, anchored at a 1-based row and column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub row: usize,
    pub col: usize,
    pub severity: Severity,
    pub description: String,
}

/// Validation report for a blueprint. Empty means the source is clean.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub annotations: Vec<Annotation>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.annotations
            .iter()
            .any(|a| a.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .filter(|a| a.severity == Severity::Error)
    }

    pub(crate) fn warn(&mut self, row: usize, col: usize, description: impl Into<String>) {
        self.push(row, col, Severity::Warning, description);
    }

    pub(crate) fn error(&mut self, row: usize, col: usize, description: impl Into<String>) {
        self.push(row, col, Severity::Error, description);
    }

    fn push(&mut self, row: usize, col: usize, severity: Severity, description: impl Into<String>) {
        self.annotations.push(Annotation {
            row,
            col,
            severity,
            description: description.into(),
        });
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors: Vec<_> = self.errors().collect();
        match errors.first() {
            Some(first) => write!(
                f,
                "blueprint has {} error(s); first at {}:{}: {}",
                errors.len(),
                first.row,
                first.col,
                first.description
            ),
            None => write!(f, "blueprint has {} warning(s)", self.annotations.len()),
        }
    }
}
