//! API Blueprint document model and parser.
//!
//! Reads `.apib` sources, expands `<!-- include(...) -->` directives, and
//! produces a [`Document`] holding resource groups, resources, actions and
//! their example transactions. Parsing goes through the [`Parser`] trait so
//! callers can substitute their own engine.

pub mod error;
pub mod include;
pub mod model;
pub mod parser;
pub mod report;

pub use error::ParseError;
pub use include::{load, read, seeds};
pub use model::{Action, Document, Header, Payload, Resource, ResourceGroup, Response, Transaction};
pub use parser::{BlueprintParser, Parser};
pub use report::{Annotation, Report, Severity};
