//! Mock routing for API Blueprint documents.
//!
//! Extracts one [`RouteDescriptor`] per declared (action, response) pair,
//! merges the routes of several documents into a [`RouteTable`] that keeps
//! document identity, and dispatches requests against it with a
//! first-match-wins policy.

pub mod dispatch;
pub mod pattern;
pub mod table;

pub use dispatch::{preferred_status, Dispatcher, MockResponse, RouteMatch};
pub use pattern::{normalize_path, Pattern};
pub use table::{merge, routes_for, RouteDescriptor, RouteTable};
