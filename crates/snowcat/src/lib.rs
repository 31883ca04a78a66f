//! snowcat library.
//!
//! Everything the `snowcat` binary does lives here so it can be tested
//! without spawning processes: the file watcher and coalescing rebuild
//! loop, the render pipeline, lint output, and the static and mock HTTP
//! servers.

pub mod config;
pub mod lint;
pub mod pipeline;
pub mod render;
pub mod serve;
pub mod watch;
