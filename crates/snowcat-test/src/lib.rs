//! Test harnesses for snowcat.
//!
//! Provides `TestMockServer`, which runs `snowcat mock` as a child process
//! on a free port, plus the CLI regression suite.

#[cfg(test)]
pub mod cli;
pub mod mock;

pub use mock::{fixture, TestError, TestMockServer};
