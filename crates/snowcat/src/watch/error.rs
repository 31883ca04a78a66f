//! Error types for the watch subsystem.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from watcher setup and from the notification stream.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("file does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("path is a directory: {}", .0.display())]
    IsDirectory(PathBuf),

    #[error("failed to initialize watcher: {0}")]
    InitFailed(#[source] notify::Error),

    #[error("cannot watch {}: {source}", path.display())]
    PathWatchFailed {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("file system event error: {0}")]
    EventError(#[source] notify::Error),
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed(e)
    }
}
