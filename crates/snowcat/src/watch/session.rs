//! A running watch session: watcher, watch set and event loop.

use std::path::{Path, PathBuf};

use tokio::task::JoinHandle;

use snowcat_telemetry::{log_watcher_error, log_watching};

use super::{resolve, PathWatcher, RebuildCoordinator, WatchError, WatchSet, WatchStreams};
use crate::config::WatchConfig;

/// Owns the watcher for the lifetime of the session.
///
/// Dropping the session (or a failed [`WatchSession::start`]) releases the
/// OS watch handles.
#[derive(Debug)]
pub struct WatchSession {
    watcher: PathWatcher,
    watch_set: WatchSet,
    task: JoinHandle<()>,
}

impl WatchSession {
    /// Open a watcher for `config`, register the watch set and spawn the
    /// event loop.
    pub fn start<F>(
        config: &WatchConfig,
        primary: &Path,
        template: Option<&Path>,
        seeds: F,
        coordinator: RebuildCoordinator,
    ) -> Result<Self, WatchError>
    where
        F: FnOnce(&Path) -> Vec<PathBuf>,
    {
        let (mut watcher, streams) = PathWatcher::new(config.backend())?;
        let watch_set = resolve(&mut watcher, primary, template, seeds)?;

        log_watching!(
            primary = %primary.display(),
            files = watch_set.len(),
            backend = ?watcher.backend(),
            "watching for changes"
        );

        let task = tokio::spawn(run_event_loop(streams, coordinator));
        Ok(Self {
            watcher,
            watch_set,
            task,
        })
    }

    pub fn watch_set(&self) -> &WatchSet {
        &self.watch_set
    }

    /// Wait for the event loop. It only ends when the watcher's streams close.
    pub async fn run(self) {
        let Self { watcher, task, .. } = self;
        if let Err(e) = task.await {
            tracing::error!(error = %e, "watch loop ended abnormally");
        }
        watcher.close();
    }
}

/// Feed qualifying change events to the coordinator and log watcher errors.
///
/// Each stream is consumed in order; the two streams are not ordered with
/// respect to each other.
pub async fn run_event_loop(mut streams: WatchStreams, coordinator: RebuildCoordinator) {
    loop {
        tokio::select! {
            Some(event) = streams.events.recv() => {
                if event.is_qualifying() {
                    tracing::debug!(path = %event.path.display(), "change detected");
                    coordinator.trigger();
                } else {
                    tracing::trace!(path = %event.path.display(), op = ?event.op, "ignoring change");
                }
            }
            Some(error) = streams.errors.recv() => {
                log_watcher_error!(error = %error, "watcher error");
            }
            else => break,
        }
    }
}
