//! File watching and the live-rebuild loop.
//!
//! [`PathWatcher`] puts native notifications and polling behind one
//! contract: `add(path)` plus an ordered stream of [`ChangeEvent`]s and an
//! ordered stream of [`WatchError`]s. The rest of the subsystem
//! ([`resolver`], [`rebuild`], [`session`]) never sees which backend is in use.

mod error;
pub mod rebuild;
pub mod resolver;
pub mod session;

pub use error::WatchError;
pub use rebuild::{
    ConsoleSink, RebuildAction, RebuildCoordinator, RebuildError, RebuildGate, RebuildOutcome,
    RebuildSink, RebuildState,
};
pub use resolver::{resolve, WatchSet};
pub use session::WatchSession;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::event::{EventKind, MetadataKind, ModifyKind};
use notify::{Event, PollWatcher, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 100;

/// Which notification mechanism backs a [`PathWatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Native OS notifications (inotify, FSEvents, ReadDirectoryChangesW).
    Native,
    /// Stat every watched directory at a fixed interval.
    Poll(Duration),
}

/// The kind of change observed on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Create,
    Write,
    Remove,
    Rename,
    Other,
}

impl From<&EventKind> for Op {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => Op::Create,
            EventKind::Modify(ModifyKind::Data(_))
            | EventKind::Modify(ModifyKind::Any)
            | EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) => Op::Write,
            EventKind::Modify(ModifyKind::Name(_)) => Op::Rename,
            EventKind::Remove(_) => Op::Remove,
            _ => Op::Other,
        }
    }
}

/// A change on one watched path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub op: Op,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, op: Op) -> Self {
        Self {
            path: path.into(),
            op,
        }
    }

    /// Only content writes trigger a rebuild.
    pub fn is_qualifying(&self) -> bool {
        self.op == Op::Write
    }
}

/// Receiving ends of a watcher's event and error streams.
#[derive(Debug)]
pub struct WatchStreams {
    pub events: mpsc::Receiver<ChangeEvent>,
    pub errors: mpsc::Receiver<WatchError>,
}

impl WatchStreams {
    /// A pair of streams fed by hand instead of by a watcher.
    pub fn channel() -> (mpsc::Sender<ChangeEvent>, mpsc::Sender<WatchError>, Self) {
        let (event_tx, events) = mpsc::channel(CHANNEL_CAPACITY);
        let (error_tx, errors) = mpsc::channel(CHANNEL_CAPACITY);
        (event_tx, error_tx, Self { events, errors })
    }
}

/// Watches individual files through either backend.
///
/// Each file's parent directory is watched non-recursively and events are
/// filtered down to the files that were added, so a file replaced by
/// rename-on-save is still watched afterwards. That replacement itself
/// arrives as a `Create` or `Rename` event and does not qualify for a
/// rebuild; only in-place writes do. OS handles are released when the
/// watcher is dropped.
pub struct PathWatcher {
    inner: Box<dyn Watcher + Send>,
    files: Arc<RwLock<HashSet<PathBuf>>>,
    dirs: HashSet<PathBuf>,
    backend: Backend,
}

impl PathWatcher {
    /// Open a watcher handle and return it with its streams.
    pub fn new(backend: Backend) -> Result<(Self, WatchStreams), WatchError> {
        let (event_tx, error_tx, streams) = WatchStreams::channel();
        let files = Arc::new(RwLock::new(HashSet::new()));
        let forwarder = EventForwarder {
            files: Arc::clone(&files),
            events: event_tx,
            errors: error_tx,
        };

        let inner: Box<dyn Watcher + Send> = match backend {
            Backend::Native => Box::new(RecommendedWatcher::new(
                forwarder,
                notify::Config::default(),
            )?),
            Backend::Poll(interval) => Box::new(PollWatcher::new(
                forwarder,
                // Poll mtimes only have whole-second resolution; hashing the
                // contents catches writes landing within the same second.
                notify::Config::default()
                    .with_poll_interval(interval)
                    .with_compare_contents(true),
            )?),
        };

        let watcher = Self {
            inner,
            files,
            dirs: HashSet::new(),
            backend,
        };
        Ok((watcher, streams))
    }

    /// Start watching a file.
    ///
    /// Fails with [`WatchError::NotFound`] when the path does not exist and
    /// with [`WatchError::IsDirectory`] when it is not a file.
    pub fn add(&mut self, path: &Path) -> Result<(), WatchError> {
        let metadata = fs::metadata(path).map_err(|_| WatchError::NotFound(path.to_path_buf()))?;
        if metadata.is_dir() {
            return Err(WatchError::IsDirectory(path.to_path_buf()));
        }
        let canonical =
            fs::canonicalize(path).map_err(|_| WatchError::NotFound(path.to_path_buf()))?;

        let dir = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| canonical.clone());
        if !self.dirs.contains(&dir) {
            self.inner
                .watch(&dir, RecursiveMode::NonRecursive)
                .map_err(|source| WatchError::PathWatchFailed {
                    path: dir.clone(),
                    source,
                })?;
            tracing::debug!(dir = %dir.display(), "watching directory");
            self.dirs.insert(dir);
        }

        self.files.write().insert(canonical);
        Ok(())
    }

    /// Canonical paths of every watched file, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.read().iter().cloned().collect();
        paths.sort();
        paths
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Release every OS handle. Equivalent to dropping the watcher.
    pub fn close(self) {
        drop(self);
    }
}

impl std::fmt::Debug for PathWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathWatcher")
            .field("backend", &self.backend)
            .field("files", &self.files.read().len())
            .field("dirs", &self.dirs.len())
            .finish()
    }
}

/// Runs on the notify thread; filters events and feeds the streams.
struct EventForwarder {
    files: Arc<RwLock<HashSet<PathBuf>>>,
    events: mpsc::Sender<ChangeEvent>,
    errors: mpsc::Sender<WatchError>,
}

impl EventForwarder {
    fn is_watched(&self, path: &Path) -> bool {
        let files = self.files.read();
        if files.contains(path) {
            return true;
        }
        canonical_lenient(path).is_some_and(|p| files.contains(&p))
    }
}

impl notify::EventHandler for EventForwarder {
    fn handle_event(&mut self, event: notify::Result<Event>) {
        match event {
            Ok(event) => {
                let op = Op::from(&event.kind);
                for path in event.paths {
                    if !self.is_watched(&path) {
                        continue;
                    }
                    // A full queue means a rebuild is already due.
                    if let Err(e) = self.events.try_send(ChangeEvent::new(path, op)) {
                        tracing::debug!(error = %e, "dropping change event");
                    }
                }
            }
            Err(e) => {
                if let Err(e) = self.errors.try_send(WatchError::EventError(e)) {
                    tracing::debug!(error = %e, "dropping watcher error");
                }
            }
        }
    }
}

/// Canonicalize a path, falling back to its canonical parent for files
/// that no longer exist.
fn canonical_lenient(path: &Path) -> Option<PathBuf> {
    fs::canonicalize(path).ok().or_else(|| {
        let parent = fs::canonicalize(path.parent()?).ok()?;
        Some(parent.join(path.file_name()?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};
    use tempfile::TempDir;

    #[test]
    fn test_only_writes_qualify() {
        let write = Op::from(&EventKind::Modify(ModifyKind::Data(DataChange::Content)));
        let poll_write = Op::from(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::WriteTime,
        )));
        assert_eq!(write, Op::Write);
        assert_eq!(poll_write, Op::Write);

        assert_eq!(Op::from(&EventKind::Create(CreateKind::File)), Op::Create);
        assert_eq!(Op::from(&EventKind::Remove(RemoveKind::File)), Op::Remove);
        assert_eq!(
            Op::from(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            Op::Rename
        );
        assert_eq!(
            Op::from(&EventKind::Modify(ModifyKind::Metadata(
                MetadataKind::Permissions
            ))),
            Op::Other
        );

        assert!(ChangeEvent::new("a", Op::Write).is_qualifying());
        assert!(!ChangeEvent::new("a", Op::Create).is_qualifying());
        assert!(!ChangeEvent::new("a", Op::Remove).is_qualifying());
        assert!(!ChangeEvent::new("a", Op::Rename).is_qualifying());
    }

    #[tokio::test]
    async fn test_add_rejects_missing_path_and_directory() {
        let dir = TempDir::new().unwrap();
        let (mut watcher, _streams) =
            PathWatcher::new(Backend::Poll(Duration::from_secs(60))).unwrap();

        assert!(matches!(
            watcher.add(&dir.path().join("missing.apib")),
            Err(WatchError::NotFound(_))
        ));
        assert!(matches!(
            watcher.add(dir.path()),
            Err(WatchError::IsDirectory(_))
        ));
        assert!(watcher.paths().is_empty());
    }

    #[tokio::test]
    async fn test_add_tracks_canonical_paths() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.apib");
        let b = dir.path().join("b.apib");
        fs::write(&a, "# A\n").unwrap();
        fs::write(&b, "# B\n").unwrap();

        let (mut watcher, _streams) =
            PathWatcher::new(Backend::Poll(Duration::from_secs(60))).unwrap();
        watcher.add(&a).unwrap();
        watcher.add(&b).unwrap();
        watcher.add(&a).unwrap();

        assert_eq!(
            watcher.paths(),
            vec![fs::canonicalize(&a).unwrap(), fs::canonicalize(&b).unwrap()]
        );
        assert_eq!(watcher.dirs.len(), 1);
    }

    async fn next_write(streams: &mut WatchStreams) -> ChangeEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match streams.events.recv().await {
                    Some(event) if event.is_qualifying() => return Some(event),
                    Some(_) => continue,
                    None => return None,
                }
            }
        })
        .await
        .expect("no write event within 5s")
        .expect("event stream closed")
    }

    #[tokio::test]
    async fn test_poll_backend_reports_writes() {
        let dir = TempDir::new().unwrap();
        let watched = dir.path().join("api.apib");
        let sibling = dir.path().join("notes.txt");
        fs::write(&watched, "# API\n").unwrap();
        fs::write(&sibling, "scratch\n").unwrap();

        let (mut watcher, mut streams) =
            PathWatcher::new(Backend::Poll(Duration::from_millis(50))).unwrap();
        watcher.add(&watched).unwrap();

        // Let the poller record the initial state before changing anything.
        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::write(&sibling, "scratch, edited\n").unwrap();
        fs::write(&watched, "# API\n\nEdited and longer.\n").unwrap();

        let event = next_write(&mut streams).await;
        assert_eq!(
            fs::canonicalize(&event.path).unwrap(),
            fs::canonicalize(&watched).unwrap()
        );
        watcher.close();
    }

    #[tokio::test]
    async fn test_poll_backend_reports_same_second_edits() {
        let dir = TempDir::new().unwrap();
        let watched = dir.path().join("api.apib");
        fs::write(&watched, "# API v1\n").unwrap();

        let (mut watcher, mut streams) =
            PathWatcher::new(Backend::Poll(Duration::from_millis(50))).unwrap();
        watcher.add(&watched).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Same length each time, well inside one second: only the contents
        // differ from one scan to the next.
        fs::write(&watched, "# API v2\n").unwrap();
        next_write(&mut streams).await;
        fs::write(&watched, "# API v3\n").unwrap();
        next_write(&mut streams).await;

        watcher.close();
    }

    #[tokio::test]
    async fn test_native_backend_reports_writes() {
        let dir = TempDir::new().unwrap();
        let watched = dir.path().join("api.apib");
        let sibling = dir.path().join("notes.txt");
        fs::write(&watched, "# API\n").unwrap();
        fs::write(&sibling, "scratch\n").unwrap();

        let (mut watcher, mut streams) = PathWatcher::new(Backend::Native).unwrap();
        watcher.add(&watched).unwrap();
        assert_eq!(watcher.backend(), Backend::Native);

        fs::write(&sibling, "scratch, edited\n").unwrap();
        fs::write(&watched, "# API\n\nEdited.\n").unwrap();

        let event = next_write(&mut streams).await;
        assert_eq!(
            fs::canonicalize(&event.path).unwrap(),
            fs::canonicalize(&watched).unwrap()
        );
        watcher.close();
    }
}
