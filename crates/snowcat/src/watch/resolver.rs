//! Computes the set of files a watch session observes.

use std::fs;
use std::path::{Path, PathBuf};

use super::{PathWatcher, WatchError};

/// The files observed by one watch session.
///
/// Always holds the primary document. The template is present only when it
/// existed at setup time, and seeds are those reported at setup time; an
/// include added later is picked up on the next session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSet {
    primary: PathBuf,
    template: Option<PathBuf>,
    seeds: Vec<PathBuf>,
}

impl WatchSet {
    pub fn primary(&self) -> &Path {
        &self.primary
    }

    pub fn template(&self) -> Option<&Path> {
        self.template.as_deref()
    }

    pub fn seeds(&self) -> &[PathBuf] {
        &self.seeds
    }

    /// Every observed path: primary, template, then seeds.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.primary.as_path())
            .chain(self.template.as_deref())
            .chain(self.seeds.iter().map(PathBuf::as_path))
    }

    pub fn len(&self) -> usize {
        1 + usize::from(self.template.is_some()) + self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Register the primary document, its template and its seeds with `watcher`.
///
/// Only a failure to watch the primary document is an error. A template
/// that does not exist is skipped, and seeds that cannot be watched are
/// logged and skipped.
pub fn resolve<F>(
    watcher: &mut PathWatcher,
    primary: &Path,
    template: Option<&Path>,
    seeds: F,
) -> Result<WatchSet, WatchError>
where
    F: FnOnce(&Path) -> Vec<PathBuf>,
{
    watcher.add(primary)?;

    let template = match template {
        Some(path) if fs::metadata(path).is_ok() => match watcher.add(path) {
            Ok(()) => Some(path.to_path_buf()),
            Err(e) => {
                tracing::warn!(template = %path.display(), error = %e, "not watching template");
                None
            }
        },
        _ => None,
    };

    let seeds = seeds(primary)
        .into_iter()
        .filter(|seed| match watcher.add(seed) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(seed = %seed.display(), error = %e, "not watching seed");
                false
            }
        })
        .collect();

    Ok(WatchSet {
        primary: primary.to_path_buf(),
        template,
        seeds,
    })
}
