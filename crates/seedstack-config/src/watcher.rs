//! File watching for configuration sources.
//!
//! The [`SourceWatcher`] monitors the files backing registered sources and
//! reports which source changed. Reloading is left to the caller, usually
//! through [`ConfigResolver::reload`](crate::ConfigResolver::reload).
//!
//! Editors often save by writing a temporary file and renaming it over the
//! original, so the watcher observes the parent directory of each file rather
//! than the file itself, and matches events by normalized path.
//!
//! # Example
//!
//! ```no_run
//! use seedstack_config::{ConfigBuilder, SourceWatcher};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), seedstack_config::ConfigError> {
//! let mut resolver = ConfigBuilder::new()
//!     .with_file("application.yaml")?
//!     .build()?;
//!
//! let mut watcher = SourceWatcher::builder()
//!     .with_debounce(Duration::from_millis(250))
//!     .watch_sources(resolver.watched_paths())?
//!     .build()?;
//!
//! while let Some(change) = watcher.next().await {
//!     resolver.reload(&change.source)?;
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ConfigError;

/// Kind of change observed on a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// File was created.
    Created,
    /// File content changed.
    Modified,
    /// File was deleted.
    Removed,
    /// File was renamed into or out of place.
    Renamed,
}

impl ChangeKind {
    fn from_event(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(ModifyKind::Name(_)) => Some(Self::Renamed),
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Removed),
            EventKind::Access(_) | EventKind::Other | EventKind::Any => None,
        }
    }
}

/// A change affecting a registered source.
#[derive(Debug, Clone)]
pub struct SourceChange {
    /// Name of the affected source.
    pub source: String,
    /// Path of the file backing the source.
    pub path: PathBuf,
    /// What happened to the file.
    pub kind: ChangeKind,
    /// When the change was observed.
    pub timestamp: Instant,
}

/// Builder for a [`SourceWatcher`].
#[derive(Debug, Clone)]
pub struct SourceWatcherBuilder {
    debounce: Duration,
    targets: Vec<(String, PathBuf)>,
}

impl Default for SourceWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceWatcherBuilder {
    /// Create a new builder with a 500ms debounce.
    #[must_use]
    pub fn new() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            targets: Vec::new(),
        }
    }

    /// Set the debounce duration.
    ///
    /// A source is reported once it has been quiet for this duration. Bursts
    /// of events on the same source collapse into the last one.
    #[must_use]
    pub fn with_debounce(mut self, duration: Duration) -> Self {
        self.debounce = duration;
        self
    }

    /// Watch the file backing `source`.
    ///
    /// The file itself may be missing, but its directory must exist.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the parent directory does not exist.
    pub fn watch_source(
        mut self,
        source: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let directory = parent_dir(path);
        if !directory.is_dir() {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("directory does not exist: {}", directory.display()),
            )));
        }
        self.targets.push((source.into(), path.to_path_buf()));
        Ok(self)
    }

    /// Watch several `(source, path)` pairs.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Self::watch_source`].
    pub fn watch_sources<I>(self, sources: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, PathBuf)>,
    {
        sources
            .into_iter()
            .try_fold(self, |builder, (source, path)| builder.watch_source(source, path))
    }

    /// Build the watcher and start receiving events.
    ///
    /// # Errors
    ///
    /// Returns an error if no source is configured or if the watcher cannot
    /// be created.
    pub fn build(self) -> Result<SourceWatcher, ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "no sources configured for watcher".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(100);
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(error) => warn!(%error, "file watcher error"),
            }
        })
        .map_err(|e| ConfigError::InvalidConfig {
            message: format!("failed to create file watcher: {e}"),
        })?;

        let mut directories = HashSet::new();
        let mut targets = HashMap::new();
        for (source, path) in self.targets {
            let directory = parent_dir(&path).to_path_buf();
            if directories.insert(directory.clone()) {
                watcher
                    .watch(&directory, RecursiveMode::NonRecursive)
                    .map_err(|e| {
                        ConfigError::Io(std::io::Error::other(format!(
                            "failed to watch {}: {e}",
                            directory.display()
                        )))
                    })?;
            }
            debug!(source = %source, path = %path.display(), "watching configuration source");
            targets.insert(normalize(&path), (source, path));
        }

        Ok(SourceWatcher {
            _watcher: watcher,
            rx,
            targets,
            debounce: self.debounce,
            pending: HashMap::new(),
        })
    }
}

/// Watches the files backing configuration sources.
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Event>,
    targets: HashMap<PathBuf, (String, PathBuf)>,
    debounce: Duration,
    pending: HashMap<String, SourceChange>,
}

impl std::fmt::Debug for SourceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceWatcher")
            .field("targets", &self.targets)
            .field("debounce", &self.debounce)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl SourceWatcher {
    /// Create a new watcher builder.
    #[must_use]
    pub fn builder() -> SourceWatcherBuilder {
        SourceWatcherBuilder::new()
    }

    /// Names of the watched sources.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.targets.values().map(|(source, _)| source.as_str())
    }

    /// Wait for the next change to a watched source.
    ///
    /// A change is delivered once its source has been quiet for the debounce
    /// duration. Returns `None` once the underlying watcher stops and every
    /// pending change has been delivered.
    pub async fn next(&mut self) -> Option<SourceChange> {
        loop {
            if let Some(change) = self.take_due(Instant::now()) {
                return Some(change);
            }
            let event = match self.next_deadline() {
                Some(deadline) => {
                    let deadline = tokio::time::Instant::from_std(deadline);
                    match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                        Ok(event) => event,
                        Err(_) => continue,
                    }
                }
                None => self.rx.recv().await,
            };
            match event {
                Some(event) => {
                    if let Some(change) = self.match_event(&event) {
                        return Some(change);
                    }
                }
                // Flush what is still pending once the channel closes.
                None => return self.take_due(Instant::now() + self.debounce),
            }
        }
    }

    /// Return a settled change without waiting.
    pub fn try_next(&mut self) -> Option<SourceChange> {
        while let Ok(event) = self.rx.try_recv() {
            if let Some(change) = self.match_event(&event) {
                return Some(change);
            }
        }
        self.take_due(Instant::now())
    }

    /// Records the event against its source. Only returns the change directly
    /// when debouncing is disabled.
    fn match_event(&mut self, event: &Event) -> Option<SourceChange> {
        let kind = ChangeKind::from_event(&event.kind)?;
        let (source, path) = event
            .paths
            .iter()
            .find_map(|path| self.targets.get(&normalize(path)))?
            .clone();

        let change = SourceChange {
            source,
            path,
            kind,
            timestamp: Instant::now(),
        };
        if self.debounce.is_zero() {
            debug!(source = %change.source, ?kind, "configuration source changed");
            return Some(change);
        }
        self.pending.insert(change.source.clone(), change);
        None
    }

    /// Removes the oldest pending change whose source has been quiet for the
    /// debounce duration at `now`.
    fn take_due(&mut self, now: Instant) -> Option<SourceChange> {
        let source = self
            .pending
            .values()
            .filter(|change| now.saturating_duration_since(change.timestamp) >= self.debounce)
            .min_by_key(|change| change.timestamp)?
            .source
            .clone();
        let change = self.pending.remove(&source)?;
        debug!(source = %change.source, kind = ?change.kind, "configuration source changed");
        Some(change)
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .values()
            .map(|change| change.timestamp + self.debounce)
            .min()
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

// Canonical parent plus file name, so that a deleted file still matches.
fn normalize(path: &Path) -> PathBuf {
    let directory = parent_dir(path);
    let directory = directory
        .canonicalize()
        .unwrap_or_else(|_| directory.to_path_buf());
    match path.file_name() {
        Some(name) => directory.join(name),
        None => directory,
    }
}
