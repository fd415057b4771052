//! Runtime config cache with hot reload.
//!
//! [`RuntimeConfigCache`] holds the last successfully loaded config behind a
//! pointer swap; readers never wait for a reload. [`ConfigWatcher`] watches
//! the config file's directory and reloads the cache once per debounce
//! window.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use notify_debouncer_mini::{DebouncedEventKind, Debouncer, new_debouncer};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::{ConfigError, Result};
use crate::loader::{LoadOptions, load};
use crate::source::Metadata;
use crate::types::RuntimeConfig;

/// Default quiet period before a burst of file events triggers a reload.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(750);

/// One resolved config together with its provenance.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub config: RuntimeConfig,
    pub metadata: Metadata,
}

impl ConfigSnapshot {
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.metadata.loaded_at()
    }
}

struct CacheInner {
    options: LoadOptions,
    snapshot: RwLock<Arc<ConfigSnapshot>>,
}

/// Shared, cheaply cloneable handle to the current config.
#[derive(Clone)]
pub struct RuntimeConfigCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for RuntimeConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConfigCache")
            .field("loaded_at", &self.resolve().loaded_at())
            .finish_non_exhaustive()
    }
}

impl RuntimeConfigCache {
    /// Load once with `options`. Fails if that first load fails.
    pub fn new(options: LoadOptions) -> Result<Self> {
        let (config, metadata) = load(&options)?;
        Ok(Self {
            inner: Arc::new(CacheInner {
                options,
                snapshot: RwLock::new(Arc::new(ConfigSnapshot { config, metadata })),
            }),
        })
    }

    /// The current snapshot.
    pub fn resolve(&self) -> Arc<ConfigSnapshot> {
        self.inner.snapshot.read().clone()
    }

    /// Load again and swap the result in.
    ///
    /// Readers keep seeing the previous snapshot until the swap; on error
    /// the previous snapshot stays in place.
    pub fn reload(&self) -> Result<Arc<ConfigSnapshot>> {
        let (config, metadata) = load(&self.inner.options)?;
        let snapshot = Arc::new(ConfigSnapshot { config, metadata });
        *self.inner.snapshot.write() = snapshot.clone();
        tracing::info!(provider = %snapshot.config.llm_provider, "Runtime config reloaded");
        Ok(snapshot)
    }

    /// The config file this cache loads from.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.inner.options.config_path()
    }

    pub fn options(&self) -> &LoadOptions {
        &self.inner.options
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Watcher
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of one debounced change to the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    Reloaded { loaded_at: DateTime<Utc> },
    Failed { error: String },
    /// The pre-reload hook vetoed this reload.
    Skipped,
}

/// Called with the config path before each reload; `false` skips it.
pub type PreReloadHook = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Watches the config file and reloads a [`RuntimeConfigCache`].
pub struct ConfigWatcher {
    cache: RuntimeConfigCache,
    debounce: Duration,
    pre_reload: Option<PreReloadHook>,
}

impl ConfigWatcher {
    pub fn new(cache: RuntimeConfigCache) -> Self {
        Self {
            cache,
            debounce: DEFAULT_DEBOUNCE,
            pre_reload: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_pre_reload<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.pre_reload = Some(Arc::new(hook));
        self
    }

    pub fn cache(&self) -> &RuntimeConfigCache {
        &self.cache
    }

    /// Start watching.
    ///
    /// Returns a single-slot channel of [`ReloadEvent`]s and a handle that
    /// keeps the watcher alive. Events are dropped while the slot is full.
    /// Drop the handle to stop watching.
    pub fn watch(&self) -> Result<(mpsc::Receiver<ReloadEvent>, WatcherHandle)> {
        let path = self
            .cache
            .config_path()
            .ok_or_else(|| ConfigError::Watch("no config path could be resolved".to_string()))?;
        let dir = path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| ConfigError::Watch(format!("'{}' is not a file path", path.display())))?;

        let (event_tx, event_rx) = mpsc::channel(1);
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut debouncer = new_debouncer(self.debounce, notify_tx)
            .map_err(|e| ConfigError::Watch(format!("watcher init: {e}")))?;
        debouncer
            .watcher()
            .watch(&dir, notify::RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::Watch(format!("watch '{}': {e}", dir.display())))?;
        tracing::info!(path = %path.display(), "Watching runtime config");

        let cache = self.cache.clone();
        let hook = self.pre_reload.clone();

        let handle = std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                let events = match result {
                    Ok(events) => events,
                    Err(e) => {
                        tracing::warn!(error = %e, "Config watch error");
                        continue;
                    }
                };
                let touched = events.iter().any(|event| {
                    event.kind == DebouncedEventKind::Any
                        && event.path.file_name() == Some(file_name.as_os_str())
                });
                if !touched {
                    continue;
                }

                let event = reload_once(&cache, hook.as_ref(), &path);
                match event_tx.try_send(event) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        tracing::debug!("Reload event dropped, receiver is behind");
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        });

        Ok((
            event_rx,
            WatcherHandle {
                _debouncer: debouncer,
                _thread: handle,
            },
        ))
    }
}

fn reload_once(
    cache: &RuntimeConfigCache,
    hook: Option<&PreReloadHook>,
    path: &Path,
) -> ReloadEvent {
    if let Some(hook) = hook
        && !hook(path)
    {
        tracing::debug!(path = %path.display(), "Reload skipped by pre-reload hook");
        return ReloadEvent::Skipped;
    }
    match cache.reload() {
        Ok(snapshot) => ReloadEvent::Reloaded {
            loaded_at: snapshot.loaded_at(),
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Config reload failed, keeping previous config");
            ReloadEvent::Failed {
                error: e.to_string(),
            }
        }
    }
}

/// Keeps the watcher alive. Dropping it stops the file watch, which ends
/// the reload thread.
pub struct WatcherHandle {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    _thread: std::thread::JoinHandle<()>,
}
