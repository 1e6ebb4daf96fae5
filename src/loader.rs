// Engine loader: ordered source fallthrough with progress, plus the shared engine state holder.
// Only one load may be in flight; a second call while loading or loaded is a no-op.

use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::{EngineBootstrap, Transcoder};
use crate::error::MediaError;
use crate::types::{EngineStatus, LoadState, OrchestratorConfig};

type StatusListener = Rc<dyn Fn(&EngineStatus)>;

struct Slot<E> {
    state: LoadState,
    handle: Option<Rc<E>>,
    progress: f64,
    error: Option<String>,
}

/// Explicit `{state, handle}` holder for the single engine instance.
/// Shared by `Rc` between the loader, the orchestrator, and status readers.
pub struct EngineCell<E> {
    slot: RefCell<Slot<E>>,
    listeners: RefCell<Vec<StatusListener>>,
}

impl<E> Default for EngineCell<E> {
    fn default() -> Self {
        EngineCell {
            slot: RefCell::new(Slot {
                state: LoadState::Unloaded,
                handle: None,
                progress: 0.0,
                error: None,
            }),
            listeners: RefCell::new(Vec::new()),
        }
    }
}

impl<E> EngineCell<E> {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn state(&self) -> LoadState {
        self.slot.borrow().state
    }

    pub fn status(&self) -> EngineStatus {
        let slot = self.slot.borrow();
        EngineStatus::from_parts(slot.state, slot.progress, slot.error.as_deref())
    }

    /// The engine, if loaded.
    pub fn handle(&self) -> Option<Rc<E>> {
        let slot = self.slot.borrow();
        match slot.state {
            LoadState::Loaded => slot.handle.clone(),
            _ => None,
        }
    }

    /// Register a callback run on every state or progress change.
    pub fn subscribe(&self, listener: impl Fn(&EngineStatus) + 'static) {
        self.listeners.borrow_mut().push(Rc::new(listener));
    }

    fn update(&self, f: impl FnOnce(&mut Slot<E>)) {
        f(&mut self.slot.borrow_mut());
        let status = self.status();
        // Snapshot first: a listener may subscribe another one.
        let listeners = self.listeners.borrow().clone();
        for listener in listeners {
            listener(&status);
        }
    }

    /// Move to `Loading` unless a load is running or done. Returns whether this call owns the load.
    fn begin_load(&self) -> bool {
        if matches!(self.state(), LoadState::Loading | LoadState::Loaded) {
            return false;
        }
        self.update(|slot| {
            slot.state = LoadState::Loading;
            slot.handle = None;
            slot.progress = 0.0;
            slot.error = None;
        });
        true
    }

    fn set_progress(&self, progress: f64) {
        let progress = if progress.is_finite() {
            progress.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.update(|slot| slot.progress = progress);
    }

    fn finish_loaded(&self, engine: E) {
        self.update(|slot| {
            slot.state = LoadState::Loaded;
            slot.handle = Some(Rc::new(engine));
            slot.progress = 100.0;
            slot.error = None;
        });
    }

    fn finish_failed(&self, message: String) {
        self.update(|slot| {
            slot.state = LoadState::Failed;
            slot.handle = None;
            slot.error = Some(message);
        });
    }
}

/// Loads the engine from the configured sources into a shared `EngineCell`.
pub struct EngineLoader<B: EngineBootstrap> {
    bootstrap: B,
    config: OrchestratorConfig,
    cell: Rc<EngineCell<B::Engine>>,
}

impl<B: EngineBootstrap> EngineLoader<B> {
    pub fn new(bootstrap: B, config: OrchestratorConfig, cell: Rc<EngineCell<B::Engine>>) -> Self {
        EngineLoader {
            bootstrap,
            config,
            cell,
        }
    }

    pub fn cell(&self) -> &Rc<EngineCell<B::Engine>> {
        &self.cell
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn bootstrap(&self) -> &B {
        &self.bootstrap
    }

    /// Load the engine, trying each source in order. Idempotent.
    pub async fn load(&self) -> Result<(), MediaError> {
        if !self.cell.begin_load() {
            tracing::debug!(state = ?self.cell.state(), "engine load already in progress or done");
            return Ok(());
        }

        let sources = &self.config.sources;
        tracing::info!(count = sources.len(), "loading media engine");

        let mut last_error = String::from("no sources configured");
        for source in sources {
            match self.try_source(source).await {
                Ok(engine) => {
                    tracing::info!(source = source.as_str(), "media engine loaded");
                    self.cell.finish_loaded(engine);
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(source = source.as_str(), %err, "engine source failed");
                    last_error = err.to_string();
                    // The next candidate starts from zero.
                    self.cell.set_progress(0.0);
                }
            }
        }

        let err = MediaError::LoadExhausted {
            attempted: sources.len(),
            last_error,
        };
        tracing::warn!(%err, "media engine unavailable");
        self.cell.finish_failed(err.to_string());
        Err(err)
    }

    async fn try_source(&self, base: &str) -> Result<B::Engine, MediaError> {
        let base = base.trim_end_matches('/');
        let wrap = |err: MediaError| MediaError::SourceUnavailable {
            source_url: base.to_string(),
            message: err.to_string(),
        };

        let core_url = format!("{}/{}", base, self.config.core_file);
        let wasm_url = format!("{}/{}", base, self.config.wasm_file);

        let core_ref = self
            .bootstrap
            .fetch_resource(&core_url, "text/javascript")
            .await
            .map_err(wrap)?;
        let wasm_ref = self
            .bootstrap
            .fetch_resource(&wasm_url, "application/wasm")
            .await
            .map_err(wrap)?;

        let cell = Rc::clone(&self.cell);
        let on_progress = move |p: f64| cell.set_progress(p);
        self.bootstrap
            .initialize(&core_ref, &wasm_ref, &on_progress)
            .await
            .map_err(wrap)
    }
}

/// Fail fast with the not-ready error unless the engine is loaded.
pub fn require_engine<E: Transcoder>(cell: &EngineCell<E>) -> Result<Rc<E>, MediaError> {
    cell.handle().ok_or(MediaError::NotLoaded)
}
