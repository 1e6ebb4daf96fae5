// Virtual file staging inside the engine namespace.
// Every name a Stage touches is deleted by cleanup(), on success and failure alike.

use crate::engine::Transcoder;
use crate::error::MediaError;

/// Tracks the files one operation places in (or expects from) the engine.
pub struct Stage<'e, E: Transcoder + ?Sized> {
    engine: &'e E,
    names: Vec<String>,
}

impl<'e, E: Transcoder + ?Sized> Stage<'e, E> {
    pub fn new(engine: &'e E) -> Self {
        Stage {
            engine,
            names: Vec::new(),
        }
    }

    /// Write an input buffer under `name`.
    pub async fn stage(&mut self, name: &str, bytes: &[u8]) -> Result<(), MediaError> {
        // Track before writing: a partial write still leaves something to delete.
        self.track(name);
        tracing::debug!(name, len = bytes.len(), "staging file");
        self.engine.write_file(name, bytes).await
    }

    /// Read an output buffer produced by the engine.
    pub async fn unstage(&mut self, name: &str) -> Result<Vec<u8>, MediaError> {
        self.track(name);
        self.engine.read_file(name).await
    }

    /// Read `name` if the engine produced it. Only a present file is tracked for cleanup.
    pub async fn read_if_present(&mut self, name: &str) -> Option<Vec<u8>> {
        match self.engine.read_file(name).await {
            Ok(bytes) => {
                self.track(name);
                Some(bytes)
            }
            Err(err) => {
                tracing::debug!(name, %err, "optional output absent");
                None
            }
        }
    }

    /// Register a name the engine will produce so cleanup covers it.
    pub fn expect(&mut self, name: &str) {
        self.track(name);
    }

    pub fn engine(&self) -> &'e E {
        self.engine
    }

    /// Delete `name` right away without tracking it. Returns whether it existed.
    pub async fn discard(&self, name: &str) -> bool {
        self.engine.delete_file(name).await.is_ok()
    }

    /// Best-effort deletion of every tracked name. Failures are logged, never returned.
    pub async fn cleanup(self) {
        for name in &self.names {
            if let Err(err) = self.engine.delete_file(name).await {
                tracing::debug!(name = name.as_str(), %err, "ignoring cleanup failure");
            }
        }
    }

    fn track(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }
}
