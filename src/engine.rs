// Seams between the orchestrator and the outside world.
// The browser module implements these over ffmpeg.wasm; tests use a scripted engine.

use async_trait::async_trait;

use crate::error::MediaError;
use crate::types::MediaUrl;

/// A loaded transcoding engine with a private file namespace.
/// Futures are `?Send`: the engine lives on the single UI thread.
#[async_trait(?Send)]
pub trait Transcoder {
    /// Write `data` into the engine namespace under `name`.
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), MediaError>;

    /// Read `name` back out of the engine namespace.
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, MediaError>;

    async fn delete_file(&self, name: &str) -> Result<(), MediaError>;

    /// Run a command-line style invocation. Returns the engine exit code.
    async fn exec(&self, args: &[String]) -> Result<i32, MediaError>;
}

/// Fetches engine resources and initializes an engine from them.
#[async_trait(?Send)]
pub trait EngineBootstrap {
    type Engine: Transcoder;

    /// Fetch `url` and return a local reference (a blob URL in the browser).
    async fn fetch_resource(&self, url: &str, mime: &str) -> Result<String, MediaError>;

    /// Initialize an engine from fetched core and wasm references.
    /// `on_progress` receives 0-100 while initialization runs.
    async fn initialize(
        &self,
        core_ref: &str,
        wasm_ref: &str,
        on_progress: &dyn Fn(f64),
    ) -> Result<Self::Engine, MediaError>;
}

/// Turns result bytes into caller-owned URLs.
pub trait ObjectUrls {
    fn create(&self, data: &[u8], mime: &str) -> Result<MediaUrl, MediaError>;

    fn revoke(&self, url: &MediaUrl);
}
