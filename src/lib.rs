// media_core: clip editor Rust/WASM media orchestrator.
// Sequences ffmpeg.wasm calls for trim, concat, gain, thumbnails and waveforms. JS is plumbing.

mod browser;
mod commands;
mod engine;
mod error;
mod loader;
mod orchestrator;
mod staging;
mod types;
mod waveform;

#[cfg(test)]
mod testing;

use std::rc::Rc;

use js_sys::{Array, Float32Array, Function, Promise, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

pub use browser::{BrowserBootstrap, BrowserObjectUrls, FfmpegEngine};
pub use engine::{EngineBootstrap, ObjectUrls, Transcoder};
pub use error::MediaError;
pub use loader::{EngineCell, EngineLoader};
pub use orchestrator::MediaOrchestrator;
pub use staging::Stage;
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

type BrowserOrchestrator = MediaOrchestrator<BrowserBootstrap, BrowserObjectUrls>;

fn to_js(err: MediaError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Media editor exposed to JavaScript.
/// Every operation returns a Promise; call `loadEngine()` first and check `status()`.
#[wasm_bindgen]
pub struct MediaEditor {
    inner: Rc<BrowserOrchestrator>,
}

#[wasm_bindgen]
impl MediaEditor {
    /// Create an editor from a JSON `OrchestratorConfig`. An empty string uses defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<MediaEditor, JsValue> {
        let config = OrchestratorConfig::from_json(config_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid config: {}", e)))?;

        Ok(MediaEditor {
            inner: Rc::new(MediaOrchestrator::new(
                BrowserBootstrap,
                BrowserObjectUrls,
                config,
            )),
        })
    }

    /// Load ffmpeg.wasm from the configured sources. Safe to call repeatedly.
    ///
    /// A call made while another load is in flight resolves immediately without
    /// waiting for it. Check `status()` or use `onStatusChange` before running operations.
    #[wasm_bindgen(js_name = loadEngine)]
    pub fn load_engine(&self) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            inner.load_engine().await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Current `{isLoaded, isLoading, loadProgress, error, isAvailable}` as JSON.
    pub fn status(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.status())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    /// Call `callback(statusJson)` on every load state or progress change.
    #[wasm_bindgen(js_name = onStatusChange)]
    pub fn on_status_change(&self, callback: Function) {
        self.inner.subscribe(move |status| {
            if let Ok(json) = serde_json::to_string(status) {
                let _ = callback.call1(&JsValue::NULL, &JsValue::from_str(&json));
            }
        });
    }

    pub fn trim(&self, input: Vec<u8>, start: f64, end: f64) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let url = inner.trim(&input, start, end).await.map_err(to_js)?;
            Ok(JsValue::from_str(url.as_str()))
        })
    }

    /// Concatenate an array of `Uint8Array`s. `on_progress(percent)` is optional.
    pub fn concatenate(&self, inputs: Array, on_progress: Option<Function>) -> Promise {
        let inner = Rc::clone(&self.inner);
        let inputs: Vec<Vec<u8>> = inputs
            .iter()
            .map(|value| Uint8Array::new(&value).to_vec())
            .collect();
        future_to_promise(async move {
            let report = |percent: f64| {
                if let Some(cb) = &on_progress {
                    let _ = cb.call1(&JsValue::NULL, &JsValue::from_f64(percent));
                }
            };
            let url = inner
                .concatenate(&inputs, Some(&report))
                .await
                .map_err(to_js)?;
            Ok(JsValue::from_str(url.as_str()))
        })
    }

    #[wasm_bindgen(js_name = adjustGain)]
    pub fn adjust_gain(&self, input: Vec<u8>, gain: f64) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let url = inner.adjust_gain(&input, gain).await.map_err(to_js)?;
            Ok(JsValue::from_str(url.as_str()))
        })
    }

    /// Resolves to an array of thumbnail blob URLs in frame order.
    #[wasm_bindgen(js_name = extractThumbnails)]
    pub fn extract_thumbnails(&self, input: Vec<u8>, interval: f64) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let urls = inner
                .extract_thumbnails(&input, interval)
                .await
                .map_err(to_js)?;
            let array: Array = urls
                .into_iter()
                .map(|url| JsValue::from_str(url.as_str()))
                .collect();
            Ok(array.into())
        })
    }

    /// Resolves to a `Float32Array` of 200 values in [0, 1].
    #[wasm_bindgen(js_name = extractWaveform)]
    pub fn extract_waveform(&self, input: Vec<u8>) -> Promise {
        let inner = Rc::clone(&self.inner);
        future_to_promise(async move {
            let waveform = inner.extract_waveform(&input).await.map_err(to_js)?;
            Ok(Float32Array::from(waveform.as_slice()).into())
        })
    }

    /// Release a blob URL returned by one of the operations.
    #[wasm_bindgen(js_name = revokeUrl)]
    pub fn revoke_url(&self, url: String) {
        self.inner.revoke_url(&MediaUrl::new(url));
    }
}
