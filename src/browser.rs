// Browser implementations of the engine seams.
// ffmpeg.wasm (@ffmpeg/ffmpeg 0.12) via wasm-bindgen imports, fetch + object URLs via web-sys.

use async_trait::async_trait;
use js_sys::{Array, Function, Object, Promise, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Blob, BlobPropertyBag, Response, Url};

use crate::engine::{EngineBootstrap, ObjectUrls, Transcoder};
use crate::error::MediaError;
use crate::types::MediaUrl;

#[wasm_bindgen(module = "@ffmpeg/ffmpeg")]
extern "C" {
    type FFmpeg;

    #[wasm_bindgen(constructor)]
    fn new() -> FFmpeg;

    #[wasm_bindgen(method)]
    fn on(this: &FFmpeg, event: &str, callback: &Function);

    #[wasm_bindgen(method, catch)]
    fn load(this: &FFmpeg, config: &JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = writeFile)]
    fn write_file(this: &FFmpeg, path: &str, data: &Uint8Array) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = readFile)]
    fn read_file(this: &FFmpeg, path: &str) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = deleteFile)]
    fn delete_file(this: &FFmpeg, path: &str) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn exec(this: &FFmpeg, args: &Array) -> Result<Promise, JsValue>;
}

/// Best human-readable text for a thrown JS value.
pub(crate) fn js_message(value: &JsValue) -> String {
    if let Some(err) = value.dyn_ref::<js_sys::Error>() {
        return String::from(err.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn engine_error(value: JsValue) -> MediaError {
    MediaError::Engine(js_message(&value))
}

async fn settle(promise: Result<Promise, JsValue>) -> Result<JsValue, JsValue> {
    JsFuture::from(promise?).await
}

/// A loaded ffmpeg.wasm instance.
pub struct FfmpegEngine {
    ffmpeg: FFmpeg,
    _log_hook: Closure<dyn FnMut(JsValue)>,
}

#[async_trait(?Send)]
impl Transcoder for FfmpegEngine {
    async fn write_file(&self, name: &str, data: &[u8]) -> Result<(), MediaError> {
        let data = Uint8Array::from(data);
        settle(self.ffmpeg.write_file(name, &data))
            .await
            .map_err(engine_error)?;
        Ok(())
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, MediaError> {
        let read_failed = |message: String| MediaError::ReadFailed {
            name: name.to_string(),
            message,
        };
        let value = settle(self.ffmpeg.read_file(name))
            .await
            .map_err(|err| read_failed(js_message(&err)))?;
        value
            .dyn_into::<Uint8Array>()
            .map(|bytes| bytes.to_vec())
            .map_err(|_| read_failed("engine returned text, expected bytes".to_string()))
    }

    async fn delete_file(&self, name: &str) -> Result<(), MediaError> {
        settle(self.ffmpeg.delete_file(name))
            .await
            .map_err(engine_error)?;
        Ok(())
    }

    async fn exec(&self, args: &[String]) -> Result<i32, MediaError> {
        let args: Array = args.iter().map(|arg| JsValue::from_str(arg)).collect();
        let code = settle(self.ffmpeg.exec(&args))
            .await
            .map_err(engine_error)?;
        code.as_f64()
            .map(|code| code as i32)
            .ok_or_else(|| MediaError::Engine("exec resolved without an exit code".to_string()))
    }
}

/// Fetches core resources over HTTP and boots ffmpeg.wasm from blob URLs.
#[derive(Debug, Default)]
pub struct BrowserBootstrap;

async fn fetch(url: &str) -> Result<Response, JsValue> {
    let global = js_sys::global();
    let promise = if let Some(window) = global.dyn_ref::<web_sys::Window>() {
        window.fetch_with_str(url)
    } else if let Some(worker) = global.dyn_ref::<web_sys::WorkerGlobalScope>() {
        worker.fetch_with_str(url)
    } else {
        return Err(JsValue::from_str("no fetch available in this context"));
    };
    JsFuture::from(promise).await?.dyn_into::<Response>()
}

fn blob_url(parts: &Array, mime: &str) -> Result<String, JsValue> {
    let options = BlobPropertyBag::new();
    options.set_type(mime);
    let blob = Blob::new_with_blob_sequence_and_options(parts, &options)?;
    Url::create_object_url_with_blob(&blob)
}

#[async_trait(?Send)]
impl EngineBootstrap for BrowserBootstrap {
    type Engine = FfmpegEngine;

    async fn fetch_resource(&self, url: &str, mime: &str) -> Result<String, MediaError> {
        let response = fetch(url).await.map_err(engine_error)?;
        if !response.ok() {
            return Err(MediaError::Engine(format!(
                "HTTP {} fetching {}",
                response.status(),
                url
            )));
        }
        let body = settle(response.blob()).await.map_err(engine_error)?;
        // Re-wrap so the blob carries the mime type the engine expects.
        blob_url(&Array::of1(&body), mime).map_err(engine_error)
    }

    async fn initialize(
        &self,
        core_ref: &str,
        wasm_ref: &str,
        on_progress: &dyn Fn(f64),
    ) -> Result<FfmpegEngine, MediaError> {
        on_progress(0.0);
        let ffmpeg = FFmpeg::new();

        let log_hook = Closure::<dyn FnMut(JsValue)>::new(|event: JsValue| {
            let message = Reflect::get(&event, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
                .unwrap_or_default();
            tracing::debug!(target: "ffmpeg", "{}", message);
        });
        ffmpeg.on("log", log_hook.as_ref().unchecked_ref());

        let config = Object::new();
        Reflect::set(&config, &"coreURL".into(), &core_ref.into()).map_err(engine_error)?;
        Reflect::set(&config, &"wasmURL".into(), &wasm_ref.into()).map_err(engine_error)?;
        on_progress(10.0);

        settle(ffmpeg.load(&config)).await.map_err(engine_error)?;
        on_progress(100.0);

        Ok(FfmpegEngine {
            ffmpeg,
            _log_hook: log_hook,
        })
    }
}

/// `URL.createObjectURL` over in-memory blobs.
#[derive(Debug, Default)]
pub struct BrowserObjectUrls;

impl ObjectUrls for BrowserObjectUrls {
    fn create(&self, data: &[u8], mime: &str) -> Result<MediaUrl, MediaError> {
        let parts = Array::of1(&Uint8Array::from(data));
        blob_url(&parts, mime)
            .map(MediaUrl::new)
            .map_err(engine_error)
    }

    fn revoke(&self, url: &MediaUrl) {
        if let Err(err) = Url::revoke_object_url(url.as_str()) {
            tracing::debug!(url = url.as_str(), err = %js_message(&err), "revoke failed");
        }
    }
}
