// Strong typing over strings. Newtypes for blob URLs and waveforms, engine state, and config.

use serde::{Deserialize, Serialize};

/// Number of buckets in an extracted waveform.
pub const WAVEFORM_BUCKETS: usize = 200;

/// Sample rate (Hz) the engine resamples to before waveform reduction.
pub const WAVEFORM_SAMPLE_RATE: u32 = 8000;

/// Transient object URL pointing at a generated blob.
/// The caller owns it and must revoke it when done.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaUrl(String);

impl MediaUrl {
    pub fn new(url: impl Into<String>) -> Self {
        MediaUrl(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for MediaUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed-length amplitude envelope, every value in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Waveform(Vec<f32>);

impl Waveform {
    pub(crate) fn from_buckets(buckets: Vec<f32>) -> Self {
        debug_assert_eq!(buckets.len(), WAVEFORM_BUCKETS);
        Waveform(buckets)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }
}

/// Engine load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

/// Snapshot of loader state for UI consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub is_loaded: bool,
    pub is_loading: bool,
    pub load_progress: f64, // 0-100
    pub error: Option<String>,
    /// False once every source failed; consumers should switch to server-side processing.
    pub is_available: bool,
}

impl EngineStatus {
    pub(crate) fn from_parts(state: LoadState, progress: f64, error: Option<&str>) -> Self {
        EngineStatus {
            is_loaded: state == LoadState::Loaded,
            is_loading: state == LoadState::Loading,
            load_progress: progress,
            error: error.map(str::to_string),
            is_available: state != LoadState::Failed,
        }
    }
}

/// Orchestrator configuration passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Candidate base URLs, tried in order until one initializes.
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    /// Core JS module file under each source.
    #[serde(default = "default_core_file")]
    pub core_file: String,
    /// WebAssembly binary under each source.
    #[serde(default = "default_wasm_file")]
    pub wasm_file: String,
    /// JPEG quality passed as `-q:v` (2 is near-best).
    #[serde(default = "default_thumbnail_quality")]
    pub thumbnail_quality: u8,
    /// Upper bound on frames read back during thumbnail extraction.
    #[serde(default = "default_max_thumbnails")]
    pub max_thumbnails: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            sources: default_sources(),
            core_file: default_core_file(),
            wasm_file: default_wasm_file(),
            thumbnail_quality: default_thumbnail_quality(),
            max_thumbnails: default_max_thumbnails(),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_json(json: &str) -> Result<Self, crate::MediaError> {
        if json.trim().is_empty() {
            return Ok(OrchestratorConfig::default());
        }
        Ok(serde_json::from_str(json)?)
    }
}

fn default_sources() -> Vec<String> {
    vec![
        "https://unpkg.com/@ffmpeg/core@0.12.6/dist/umd".to_string(),
        "https://cdn.jsdelivr.net/npm/@ffmpeg/core@0.12.6/dist/umd".to_string(),
    ]
}

fn default_core_file() -> String {
    "ffmpeg-core.js".to_string()
}

fn default_wasm_file() -> String {
    "ffmpeg-core.wasm".to_string()
}

fn default_thumbnail_quality() -> u8 {
    2
}

fn default_max_thumbnails() -> u32 {
    1000
}
