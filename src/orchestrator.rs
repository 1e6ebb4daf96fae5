// Media operations over the loaded engine.
// Each one: precondition check -> stage inputs -> exec -> read output -> package -> cleanup.
// Operations are not serialized internally; callers run one at a time.

use std::rc::Rc;

use crate::commands;
use crate::engine::{EngineBootstrap, ObjectUrls, Transcoder};
use crate::error::MediaError;
use crate::loader::{require_engine, EngineCell, EngineLoader};
use crate::staging::Stage;
use crate::types::{EngineStatus, LoadState, MediaUrl, OrchestratorConfig, Waveform};
use crate::waveform;

const VIDEO_MIME: &str = "video/mp4";
const IMAGE_MIME: &str = "image/jpeg";

/// Stateful media orchestrator: one engine, five file-in/file-out operations.
pub struct MediaOrchestrator<B: EngineBootstrap, U: ObjectUrls> {
    loader: EngineLoader<B>,
    urls: U,
}

impl<B: EngineBootstrap, U: ObjectUrls> MediaOrchestrator<B, U> {
    pub fn new(bootstrap: B, urls: U, config: OrchestratorConfig) -> Self {
        Self::with_cell(bootstrap, urls, config, EngineCell::new())
    }

    /// Build over an existing engine state holder shared with other readers.
    pub fn with_cell(
        bootstrap: B,
        urls: U,
        config: OrchestratorConfig,
        cell: Rc<EngineCell<B::Engine>>,
    ) -> Self {
        MediaOrchestrator {
            loader: EngineLoader::new(bootstrap, config, cell),
            urls,
        }
    }

    pub fn cell(&self) -> &Rc<EngineCell<B::Engine>> {
        self.loader.cell()
    }

    pub fn state(&self) -> LoadState {
        self.cell().state()
    }

    pub fn status(&self) -> EngineStatus {
        self.cell().status()
    }

    pub fn subscribe(&self, listener: impl Fn(&EngineStatus) + 'static) {
        self.cell().subscribe(listener);
    }

    /// Load the engine once. No-op while loading or after success.
    /// A call that lands during an in-flight load returns `Ok` before the engine is ready.
    pub async fn load_engine(&self) -> Result<(), MediaError> {
        self.loader.load().await
    }

    /// Release a URL previously returned by an operation.
    pub fn revoke_url(&self, url: &MediaUrl) {
        self.urls.revoke(url);
    }

    /// Stream-copy `input` between `start` and `end` seconds.
    #[tracing::instrument(skip(self, input), fields(len = input.len()))]
    pub async fn trim(&self, input: &[u8], start: f64, end: f64) -> Result<MediaUrl, MediaError> {
        let engine = require_engine(self.cell())?;
        if !start.is_finite() || !end.is_finite() || start < 0.0 {
            return Err(MediaError::InvalidInput(format!(
                "trim range {}..{} is not a valid time range",
                start, end
            )));
        }
        if end <= start {
            return Err(MediaError::InvalidInput(format!(
                "trim end {} must be after start {}",
                end, start
            )));
        }

        let mut stage = Stage::new(&*engine);
        let result = async {
            stage.stage(commands::INPUT, input).await?;
            stage.expect(commands::OUTPUT);
            run(&stage, "trim", commands::trim(start, end)).await?;
            let bytes = stage.unstage(commands::OUTPUT).await?;
            self.urls.create(&bytes, VIDEO_MIME)
        }
        .await;
        stage.cleanup().await;
        result
    }

    /// Concatenate `inputs` in order. `on_progress` sees 0, staging up to 50, then 100.
    #[tracing::instrument(skip_all, fields(count = inputs.len()))]
    pub async fn concatenate<I: AsRef<[u8]>>(
        &self,
        inputs: &[I],
        on_progress: Option<&dyn Fn(f64)>,
    ) -> Result<MediaUrl, MediaError> {
        let engine = require_engine(self.cell())?;
        if inputs.is_empty() {
            return Err(MediaError::InvalidInput(
                "concatenate needs at least one input".to_string(),
            ));
        }

        let report = |p: f64| {
            if let Some(cb) = on_progress {
                cb(p);
            }
        };

        let mut stage = Stage::new(&*engine);
        let result = async {
            report(0.0);
            let total = inputs.len();
            let mut names = Vec::with_capacity(total);
            for (index, input) in inputs.iter().enumerate() {
                let name = commands::concat_input(index);
                stage.stage(&name, input.as_ref()).await?;
                names.push(name);
                report((index + 1) as f64 / total as f64 * 50.0);
            }

            let manifest = commands::manifest(&names);
            stage
                .stage(commands::MANIFEST, manifest.as_bytes())
                .await?;
            stage.expect(commands::OUTPUT);
            run(&stage, "concatenate", commands::concatenate()).await?;
            let bytes = stage.unstage(commands::OUTPUT).await?;
            let url = self.urls.create(&bytes, VIDEO_MIME)?;
            report(100.0);
            Ok::<_, MediaError>(url)
        }
        .await;
        stage.cleanup().await;
        result
    }

    /// Scale audio volume by `gain`; video is copied.
    #[tracing::instrument(skip(self, input), fields(len = input.len()))]
    pub async fn adjust_gain(&self, input: &[u8], gain: f64) -> Result<MediaUrl, MediaError> {
        let engine = require_engine(self.cell())?;
        if !gain.is_finite() || gain < 0.0 {
            return Err(MediaError::InvalidInput(format!(
                "gain {} must be a finite, non-negative multiplier",
                gain
            )));
        }

        let mut stage = Stage::new(&*engine);
        let result = async {
            stage.stage(commands::INPUT, input).await?;
            stage.expect(commands::OUTPUT);
            run(&stage, "adjust_gain", commands::adjust_gain(gain)).await?;
            let bytes = stage.unstage(commands::OUTPUT).await?;
            self.urls.create(&bytes, VIDEO_MIME)
        }
        .await;
        stage.cleanup().await;
        result
    }

    /// One JPEG every `interval` seconds, in frame order.
    ///
    /// Frames are read `thumb_1.jpg`, `thumb_2.jpg`, ... until the first one the engine
    /// cannot produce. A gap in the engine's numbering ends the sequence early.
    #[tracing::instrument(skip(self, input), fields(len = input.len()))]
    pub async fn extract_thumbnails(
        &self,
        input: &[u8],
        interval: f64,
    ) -> Result<Vec<MediaUrl>, MediaError> {
        let engine = require_engine(self.cell())?;
        if !interval.is_finite() || interval <= 0.0 {
            return Err(MediaError::InvalidInput(format!(
                "thumbnail interval {} must be a positive number of seconds",
                interval
            )));
        }

        let config = self.loader.config();
        let mut stage = Stage::new(&*engine);
        let mut urls = Vec::new();
        let mut next_frame = 1;
        let mut exhausted = false;
        let result = async {
            stage.stage(commands::INPUT, input).await?;
            run(
                &stage,
                "extract_thumbnails",
                commands::thumbnails(interval, config.thumbnail_quality),
            )
            .await?;

            for index in 1..=config.max_thumbnails {
                let name = commands::thumbnail_name(index);
                let Some(bytes) = stage.read_if_present(&name).await else {
                    tracing::debug!(frames = urls.len(), "no more thumbnails");
                    exhausted = true;
                    break;
                };
                next_frame = index + 1;
                urls.push(self.urls.create(&bytes, IMAGE_MIME)?);
            }
            Ok::<_, MediaError>(())
        }
        .await;

        // Frames past the cap (or past a failure) were never read; drop them too.
        if !exhausted {
            let mut index = next_frame;
            while stage.discard(&commands::thumbnail_name(index)).await {
                index += 1;
            }
            tracing::debug!(dropped = index - next_frame, "discarded unread thumbnails");
        }
        stage.cleanup().await;

        match result {
            Ok(()) => Ok(urls),
            Err(err) => {
                // No partial results: release what was already handed out.
                for url in &urls {
                    self.urls.revoke(url);
                }
                Err(err)
            }
        }
    }

    /// 200-bucket amplitude envelope of the audio track.
    #[tracing::instrument(skip(self, input), fields(len = input.len()))]
    pub async fn extract_waveform(&self, input: &[u8]) -> Result<Waveform, MediaError> {
        let engine = require_engine(self.cell())?;

        let mut stage = Stage::new(&*engine);
        let result = async {
            stage.stage(commands::INPUT, input).await?;
            stage.expect(commands::AUDIO_OUTPUT);
            run(&stage, "extract_waveform", commands::waveform()).await?;
            let wav = stage.unstage(commands::AUDIO_OUTPUT).await?;
            waveform::from_wav(&wav)
        }
        .await;
        stage.cleanup().await;
        result
    }
}

async fn run<E: Transcoder + ?Sized>(
    stage: &Stage<'_, E>,
    operation: &'static str,
    args: Vec<String>,
) -> Result<(), MediaError> {
    tracing::debug!(operation, args = %args.join(" "), "exec");
    match stage.engine().exec(&args).await? {
        0 => Ok(()),
        code => Err(MediaError::ExecFailed { operation, code }),
    }
}
