// Argument lists for the engine's command-line style interface, plus the concat manifest.

pub const INPUT: &str = "input.mp4";
pub const OUTPUT: &str = "output.mp4";
pub const MANIFEST: &str = "concat_list.txt";
pub const AUDIO_OUTPUT: &str = "audio.wav";

/// Staged name of the `index`-th concatenate input.
pub fn concat_input(index: usize) -> String {
    format!("input{}.mp4", index)
}

/// Name the engine writes the `index`-th thumbnail to (1-based, per `%d`).
pub fn thumbnail_name(index: u32) -> String {
    format!("thumb_{}.jpg", index)
}

const THUMBNAIL_PATTERN: &str = "thumb_%d.jpg";

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

/// Stream-copy cut from `start` to `end` seconds.
pub fn trim(start: f64, end: f64) -> Vec<String> {
    let start = start.to_string();
    let end = end.to_string();
    args([
        "-i", INPUT, "-ss", start.as_str(), "-to", end.as_str(), "-c", "copy", OUTPUT,
    ])
}

/// Concat demuxer over the manifest, stream copy.
pub fn concatenate() -> Vec<String> {
    args([
        "-f", "concat", "-safe", "0", "-i", MANIFEST, "-c", "copy", OUTPUT,
    ])
}

/// Volume filter on audio; video is copied untouched.
pub fn adjust_gain(gain: f64) -> Vec<String> {
    let filter = format!("volume={}", gain);
    args(["-i", INPUT, "-filter:a", filter.as_str(), "-c:v", "copy", OUTPUT])
}

/// One frame every `interval` seconds at fixed JPEG quality.
pub fn thumbnails(interval: f64, quality: u8) -> Vec<String> {
    let filter = format!("fps=1/{}", interval);
    let quality = quality.to_string();
    args([
        "-i",
        INPUT,
        "-vf",
        filter.as_str(),
        "-q:v",
        quality.as_str(),
        THUMBNAIL_PATTERN,
    ])
}

/// Mono 16-bit PCM at the waveform sample rate, video dropped.
pub fn waveform() -> Vec<String> {
    let rate = crate::types::WAVEFORM_SAMPLE_RATE.to_string();
    args([
        "-i",
        INPUT,
        "-vn",
        "-acodec",
        "pcm_s16le",
        "-ar",
        rate.as_str(),
        "-ac",
        "1",
        AUDIO_OUTPUT,
    ])
}

/// Concat demuxer manifest: one `file '<name>'` line per input, in order.
pub fn manifest<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| format!("file '{}'", name.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}
