// Waveform reduction: 16-bit PCM WAV -> 200 averaged magnitudes in [0, 1].
// Bucket size is floor(samples / 200); trailing samples past 200 * size are dropped.

use crate::error::MediaError;
use crate::types::{Waveform, WAVEFORM_BUCKETS};

/// Canonical RIFF/WAVE header length the engine writes for pcm_s16le.
pub const WAV_HEADER_LEN: usize = 44;

/// Decode samples after the header and normalize each to |s| / 32768.
pub fn normalized_samples(wav: &[u8]) -> Result<Vec<f32>, MediaError> {
    if wav.len() < WAV_HEADER_LEN {
        return Err(MediaError::MalformedOutput(format!(
            "WAV output is {} bytes, shorter than its {}-byte header",
            wav.len(),
            WAV_HEADER_LEN
        )));
    }

    // A trailing odd byte is not a full sample.
    let samples = wav[WAV_HEADER_LEN..]
        .chunks_exact(2)
        .map(|pair| {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            (sample as f32).abs() / 32768.0
        })
        .collect();

    Ok(samples)
}

/// Average normalized samples into exactly `WAVEFORM_BUCKETS` buckets.
pub fn bucketize(samples: &[f32]) -> Waveform {
    let block = samples.len() / WAVEFORM_BUCKETS;
    if block == 0 {
        // Too short to fill a single bucket per slot.
        return Waveform::from_buckets(vec![0.0; WAVEFORM_BUCKETS]);
    }

    let buckets = samples
        .chunks_exact(block)
        .take(WAVEFORM_BUCKETS)
        .map(|chunk| {
            let sum: f32 = chunk.iter().sum();
            (sum / block as f32).clamp(0.0, 1.0)
        })
        .collect();

    Waveform::from_buckets(buckets)
}

/// Full reduction from WAV bytes.
pub fn from_wav(wav: &[u8]) -> Result<Waveform, MediaError> {
    let samples = normalized_samples(wav)?;
    Ok(bucketize(&samples))
}

#[cfg(test)]
pub(crate) fn encode_wav(samples: &[i16]) -> Vec<u8> {
    let mut bytes = vec![0u8; WAV_HEADER_LEN];
    bytes[..4].copy_from_slice(b"RIFF");
    bytes[8..12].copy_from_slice(b"WAVE");
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn header_is_skipped() {
        let wav = encode_wav(&[16384, -16384]);
        let samples = normalized_samples(&wav).unwrap();
        assert_eq!(samples, vec![0.5, 0.5]);
    }

    #[test]
    fn most_negative_sample_is_full_scale() {
        let samples = normalized_samples(&encode_wav(&[i16::MIN])).unwrap();
        assert_eq!(samples, vec![1.0]);
    }

    #[test]
    fn truncated_header_is_rejected() {
        let err = normalized_samples(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, MediaError::MalformedOutput(_)));
    }

    #[test]
    fn remainder_samples_are_dropped() {
        // 401 samples -> block of 2; the last sample (full scale) never lands in a bucket.
        let mut samples = vec![0.0f32; 400];
        samples.push(1.0);
        let waveform = bucketize(&samples);
        assert_eq!(waveform.len(), WAVEFORM_BUCKETS);
        assert!(waveform.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn buckets_average_their_chunk() {
        let mut samples = vec![0.0f32; 400];
        samples[0] = 1.0;
        let waveform = bucketize(&samples);
        assert!((waveform.as_slice()[0] - 0.5).abs() < f32::EPSILON);
        assert_eq!(waveform.as_slice()[1], 0.0);
    }

    #[test]
    fn short_audio_yields_silent_waveform() {
        let waveform = from_wav(&encode_wav(&[1000; 50])).unwrap();
        assert_eq!(waveform.len(), WAVEFORM_BUCKETS);
        assert!(waveform.as_slice().iter().all(|&v| v == 0.0));
    }

    proptest! {
        #[test]
        fn waveform_is_fixed_length_and_bounded(
            samples in prop::collection::vec(any::<i16>(), 0..5000)
        ) {
            let waveform = from_wav(&encode_wav(&samples)).unwrap();
            prop_assert_eq!(waveform.len(), WAVEFORM_BUCKETS);
            for &v in waveform.as_slice() {
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}
