//! End-to-end spectrogram -> Haar -> top-wavelet pipeline, exercised
//! without a store.

use sabi::config::FingerprintConfig;
use sabi::fingerprint::create_fingerprints;

use std::f32::consts::PI;

fn sine(freq: f32, sample_rate: u32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

fn samples_for_frames(cfg: &FingerprintConfig, frames: usize) -> usize {
    cfg.window_size + (frames - 1) * (cfg.window_size - cfg.overlap)
}

#[test]
fn short_clip_is_not_indexable() {
    let cfg = FingerprintConfig::default();
    let pcm = vec![0.0f32; cfg.window_size / 2];
    let (_, fingerprints) = create_fingerprints(&pcm, &cfg);
    assert!(fingerprints.is_empty());
}

#[test]
fn re_encoded_clip_yields_a_close_fingerprint() {
    let cfg = FingerprintConfig::default();
    let n = samples_for_frames(&cfg, cfg.fingerprint_length * 2);
    let original = sine(523.25, cfg.sample_rate, n);

    // Simulate a lossy re-encode: light additive noise plus a tiny gain change.
    let mut noisy: Vec<f32> = original
        .iter()
        .enumerate()
        .map(|(i, &s)| s * 0.98 + 0.01 * ((i as f32 * 0.37).sin()))
        .collect();
    noisy.truncate(original.len());

    let (_, fp_a) = create_fingerprints(&original, &cfg);
    let (_, fp_b) = create_fingerprints(&noisy, &cfg);

    assert_eq!(fp_a.len(), fp_b.len());
    for (a, b) in fp_a.iter().zip(fp_b.iter()) {
        let distance = a.hamming_distance(b);
        // A light re-encode should disturb only a small minority of bits.
        assert!(distance < a.len() / 4, "hamming distance {distance} too large out of {}", a.len());
    }
}

#[test]
fn disjoint_audio_yields_far_apart_fingerprints() {
    let cfg = FingerprintConfig::default();
    let n = samples_for_frames(&cfg, cfg.fingerprint_length);
    let low = sine(330.0, cfg.sample_rate, n);
    let high = sine(1800.0, cfg.sample_rate, n);

    let (_, fp_low) = create_fingerprints(&low, &cfg);
    let (_, fp_high) = create_fingerprints(&high, &cfg);

    assert_eq!(fp_low.len(), 1);
    assert_eq!(fp_high.len(), 1);
    let distance = fp_low[0].hamming_distance(&fp_high[0]);
    assert!(distance > fp_low[0].len() / 8);
}
