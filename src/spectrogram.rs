//! C1 — log-spaced spectrogram builder.
//!
//! Turns a mono PCM buffer into `S[t][b]`, a log-magnitude spectrogram on a
//! logarithmic frequency grid, via a windowed STFT built on the
//! [`crate::fft`] Cooley-Tukey core.

use crate::config::FingerprintConfig;
use crate::fft::CooleyTukeyFFT;

/// `S[t][b]`: one row per STFT frame, `frequency_bins` columns per row,
/// already log-magnitude (`ln(1 + magnitude)`).
pub type Spectrogram = Vec<Vec<f32>>;

/// Precomputes the `[start, end)` FFT-bin range that log-grid bin `i`
/// draws its mean magnitude from.
struct LogBinGrid {
    /// For each log bin, the half-open range of linear FFT bin indices.
    ranges: Vec<(usize, usize)>,
}

impl LogBinGrid {
    fn build(cfg: &FingerprintConfig, fft_bin_count: usize) -> Self {
        let w = cfg.frequency_bins;
        let base = cfg.log_base;
        let log_start = cfg.start_frequency.log(base);
        let log_end = cfg.end_frequency.log(base);
        let delta = (log_end - log_start) / w as f32;

        let boundary_freq = |i: usize| -> f32 { cfg.start_frequency * base.powf(i as f32 * delta) };

        let freq_per_fft_bin = cfg.sample_rate as f32 / cfg.window_size as f32;
        let fft_bin_for_freq =
            |freq: f32| -> usize { ((freq / freq_per_fft_bin).round() as isize).clamp(0, fft_bin_count as isize - 1) as usize };

        let mut ranges = Vec::with_capacity(w);
        for i in 0..w {
            let lo = fft_bin_for_freq(boundary_freq(i));
            let hi = fft_bin_for_freq(boundary_freq(i + 1)).max(lo + 1);
            ranges.push((lo, hi.min(fft_bin_count)));
        }

        Self { ranges }
    }

    fn bin_count(&self) -> usize {
        self.ranges.len()
    }
}

/// Builds the log-spaced spectrogram for one mono PCM buffer.
///
/// Returns an empty spectrogram when `pcm` is too short for even one STFT
/// frame; `crate::fingerprint` is responsible for turning "not enough
/// frames" into [`crate::error::EngineError::AudioTooShort`] at the tile
/// level, not here.
pub fn build_spectrogram(pcm: &[f32], cfg: &FingerprintConfig) -> Spectrogram {
    let fft = CooleyTukeyFFT::new(cfg.window_size, cfg.overlap);
    let frames = fft.magnitude_spectra(pcm);
    if frames.is_empty() {
        return Vec::new();
    }

    let fft_bin_count = frames[0].len();
    let grid = LogBinGrid::build(cfg, fft_bin_count);

    frames
        .iter()
        .map(|frame| {
            (0..grid.bin_count())
                .map(|i| {
                    let (lo, hi) = grid.ranges[i];
                    if lo >= hi {
                        return 0.0;
                    }
                    let sum: f32 = frame[lo..hi].iter().sum();
                    let mean = sum / (hi - lo) as f32;
                    mean.max(0.0).ln_1p()
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FingerprintConfig;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: u32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn short_clip_yields_empty_spectrogram() {
        let cfg = FingerprintConfig::default();
        let pcm = vec![0.0f32; cfg.window_size - 1];
        let spec = build_spectrogram(&pcm, &cfg);
        assert!(spec.is_empty());
    }

    #[test]
    fn spectrogram_has_configured_bin_count() {
        let cfg = FingerprintConfig::default();
        let pcm = sine(440.0, cfg.sample_rate, cfg.window_size * 8);
        let spec = build_spectrogram(&pcm, &cfg);
        assert!(!spec.is_empty());
        for row in &spec {
            assert_eq!(row.len(), cfg.frequency_bins);
        }
    }

    #[test]
    fn louder_tone_in_band_raises_energy_in_that_row() {
        let cfg = FingerprintConfig::default();
        let silence = vec![0.0f32; cfg.window_size * 4];
        let tone = sine(1000.0, cfg.sample_rate, cfg.window_size * 4);

        let silent_spec = build_spectrogram(&silence, &cfg);
        let tone_spec = build_spectrogram(&tone, &cfg);

        let silent_energy: f32 = silent_spec.iter().flatten().sum();
        let tone_energy: f32 = tone_spec.iter().flatten().sum();
        assert!(tone_energy > silent_energy);
    }
}
