pub mod complex;

use complex::Complex;
use std::f32::consts::PI;

/// Recursive radix-2 Cooley-Tukey FFT, the numeric core shared by the
/// spectrogram builder. Operates on power-of-two buffers only.
pub struct CooleyTukeyFFT {
    chunk_size: usize,
    overlap_size: usize,
}

impl CooleyTukeyFFT {
    pub fn new(chunk_size: usize, overlap_size: usize) -> Self {
        if !chunk_size.is_power_of_two() {
            panic!("chunk size must be a power of two for this implementation to work");
        }

        Self {
            chunk_size,
            overlap_size,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn hop_size(&self) -> usize {
        self.chunk_size - self.overlap_size
    }

    /// Hann window, applied before every forward transform.
    pub fn apply_hann_window(&self, chunk: &[f32]) -> Vec<f32> {
        let n = chunk.len();
        chunk
            .iter()
            .enumerate()
            .map(|(i, &sample)| {
                let num = 2.0 * PI * (i as f32);
                let denom = (n as f32) - 1.0;
                // w[n] = 0.5 * (1 - cos(2*pi*i / (n - 1)))
                let multiplier = 0.5 * (1.0 - (num / denom).cos());
                sample * multiplier
            })
            .collect()
    }

    fn cooley_tukey_fft(&self, buf: &mut [Complex]) {
        let n = buf.len();

        if n <= 1 {
            return;
        }
        let mut even: Vec<Complex> = Vec::with_capacity(n / 2);
        let mut odd: Vec<Complex> = Vec::with_capacity(n / 2);

        for (i, &sample) in buf.iter().enumerate() {
            if i % 2 == 0 {
                even.push(sample);
            } else {
                odd.push(sample);
            }
        }

        self.cooley_tukey_fft(&mut even);
        self.cooley_tukey_fft(&mut odd);

        // P(omega)  = Pe(omega^2) + omega * Po(omega^2)
        // P(-omega) = Pe(omega^2) - omega * Po(omega^2)
        // where omega = e^(i*2*pi*k/n), and -omega^j = omega^(j + n/2)
        for j in 0..n / 2 {
            let theta = (2.0 * PI * (j as f32)) / (n as f32);
            let omega = Complex::from_polar(1.0, -theta);

            buf[j] = even[j] + (omega * odd[j]);
            buf[j + n / 2] = even[j] - (omega * odd[j]);
        }
    }

    /// Windows and transforms one chunk, returning the full complex spectrum.
    pub fn transform_chunk(&self, chunk: &[f32]) -> Vec<Complex> {
        let windowed = self.apply_hann_window(chunk);
        let mut complex_buf: Vec<Complex> = windowed.iter().map(|&s| Complex::new(s, 0.0)).collect();
        self.cooley_tukey_fft(&mut complex_buf);
        complex_buf
    }

    /// Slides a non-overlapping-by-`hop_size` window across `buffer` and
    /// returns the magnitude spectrum (first half of the complex spectrum,
    /// since the input is real) for every full chunk.
    pub fn magnitude_spectra(&self, buffer: &[f32]) -> Vec<Vec<f32>> {
        let mut position = 0;
        let mut frames = Vec::new();

        while position + self.chunk_size <= buffer.len() {
            let chunk = &buffer[position..position + self.chunk_size];
            let spectrum = self.transform_chunk(chunk);
            let half = spectrum.len() / 2;
            let magnitudes: Vec<f32> = spectrum[..half].iter().map(|c| c.norm_sqr().sqrt()).collect();
            frames.push(magnitudes);
            position += self.hop_size();
        }

        frames
    }
}

impl Default for CooleyTukeyFFT {
    fn default() -> Self {
        let chunk_size = 2048;
        let overlap_size = chunk_size / 2;
        Self {
            chunk_size,
            overlap_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_tone_peaks_at_expected_bin() {
        let fft = CooleyTukeyFFT::new(1024, 0);
        let sample_rate = 5512.0f32;
        let freq = 430.0f32;
        let samples: Vec<f32> = (0..1024)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect();

        let spectra = fft.magnitude_spectra(&samples);
        assert_eq!(spectra.len(), 1);

        let spectrum = &spectra[0];
        let expected_bin = (freq * 1024.0 / sample_rate).round() as usize;
        let peak_bin = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();

        assert!((peak_bin as i64 - expected_bin as i64).abs() <= 1);
    }

    #[test]
    fn silence_has_zero_magnitude() {
        let fft = CooleyTukeyFFT::new(256, 0);
        let samples = vec![0.0f32; 256];
        let spectra = fft.magnitude_spectra(&samples);
        assert!(spectra[0].iter().all(|&m| m.abs() < 1e-6));
    }
}
