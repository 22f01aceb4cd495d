//! C4 — fingerprint service: orchestrates C1 (spectrogram) -> C2 (Haar) ->
//! C3 (top-wavelet encode) into the public `create_fingerprints` contract.
//!
//! Free-function orchestration rather than a struct with mutable state:
//! each stage is pure and the pipeline is just a chain of calls.

use crate::config::FingerprintConfig;
use crate::spectrogram::{build_spectrogram, Spectrogram};
use crate::wavelet::{encode_top_wavelets, haar_decompose, Tile};

/// One fingerprint's bits, `F = 2 * fingerprint_length^2` long.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintBits(pub Vec<bool>);

impl FingerprintBits {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hamming distance to another fingerprint of the same length.
    pub fn hamming_distance(&self, other: &FingerprintBits) -> usize {
        debug_assert_eq!(self.0.len(), other.0.len());
        self.0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a != b)
            .count()
    }
}

/// Slides a non-overlapping `T`-frame window across `spectrogram` and
/// normalizes (subtracts the tile mean) each full tile before handing it
/// to C2/C3. Incomplete trailing tiles are discarded.
fn tiles_from_spectrogram(spectrogram: &Spectrogram, tile_size: usize) -> Vec<Tile> {
    let mut tiles = Vec::new();
    let mut row = 0;

    while row + tile_size <= spectrogram.len() {
        let mut data = Vec::with_capacity(tile_size * tile_size);
        for r in 0..tile_size {
            data.extend_from_slice(&spectrogram[row + r]);
        }

        let mean = data.iter().sum::<f32>() / data.len() as f32;
        for v in data.iter_mut() {
            *v -= mean;
        }

        tiles.push(Tile::new(tile_size, data));
        row += tile_size;
    }

    tiles
}

/// Builds the spectrogram and every fingerprint derivable from it.
/// Short clips (fewer than `fingerprint_length` STFT frames) return an
/// empty fingerprint list alongside whatever (possibly empty) spectrogram
/// was produced — callers treat this as "not indexable", never as an error.
pub fn create_fingerprints(pcm: &[f32], cfg: &FingerprintConfig) -> (Spectrogram, Vec<FingerprintBits>) {
    let spectrogram = build_spectrogram(pcm, cfg);

    let tiles = tiles_from_spectrogram(&spectrogram, cfg.fingerprint_length);
    let fingerprints = tiles
        .into_iter()
        .map(|mut tile| {
            haar_decompose(&mut tile);
            FingerprintBits(encode_top_wavelets(&tile, cfg.top_wavelets))
        })
        .collect();

    (spectrogram, fingerprints)
}
