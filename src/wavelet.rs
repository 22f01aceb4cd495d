//! C2 — standard 2D Haar decomposition, and C3 — the top-wavelet sign
//! encoder built on top of it.
//!
//! Fresh code (the teacher has no wavelet transform), written in the
//! teacher's register: small free functions over slices, no panics on
//! any input this crate ever hands it.

use ordered_float::OrderedFloat;

/// A square `size x size` tile of samples, row-major.
#[derive(Debug, Clone)]
pub struct Tile {
    data: Vec<f32>,
    size: usize,
}

impl Tile {
    pub fn new(size: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), size * size);
        Self { data, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    fn row_mut(&mut self, r: usize) -> &mut [f32] {
        let s = self.size;
        &mut self.data[r * s..(r + 1) * s]
    }

    fn column(&self, c: usize) -> Vec<f32> {
        (0..self.size).map(|r| self.data[r * self.size + c]).collect()
    }

    fn set_column(&mut self, c: usize, values: &[f32]) {
        for (r, &v) in values.iter().enumerate() {
            self.data[r * self.size + c] = v;
        }
    }

    fn energy(&self) -> f64 {
        self.data.iter().map(|&v| (v as f64) * (v as f64)).sum()
    }
}

/// One full orthonormal Haar pyramid pass over a power-of-two slice:
/// `a' = (a+b)/sqrt(2)`, `d' = (a-b)/sqrt(2)`, recursing on the averages.
fn haar_1d_pyramid(values: &mut [f32]) {
    let sqrt2 = std::f32::consts::SQRT_2;
    let mut n = values.len();

    while n > 1 {
        let half = n / 2;
        let mut next = vec![0.0f32; n];
        for i in 0..half {
            let a = values[2 * i];
            let b = values[2 * i + 1];
            next[i] = (a + b) / sqrt2;
            next[half + i] = (a - b) / sqrt2;
        }
        values[..n].copy_from_slice(&next);
        n = half;
    }
}

/// Standard 2D Haar transform: row-wise pyramid, then column-wise pyramid.
/// `tile.size()` must be a power of two — an invariant of the caller (C4),
/// which only ever builds tiles of exactly `fingerprint_length`.
pub fn haar_decompose(tile: &mut Tile) {
    let size = tile.size();

    for r in 0..size {
        haar_1d_pyramid(tile.row_mut(r));
    }

    for c in 0..size {
        let mut column = tile.column(c);
        haar_1d_pyramid(&mut column);
        tile.set_column(c, &column);
    }
}

/// C3 — keeps the `top` largest-magnitude coefficients, encodes each as a
/// `(1,0)`/`(0,1)` sign pair, and zeroes the rest as `(0,0)`. Returns the
/// concatenation of all pairs in index order: `2 * size * size` bits.
pub fn encode_top_wavelets(tile: &Tile, top: usize) -> Vec<bool> {
    let values = tile.as_slice();

    let mut by_magnitude: Vec<(usize, OrderedFloat<f32>)> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i, OrderedFloat(v.abs())))
        .collect();
    // Largest magnitude first; ties keep the lower index first.
    by_magnitude.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut selected = vec![false; values.len()];
    for &(idx, _) in by_magnitude.iter().take(top) {
        selected[idx] = true;
    }

    let mut bits = Vec::with_capacity(values.len() * 2);
    for (i, &v) in values.iter().enumerate() {
        if selected[i] {
            if v > 0.0 {
                bits.push(true);
                bits.push(false);
            } else {
                bits.push(false);
                bits.push(true);
            }
        } else {
            bits.push(false);
            bits.push(false);
        }
    }
    bits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_tile(size: usize) -> Tile {
        let data: Vec<f32> = (0..size * size).map(|i| i as f32).collect();
        Tile::new(size, data)
    }

    #[test]
    fn haar_preserves_energy() {
        let mut tile = ramp_tile(8);
        let before = tile.energy();
        haar_decompose(&mut tile);
        let after = tile.energy();
        assert!((before - after).abs() < 1e-2, "{before} vs {after}");
    }

    #[test]
    fn constant_tile_decomposes_to_single_dc_coefficient() {
        let size = 4;
        let mut tile = Tile::new(size, vec![3.0; size * size]);
        haar_decompose(&mut tile);
        let dc = tile.as_slice()[0];
        assert!(dc.abs() > 0.0);
        let ac_energy: f32 = tile.as_slice()[1..].iter().map(|v| v * v).sum();
        assert!(ac_energy < 1e-6);
    }

    #[test]
    fn top_wavelet_parity_holds() {
        let mut tile = ramp_tile(8);
        haar_decompose(&mut tile);
        let top = 10;
        let bits = encode_top_wavelets(&tile, top);

        assert_eq!(bits.len(), 2 * 8 * 8);

        let single_set_pairs = bits.chunks(2).filter(|pair| pair[0] ^ pair[1]).count();
        let zero_pairs = bits.chunks(2).filter(|pair| !pair[0] && !pair[1]).count();
        let both_set_pairs = bits.chunks(2).filter(|pair| pair[0] && pair[1]).count();

        assert_eq!(single_set_pairs, top);
        assert_eq!(both_set_pairs, 0);
        assert_eq!(zero_pairs, 8 * 8 - top);
    }

    #[test]
    fn top_wavelet_selects_largest_magnitudes() {
        let tile = Tile::new(2, vec![5.0, -1.0, 0.0, -9.0]);
        let bits = encode_top_wavelets(&tile, 2);
        // index 3 (-9.0) and index 0 (5.0) should be the two selected.
        assert_eq!(&bits[0..2], &[true, false]); // +5.0
        assert_eq!(&bits[2..4], &[false, false]); // -1.0 not selected
        assert_eq!(&bits[4..6], &[false, false]); // 0.0 not selected
        assert_eq!(&bits[6..8], &[false, true]); // -9.0
    }
}
