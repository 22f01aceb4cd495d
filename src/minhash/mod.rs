//! C6 — MinHash sketching and LSH banding.
//!
//! Uses `twox-hash` for the `B > 4` band-hash fallback; bands with four or
//! fewer components pack into a 16-bit key directly instead.

pub mod permutations;

use std::collections::HashMap;
use std::hash::Hasher;

use twox_hash::XxHash64;

use crate::fingerprint::FingerprintBits;
use permutations::PermutationTable;

/// One MinHash signature: `K = L * B` component indices into `[0, F]`,
/// where `F` itself is the sentinel for "no set bit under this permutation".
pub fn compute_signature(bits: &FingerprintBits, perms: &PermutationTable) -> Vec<u32> {
    let f = bits.len() as u32;
    (0..perms.k())
        .map(|p| {
            let row = perms.row(p);
            row.iter()
                .position(|&original_index| bits.0[original_index as usize])
                .map(|position| position as u32)
                .unwrap_or(f)
        })
        .collect()
}

/// Splits a `K`-long signature into `L` bands of `B` components each and
/// hashes every band to a 64-bit key. `L * B` must equal `signature.len()`.
pub fn group_to_bands(signature: &[u32], hash_tables: usize, hash_keys_per_table: usize) -> HashMap<usize, u64> {
    debug_assert_eq!(signature.len(), hash_tables * hash_keys_per_table);

    let mut bands = HashMap::with_capacity(hash_tables);
    for band in 0..hash_tables {
        let start = band * hash_keys_per_table;
        let components = &signature[start..start + hash_keys_per_table];
        bands.insert(band, hash_band(components));
    }
    bands
}

/// Up to four components pack losslessly into the low 16 bits each of a
/// `u64`; beyond that we fall back to a non-cryptographic stream hash.
/// Components are fingerprint-bit indices, always well under 2^16 for any
/// fingerprint configuration this crate validates.
fn hash_band(components: &[u32]) -> u64 {
    if components.len() <= 4 {
        let mut key = 0u64;
        for &component in components {
            key = (key << 16) | (component as u64 & 0xFFFF);
        }
        key
    } else {
        let mut hasher = XxHash64::with_seed(0);
        for &component in components {
            hasher.write_u32(component);
        }
        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(set: &[usize], len: usize) -> FingerprintBits {
        let mut v = vec![false; len];
        for &i in set {
            v[i] = true;
        }
        FingerprintBits(v)
    }

    #[test]
    fn empty_fingerprint_signature_is_all_sentinel() {
        let perms = PermutationTable::generate(8, 16, Some(1));
        let fp = bits(&[], 16);
        let sig = compute_signature(&fp, &perms);
        assert!(sig.iter().all(|&c| c == 16));
    }

    #[test]
    fn identical_fingerprints_share_a_signature() {
        let perms = PermutationTable::generate(8, 16, Some(1));
        let a = bits(&[2, 5, 9], 16);
        let b = bits(&[2, 5, 9], 16);
        assert_eq!(compute_signature(&a, &perms), compute_signature(&b, &perms));
    }

    #[test]
    fn signature_selects_minimum_permuted_position() {
        let perms = PermutationTable::generate(1, 4, Some(3));
        let row = perms.row(0).to_vec();
        let fp = bits(&[row[2] as usize], 4);
        let sig = compute_signature(&fp, &perms);
        assert_eq!(sig[0], 2);
    }

    #[test]
    fn banding_produces_one_key_per_band() {
        let sig: Vec<u32> = (0..20).collect();
        let bands = group_to_bands(&sig, 5, 4);
        assert_eq!(bands.len(), 5);
    }

    #[test]
    fn small_bands_pack_without_collision_for_distinct_components() {
        let a = group_to_bands(&[1, 2, 3, 4], 1, 4);
        let b = group_to_bands(&[1, 2, 3, 5], 1, 4);
        assert_ne!(a[&0], b[&0]);
    }

    #[test]
    fn wide_bands_use_the_stream_hash_fallback() {
        let wide: Vec<u32> = (0..8).collect();
        let bands = group_to_bands(&wide, 1, 8);
        assert_eq!(bands.len(), 1);
    }

    /// §8: the expected fraction of equal signature entries between two
    /// fingerprints' MinHash signatures equals their Jaccard similarity.
    /// Checked empirically over 1000 random pairs — per-pair agreement is
    /// noisy at K=256, but averaged over the sample it should track Jaccard
    /// closely.
    #[test]
    fn signature_agreement_tracks_jaccard_similarity_on_average() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let f = 64;
        let perms = PermutationTable::generate(256, f, Some(99));
        let mut rng = StdRng::seed_from_u64(99);

        let mut total_error = 0.0;
        let pairs = 1000;
        for _ in 0..pairs {
            let a: Vec<bool> = (0..f).map(|_| rng.random_bool(0.5)).collect();
            let b: Vec<bool> = (0..f).map(|_| rng.random_bool(0.5)).collect();

            let union = a.iter().zip(&b).filter(|(&x, &y)| x || y).count();
            let intersection = a.iter().zip(&b).filter(|(&x, &y)| x && y).count();
            let jaccard = if union == 0 { 1.0 } else { intersection as f64 / union as f64 };

            let sig_a = compute_signature(&FingerprintBits(a), &perms);
            let sig_b = compute_signature(&FingerprintBits(b), &perms);
            let agreement =
                sig_a.iter().zip(&sig_b).filter(|(x, y)| x == y).count() as f64 / perms.k() as f64;

            total_error += (agreement - jaccard).abs();
        }

        let mean_error = total_error / pairs as f64;
        assert!(mean_error < 0.05, "mean |agreement - jaccard| too high: {mean_error}");
    }
}
