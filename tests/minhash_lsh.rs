//! MinHash signature + LSH banding, exercised end to end against real
//! fingerprints (no store required).

use sabi::config::FingerprintConfig;
use sabi::fingerprint::create_fingerprints;
use sabi::minhash::permutations::PermutationTable;
use sabi::minhash::{compute_signature, group_to_bands};

use std::f32::consts::PI;

fn sine(freq: f32, sample_rate: u32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

#[test]
fn identical_clips_land_in_every_same_band() {
    let cfg = FingerprintConfig::default();
    let n = cfg.window_size + (cfg.fingerprint_length - 1) * (cfg.window_size - cfg.overlap);
    let pcm = sine(660.0, cfg.sample_rate, n);

    let (_, fps_a) = create_fingerprints(&pcm, &cfg);
    let (_, fps_b) = create_fingerprints(&pcm, &cfg);
    assert_eq!(fps_a.len(), 1);

    let hash_tables = 16;
    let hash_keys_per_table = 4;
    let perms = PermutationTable::generate(hash_tables * hash_keys_per_table, cfg.fingerprint_bits(), Some(11));

    let sig_a = compute_signature(&fps_a[0], &perms);
    let sig_b = compute_signature(&fps_b[0], &perms);
    assert_eq!(sig_a, sig_b);

    let bands_a = group_to_bands(&sig_a, hash_tables, hash_keys_per_table);
    let bands_b = group_to_bands(&sig_b, hash_tables, hash_keys_per_table);
    assert_eq!(bands_a, bands_b);
}

#[test]
fn unrelated_clips_rarely_share_every_band() {
    let cfg = FingerprintConfig::default();
    let n = cfg.window_size + (cfg.fingerprint_length - 1) * (cfg.window_size - cfg.overlap);
    let a = sine(220.0, cfg.sample_rate, n);
    let b = sine(2200.0, cfg.sample_rate, n);

    let (_, fps_a) = create_fingerprints(&a, &cfg);
    let (_, fps_b) = create_fingerprints(&b, &cfg);

    let hash_tables = 25;
    let hash_keys_per_table = 4;
    let perms = PermutationTable::generate(hash_tables * hash_keys_per_table, cfg.fingerprint_bits(), Some(5));

    let bands_a = group_to_bands(&compute_signature(&fps_a[0], &perms), hash_tables, hash_keys_per_table);
    let bands_b = group_to_bands(&compute_signature(&fps_b[0], &perms), hash_tables, hash_keys_per_table);

    let shared = (0..hash_tables).filter(|i| bands_a[i] == bands_b[i]).count();
    assert!(shared < hash_tables / 2, "shared {shared} of {hash_tables} bands for unrelated clips");
}
