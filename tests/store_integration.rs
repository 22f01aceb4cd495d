//! Full insert/query round trips against a real Postgres database.
//!
//! These need `DATABASE_URL` pointed at a scratch database with the
//! `migrations/` applied, so they're `#[ignore]`d by default — run with
//! `cargo test --test store_integration -- --ignored` once one is
//! available.

use std::env;
use std::f32::consts::PI;
use std::sync::Arc;

use sabi::config::EngineConfig;
use sabi::minhash::permutations::PermutationTable;
use sabi::repository::TrackMetadata;
use sabi::store::Store;
use sabi::Engine;

fn sine(freq: f32, sample_rate: u32, n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

fn track(title: &str) -> TrackMetadata {
    TrackMetadata {
        title: title.to_string(),
        path: format!("/fixtures/{title}.wav"),
        ..Default::default()
    }
}

fn test_engine() -> Engine {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set for store_integration tests");
    let config = EngineConfig::default();
    let store = Store::connect(&database_url).expect("connect to test database");
    let permutations = PermutationTable::generate(
        config.index.signature_length(),
        config.fingerprint.fingerprint_bits(),
        Some(1),
    );
    let mut engine = Engine::new(store, Arc::new(permutations), config).expect("build engine");
    engine.reset_database().expect("reset before test");
    engine
}

#[test]
#[ignore]
fn empty_database_returns_no_matches() {
    let mut engine = test_engine();
    let cfg = EngineConfig::default().fingerprint;
    let n = cfg.window_size + (cfg.fingerprint_length - 1) * (cfg.window_size - cfg.overlap);
    let pcm = sine(440.0, cfg.sample_rate, n);

    let matches = engine.find_similar(&pcm, false).unwrap();
    assert!(matches.is_empty());
}

#[test]
#[ignore]
fn exact_match_ranks_first() {
    let mut engine = test_engine();
    let cfg = EngineConfig::default().fingerprint;
    let n = cfg.window_size + (cfg.fingerprint_length * 3 - 1) * (cfg.window_size - cfg.overlap);
    let track_pcm = sine(349.23, cfg.sample_rate, n);
    let other_pcm = sine(1046.5, cfg.sample_rate, n);

    let track_id = engine.insert_track(&track("target"), &track_pcm).unwrap();
    engine.insert_track(&track("distractor"), &other_pcm).unwrap();

    let matches = engine.find_similar(&track_pcm, false).unwrap();
    assert!(!matches.is_empty());
    assert_eq!(matches[0].0.id, track_id);
    assert_eq!(matches[0].1.min_hamming_distance, 0);
    assert!((matches[0].1.similarity - 1.0).abs() < 1e-6);
}

#[test]
#[ignore]
fn threshold_filtering_drops_weak_candidates() {
    let mut engine = test_engine();
    let cfg = EngineConfig::default().fingerprint;
    let n = cfg.window_size + (cfg.fingerprint_length - 1) * (cfg.window_size - cfg.overlap);
    let track_pcm = sine(500.0, cfg.sample_rate, n);
    let query_pcm = sine(500.0, cfg.sample_rate, n);

    engine.insert_track(&track("track"), &track_pcm).unwrap();

    let filtered = engine.find_similar(&query_pcm, false).unwrap();
    let unfiltered = engine.find_similar(&query_pcm, true).unwrap();
    assert!(unfiltered.len() >= filtered.len());
}

#[test]
#[ignore]
fn reset_clears_every_table() {
    let mut engine = test_engine();
    let cfg = EngineConfig::default().fingerprint;
    let n = cfg.window_size + (cfg.fingerprint_length - 1) * (cfg.window_size - cfg.overlap);
    engine.insert_track(&track("track"), &sine(600.0, cfg.sample_rate, n)).unwrap();

    assert_eq!(engine.count_tracks().unwrap(), 1);
    engine.reset_database().unwrap();
    assert_eq!(engine.count_tracks().unwrap(), 0);
}

#[test]
#[ignore]
fn track_metadata_round_trips() {
    let mut engine = test_engine();
    let cfg = EngineConfig::default().fingerprint;
    let n = cfg.window_size + (cfg.fingerprint_length - 1) * (cfg.window_size - cfg.overlap);

    let mut metadata = track("tagged");
    metadata.artist = Some("Thelonious Monk".to_string());
    metadata.album_id = Some(7);
    metadata.tags.insert("genre".to_string(), "jazz".to_string());

    let track_id = engine.insert_track(&metadata, &sine(700.0, cfg.sample_rate, n)).unwrap();
    let stored = engine.get_track(track_id).unwrap().expect("track exists");

    assert_eq!(stored.artist.as_deref(), Some("Thelonious Monk"));
    assert_eq!(stored.album_id, Some(7));
    assert_eq!(stored.tags.get("genre").map(String::as_str), Some("jazz"));
}
