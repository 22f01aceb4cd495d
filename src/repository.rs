//! C9 — repository facade: the one type every entry point (CLI, HTTP
//! server, tests) talks to.
//!
//! Grounded on the teacher's `main.rs`/`tester.rs` orchestration style
//! (construct `DB`/`CooleyTukeyFFT`/`AudioProcessor` once, then call
//! through for every operation). `Engine` replaces that ad hoc per-call
//! `DB::new()` with one long-lived handle holding the store connection,
//! the shared permutation table, and validated config.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::fingerprint::create_fingerprints;
use crate::minhash::permutations::PermutationTable;
use crate::minhash::{compute_signature, group_to_bands};
use crate::query::{query, QueryStats};
use crate::store::{NewTrackMetadata, Store, TrackRecord};

pub struct Engine {
    store: Store,
    permutations: Arc<PermutationTable>,
    config: EngineConfig,
}

/// Everything a caller supplies about a track beyond its audio, mirroring
/// the free-form half of the §3 Track record.
#[derive(Debug, Clone, Default)]
pub struct TrackMetadata {
    pub album_id: Option<i32>,
    pub artist: Option<String>,
    pub title: String,
    pub path: String,
    pub tags: BTreeMap<String, String>,
}

impl Engine {
    pub fn new(store: Store, permutations: Arc<PermutationTable>, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            permutations,
            config,
        })
    }

    /// Fingerprints `pcm` and indexes every fingerprint under `metadata`,
    /// returning the new track id. Audio too short to yield even one
    /// fingerprint still creates the track row, with zero fingerprints,
    /// so the track stays visible to `listTracks`/`countTracks` — but the
    /// call itself surfaces `AudioTooShort` so callers can tell "indexed"
    /// apart from "indexed but not searchable".
    pub fn insert_track(&mut self, metadata: &TrackMetadata, pcm: &[f32]) -> EngineResult<i32> {
        let (spectrogram, fingerprints) = create_fingerprints(pcm, &self.config.fingerprint);
        info!(track = %metadata.title, count = fingerprints.len(), "fingerprinted track");

        let duration_ms = (pcm.len() as f64 / self.config.fingerprint.sample_rate as f64 * 1000.0) as i64;
        let new_track = NewTrackMetadata {
            album_id: metadata.album_id,
            duration_ms: Some(duration_ms),
            artist: metadata.artist.clone(),
            title: metadata.title.clone(),
            path: metadata.path.clone(),
            tags: metadata.tags.clone(),
        };

        let bands_per_fingerprint: Vec<_> = fingerprints
            .iter()
            .map(|fingerprint| {
                let signature = compute_signature(fingerprint, &self.permutations);
                group_to_bands(&signature, self.config.index.hash_tables, self.config.index.hash_keys_per_table)
            })
            .collect();

        let (track_id, _fingerprint_ids) =
            self.store.insert_indexed_track(&new_track, &fingerprints, &bands_per_fingerprint)?;

        if fingerprints.is_empty() {
            return Err(EngineError::AudioTooShort {
                frames: spectrogram.len(),
                required: self.config.fingerprint.fingerprint_length,
            });
        }

        Ok(track_id)
    }

    /// Fingerprints `pcm` and returns ranked similar tracks, best match
    /// first. A clip too short to yield even one fingerprint surfaces
    /// `AudioTooShort` rather than an empty (and therefore indistinguishable
    /// from "no similar tracks") result.
    pub fn find_similar(&mut self, pcm: &[f32], search_all: bool) -> EngineResult<Vec<(TrackRecord, QueryStats)>> {
        let (spectrogram, fingerprints) = create_fingerprints(pcm, &self.config.fingerprint);
        if fingerprints.is_empty() {
            return Err(EngineError::AudioTooShort {
                frames: spectrogram.len(),
                required: self.config.fingerprint.fingerprint_length,
            });
        }

        let matches = query(
            &mut self.store,
            &fingerprints,
            &self.permutations,
            &self.config.index,
            search_all,
        )?;

        let track_ids: Vec<i32> = matches.iter().map(|(id, _)| *id).collect();
        let mut tracks = self.store.read_tracks_by_id(&track_ids)?;

        let mut results = Vec::with_capacity(matches.len());
        for (track_id, stats) in matches {
            if let Some(track) = tracks.remove(&track_id) {
                results.push((track, stats));
            }
        }
        Ok(results)
    }

    pub fn list_tracks(&mut self, artist_filter: Option<&str>) -> EngineResult<Vec<TrackRecord>> {
        self.store.read_tracks(artist_filter)
    }

    pub fn get_track(&mut self, track_id: i32) -> EngineResult<Option<TrackRecord>> {
        self.store.read_track_by_id(track_id)
    }

    pub fn count_tracks(&mut self) -> EngineResult<i64> {
        self.store.count_tracks()
    }

    /// PCM sample rate every `insert_track`/`find_similar` call expects its
    /// input already resampled to.
    pub fn sample_rate(&self) -> u32 {
        self.config.fingerprint.sample_rate
    }

    pub fn reset_database(&mut self) -> EngineResult<()> {
        self.store.reset()
    }
}
