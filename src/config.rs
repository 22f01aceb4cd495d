//! Configuration recognized by the engine.
//!
//! Mirrors the teacher's `dotenvy`-based `DATABASE_URL` read in
//! `db/connector.rs`, generalized into one place so every entry point
//! (CLI, HTTP server, tests) builds the same structs the same way.

use std::env;

use crate::error::{EngineError, EngineResult};

/// Parameters for C1–C4: turning PCM into fingerprint bit-vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintConfig {
    /// PCM sample rate the engine expects its input already resampled to.
    pub sample_rate: u32,
    /// STFT window length in samples; must be a power of two.
    pub window_size: usize,
    /// STFT hop overlap in samples; must be less than `window_size`.
    pub overlap: usize,
    /// Tile time-dimension `T`; must be a power of two and equal to `frequency_bins`.
    pub fingerprint_length: usize,
    /// Tile frequency-dimension `W`; must equal `fingerprint_length`.
    pub frequency_bins: usize,
    /// Lower edge of the log-frequency grid, in Hz.
    pub start_frequency: f32,
    /// Upper edge of the log-frequency grid, in Hz.
    pub end_frequency: f32,
    /// Number of top-magnitude Haar coefficients retained per tile.
    pub top_wavelets: usize,
    /// Base of the logarithmic frequency grid.
    pub log_base: f32,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            sample_rate: 5512,
            window_size: 1024,
            overlap: 512,
            fingerprint_length: 32,
            frequency_bins: 32,
            start_frequency: 318.0,
            end_frequency: 2000.0,
            top_wavelets: 200,
            log_base: 2.0,
        }
    }
}

impl FingerprintConfig {
    /// Bit-length `F` of one fingerprint produced under this configuration.
    pub fn fingerprint_bits(&self) -> usize {
        2 * self.fingerprint_length * self.fingerprint_length
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !self.fingerprint_length.is_power_of_two() {
            return Err(EngineError::InvalidConfig(format!(
                "fingerprint_length {} is not a power of two",
                self.fingerprint_length
            )));
        }
        if self.frequency_bins != self.fingerprint_length {
            return Err(EngineError::InvalidConfig(format!(
                "frequency_bins ({}) must equal fingerprint_length ({}) for a square tile",
                self.frequency_bins, self.fingerprint_length
            )));
        }
        if !self.window_size.is_power_of_two() {
            return Err(EngineError::InvalidConfig(format!(
                "window_size {} is not a power of two",
                self.window_size
            )));
        }
        if self.overlap >= self.window_size {
            return Err(EngineError::InvalidConfig(format!(
                "overlap {} must be less than window_size {}",
                self.overlap, self.window_size
            )));
        }
        if self.top_wavelets == 0 || self.top_wavelets > self.fingerprint_length * self.fingerprint_length {
            return Err(EngineError::InvalidConfig(format!(
                "top_wavelets {} must be in 1..={}",
                self.top_wavelets,
                self.fingerprint_length * self.fingerprint_length
            )));
        }
        if self.start_frequency <= 0.0 || self.end_frequency <= self.start_frequency {
            return Err(EngineError::InvalidConfig(
                "start_frequency must be positive and less than end_frequency".into(),
            ));
        }
        Ok(())
    }
}

/// Parameters for C5/C6/C8: MinHash, LSH banding, and query thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexConfig {
    /// Number of LSH bands `L`.
    pub hash_tables: usize,
    /// Signature components per band `B`.
    pub hash_keys_per_table: usize,
    /// Minimum shared bands for a candidate to survive filtering.
    pub threshold_tables: usize,
    /// Cap on fingerprints considered per query clip.
    pub max_signature_count: usize,
    /// Cap on ranked tracks returned per query.
    pub top_candidates: usize,
    /// Blend weight `alpha` in the composite ordering score.
    pub ordering_alpha: f32,
    /// Deterministic seed for permutation generation; `None` uses OS randomness.
    pub permutation_seed: Option<u64>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        let hash_tables = 25;
        Self {
            hash_tables,
            hash_keys_per_table: 4,
            threshold_tables: (0.12 * hash_tables as f32).round() as usize,
            max_signature_count: 5,
            top_candidates: 200,
            ordering_alpha: 0.4,
            permutation_seed: None,
        }
    }
}

impl IndexConfig {
    /// MinHash signature length `K = L * B`.
    pub fn signature_length(&self) -> usize {
        self.hash_tables * self.hash_keys_per_table
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.hash_tables == 0 || self.hash_keys_per_table == 0 {
            return Err(EngineError::InvalidConfig(
                "hash_tables and hash_keys_per_table must be nonzero".into(),
            ));
        }
        if self.threshold_tables > self.hash_tables {
            return Err(EngineError::InvalidConfig(format!(
                "threshold_tables {} exceeds hash_tables {}",
                self.threshold_tables, self.hash_tables
            )));
        }
        if self.max_signature_count == 0 {
            return Err(EngineError::InvalidConfig(
                "max_signature_count must be nonzero".into(),
            ));
        }
        Ok(())
    }
}

/// Everything the store connection layer needs, read from the environment
/// the same way the teacher's `DB::new()` reads `DATABASE_URL`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub permutation_path: String,
}

impl StoreConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| EngineError::InvalidConfig("DATABASE_URL must be set".into()))?;
        let permutation_path = env::var("PERMUTATION_PATH")
            .unwrap_or_else(|_| "permutations.csv".to_string());

        Ok(Self {
            database_url,
            permutation_path,
        })
    }
}

/// The full set of knobs an `Engine` (C9) is built from.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub fingerprint: FingerprintConfig,
    pub index: IndexConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fingerprint: FingerprintConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        self.fingerprint.validate()?;
        self.index.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configs_validate() {
        assert!(FingerprintConfig::default().validate().is_ok());
        assert!(IndexConfig::default().validate().is_ok());
    }

    #[test]
    fn non_power_of_two_tile_is_rejected() {
        let mut cfg = FingerprintConfig::default();
        cfg.fingerprint_length = 33;
        cfg.frequency_bins = 33;
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn mismatched_tile_dims_are_rejected() {
        let mut cfg = FingerprintConfig::default();
        cfg.frequency_bins = 16;
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn threshold_above_hash_tables_is_rejected() {
        let mut cfg = IndexConfig::default();
        cfg.threshold_tables = cfg.hash_tables + 1;
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidConfig(_))));
    }
}
