//! C5 — permutation store: generates and persists the `K x F` permutation
//! table MinHash signatures are computed against.
//!
//! Grounded on the teacher's declared-but-unused `rand = "0.9.2"`
//! dependency and its `dotenvy`-driven flat-file conventions in
//! `db/connector.rs` — this is exactly the gap those fill.

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{EngineError, EngineResult};

/// A `K x F` table of permutations of `[0, F)`, loaded once per process
/// and treated as read-only process-wide state.
#[derive(Debug, Clone, PartialEq)]
pub struct PermutationTable {
    rows: Vec<Vec<u32>>,
    fingerprint_bits: usize,
}

impl PermutationTable {
    /// Generates `k` fresh random permutations of `[0, fingerprint_bits)`.
    /// `seed = Some(_)` drives a reproducible `StdRng`; `None` seeds from
    /// the OS.
    pub fn generate(k: usize, fingerprint_bits: usize, seed: Option<u64>) -> Self {
        let mut rows = Vec::with_capacity(k);

        match seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                for _ in 0..k {
                    rows.push(Self::shuffled_identity(fingerprint_bits, &mut rng));
                }
            }
            None => {
                let mut rng = rand::rng();
                for _ in 0..k {
                    rows.push(Self::shuffled_identity(fingerprint_bits, &mut rng));
                }
            }
        }

        Self {
            rows,
            fingerprint_bits,
        }
    }

    fn shuffled_identity<R: rand::Rng + ?Sized>(fingerprint_bits: usize, rng: &mut R) -> Vec<u32> {
        let mut row: Vec<u32> = (0..fingerprint_bits as u32).collect();
        row.shuffle(rng);
        row
    }

    pub fn k(&self) -> usize {
        self.rows.len()
    }

    pub fn fingerprint_bits(&self) -> usize {
        self.fingerprint_bits
    }

    /// The `p`-th permutation row.
    pub fn row(&self, p: usize) -> &[u32] {
        &self.rows[p]
    }

    /// Persists the table as `K` rows of `F` space-separated integers
    /// (one row per permutation).
    pub fn save(&self, path: impl AsRef<Path>) -> EngineResult<()> {
        let mut contents = String::new();
        for row in &self.rows {
            let line = row
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            contents.push_str(&line);
            contents.push('\n');
        }
        fs::write(path, contents).map_err(|e| EngineError::StoreWrite(e.to_string()))
    }

    /// Loads a permutation file, verifying it agrees with the `(k,
    /// fingerprint_bits)` this database expects. A mismatch is fatal
    /// because regenerating the table
    /// invalidates every stored signature.
    pub fn load(path: impl AsRef<Path>, k: usize, fingerprint_bits: usize) -> EngineResult<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| EngineError::StoreRead(e.to_string()))?;

        let mut rows = Vec::new();
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            let row: Result<Vec<u32>, _> = line.split_whitespace().map(|tok| tok.parse::<u32>()).collect();
            let row = row.map_err(|e| {
                EngineError::SchemaMismatch(format!("malformed permutation row: {e}"))
            })?;
            rows.push(row);
        }

        if rows.len() != k {
            return Err(EngineError::SchemaMismatch(format!(
                "permutation file has {} rows, database expects K={}",
                rows.len(),
                k
            )));
        }
        for row in &rows {
            if row.len() != fingerprint_bits {
                return Err(EngineError::SchemaMismatch(format!(
                    "permutation row has {} entries, database expects F={}",
                    row.len(),
                    fingerprint_bits
                )));
            }
        }

        Ok(Self {
            rows,
            fingerprint_bits,
        })
    }

    /// Loads the table at `path` if present, else generates and persists
    /// a fresh one — the usual "first run creates the database identity"
    /// path for a brand-new store.
    pub fn load_or_create(
        path: impl AsRef<Path>,
        k: usize,
        fingerprint_bits: usize,
        seed: Option<u64>,
    ) -> EngineResult<Self> {
        if path.as_ref().exists() {
            Self::load(path, k, fingerprint_bits)
        } else {
            let table = Self::generate(k, fingerprint_bits, seed);
            table.save(path)?;
            Ok(table)
        }
    }
}
