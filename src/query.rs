//! C8 — similarity query: turns a clip's fingerprints into ranked track
//! matches.
//!
//! A Hamming/table-vote composite score; stylistically
//! grounded on the teacher's `vote_best_matches` (`HashMap`-keyed
//! per-candidate accumulation, final `sort_by` + `truncate`). Parallel
//! reduction above `PARALLEL_THRESHOLD` candidates is grounded on
//! `Vishal4742-sonica`'s `audio-engine` crate, which pulls in `rayon` for
//! exactly this shape of CPU-bound fan-out.

use std::collections::HashMap;

use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::config::IndexConfig;
use crate::fingerprint::FingerprintBits;
use crate::minhash::{compute_signature, group_to_bands, permutations::PermutationTable};
use crate::store::{HashBinMatch, Store};

/// Candidate fan-out size above which scoring switches to a `rayon`
/// parallel fold; below it the sequential path avoids thread-pool overhead
/// for small result sets.
const PARALLEL_THRESHOLD: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryStats {
    /// Total bands (summed across every surviving query/candidate pair)
    /// this track's fingerprints collided on.
    pub table_votes: usize,
    /// Smallest Hamming distance observed between any query fingerprint
    /// and any of this track's matched fingerprints.
    pub min_hamming_distance: usize,
    /// Number of candidate matches folded into this track's stats.
    pub candidate_count: usize,
    /// Best per-fingerprint similarity observed for this track, `1 -
    /// min_hamming_distance / F`.
    pub similarity: f32,
    /// Composite ranking score: lower is more similar.
    pub score: f32,
}

/// One (query fingerprint, candidate fingerprint) pair's contribution to
/// its owning track's running stats.
#[derive(Debug, Clone, Copy)]
struct Contribution {
    track_id: i32,
    table_votes: usize,
    hamming: usize,
}

#[derive(Debug, Clone)]
struct Accumulator {
    total_table_votes: usize,
    hamming_distance_sum: usize,
    min_hamming_distance: usize,
    candidate_count: usize,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            total_table_votes: 0,
            hamming_distance_sum: 0,
            min_hamming_distance: usize::MAX,
            candidate_count: 0,
        }
    }

    fn absorb(&mut self, c: &Contribution) {
        self.total_table_votes += c.table_votes;
        self.hamming_distance_sum += c.hamming;
        self.min_hamming_distance = self.min_hamming_distance.min(c.hamming);
        self.candidate_count += 1;
    }

    fn merge(&mut self, other: &Accumulator) {
        self.total_table_votes += other.total_table_votes;
        self.hamming_distance_sum += other.hamming_distance_sum;
        self.min_hamming_distance = self.min_hamming_distance.min(other.min_hamming_distance);
        self.candidate_count += other.candidate_count;
    }
}

/// Runs one similarity query: bands every fingerprint in `query_fingerprints`,
/// looks up candidates sharing a band key, scores each candidate track by
/// table votes and Hamming distance, and returns tracks ranked best-first.
///
/// `search_all` bypasses the per-fingerprint LSH lookup entirely and scores
/// against every indexed fingerprint (via [`Store::read_all_hash_bins`]),
/// a debugging/audit escape hatch that also disables `threshold_tables`
/// filtering.
pub fn query(
    store: &mut Store,
    query_fingerprints: &[FingerprintBits],
    permutations: &PermutationTable,
    cfg: &IndexConfig,
    search_all: bool,
) -> crate::error::EngineResult<Vec<(i32, QueryStats)>> {
    let truncated = if query_fingerprints.len() > cfg.max_signature_count {
        &query_fingerprints[..cfg.max_signature_count]
    } else {
        query_fingerprints
    };

    if truncated.is_empty() {
        return Ok(Vec::new());
    }

    let fingerprint_bits = truncated[0].len();

    let all_matches = if search_all {
        Some(store.read_all_hash_bins()?)
    } else {
        None
    };

    let mut per_query_matches: Vec<HashMap<i64, HashBinMatch>> = Vec::with_capacity(truncated.len());
    for fp in truncated {
        let matches = if let Some(all) = &all_matches {
            all.clone()
        } else {
            let signature = compute_signature(fp, permutations);
            let bands = group_to_bands(&signature, cfg.hash_tables, cfg.hash_keys_per_table);
            store.lookup_by_hash_bins(&bands)?
        };
        per_query_matches.push(matches);
    }

    let threshold = if search_all { 0 } else { cfg.threshold_tables };

    let mut candidate_ids: Vec<i64> = per_query_matches
        .iter()
        .flat_map(|m| m.keys().copied())
        .collect();
    candidate_ids.sort_unstable();
    candidate_ids.dedup();

    if candidate_ids.is_empty() {
        return Ok(Vec::new());
    }

    let candidate_fingerprints = store.read_fingerprints_by_id(&candidate_ids)?;

    let contributions: Vec<Contribution> = truncated
        .iter()
        .zip(per_query_matches.iter())
        .flat_map(|(fp, matches)| {
            matches.iter().filter_map(move |(fingerprint_id, m)| {
                let table_votes = m.votes.min(cfg.hash_tables);
                if table_votes < threshold {
                    return None;
                }
                let candidate_bits = candidate_fingerprints.get(fingerprint_id)?;
                let hamming = fp.hamming_distance(candidate_bits);
                Some(Contribution {
                    track_id: m.track_id,
                    table_votes,
                    hamming,
                })
            })
        })
        .collect();

    let per_track = if contributions.len() > PARALLEL_THRESHOLD {
        reduce_parallel(&contributions)
    } else {
        reduce_sequential(&contributions)
    };

    let mut scored: Vec<(i32, QueryStats)> = per_track
        .into_iter()
        .map(|(track_id, acc)| {
            let stats = score(&acc, cfg.ordering_alpha, fingerprint_bits);
            (track_id, stats)
        })
        .collect();

    scored.sort_by(|a, b| {
        OrderedFloat(a.1.score)
            .cmp(&OrderedFloat(b.1.score))
            .then(a.1.min_hamming_distance.cmp(&b.1.min_hamming_distance))
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(cfg.top_candidates);

    Ok(scored)
}

fn score(acc: &Accumulator, alpha: f32, fingerprint_bits: usize) -> QueryStats {
    let distance_ratio = acc.hamming_distance_sum as f32 / acc.total_table_votes.max(1) as f32;
    let score = distance_ratio + alpha * acc.min_hamming_distance as f32;
    let similarity = 1.0 - (acc.min_hamming_distance as f32 / fingerprint_bits.max(1) as f32);
    QueryStats {
        table_votes: acc.total_table_votes,
        min_hamming_distance: acc.min_hamming_distance,
        candidate_count: acc.candidate_count,
        similarity,
        score,
    }
}

fn reduce_sequential(contributions: &[Contribution]) -> HashMap<i32, Accumulator> {
    let mut map: HashMap<i32, Accumulator> = HashMap::new();
    for c in contributions {
        map.entry(c.track_id).or_insert_with(Accumulator::new).absorb(c);
    }
    map
}

/// Parallel fan-in: each chunk reduces independently, then chunk maps are
/// merged sequentially. Per-track totals are associative and commutative,
/// so the final merge order never affects the result, keeping the overall
/// query deterministic regardless of thread scheduling.
fn reduce_parallel(contributions: &[Contribution]) -> HashMap<i32, Accumulator> {
    contributions
        .par_chunks(PARALLEL_THRESHOLD / 4 + 1)
        .map(reduce_sequential)
        .reduce(HashMap::new, |mut a, b| {
            for (track_id, acc) in b {
                a.entry(track_id).or_insert_with(Accumulator::new).merge(&acc);
            }
            a
        })
}
