//! C7 — the Diesel-backed index store: tracks, their fingerprints, and the
//! LSH band keys derived from each fingerprint.
//!
//! Wraps a bare `PgConnection` with a `dotenvy`-sourced URL and batches
//! inserts as `insert_into(...).values(batch)` transactions. Candidate
//! lookups use a temp-table join against the band keys of a query, rather
//! than an `IN (...)` list per band, to keep a wide fan-out query planar.

pub mod models;

use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;

use diesel::connection::SimpleConnection;
use diesel::dsl::insert_into;
use diesel::prelude::*;

use crate::error::{EngineError, EngineResult};
use crate::fingerprint::FingerprintBits;
use models::{
    bits_to_bytes, bytes_to_bits, parse_tags, serialize_tags, FingerprintRow, HashBinRow,
    NewFingerprintRow, NewHashBinRow, NewTrack, TrackRow,
};

const FINGERPRINT_BATCH_SIZE: usize = 5_000;
const HASH_BIN_BATCH_SIZE: usize = 10_000;

/// Everything `insert_track` needs beyond the PCM itself — the free-form
/// metadata half of the §3 Track record.
#[derive(Debug, Clone, Default)]
pub struct NewTrackMetadata {
    pub album_id: Option<i32>,
    pub duration_ms: Option<i64>,
    pub artist: Option<String>,
    pub title: String,
    pub path: String,
    pub tags: BTreeMap<String, String>,
}

/// One stored track alongside the fingerprint count it was indexed with —
/// the denormalized counter kept consistent with the rows in
/// `fingerprints`, so query-time vote totals never drift from the table.
#[derive(Debug, Clone)]
pub struct TrackRecord {
    pub id: i32,
    pub album_id: Option<i32>,
    pub duration_ms: Option<i64>,
    pub artist: Option<String>,
    pub title: String,
    pub path: String,
    pub tags: BTreeMap<String, String>,
    pub total_fingerprints: i32,
}

impl From<TrackRow> for TrackRecord {
    fn from(row: TrackRow) -> Self {
        Self {
            id: row.id,
            album_id: row.album_id,
            duration_ms: row.duration_ms,
            artist: row.artist,
            title: row.title,
            path: row.path,
            tags: parse_tags(&row.tags),
            total_fingerprints: row.total_fingerprints,
        }
    }
}

/// A candidate fingerprint surfaced by `lookup_by_hash_bins`: how many
/// distinct bands it collided on, and the track it belongs to (denormalized
/// onto `hash_bins` so this doesn't need a join back to `fingerprints`).
#[derive(Debug, Clone, Copy)]
pub struct HashBinMatch {
    pub track_id: i32,
    pub votes: usize,
}

pub struct Store {
    conn: PgConnection,
}

impl Store {
    pub fn connect(database_url: &str) -> EngineResult<Self> {
        let conn = PgConnection::establish(database_url)
            .map_err(|e| EngineError::StoreWrite(e.to_string()))?;
        Ok(Self { conn })
    }

    pub fn insert_track(&mut self, metadata: &NewTrackMetadata) -> EngineResult<i32> {
        let inserted = insert_track_row(&mut self.conn, metadata, 0)?;
        Ok(inserted.id)
    }

    /// Indexes a whole track in one logical transaction: the track row,
    /// every fingerprint, and every fingerprint's hash-bin rows all commit
    /// together or not at all — per §4.9, a failure partway (e.g. the
    /// hash-bin insert for fingerprint k of n) must not leave the track
    /// row live with only some of its fingerprints indexed. Returns the
    /// new track id and the ids assigned to `fingerprints`, in order.
    pub fn insert_indexed_track(
        &mut self,
        metadata: &NewTrackMetadata,
        fingerprints: &[FingerprintBits],
        bands_per_fingerprint: &[HashMap<usize, u64>],
    ) -> EngineResult<(i32, Vec<i64>)> {
        debug_assert_eq!(fingerprints.len(), bands_per_fingerprint.len());

        self.conn.transaction(|conn| {
            let track = insert_track_row(conn, metadata, fingerprints.len() as i32)?;

            let fingerprint_ids = insert_fingerprint_rows(conn, track.id, fingerprints)?;

            for (fingerprint_id, bands) in fingerprint_ids.iter().zip(bands_per_fingerprint.iter()) {
                insert_hash_bin_rows(conn, track.id, *fingerprint_id, bands)?;
            }

            Ok((track.id, fingerprint_ids))
        })
    }

    pub fn read_track_by_id(&mut self, track_id: i32) -> EngineResult<Option<TrackRecord>> {
        use crate::schema::tracks::dsl::*;

        let row = tracks
            .filter(id.eq(track_id))
            .first::<TrackRow>(&mut self.conn)
            .optional()?;
        Ok(row.map(TrackRecord::from))
    }

    /// Reads several tracks at once, grouped by id regardless of physical
    /// row order — the spec's corrected contract for the source's buggy
    /// `readFingerprintsByMultipleTrackId` grouping.
    pub fn read_tracks_by_id(&mut self, ids: &[i32]) -> EngineResult<HashMap<i32, TrackRecord>> {
        use crate::schema::tracks::dsl::*;

        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = tracks.filter(id.eq_any(ids)).load::<TrackRow>(&mut self.conn)?;
        Ok(rows.into_iter().map(|row| (row.id, TrackRecord::from(row))).collect())
    }

    /// Lists every track, optionally filtered to a single artist (exact
    /// match). `None` returns the whole table.
    pub fn read_tracks(&mut self, artist_filter: Option<&str>) -> EngineResult<Vec<TrackRecord>> {
        use crate::schema::tracks::dsl::*;

        let rows = match artist_filter {
            Some(name) => tracks.filter(artist.eq(name)).load::<TrackRow>(&mut self.conn)?,
            None => tracks.load::<TrackRow>(&mut self.conn)?,
        };
        Ok(rows.into_iter().map(TrackRecord::from).collect())
    }

    pub fn count_tracks(&mut self) -> EngineResult<i64> {
        use crate::schema::tracks::dsl::*;

        tracks.count().get_result(&mut self.conn).map_err(Into::into)
    }

    /// Inserts every fingerprint for `track_id` in one transaction, stamps
    /// each row's `total_per_track` with the batch size (advisory, written
    /// once and never recomputed on read), and bumps the track's running
    /// counter. Returns the new row ids in the same order as `fingerprints`.
    pub fn insert_fingerprints(
        &mut self,
        track_id: i32,
        fingerprints: &[FingerprintBits],
    ) -> EngineResult<Vec<i64>> {
        use crate::schema::tracks::dsl as track_dsl;

        if fingerprints.is_empty() {
            return Ok(Vec::new());
        }

        self.conn.transaction(|conn| {
            let ids = insert_fingerprint_rows(conn, track_id, fingerprints)?;

            diesel::update(track_dsl::tracks.filter(track_dsl::id.eq(track_id)))
                .set(track_dsl::total_fingerprints.eq(track_dsl::total_fingerprints + ids.len() as i32))
                .execute(conn)?;

            Ok(ids)
        })
    }

    pub fn read_fingerprints_by_id(
        &mut self,
        ids: &[i64],
    ) -> EngineResult<HashMap<i64, FingerprintBits>> {
        use crate::schema::fingerprints::dsl::*;

        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = fingerprints
            .filter(id.eq_any(ids))
            .load::<FingerprintRow>(&mut self.conn)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let bits = bytes_to_bits(&row.bits);
                (row.id, FingerprintBits(bits))
            })
            .collect())
    }

    /// Inserts every band key produced for one fingerprint in a single
    /// transaction, denormalizing `track_id` onto each row so candidate
    /// lookups don't need a join back to `fingerprints`.
    pub fn insert_hash_bins(
        &mut self,
        track_id: i32,
        fingerprint_id: i64,
        bands: &HashMap<usize, u64>,
    ) -> EngineResult<()> {
        if bands.is_empty() {
            return Ok(());
        }

        self.conn
            .transaction(|conn| insert_hash_bin_rows(conn, track_id, fingerprint_id, bands))
    }

    /// For each `(band_index, band_key)` pair in `bands`, finds every other
    /// fingerprint sharing that exact key, and returns a per-fingerprint
    /// vote count plus its owning track. Grounded on the teacher's
    /// `fetch_matches_grouped_by_hash` temp-table join, generalized from a
    /// single `hash` column to `(band_index, band_key)` pairs.
    pub fn lookup_by_hash_bins(
        &mut self,
        bands: &HashMap<usize, u64>,
    ) -> EngineResult<HashMap<i64, HashBinMatch>> {
        if bands.is_empty() {
            return Ok(HashMap::new());
        }

        let pairs: Vec<(i32, i64)> = bands
            .iter()
            .map(|(&b, &k)| (b as i32, k as i64))
            .collect();

        let rows: Vec<HashBinRow> = self.conn.transaction(|conn| {
            conn.batch_execute(
                "CREATE TEMPORARY TABLE query_bands (band_index INT NOT NULL, band_key BIGINT NOT NULL) ON COMMIT DROP;",
            )?;

            diesel::table! {
                query_bands (band_index, band_key) {
                    band_index -> Integer,
                    band_key -> BigInt,
                }
            }

            #[derive(Insertable)]
            #[diesel(table_name = query_bands)]
            struct NewQueryBand {
                band_index: i32,
                band_key: i64,
            }

            let to_insert: Vec<NewQueryBand> = pairs
                .iter()
                .map(|&(band_index, band_key)| NewQueryBand { band_index, band_key })
                .collect();
            insert_into(query_bands::table)
                .values(&to_insert)
                .execute(conn)?;

            diesel::sql_query(
                "SELECT h.id, h.fingerprint_id, h.track_id, h.band_index, h.band_key, h.created_at \
                 FROM hash_bins AS h \
                 INNER JOIN query_bands AS q \
                 ON h.band_index = q.band_index AND h.band_key = q.band_key;",
            )
            .load::<HashBinRow>(conn)
        })?;

        let mut matches: HashMap<i64, HashBinMatch> = HashMap::new();
        for row in rows {
            matches
                .entry(row.fingerprint_id)
                .and_modify(|m| m.votes += 1)
                .or_insert(HashBinMatch {
                    track_id: row.track_id,
                    votes: 1,
                });
        }
        Ok(matches)
    }

    /// Full, unpaginated scan of every stored band key, grouped by
    /// fingerprint — the `searchAll` escape hatch that bypasses LSH
    /// candidate lookup entirely. The teacher's original query carried a
    /// fixed `LIMIT` that silently truncated large tables; this
    /// intentionally has none.
    pub fn read_all_hash_bins(&mut self) -> EngineResult<HashMap<i64, HashBinMatch>> {
        use crate::schema::hash_bins::dsl::*;

        let rows = hash_bins
            .select((fingerprint_id, track_id, band_index))
            .load::<(i64, i32, i32)>(&mut self.conn)?;

        let mut matches: HashMap<i64, HashBinMatch> = HashMap::new();
        for (fp_id, trk_id, _band) in rows {
            matches
                .entry(fp_id)
                .and_modify(|m| m.votes += 1)
                .or_insert(HashBinMatch { track_id: trk_id, votes: 1 });
        }
        Ok(matches)
    }

    /// Truncates all three tables, for a clean-slate rebuild.
    pub fn reset(&mut self) -> EngineResult<()> {
        self.conn
            .transaction(|conn| {
                diesel::sql_query("TRUNCATE TABLE hash_bins, fingerprints, tracks RESTART IDENTITY CASCADE;")
                    .execute(conn)
            })
            .map_err(|e: diesel::result::Error| EngineError::StoreWrite(e.to_string()))?;
        Ok(())
    }
}

/// Inserts one track row with `total_fingerprints` stamped up front. Shared
/// by the standalone `insert_track` and by `insert_indexed_track`, which
/// folds this into a larger transaction.
fn insert_track_row(
    conn: &mut PgConnection,
    metadata: &NewTrackMetadata,
    total_fingerprints: i32,
) -> Result<TrackRow, diesel::result::Error> {
    use crate::schema::tracks::dsl::*;

    let new_track = NewTrack {
        album_id: metadata.album_id,
        duration_ms: metadata.duration_ms,
        artist: metadata.artist.clone(),
        title: metadata.title.clone(),
        path: metadata.path.clone(),
        tags: serialize_tags(&metadata.tags),
        total_fingerprints,
        created_at: Some(SystemTime::now()),
    };

    insert_into(tracks).values(&new_track).get_result(conn)
}

/// Batches every fingerprint row for `track_id` into the connection's
/// current transaction. Shared by the standalone `insert_fingerprints` and
/// by `insert_indexed_track`.
fn insert_fingerprint_rows(
    conn: &mut PgConnection,
    track_id: i32,
    fingerprints: &[FingerprintBits],
) -> Result<Vec<i64>, diesel::result::Error> {
    use crate::schema::fingerprints::dsl as fp_dsl;

    if fingerprints.is_empty() {
        return Ok(Vec::new());
    }

    let total_per_track = fingerprints.len() as i32;
    let rows: Vec<NewFingerprintRow> = fingerprints
        .iter()
        .enumerate()
        .map(|(i, fp)| NewFingerprintRow {
            track_id,
            sequence_index: i as i32,
            total_per_track,
            bits: bits_to_bytes(&fp.0),
            bit_len: fp.len() as i32,
            created_at: Some(SystemTime::now()),
        })
        .collect();

    let mut ids = Vec::with_capacity(rows.len());
    for batch in rows.chunks(FINGERPRINT_BATCH_SIZE) {
        let inserted: Vec<FingerprintRow> = insert_into(fp_dsl::fingerprints).values(batch).get_results(conn)?;
        ids.extend(inserted.into_iter().map(|r| r.id));
    }
    Ok(ids)
}

/// Batches every band-key row for one fingerprint into the connection's
/// current transaction. Shared by the standalone `insert_hash_bins` and by
/// `insert_indexed_track`.
fn insert_hash_bin_rows(
    conn: &mut PgConnection,
    track_id: i32,
    fingerprint_id: i64,
    bands: &HashMap<usize, u64>,
) -> Result<(), diesel::result::Error> {
    use crate::schema::hash_bins::dsl as bins_dsl;

    if bands.is_empty() {
        return Ok(());
    }

    let rows: Vec<NewHashBinRow> = bands
        .iter()
        .map(|(&band_index, &band_key)| NewHashBinRow {
            fingerprint_id,
            track_id,
            band_index: band_index as i32,
            band_key: band_key as i64,
            created_at: Some(SystemTime::now()),
        })
        .collect();

    for batch in rows.chunks(HASH_BIN_BATCH_SIZE) {
        insert_into(bins_dsl::hash_bins).values(batch).execute(conn)?;
    }
    Ok(())
}
