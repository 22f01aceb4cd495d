//! Diesel row types for the three-table schema.

use std::collections::BTreeMap;
use std::time::SystemTime;

use diesel::prelude::*;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::tracks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TrackRow {
    pub id: i32,
    pub album_id: Option<i32>,
    pub duration_ms: Option<i64>,
    pub artist: Option<String>,
    pub title: String,
    pub path: String,
    pub tags: String,
    pub total_fingerprints: i32,
    pub created_at: Option<SystemTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::tracks)]
pub struct NewTrack {
    pub album_id: Option<i32>,
    pub duration_ms: Option<i64>,
    pub artist: Option<String>,
    pub title: String,
    pub path: String,
    pub tags: String,
    pub total_fingerprints: i32,
    pub created_at: Option<SystemTime>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::fingerprints)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FingerprintRow {
    pub id: i64,
    pub track_id: i32,
    pub sequence_index: i32,
    pub total_per_track: i32,
    pub bits: Vec<u8>,
    pub bit_len: i32,
    pub created_at: Option<SystemTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::fingerprints)]
pub struct NewFingerprintRow {
    pub track_id: i32,
    pub sequence_index: i32,
    pub total_per_track: i32,
    pub bits: Vec<u8>,
    pub bit_len: i32,
    pub created_at: Option<SystemTime>,
}

#[derive(Queryable, QueryableByName, Debug, Clone)]
#[diesel(table_name = crate::schema::hash_bins)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HashBinRow {
    pub id: i64,
    pub fingerprint_id: i64,
    pub track_id: i32,
    pub band_index: i32,
    pub band_key: i64,
    pub created_at: Option<SystemTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::hash_bins)]
pub struct NewHashBinRow {
    pub fingerprint_id: i64,
    pub track_id: i32,
    pub band_index: i32,
    pub band_key: i64,
    pub created_at: Option<SystemTime>,
}

/// Fingerprint bits serialize one byte per flag (`0` or `1`), not
/// bit-packed, to keep the `bytea` layout trivial to inspect by hand.
/// A bit-packed format is a local optimization left for a future
/// migration that bumps a format marker.
pub fn bits_to_bytes(bits: &[bool]) -> Vec<u8> {
    bits.iter().map(|&b| b as u8).collect()
}

pub fn bytes_to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes.iter().map(|&b| b != 0).collect()
}

/// Serializes a tag map as `k=v;k=v`, sorted by key so the encoding is
/// stable for round-trip tests and doesn't depend on map iteration order.
pub fn serialize_tags(tags: &BTreeMap<String, String>) -> String {
    tags.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Parses the `k=v;k=v` tag encoding back into a map. Entries without an
/// `=` are skipped rather than treated as an error; this is free-form
/// metadata, not a validated schema.
pub fn parse_tags(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_trip_through_byte_encoding() {
        let bits = vec![true, false, true, true, false, false, false, true, true];
        let bytes = bits_to_bytes(&bits);
        assert_eq!(bytes_to_bits(&bytes), bits);
    }

    #[test]
    fn tags_round_trip_through_kv_encoding() {
        let mut tags = BTreeMap::new();
        tags.insert("genre".to_string(), "jazz".to_string());
        tags.insert("year".to_string(), "1959".to_string());

        let encoded = serialize_tags(&tags);
        assert_eq!(encoded, "genre=jazz;year=1959");
        assert_eq!(parse_tags(&encoded), tags);
    }

    #[test]
    fn empty_tags_round_trip_to_empty_map() {
        assert_eq!(serialize_tags(&BTreeMap::new()), "");
        assert!(parse_tags("").is_empty());
    }
}
