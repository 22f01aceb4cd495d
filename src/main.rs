mod cli;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use cli::{Cli, Commands};
use sabi::audio::AudioDecoder;
use sabi::config::{EngineConfig, StoreConfig};
use sabi::minhash::permutations::PermutationTable;
use sabi::repository::TrackMetadata;
use sabi::store::Store;
use sabi::Engine;

fn build_engine(config: EngineConfig, store_config: &StoreConfig) -> anyhow::Result<Engine> {
    config.validate()?;

    let store = Store::connect(&store_config.database_url)?;
    let permutations = PermutationTable::load_or_create(
        &store_config.permutation_path,
        config.index.signature_length(),
        config.fingerprint.fingerprint_bits(),
        config.index.permutation_seed,
    )?;

    Ok(Engine::new(store, Arc::new(permutations), config)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(level).init();

    let config = EngineConfig::default();
    let store_config = StoreConfig::from_env()?;
    let decoder = AudioDecoder::new();

    match cli.command {
        Commands::Ingest {
            path,
            title,
            artist,
            album_id,
            tags,
        } => {
            let mut engine = build_engine(config, &store_config)?;
            let (raw, native_rate) = decoder.decode_file(&path.to_string_lossy())?;
            let pcm = decoder.resample_linear(&raw, native_rate, engine.sample_rate());
            let metadata = TrackMetadata {
                album_id,
                artist,
                title: title.clone(),
                path: path.to_string_lossy().into_owned(),
                tags: tags
                    .iter()
                    .filter_map(|pair| pair.split_once('='))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            };
            let track_id = engine.insert_track(&metadata, &pcm)?;
            println!("indexed track {track_id} ({title})");
        }
        Commands::Query {
            path,
            threshold,
            top,
            search_all,
        } => {
            let mut query_config = config.clone();
            if let Some(threshold) = threshold {
                query_config.index.threshold_tables = threshold;
            }
            if let Some(top) = top {
                query_config.index.top_candidates = top;
            }

            let mut engine = build_engine(query_config, &store_config)?;
            let (raw, native_rate) = decoder.decode_file(&path.to_string_lossy())?;
            let pcm = decoder.resample_linear(&raw, native_rate, engine.sample_rate());
            let matches = engine.find_similar(&pcm, search_all)?;

            if matches.is_empty() {
                println!("no matches found");
            }
            for (track, stats) in matches {
                println!(
                    "{:>6}  {:<40}  votes={:<4} min_hamming={:<4} similarity={:.3} score={:.4}",
                    track.id, track.title, stats.table_votes, stats.min_hamming_distance, stats.similarity, stats.score
                );
            }
        }
        Commands::List { artist } => {
            let mut engine = build_engine(config, &store_config)?;
            for track in engine.list_tracks(artist.as_deref())? {
                let artist = track.artist.as_deref().unwrap_or("-");
                println!("{:>6}  {:<20}  {}", track.id, artist, track.title);
            }
        }
        Commands::Count => {
            let mut engine = build_engine(config, &store_config)?;
            println!("{}", engine.count_tracks()?);
        }
        Commands::Reset => {
            let mut engine = build_engine(config, &store_config)?;
            engine.reset_database()?;
            println!("database reset");
        }
        Commands::Serve { addr } => {
            let engine = build_engine(config, &store_config)?;
            let socket_addr: SocketAddr = addr.parse()?;
            sabi::server::serve(engine, socket_addr).await?;
        }
    }

    Ok(())
}
