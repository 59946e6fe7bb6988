// SPDX-License-Identifier: MIT
//! Serves cached waveform windows over a CBOR request/reply socket while
//! ingesting live `DataPacket` broadcasts from an upstream publisher to
//! keep the cache warm.

use anyhow::{anyhow, Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tracing::{error, info, warn};
use urts_config::ServiceConfig;
use urts_packet_cache::{CacheAlgorithm, PacketCache};
use urts_proto::wire::{decode_frame_header, encode_frame, to_cbor, FRAME_HEADER_BYTES};
use urts_transport::{Subscriber, ZapOptions};
use urts_worker::WorkerPool;

const SECTION: &str = "PacketCache";
const CALL_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_NUM_THREADS: usize = 2;

/// Which stage of startup or operation a fatal error occurred in,
/// determining this process's exit code.
enum Stage {
    Config,
    Init,
    Runtime,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let Some(config_path) = std::env::args().nth(1) else {
        error!("usage: urts-packetcache-service <config.ini>");
        return ExitCode::from(1);
    };
    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "failed to start async runtime");
            return ExitCode::from(2);
        }
    };
    match runtime.block_on(run(config_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err((Stage::Config, err)) => {
            error!(%err, "configuration error");
            ExitCode::from(1)
        }
        Err((Stage::Init, err)) => {
            error!(%err, "initialization failure");
            ExitCode::from(2)
        }
        Err((Stage::Runtime, err)) => {
            error!(%err, "runtime fatal error");
            ExitCode::from(3)
        }
    }
}

async fn run(config_path: String) -> Result<(), (Stage, anyhow::Error)> {
    let config =
        ServiceConfig::load(&config_path, SECTION).map_err(|e| (Stage::Config, e.into()))?;
    let address = config
        .address()
        .map_err(|e| (Stage::Config, e.into()))?
        .to_string();
    let max_packets = config
        .get_u32("maxPackets")
        .map_err(|e| (Stage::Config, e.into()))?;
    let upstream = config.get("upstreamAddress").map(str::to_string);

    let cache = Arc::new(max_packets.map_or_else(PacketCache::new, |n| {
        PacketCache::with_max_packets_per_channel(n as usize)
    }));

    let pool = Arc::new(WorkerPool::new(DEFAULT_NUM_THREADS));
    pool.initialize().map_err(|e| (Stage::Init, anyhow!(e)))?;
    pool.start(Arc::new(CacheAlgorithm::new(cache.clone())))
        .map_err(|e| (Stage::Init, anyhow!(e)))?;

    if let Some(upstream_address) = upstream {
        let ingest_cache = cache.clone();
        tokio::spawn(async move {
            if let Err(err) = ingest(upstream_address, ingest_cache).await {
                warn!(%err, "packet ingestion loop exited");
            }
        });
    }

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| (Stage::Init, e.into()))?;
    info!(%address, "packet cache service listening");

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| (Stage::Runtime, e.into()))?;
        let pool = pool.clone();
        tokio::spawn(async move {
            if let Err(err) = serve_connection(stream, pool).await {
                warn!(%peer, %err, "connection closed");
            }
        });
    }
}

async fn ingest(address: String, cache: Arc<PacketCache>) -> Result<()> {
    let mut subscriber = Subscriber::connect(address, ZapOptions::Grasslands)
        .await
        .context("connecting to upstream publisher")?;
    loop {
        let (message, _ts) = subscriber.recv().await.context("reading upstream broadcast")?;
        if let urts_proto::Message::DataPacket(packet) = message {
            cache.put(packet);
        }
    }
}

async fn serve_connection(mut stream: TcpStream, pool: Arc<WorkerPool>) -> Result<()> {
    loop {
        let mut header = [0u8; FRAME_HEADER_BYTES];
        match stream.read_exact(&mut header).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        let len = decode_frame_header(header)?;
        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).await?;

        let worker = pool.clone();
        let reply = tokio::task::spawn_blocking(move || worker.call(payload, CALL_TIMEOUT))
            .await
            .context("worker thread panicked")??;
        let framed = encode_frame(&to_cbor(&reply)?)?;
        stream.write_all(&framed).await?;
    }
}
