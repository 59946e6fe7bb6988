// SPDX-License-Identifier: MIT
//! Runs a single inference model — one of a one-component detector,
//! three-component detector, picker, first-motion classifier, locator,
//! travel-time table, or associator — behind a CBOR request/reply
//! socket, selected at startup by the `serviceType` configuration key.

mod models;

use anyhow::{anyhow, Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Runtime;
use tracing::{error, info, warn};
use urts_associator::AssociatorAlgorithm;
use urts_config::ServiceConfig;
use urts_inference::{
    DetectorAlgorithm, FirstMotionAlgorithm, LocatorAlgorithm, PickerAlgorithm, TravelTimeAlgorithm,
};
use urts_proto::wire::{decode_frame_header, encode_frame, to_cbor, FRAME_HEADER_BYTES};
use urts_worker::{Algorithm, WorkerPool};

use models::{
    ConstantVelocityTravelTime, EnergyRatioDetector, SeedLocator, TimeWindowAssociator,
    UniformFirstMotion, ZeroCorrectionPicker,
};

const SECTION: &str = "Inference";
const CALL_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_NUM_THREADS: usize = 1;

/// Which stage of startup or operation a fatal error occurred in,
/// determining this process's exit code.
enum Stage {
    Config,
    Init,
    Runtime,
}

/// The model kind a single instance of this service runs, selected by
/// the `serviceType` configuration key. Exactly one is loaded per
/// process, matching how each service binary owns one worker pool.
enum ServiceKind {
    Detector1c,
    Detector3c,
    Picker,
    FirstMotion,
    Locator,
    TravelTime,
    Associator,
}

impl ServiceKind {
    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "Detector1C" => Ok(Self::Detector1c),
            "Detector3C" => Ok(Self::Detector3c),
            "Picker" => Ok(Self::Picker),
            "FirstMotion" => Ok(Self::FirstMotion),
            "Locator" => Ok(Self::Locator),
            "TravelTime" => Ok(Self::TravelTime),
            "Associator" => Ok(Self::Associator),
            other => Err(anyhow!(
                "unrecognized serviceType '{other}' (expected one of Detector1C, Detector3C, \
                 Picker, FirstMotion, Locator, TravelTime, Associator)"
            )),
        }
    }

    fn build_algorithm(&self) -> Arc<dyn Algorithm> {
        match self {
            Self::Detector1c => Arc::new(DetectorAlgorithm::new(EnergyRatioDetector::one_component())),
            Self::Detector3c => {
                Arc::new(DetectorAlgorithm::new(EnergyRatioDetector::three_component()))
            }
            Self::Picker => Arc::new(PickerAlgorithm::new(ZeroCorrectionPicker::new())),
            Self::FirstMotion => Arc::new(FirstMotionAlgorithm::new(UniformFirstMotion::new())),
            Self::Locator => Arc::new(LocatorAlgorithm::new(SeedLocator)),
            Self::TravelTime => Arc::new(TravelTimeAlgorithm::new(ConstantVelocityTravelTime::new())),
            Self::Associator => Arc::new(AssociatorAlgorithm::new(TimeWindowAssociator::new())),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let Some(config_path) = std::env::args().nth(1) else {
        error!("usage: urts-inference-service <config.ini>");
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
    let service_type = config
        .require("serviceType")
        .map_err(|e| (Stage::Config, e.into()))?;
    let kind = ServiceKind::parse(service_type).map_err(|e| (Stage::Config, e))?;
    let num_threads = config
        .get_u32("nThreads")
        .map_err(|e| (Stage::Config, e.into()))?
        .map_or(DEFAULT_NUM_THREADS, |n| n as usize);

    if let Some(weights_file) = config.get("modelWeightsFile") {
        warn!(
            %weights_file,
            "modelWeightsFile is configured but this build has no model-weight loader; \
             running the analytic placeholder model instead"
        );
    }
    if let Some(device) = config.device().map_err(|e| (Stage::Config, e.into()))? {
        info!(?device, "device selection is accepted but has no effect on the placeholder model");
    }

    let pool = Arc::new(WorkerPool::new(num_threads));
    pool.initialize().map_err(|e| (Stage::Init, anyhow!(e)))?;
    pool.start(kind.build_algorithm()).map_err(|e| (Stage::Init, anyhow!(e)))?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| (Stage::Init, e.into()))?;
    info!(%address, %service_type, "inference service listening");

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
