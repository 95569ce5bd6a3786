use clap::Parser;
use fermion_compute::ExecutionUnit;
use fermion_core::{RenderError, DEFAULT_EXPORT_NAME};
use fermion_ui::{
    Bridge, ConfigError, LogSink, RenderSession, RenderWorker, SessionConfig, SystemScheduler,
};
use futures::executor::LocalPool;
use futures::task::{LocalSpawnExt, SpawnError};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

const DEFAULT_SCENE: &str = r#"{ "width": 400, "height": 300 }"#;

#[derive(Parser, Debug)]
#[command(name = "fermion", version, about = "Render a scene progressively on an isolated execution unit")]
struct Cli {
    /// Scene JSON file. Renders a 400x300 gradient when omitted.
    scene: Option<PathBuf>,

    /// Number of work groups. Defaults to the hardware parallelism.
    #[arg(long)]
    concurrency: Option<u32>,

    /// Output PNG path.
    #[arg(long, default_value = DEFAULT_EXPORT_NAME)]
    out: PathBuf,

    /// Progress polling interval in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Session config JSON file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pause after each tile, in milliseconds.
    #[arg(long)]
    tile_delay_ms: Option<u64>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to read scene {path}: {source}")]
    Scene {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to spawn execution unit: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("failed to start bridge: {0}")]
    Executor(#[from] SpawnError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::detect(),
    };
    if let Some(interval_ms) = cli.interval_ms {
        config.update_interval_ms = interval_ms;
    }
    if cli.tile_delay_ms.is_some() {
        config.unit.tile_delay_ms = cli.tile_delay_ms;
    }

    let scene = match &cli.scene {
        Some(path) => std::fs::read_to_string(path).map_err(|source| CliError::Scene {
            path: path.clone(),
            source,
        })?,
        None => DEFAULT_SCENE.to_string(),
    };
    let concurrency = cli
        .concurrency
        .unwrap_or(config.hardware_parallelism.max(1) as u32);
    let threads = config.hardware_parallelism;

    let (_unit, endpoint) = ExecutionUnit::spawn(config.unit.render_settings())?;
    let (bridge, pump) = Bridge::new(endpoint);

    let mut pool = LocalPool::new();
    pool.spawner().spawn_local(pump)?;

    let session = RenderSession::new(
        RenderWorker::new(bridge),
        SystemScheduler::new(),
        config,
        LogSink,
    );

    pool.run_until(async {
        session.initialize(Some(threads)).await?;
        session.start(&scene, concurrency).await
    })?;

    session.export_png(&cli.out)?;
    Ok(())
}
