use std::error::Error;

use dotenv::dotenv;
use halbot::config::AppConfig;
use halbot::encoding::{InputPipeline, Registry, StatsTable};
use halbot::errors::PortError;
use halbot::inference::{InferenceWorker, NeutralPolicy};
use halbot::infra::{BridgeCommand, BridgeProcess, DefaultObserver, FrameLog, find_open_udp_ports};
use halbot::runner::EpisodeRunner;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("halbot=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn udp_port(config: &AppConfig) -> Result<u32, PortError> {
    if let Some(port) = config.udp_port {
        return Ok(port);
    }
    let port = find_open_udp_ports(1)?
        .into_iter()
        .next()
        .ok_or(PortError::NotEnoughPorts {
            requested: 1,
            available: 0,
        })?;
    info!("Using discovered udp port {}", port);
    Ok(port)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let registry = Registry::standard();
    let input_config = registry.input_config(&config.input_config)?.clone();
    let decoder = registry.decoder(&config.decoder)?;

    info!(
        "Playing {} as {} with {} / {}",
        config.character, config.ego, config.input_config, config.decoder
    );

    let bridge = BridgeProcess::new(BridgeCommand {
        program: config.bridge_program.clone(),
        args: config.bridge_args.clone(),
        udp_port: udp_port(&config)?,
        replay_dir: config.replay_dir.clone(),
    });
    let ego = bridge.controller(config.ego);
    let opponent = bridge.controller(config.ego.opponent());

    let pipeline = InputPipeline::new(input_config, StatsTable::melee_defaults());
    let mut decisions =
        InferenceWorker::new(config.ego, pipeline, decoder, NeutralPolicy, config.seq_len)
            .spawn(config.worker_join_timeout)?;

    let mut runner =
        EpisodeRunner::new(bridge, ego, opponent, config.runner_config(), DefaultObserver);
    if let Some(folder) = &config.debug_log_dir {
        match FrameLog::create(folder, config.ego) {
            Ok(frame_log) => {
                info!("Writing frame log to {}", frame_log.path().display());
                runner = runner.with_frame_log(frame_log);
            }
            Err(err) => warn!("Cannot create frame log in {}: {}", folder.display(), err),
        }
    }

    let outcome = runner.run(&mut decisions).await?;
    let summary = outcome.stats.summary(config.ego);
    info!(
        "Damage {:.1} inflicted / {:.1} received, stocks {} taken / {} lost over {} frames",
        summary.damage_inflicted,
        summary.damage_received,
        summary.stocks_taken,
        summary.stocks_lost,
        summary.frames
    );

    Ok(())
}
