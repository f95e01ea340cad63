mod board;
mod config;
mod runner;

use anyhow::Result;
use board::{board_init, LogIndicator};
use config::AppConfig;
use edgeboard_core::{MockChannel, SerialChannel, SerialPortChannel, Uart};
use edgeboard_impulse::ReplayClassifier;
use runner::{run_inference, Console, Exit, LoopSettings};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

/// `edgeboard-app [--config <path> | <path>] [--list-ports]`
struct Args {
    config: Option<PathBuf>,
    list_ports: bool,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut parsed = Args {
        config: None,
        list_ports: false,
    };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" if i + 1 < args.len() => {
                parsed.config = Some(PathBuf::from(&args[i + 1]));
                i += 1;
            }
            "--list-ports" => parsed.list_ports = true,
            other if !other.starts_with('-') && parsed.config.is_none() => {
                parsed.config = Some(PathBuf::from(other));
            }
            other => log::warn!("ignoring argument {other}"),
        }
        i += 1;
    }
    parsed
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();
    if args.list_ports {
        for p in SerialPortChannel::list_ports() {
            println!("{p}");
        }
        return ExitCode::SUCCESS;
    }

    match run(args) {
        Ok(exit) => {
            log::info!("inference loop ended: {:?}", exit);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<Exit> {
    let cfg = AppConfig::load(args.config.as_deref())?;
    if cfg.is_offline() {
        log::info!("no serial port configured, console output goes to stdout only");
        start(MockChannel::discarding(), &cfg)
    } else {
        start(SerialPortChannel::new(), &cfg)
    }
}

fn start<C: SerialChannel>(channel: C, cfg: &AppConfig) -> Result<Exit> {
    let mut uart = Uart::new(channel, cfg.uart());
    let mut indicator = LogIndicator::default();
    board_init(&mut uart, cfg.use_max_baud, &mut indicator);

    let mut classifier = ReplayClassifier::new(cfg.model.clone(), cfg.replay.clone())?;
    let settings = LoopSettings {
        interval: cfg.interval(),
        max_iterations: cfg.max_iterations,
    };

    let exit = {
        let mut console = Console::new(&mut uart, cfg.mirror_stdout);
        run_inference(&mut console, &mut classifier, &cfg.features, &settings)
    };
    uart.deinitialize();
    exit
}
