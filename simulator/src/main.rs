use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use climate_node_common::{NodeConfig, NodeParts, Scheduler, TelemetryNode};
use log::info;

mod hardware;
mod http;

use hardware::{ConsoleLed, HostNetwork, ProcessClock, SimulatedDht, SystemClock, ThreadDelay};
use http::UreqTransport;

/// Runs the climate node pipeline on a desktop against a real collector.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON configuration file; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Collector URL, e.g. http://127.0.0.1:5000/data
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long)]
    device_id: Option<String>,

    /// Seconds between two readings.
    #[arg(long)]
    interval_secs: Option<u32>,

    /// Stop after this many cycles instead of running forever.
    #[arg(long)]
    cycles: Option<u64>,

    /// Make every n-th sensor read fail.
    #[arg(long, default_value_t = 0)]
    fault_every: u32,

    /// Add the computed severity to every reading.
    #[arg(long)]
    include_severity: bool,
}

type SimNode =
    TelemetryNode<HostNetwork, SimulatedDht, SystemClock, UreqTransport, ConsoleLed, ThreadDelay>;

/// The node and the loop driving it.
struct App {
    node: SimNode,
    scheduler: Scheduler<ProcessClock, ThreadDelay>,
}

impl App {
    fn new(config: &NodeConfig, fault_every: u32) -> Self {
        let node = TelemetryNode::new(
            config,
            NodeParts {
                radio: HostNetwork,
                sensor: SimulatedDht::new(fault_every),
                clock: SystemClock,
                transport: UreqTransport::new(config.http_timeout()),
                led: ConsoleLed,
                delay: ThreadDelay,
            },
        );
        let scheduler = Scheduler::new(
            ProcessClock::new(),
            ThreadDelay,
            config.interval_ms,
            config.poll_interval_ms,
        );

        Self { node, scheduler }
    }

    fn run(mut self, cycles: Option<u64>) {
        let Some(cycles) = cycles else {
            self.scheduler.run(&mut self.node)
        };

        if cycles == 0 {
            return;
        }
        let last = self
            .scheduler
            .run_until(&mut self.node, |report| report.sequence >= cycles);
        info!(
            "{} stopped after cycle {}: {}",
            self.node.device_id(),
            last.sequence,
            self.node.stats()
        );
    }
}

fn load_config(args: &Args) -> anyhow::Result<NodeConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            NodeConfig::from_json(&json).with_context(|| format!("parsing {}", path.display()))?
        }
        None => NodeConfig::default(),
    };

    config.apply_overrides(|key| std::env::var(key).ok())?;

    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(device_id) = &args.device_id {
        config.device_id = device_id.clone();
    }
    if let Some(secs) = args.interval_secs {
        config.interval_ms = secs
            .checked_mul(1_000)
            .context("--interval-secs is too large")?;
    }
    if args.include_severity {
        config.include_severity = true;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;

    info!("=== Climate node simulator ===");
    info!("Device: {}", config.device_id);
    info!("Collector: {}", config.endpoint);
    info!(
        "Interval: {:?}, HTTP timeout: {:?}",
        config.interval(),
        config.http_timeout()
    );

    App::new(&config, args.fault_every).run(args.cycles);
    Ok(())
}
