use anyhow::{Context, Result};
use clap::Parser;
use guardian_daemon::{
    collector::{LinuxSampleSource, Signal},
    config::Config,
    scheduler::{Cadence, GuardianEvent, Scheduler},
    Guardian,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "host-guardian", version, about = "Host health monitor and temp cleaner")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, env = "HOST_GUARDIAN_CONFIG")]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn load_config(path: Option<PathBuf>) -> Config {
    let config_path = path.unwrap_or_else(Config::config_path);
    if config_path.exists() {
        Config::load(&config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        info!("No config file at {:?}, using defaults", config_path);
        Config::default()
    }
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config);
    config
        .validate()
        .context("refusing to start with an invalid configuration")?;

    if args.print_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    info!("Host Guardian starting...");
    let source = Arc::new(LinuxSampleSource::new(config.general.disk_path.clone()));
    let guardian = Arc::new(Guardian::new(&config, source));
    if !guardian.executor().is_enabled() {
        info!("Automatic cleanup disabled; scans report candidates only");
    }
    let scheduler = Scheduler::new(Arc::clone(&guardian), Cadence::from_config(&config.general));
    let shutdown = scheduler.shutdown_token();

    let mut events = scheduler.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                GuardianEvent::Cycle(report) => debug!(
                    cycle = report.cycle,
                    "cpu {:.1}% | memory {:.1}% | disk {:.1}% | health {:.1}",
                    report.sample.cpu_percent,
                    report.sample.memory_percent,
                    report.sample.disk_percent,
                    report.health_score
                ),
                GuardianEvent::Cleanup { cycle, run } => info!(
                    cycle,
                    candidates = run.candidates,
                    removed = run.outcome.removed,
                    skipped = run.outcome.safety_skipped,
                    "Cleanup scan finished"
                ),
                GuardianEvent::Optimization { .. } => {}
            }
        }
    });

    let runner = tokio::spawn(scheduler.run());
    wait_for_shutdown().await;
    shutdown.cancel();
    runner.await.context("scheduler task panicked")?;

    for stats in guardian.baseline_stats() {
        info!(
            "{}: avg={:.1}%, std={:.1}%, cv={:.1}% ({:?})",
            stats.signal, stats.mean, stats.stdev, stats.cv, stats.stability
        );
    }
    info!(
        "Stopped. Optimization score {}%, {} baseline samples, {} cpu readings retained",
        guardian.optimization_score(),
        guardian.total_samples(),
        guardian.baseline(Signal::Cpu).len()
    );
    Ok(())
}
