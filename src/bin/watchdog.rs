use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ping_watchdog::{
    IcmpProber, Monitor, MonitorConfig, ScriptRemediator, config::get_default_script_path,
};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(about = "Ping a host and run a script when it stops answering")]
struct Args {
    /// Script to run once the failure threshold is reached
    #[arg(long, default_value_os_t = get_default_script_path())]
    script: PathBuf,

    /// Log every probe in detail
    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    dotenv::dotenv().ok();

    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new().with_target("ping_watchdog", level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    let config = MonitorConfig::load(&args.script).with_context(|| {
        format!(
            "refusing to start (remediation script: {})",
            args.script.display()
        )
    })?;

    let remediator = ScriptRemediator::new(config.script_path.clone());
    let monitor = Monitor::new(config, IcmpProber::new(), remediator);

    tokio::select! {
        _ = monitor.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt, shutting down");
        }
    }

    Ok(())
}
