//! procwatch - watch this process's threads and heap
//!
//! Runs a scheduler against its own process and prints every snapshot, either
//! as text blocks or as JSON lines, until interrupted.

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use procwatch::{cli::Cli, config::Config, CountingAllocator, Scheduler, Snapshot};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator;

fn print_snapshot(snapshot: &Snapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{}", line),
            Err(e) => error!("Failed to serialize snapshot: {}", e),
        }
    } else {
        println!("[{}]\n{}\n", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"), snapshot);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let scheduler_config = config.monitor.to_scheduler_config()?;

    info!("procwatch starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Selector: {}", scheduler_config.selector().to_selector_string());
    info!("Interval: {:?}", scheduler_config.interval());
    match scheduler_config.http_addr() {
        Some(addr) => info!("Introspection Server: {}", addr),
        None => info!("Introspection Server: Disabled"),
    }
    info!("Verbose: {}", scheduler_config.verbose);
    info!("-------------------------------------------------------");

    let json = cli.json;
    let scheduler = Scheduler::new(scheduler_config, move |snapshot| print_snapshot(&snapshot, json));

    if cli.once {
        print_snapshot(&scheduler.current_snapshot(), json);
        return Ok(());
    }

    scheduler.start();
    if let Some(addr) = scheduler.http_addr() {
        info!("Profiling routes at http://{}/debug/pprof/", addr);
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");
    scheduler.stop().await;
    info!("procwatch stopped.");
    Ok(())
}
