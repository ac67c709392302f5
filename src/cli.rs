//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the `procwatch` binary
//! using the `clap` crate. These arguments are parsed at startup and then
//! merged, with the highest precedence, over the configuration from the
//! `procwatch.toml` file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::net::IpAddr;
use std::path::PathBuf;

/// Periodically samples thread and heap statistics of this process and
/// optionally serves profiling routes over HTTP.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Milliseconds between samples.
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Port for the introspection server (0 disables it).
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Interface the introspection server binds to.
    #[arg(long, value_name = "IP")]
    pub bind: Option<IpAddr>,

    /// Categories to sample, e.g. "threads,memory", "all" or "none".
    #[arg(short, long, value_name = "LIST")]
    pub select: Option<String>,

    /// Log lifecycle messages of the monitor.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print snapshots as JSON lines.
    #[arg(long)]
    pub json: bool,

    /// Print a single snapshot and exit.
    #[arg(long)]
    pub once: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut monitor = Dict::new();

        if let Some(interval_ms) = self.interval_ms {
            monitor.insert("interval_ms".into(), Value::from(interval_ms));
        }

        if let Some(port) = self.port {
            monitor.insert("port".into(), Value::from(port));
        }

        if let Some(bind) = self.bind {
            monitor.insert("bind_address".into(), Value::from(bind.to_string()));
        }

        if let Some(select) = &self.select {
            monitor.insert("selector".into(), Value::from(select.clone()));
        }

        // A bare flag can only turn verbosity on; absence leaves the file value.
        if self.verbose {
            monitor.insert("verbose".into(), Value::from(true));
        }

        let mut dict = Dict::new();
        if !monitor.is_empty() {
            dict.insert("monitor".into(), Value::Dict(Tag::Default, monitor));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
