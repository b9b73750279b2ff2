//! statstreamd - streaming metrics sampler daemon.
//!
//! Samples /proc at a fixed interval and writes one JSON document per cycle
//! to stdout or a file.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::Parser;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use statstream::collector::{Collector, CycleContext, RealCommands, RealFs, SystemCollector};
use statstream::config::SamplerConfig;
use statstream::output::{DEFAULT_CAPACITY, JsonWriter, OutputSink};
use statstream::sampler::{CpuFilter, DEFAULT_MAX_CPUS};

const CPUSET_FILE: &str = "cpuset.cpus.effective";

/// Streaming metrics sampler.
#[derive(Parser)]
#[command(name = "statstreamd", about = "Streaming metrics sampler", version)]
struct Args {
    /// Sampling interval in seconds.
    #[arg(short = 's', long, default_value = "60")]
    interval: u64,

    /// Number of documents to write (0 runs until interrupted).
    #[arg(short, long, default_value = "0")]
    count: u64,

    /// Output file; documents are appended. Defaults to stdout.
    #[arg(short, long, value_name = "FILE")]
    output: Option<String>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Output buffer size in bytes.
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    buffer_size: usize,

    /// Only report these CPUs (e.g. "0-3,8").
    #[arg(long, value_name = "LIST", value_parser = parse_cpu_filter, conflicts_with = "cgroup_cpus")]
    allowed_cpus: Option<CpuFilter>,

    /// Read the allowed CPU list from `<PATH>/cpuset.cpus.effective`
    /// (e.g. /sys/fs/cgroup).
    #[arg(long, value_name = "PATH")]
    cgroup_cpus: Option<String>,

    /// Capacity of the per-CPU table; higher CPU numbers are ignored.
    #[arg(long, default_value_t = DEFAULT_MAX_CPUS)]
    max_cpus: usize,

    /// Disk name prefix to skip (repeatable).
    #[arg(long, value_name = "PREFIX", default_values_t = ["loop".to_string()])]
    disk_exclude: Vec<String>,

    /// Interface name prefix to skip (repeatable).
    #[arg(long, value_name = "PREFIX", default_values_t = ["veth".to_string()])]
    net_exclude: Vec<String>,

    /// Include `lshw -json` output in every document.
    #[arg(long)]
    lshw: bool,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

fn parse_cpu_filter(s: &str) -> Result<CpuFilter, String> {
    CpuFilter::from_list(s).map_err(|e| e.message)
}

/// Initializes the tracing subscriber on stderr; stdout carries documents.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["statstreamd", "statstream"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn build_config(args: &Args) -> SamplerConfig {
    let mut config = SamplerConfig {
        interval_secs: args.interval,
        count: args.count,
        proc_path: args.proc_path.clone(),
        max_cpus: args.max_cpus,
        disk_exclude: args.disk_exclude.clone(),
        net_exclude: args.net_exclude.clone(),
        collect_lshw: args.lshw,
        buffer_size: args.buffer_size,
        command_line: std::env::args().collect::<Vec<_>>().join(" "),
        ..Default::default()
    };

    if let Some(filter) = &args.allowed_cpus {
        config.cpu_filter = filter.clone();
    } else if let Some(cgroup) = &args.cgroup_cpus {
        let path = format!("{}/{}", cgroup.trim_end_matches('/'), CPUSET_FILE);
        let system = SystemCollector::new(RealFs::new(), args.proc_path.clone());
        match system.collect_cpuset(&path) {
            Ok(filter) => config.cpu_filter = filter,
            Err(e) => warn!("Ignoring cgroup cpuset, reporting all CPUs: {}", e),
        }
    }

    config
}

fn open_output(path: Option<&str>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let config = build_config(&args);
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    if args.print_config {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize configuration: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    info!("statstreamd {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: interval={}s, count={}, output={}, proc={}",
        config.interval_secs,
        config.count,
        args.output.as_deref().unwrap_or("stdout"),
        config.proc_path
    );
    if let CpuFilter::Only(cpus) = &config.cpu_filter {
        info!("CPU filter: {} allowed CPU(s)", cpus.len());
    }

    let out = match open_output(args.output.as_deref()) {
        Ok(out) => out,
        Err(e) => {
            error!("Failed to open output: {}", e);
            std::process::exit(1);
        }
    };
    let mut writer = JsonWriter::new(OutputSink::with_capacity(out, config.buffer_size));

    let interval = Duration::from_secs(config.interval_secs);
    let count = config.count;
    let mut collector = Collector::new(RealFs::new(), RealCommands::new(), config);

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    if let Err(e) = collector.prime() {
        warn!("Failed to prime baselines: {}", e);
    }
    info!(
        "Tracking {} disk(s), {} interface(s)",
        collector.disks().len(),
        collector.interfaces().len()
    );

    let mut last = Instant::now();
    let mut loop_index: u64 = 0;

    while running.load(Ordering::SeqCst) {
        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        let mut remaining = interval;
        while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
            let sleep_time = remaining.min(sleep_interval);
            std::thread::sleep(sleep_time);
            remaining = remaining.saturating_sub(sleep_time);
        }
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let now = Instant::now();
        let ctx = CycleContext {
            elapsed: now.duration_since(last).as_secs_f64(),
            loop_index,
            now: Utc::now(),
        };
        last = now;

        match collector.collect_cycle(&mut writer, &ctx) {
            Ok(()) => debug!("Document #{} written", loop_index),
            Err(e) if e.is_broken_pipe() => {
                error!("Output closed, stopping: {}", e);
                std::process::exit(1);
            }
            Err(e) => error!("Failed to collect cycle {}: {}", loop_index, e),
        }

        // Failed cycles count too, so a limited run always ends.
        loop_index += 1;
        if count > 0 && loop_index >= count {
            info!("Finished {} cycle(s)", loop_index);
            break;
        }
    }

    info!("Shutting down...");
    if let Err(e) = writer.flush() {
        error!("Failed to flush output: {}", e);
    }
}
