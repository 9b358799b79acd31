//! cwagent - publishes host memory, swap and disk metrics.
//!
//! Runs a collection cycle immediately and then every `--interval` minutes,
//! sending data points to `--endpoint` (or stdout when none is given).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use cwagent::agent::{Agent, AgentError};
use cwagent::collector::HostStats;
use cwagent::config::{
    AgentConfig, DEFAULT_DISK_PATHS, DEFAULT_DISK_UNIT, DEFAULT_INTERVAL_MINUTES,
    DEFAULT_MEMORY_UNIT, DEFAULT_NAMESPACE, DEFAULT_PROC_PATH,
};
use cwagent::identity::{
    DEFAULT_METADATA_URL, IdentityError, ImdsClient, REGION_ENV, resolve_base_dimensions,
    resolve_region,
};
use cwagent::metrics::{MetricToggles, MetricsPublisher};
use cwagent::publisher::{HttpPublisher, StdoutPublisher};

/// Host memory, swap and disk metrics agent.
#[derive(Parser, Debug)]
#[command(name = "cwagent", about = "Host memory, swap and disk metrics agent", version)]
struct Args {
    /// Region the metrics are published to. Falls back to AWS_REGION, then
    /// to the instance metadata service.
    #[arg(long)]
    region: Option<String>,

    /// Report under a Hostname dimension instead of the instance id.
    #[arg(long)]
    hostname: Option<String>,

    /// Namespace of the published metrics.
    #[arg(long, default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Interval between cycles, in minutes.
    #[arg(long, default_value_t = DEFAULT_INTERVAL_MINUTES)]
    interval: u64,

    /// Run a single cycle and exit.
    #[arg(long)]
    once: bool,

    /// Enable every metric.
    #[arg(long)]
    all_metrics: bool,

    /// Unit for memory and swap values (B, KB, MB, GB, TB).
    #[arg(long, default_value = DEFAULT_MEMORY_UNIT)]
    mem_unit: String,

    /// Count buffers and page cache as used memory.
    #[arg(long)]
    mem_shared_buffers_as_used: bool,

    /// Report available memory.
    #[arg(long)]
    mem_avail: bool,

    /// Report used memory.
    #[arg(long)]
    mem_used: bool,

    /// Report memory utilization.
    #[arg(long)]
    mem_util: bool,

    /// Report available swap.
    #[arg(long)]
    swap_avail: bool,

    /// Report used swap.
    #[arg(long)]
    swap_used: bool,

    /// Report swap utilization.
    #[arg(long)]
    swap_util: bool,

    /// Unit for disk values (B, KB, MB, GB, TB).
    #[arg(long, default_value = DEFAULT_DISK_UNIT)]
    disk_unit: String,

    /// Report available disk space.
    #[arg(long)]
    disk_avail: bool,

    /// Report used disk space.
    #[arg(long)]
    disk_used: bool,

    /// Report disk space utilization.
    #[arg(long)]
    disk_util: bool,

    /// Comma-separated list of paths whose filesystems are reported.
    #[arg(long, default_value = DEFAULT_DISK_PATHS)]
    disk_paths: String,

    /// Add the instance's autoscaling group as a dimension.
    #[arg(long)]
    autoscaling_group: bool,

    /// HTTP endpoint receiving JSON batches. Prints to stdout when unset.
    #[arg(long)]
    endpoint: Option<String>,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = DEFAULT_PROC_PATH)]
    proc_path: String,

    /// Base URL of the instance metadata service.
    #[arg(long, default_value = DEFAULT_METADATA_URL)]
    metadata_url: String,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            namespace: self.namespace.clone(),
            interval_minutes: self.interval,
            run_once: self.once,
            toggles: MetricToggles {
                all: self.all_metrics,
                mem_available: self.mem_avail,
                mem_used: self.mem_used,
                mem_utilization: self.mem_util,
                swap_available: self.swap_avail,
                swap_used: self.swap_used,
                swap_utilization: self.swap_util,
                disk_available: self.disk_avail,
                disk_used: self.disk_used,
                disk_utilization: self.disk_util,
            },
            memory_unit: self.mem_unit.clone(),
            disk_unit: self.disk_unit.clone(),
            disk_paths: self.disk_paths.clone(),
            shared_buffers_as_used: self.mem_shared_buffers_as_used,
        }
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
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
    if let Ok(directive) = format!("cwagent={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), AgentError> {
    let config = args.agent_config().validate()?;
    info!(
        "Config: namespace={}, interval={}m, disk_paths={:?}, once={}",
        config.namespace, args.interval, config.disk_paths, config.run_once
    );

    let metadata = ImdsClient::new(&args.metadata_url).map_err(IdentityError::from)?;
    let env_region = std::env::var(REGION_ENV).ok();
    let region = resolve_region(args.region.as_deref(), env_region.as_deref(), &metadata)?;
    let base_dimensions =
        resolve_base_dimensions(args.hostname.as_deref(), args.autoscaling_group, &metadata)?;
    info!("Region {}, dimensions {:?}", region, base_dimensions);

    let publisher: Box<dyn MetricsPublisher> = match &args.endpoint {
        Some(endpoint) => {
            info!("Publishing to {}", endpoint);
            Box::new(HttpPublisher::new(endpoint.as_str(), region))
        }
        None => {
            info!("No endpoint configured, printing to stdout");
            Box::new(StdoutPublisher::new())
        }
    };

    let agent = Agent::new(
        config,
        base_dimensions,
        HostStats::platform(&args.proc_path),
        publisher,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let r = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    agent.run(shutdown)?;
    info!("Shutdown complete");
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    info!("cwagent {} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        error!("{}", e);
        eprintln!("cwagent: {e}");
        std::process::exit(1);
    }
}
