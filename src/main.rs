use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use iot_probe_rs::http::{HttpProber, Scheme, SchemeOrder};
use iot_probe_rs::probe::ProbeSpec;
use iot_probe_rs::scanner::{self, ScanConfig};
use iot_probe_rs::{ports, targets};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// iot-probe-rs — check TCP reachability, send one HTTP(S) request per target
/// and report which responses match a signature.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "iot-probe-rs",
    version,
    about = "Concurrent TCP + HTTP(S) signature probe for bulk IoT device discovery.",
    long_about = None
)]
struct Cli {
    /// Number of concurrent workers.
    #[arg(short = 't', long = "threads", default_value_t = 1000)]
    threads: usize,

    /// Target list: one `host,port` or bare `host` per line.
    #[arg(short = 'l', long = "list")]
    list: PathBuf,

    /// JSON probe descriptor (path, method, headers, search, data).
    #[arg(short = 'r', long = "request")]
    request: PathBuf,

    /// Print every result, not only detections (`-v=false` or `-v false` for detections only).
    #[arg(
        short = 'v',
        long,
        default_value_t = true,
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    verbose: bool,

    /// Try both http:// and https:// against each target.
    #[arg(short = 'a', long = "auto-scheme", default_value_t = false)]
    auto_scheme: bool,

    /// Ports for bare-host lines, nmap style (e.g. 22 or 80,443 or 1000-2000).
    #[arg(short = 'p', long, default_value = "")]
    ports: String,

    /// With --auto-scheme, try https before http.
    #[arg(long = "https-first", default_value_t = false)]
    https_first: bool,

    /// Scheme used without --auto-scheme when a host has no scheme prefix.
    #[arg(long, value_enum, default_value_t = SchemeArg::Http)]
    scheme: SchemeArg,

    /// Skip the TCP liveness check and send the HTTP request directly.
    #[arg(long = "no-liveness", default_value_t = false)]
    no_liveness: bool,

    /// TCP liveness connect timeout in milliseconds.
    #[arg(long = "connect-timeout-ms", default_value_t = 1000)]
    connect_timeout_ms: u64,

    /// Whole HTTP request timeout in milliseconds.
    #[arg(long = "timeout-ms", default_value_t = 5000)]
    timeout_ms: u64,

    /// Task queue capacity.
    #[arg(long = "queue-size", default_value_t = 100)]
    queue_size: usize,

    /// Reject malformed port specifications instead of reading them as 0.
    #[arg(long = "strict-ports", default_value_t = false)]
    strict_ports: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SchemeArg {
    Http,
    Https,
}

impl From<SchemeArg> for Scheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Http => Scheme::Http,
            SchemeArg::Https => Scheme::Https,
        }
    }
}

impl Cli {
    fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            workers: self.threads,
            verbose: self.verbose,
            auto_scheme: self.auto_scheme,
            scheme_order: if self.https_first {
                SchemeOrder::HttpsFirst
            } else {
                SchemeOrder::HttpFirst
            },
            default_scheme: self.scheme.into(),
            check_liveness: !self.no_liveness,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            queue_capacity: self.queue_size,
            ..ScanConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    info!(
        threads = cli.threads,
        list = %cli.list.display(),
        request = %cli.request.display(),
        verbose = cli.verbose,
        auto_scheme = cli.auto_scheme,
        ports = %cli.ports,
        "configuration"
    );

    let spec = ProbeSpec::load(&cli.request)?;
    spec.validate()
        .with_context(|| format!("invalid probe descriptor: {}", cli.request.display()))?;

    if cli.strict_ports {
        ports::validate_port_spec(&cli.ports).context("invalid --ports")?;
    }
    let port_set = ports::expand_ports(&cli.ports);
    info!(count = port_set.len(), "ports expanded");

    let list = targets::open_list(&cli.list).await?;
    let prober = HttpProber::new(Arc::new(spec), Duration::from_millis(cli.timeout_ms))?;

    let summary = scanner::scan_list(
        list,
        &port_set,
        cli.scan_config(),
        Arc::new(prober),
        io::stdout(),
    )
    .await?;

    info!(
        lines = summary.lines,
        skipped_lines = summary.skipped_lines,
        tasks = summary.tasks,
        detections = summary.detections,
        "done"
    );
    Ok(())
}
