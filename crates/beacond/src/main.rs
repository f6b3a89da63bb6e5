// # beacond - Reporter Daemon
//
// The reporter daemon is a thin integration layer: it reads configuration
// from environment variables, initializes the runtime, and wires the
// system resolver and HTTP transport into the reporting engine. All cycle,
// change-detection, and retry logic lives in beacon-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// - `BEACON_COLLECTOR_HOST`: Collector hostname or address (required)
// - `BEACON_COLLECTOR_PORT`: Collector TCP port (default 5000)
// - `BEACON_REPORT_INTERVAL_SECS`: Steady-state delay between reports
//   (default 1800)
// - `BEACON_RETRY_INTERVAL_SECS`: Delay between failed attempts
//   (default 300)
// - `BEACON_MAX_RETRY_DURATION_SECS`: Failure window before a data point
//   is abandoned (default 86400)
// - `BEACON_PROBE_ADDR`: External address for the outbound-IP route probe
//   (default 8.8.8.8:53)
// - `BEACON_LOG_LEVEL`: Log level (trace, debug, info, warn, error)
//
// Invalid interval values fall back to the defaults with a warning; the
// daemon keeps running.
//
// ## Example
//
// ```bash
// export BEACON_COLLECTOR_HOST=collector.internal
// export BEACON_COLLECTOR_PORT=5000
//
// beacond
// ```

use anyhow::Result;
use beacon_core::config::{IntervalConfig, ReporterConfig};
use beacon_core::{ReportingEngine, SystemClock};
use beacon_resolver_system::SystemIdentityResolver;
use beacon_transport_http::HttpReportTransport;
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ReporterExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ReporterExitCode> for ExitCode {
    fn from(code: ReporterExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    collector_host: String,
    collector_port: u16,
    /// Raw interval values; parsed after logging is up so fallback
    /// warnings are visible
    report_interval_raw: Option<String>,
    retry_interval_raw: Option<String>,
    max_retry_duration_raw: Option<String>,
    probe_addr: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let collector_port = match env::var("BEACON_COLLECTOR_PORT") {
            Ok(raw) => raw.parse().map_err(|_| {
                anyhow::anyhow!(
                    "BEACON_COLLECTOR_PORT '{}' is not a valid port number",
                    raw
                )
            })?,
            Err(_) => 5000,
        };

        Ok(Self {
            collector_host: env::var("BEACON_COLLECTOR_HOST").map_err(|_| {
                anyhow::anyhow!(
                    "BEACON_COLLECTOR_HOST is required. \
                    Set it via: export BEACON_COLLECTOR_HOST=collector.internal"
                )
            })?,
            collector_port,
            report_interval_raw: env::var("BEACON_REPORT_INTERVAL_SECS").ok(),
            retry_interval_raw: env::var("BEACON_RETRY_INTERVAL_SECS").ok(),
            max_retry_duration_raw: env::var("BEACON_MAX_RETRY_DURATION_SECS").ok(),
            probe_addr: env::var("BEACON_PROBE_ADDR").ok(),
            log_level: env::var("BEACON_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.collector_host.is_empty() {
            anyhow::bail!("BEACON_COLLECTOR_HOST cannot be empty");
        }

        if self.collector_port == 0 {
            anyhow::bail!("BEACON_COLLECTOR_PORT cannot be 0");
        }

        if let Some(probe) = &self.probe_addr
            && probe.parse::<std::net::SocketAddr>().is_err()
        {
            anyhow::bail!(
                "BEACON_PROBE_ADDR '{}' is not a valid socket address. \
                Example: export BEACON_PROBE_ADDR=8.8.8.8:53",
                probe
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "BEACON_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                other
            ),
        }

        Ok(())
    }

    /// Interval configuration, warning and defaulting on unparseable values
    fn intervals(&self) -> IntervalConfig {
        let defaults = IntervalConfig::default();
        IntervalConfig {
            report_interval_secs: parse_interval(
                "BEACON_REPORT_INTERVAL_SECS",
                self.report_interval_raw.as_deref(),
                defaults.report_interval_secs,
            ),
            retry_interval_secs: parse_interval(
                "BEACON_RETRY_INTERVAL_SECS",
                self.retry_interval_raw.as_deref(),
                defaults.retry_interval_secs,
            ),
            max_retry_duration_secs: parse_interval(
                "BEACON_MAX_RETRY_DURATION_SECS",
                self.max_retry_duration_raw.as_deref(),
                defaults.max_retry_duration_secs,
            ),
        }
    }
}

/// Parse one interval value; unparseable input falls back with a warning
fn parse_interval(name: &str, raw: Option<&str>, default: u64) -> u64 {
    match raw {
        None => default,
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "{} '{}' is not a valid number of seconds, falling back to {}s",
                    name, raw, default
                );
                default
            }
        },
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ReporterExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ReporterExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ReporterExitCode::ConfigError.into();
    }

    info!("Starting beacond");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ReporterExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {}", e);
            ReporterExitCode::RuntimeError
        } else {
            ReporterExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let resolver = match &config.probe_addr {
        Some(probe) => SystemIdentityResolver::with_probe_addr(
            probe.parse().expect("validated: probe address parses"),
        ),
        None => SystemIdentityResolver::new(),
    };

    let transport = HttpReportTransport::new(&config.collector_host, config.collector_port);
    info!("Reporting to {}", transport.endpoint());

    let mut reporter_config = ReporterConfig::new(&config.collector_host, config.collector_port);
    reporter_config.intervals = config.intervals();
    info!(
        "Intervals: report={}s retry={}s max_retry_duration={}s",
        reporter_config.intervals.report_interval_secs,
        reporter_config.intervals.retry_interval_secs,
        reporter_config.intervals.max_retry_duration_secs
    );

    let (engine, mut event_rx) = ReportingEngine::new(
        Box::new(resolver),
        Box::new(transport),
        Box::new(SystemClock),
        reporter_config,
    )?;

    // Engine cycles already log at info/warn; the event stream is traced
    // for anything watching at debug level
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            tracing::debug!(?event, "engine event");
        }
    });

    engine.run().await?;

    Ok(())
}
