use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use configs::ProbeConfig;
use harness::{observability, suites, RunReport, Runner};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Exit code for configuration, connectivity and other setup failures.
const EXIT_SETUP: u8 = 2;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Compact,
    Json,
}

/// Black-box conformance probe for the finance backend.
#[derive(Debug, Parser)]
#[command(name = "finance-probe", version)]
struct Cli {
    /// Config file (defaults to $PROBE_CONFIG, then probe.toml)
    #[arg(long)]
    config: Option<String>,
    /// Backend base URL, overrides config and environment
    #[arg(long)]
    base_url: Option<String>,
    /// Run only these suites (repeatable)
    #[arg(long = "suite")]
    suites: Vec<String>,
    /// Run only these checks, as `check` or `suite::check` (repeatable)
    #[arg(long = "check")]
    checks: Vec<String>,
    /// Write the JSON run report here
    #[arg(long)]
    report_json: Option<PathBuf>,
    /// Write Prometheus text metrics here after the run
    #[arg(long)]
    metrics: Option<PathBuf>,
    #[arg(long, value_enum, default_value = "compact")]
    log_format: LogFormat,
    /// Print suites and their checks, then exit
    #[arg(long)]
    list: bool,
}

fn init_logging(format: LogFormat) {
    // .env first so RUST_LOG from it takes effect
    common::env::load_dotenv();
    match format {
        LogFormat::Compact => common::utils::logging::init_logging_default(),
        LogFormat::Json => common::utils::logging::init_logging_json(),
    }
    info!(service = "probe", event = "logger_init", "tracing subscriber initialized");
}

fn print_catalog() {
    for suite in suites::all() {
        println!("{}", suite.name());
        for check in suite.checks() {
            println!("  {check}");
        }
    }
}

fn write_outputs(cli: &Cli, report: &RunReport) -> Result<()> {
    if let Some(path) = &cli.report_json {
        let json = report.to_json().context("serializing run report")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        info!(event = "report_written", path = %path.display());
    }
    if let Some(path) = &cli.metrics {
        let text = observability::encode_metrics().context("encoding metrics")?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        info!(event = "metrics_written", path = %path.display());
    }
    Ok(())
}

async fn probe(cli: &Cli, cfg: ProbeConfig) -> Result<RunReport> {
    let runner = Runner::new(cfg)?
        .select_suites(&cli.suites)?
        .with_checks(cli.checks.clone())?;
    info!(event = "suites_selected", suites = ?runner.suite_names());
    runner.run().await
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.list {
        print_catalog();
        return ExitCode::SUCCESS;
    }
    init_logging(cli.log_format);

    let run_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(
            service = "probe",
            event = "panic",
            %run_id,
            pid,
            message = %info,
            "unhandled panic occurred"
        );
    }));

    let cfg = match ProbeConfig::load_and_validate(cli.config.as_deref(), cli.base_url.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(
                service = "probe",
                event = "config_invalid",
                error = %format!("{e:#}"),
                "cannot start probe"
            );
            return ExitCode::from(EXIT_SETUP);
        }
    };

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = cfg.run.worker_threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(
                service = "probe",
                event = "runtime_build_failed",
                error = %e,
                "failed to build tokio runtime"
            );
            return ExitCode::from(EXIT_SETUP);
        }
    };

    info!(
        service = "probe",
        event = "start",
        %run_id,
        pid,
        version,
        base_url = %cfg.backend.base_url,
        "finance probe starting"
    );

    rt.block_on(async {
        tokio::select! {
            res = probe(&cli, cfg) => match res {
                Ok(report) => {
                    print!("{}", report.summary());
                    if let Err(e) = write_outputs(&cli, &report) {
                        let error = format!("{e:#}");
                        error!(service = "probe", event = "output_failed", %error);
                        ExitCode::from(EXIT_SETUP)
                    } else if report.is_success() {
                        info!(
                            service = "probe",
                            event = "stop",
                            %run_id,
                            "all checks passed or skipped"
                        );
                        ExitCode::SUCCESS
                    } else {
                        warn!(
                            service = "probe",
                            event = "stop",
                            %run_id,
                            failed = report.totals.failed,
                            "checks failed"
                        );
                        ExitCode::FAILURE
                    }
                }
                Err(e) => {
                    error!(
                        service = "probe",
                        event = "run_failed",
                        error = %format!("{e:#}"),
                        "run could not complete"
                    );
                    ExitCode::from(EXIT_SETUP)
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!(
                    service = "probe",
                    event = "shutdown_signal",
                    %run_id,
                    pid,
                    "received Ctrl+C, aborting run"
                );
                ExitCode::FAILURE
            }
        }
    })
}
