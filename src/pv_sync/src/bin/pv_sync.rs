use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use energy_ingestor::providers::{
    eon::Eon, goteborg_energi::GoteborgEnergi, tibber::TibberProvider,
};
use pv_sync::{
    config::{Config, load_config_path},
    gaps::find_missing_days,
    ledger::{DailyLedgerRecord, pvoutput::PvOutput},
    logging,
    reconcile::{ReconcileReport, hourly::HourlyEngine, monthly::MonthlyEngine, reconcile},
    tz::today_in,
};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(version, about = "Backfill grid import/export into PVOutput")]
struct Cli {
    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Don't send any data to PVOutput
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Configuration file to use
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    #[command(subcommand)]
    source: Source,
}

#[derive(Subcommand)]
enum Source {
    /// Hourly import and daily export from Tibber
    Tibber,
    /// Month-by-day tables from the Göteborg Energi portal
    GoteborgEnergi,
    /// Month-by-day tables from the E.ON portal
    Eon,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.debug);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config_path(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    let pv = config.pvoutput()?;
    let ledger = PvOutput::new(&pv.api_key, &pv.system_id, pv.requests_per_hour, cli.dry_run)?;

    let today = today_in(config.timezone);
    let missing = match find_missing_days(&ledger, config.lookback_days, today) {
        Ok(missing) => missing,
        Err(e) => {
            warn!(error = %e, "could not read ledger, skipping this run");
            return Ok(());
        }
    };
    if missing.is_empty() {
        info!("ledger is complete");
        return Ok(());
    }

    let report = match cli.source {
        Source::Tibber => run_tibber(&config, &ledger, &missing)?,
        Source::GoteborgEnergi => run_goteborg_energi(&config, &ledger, &missing)?,
        Source::Eon => run_eon(&config, &ledger, &missing)?,
    };

    if !report.is_clean() {
        warn!(failed = ?report.failed, "some days could not be written");
    }
    Ok(())
}

fn run_tibber(
    config: &Config,
    ledger: &PvOutput,
    missing: &[DailyLedgerRecord],
) -> Result<ReconcileReport> {
    let cfg = config.tibber()?;
    let tibber = TibberProvider::connect(&cfg.token, cfg.home_id.as_deref())
        .context("connecting to tibber")?;
    info!(home_id = tibber.home_id(), "connected to tibber");

    let engine = HourlyEngine::new(&tibber, &tibber);
    Ok(reconcile(&engine, ledger, missing)?)
}

fn run_goteborg_energi(
    config: &Config,
    ledger: &PvOutput,
    missing: &[DailyLedgerRecord],
) -> Result<ReconcileReport> {
    let cfg = config.goteborg_energi()?;
    let session = GoteborgEnergi::new(cfg.username, cfg.password, cfg.import_pod, cfg.export_pod)
        .log_in()
        .context("logging in to goteborg energi")?;

    let result = reconcile(&MonthlyEngine::new(&session), ledger, missing);
    if let Err(e) = session.log_out() {
        warn!(error = %e, "failed to log out of goteborg energi");
    }
    Ok(result?)
}

fn run_eon(
    config: &Config,
    ledger: &PvOutput,
    missing: &[DailyLedgerRecord],
) -> Result<ReconcileReport> {
    let cfg = config.eon()?;
    let session = Eon::new(cfg.user_id, cfg.password, cfg.installation)
        .log_in()
        .context("logging in to eon")?;

    let result = reconcile(&MonthlyEngine::new(&session), ledger, missing);
    if let Err(e) = session.log_out() {
        warn!(error = %e, "failed to log out of eon");
    }
    Ok(result?)
}
