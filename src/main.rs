//! Attendance report server and command-line tools.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use attendance_report as app;

use app::calendar::CalendarResolver;
use app::config::{AppConfig, ConfigLoadResult, LoggingConfig};
use app::db;
use app::export::XlsxRenderer;
use app::holiday::HolidayClient;
use app::report::ReportVariant;
use app::server::{self, AppState};
use app::service::ReportService;
use app::store::DbStore;

/// HR attendance backend: workday calendar and monthly Excel reports.
#[derive(Parser)]
#[command(name = "attendance-report", version)]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use config.toml from current directory (dev mode)
    #[arg(long, global = true)]
    dev: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a config file with default values
    InitConfig {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Start the HTTP server
    Serve,
    /// Fetch and store the workday calendar of a year
    InitCalendar {
        #[arg(long)]
        year: i32,
    },
    /// Write a monthly report file
    Report {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long, value_enum, default_value = "detail")]
        variant: VariantArg,
        /// Output file (defaults to the standard report file name)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum VariantArg {
    Detail,
    Record,
}

impl From<VariantArg> for ReportVariant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Detail => ReportVariant::Detail,
            VariantArg::Record => ReportVariant::Record,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match (&cli.config, cli.dev) {
        (Some(path), _) => path.clone(),
        (None, true) => PathBuf::from("config.toml"),
        (None, false) => AppConfig::default_path(),
    };

    if let Command::InitConfig { force } = cli.command {
        if config_path.exists() && !force {
            bail!("{} already exists, pass --force to replace it", config_path.display());
        }
        AppConfig::default()
            .save(&config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("Wrote default config to {}", config_path.display());
        return Ok(());
    }

    let (config, missing) = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => (config, false),
        ConfigLoadResult::Missing => (AppConfig::default(), true),
        ConfigLoadResult::Invalid(e) => bail!("Invalid config {}: {e}", config_path.display()),
    };

    let _guard = init_tracing(&config.logging)?;
    tracing::info!("Attendance report starting...");
    if missing {
        tracing::warn!("Config {:?} not found, using defaults", config_path);
    } else {
        tracing::info!("Config path: {:?}", config_path);
    }

    let conn = db::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    if let Ok(version) = db::server_version(&conn).await {
        tracing::info!("PostgreSQL: {}", version);
    }
    if let Ok(counts) = db::table_counts(&conn).await {
        tracing::info!(
            "Tables: {} calendar days, {} punch records",
            counts.calendar_days,
            counts.punch_records
        );
    }

    let rules = config.attendance.rules();
    let store = Arc::new(DbStore::new(conn, rules.offset));
    let holidays = Arc::new(HolidayClient::new(&config.holiday)?);
    let resolver = CalendarResolver::new(store.clone(), holidays, config.holiday.max_days);
    let service = ReportService::new(store, resolver, Arc::new(XlsxRenderer), rules);

    match cli.command {
        Command::InitConfig { .. } => {}
        Command::Serve => {
            let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
                .await
                .with_context(|| format!("Failed to bind {}", config.server.listen_addr))?;
            tracing::info!("Listening on {}", config.server.listen_addr);

            let app = server::router(AppState {
                service: Arc::new(service),
            });
            axum::serve(listener, app).await?;
        }
        Command::InitCalendar { year } => {
            let days = service.init_calendar(year).await?;
            tracing::info!("Calendar for {year} ready: {days} days");
        }
        Command::Report {
            year,
            month,
            variant,
            output,
        } => {
            let report = service.generate(year, month, variant.into()).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(&report.file_name));
            report
                .write_to(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!("Wrote {} ({} users) to {}", report.file_name, report.users, path.display());
        }
    }

    Ok(())
}

/// Console logging plus an optional daily rolling file.
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid log level")?;

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}
