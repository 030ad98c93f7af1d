use std::cell::RefCell;
use std::process::ExitCode;

use camino::Utf8Path;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use geonames_loader::app::{App, ImportOptions, ImportSink, NopSink, Stage};
use geonames_loader::config::{Config, ConfigLoader};
use geonames_loader::db::SqliteStore;
use geonames_loader::dialect::Dialect;
use geonames_loader::download::HttpDownloadClient;
use geonames_loader::error::LoaderError;

#[derive(Parser)]
#[command(name = "geonames-load")]
#[command(about = "Import GeoNames dump files into a local database")]
#[command(version, author)]
struct Cli {
    /// Configuration file (defaults to geonames-load.json if present)
    #[arg(long)]
    config: Option<String>,

    /// Path of the SQLite database file
    #[arg(long)]
    database: Option<String>,

    /// Directory for cached downloads
    #[arg(long)]
    download_dir: Option<String>,

    /// Target SQL dialect
    #[arg(long, value_enum)]
    dialect: Option<Dialect>,

    /// Override the geographic names archive URL
    #[arg(long)]
    archive: Option<String>,

    /// Override the timezones file URL
    #[arg(long)]
    timezones: Option<String>,

    /// Override the first-level administrative codes URL
    #[arg(long)]
    admin1_codes: Option<String>,

    /// Override the second-level administrative codes URL
    #[arg(long)]
    admin2_codes: Option<String>,

    /// Override the hierarchy archive URL
    #[arg(long)]
    hierarchy: Option<String>,

    /// Override the country info file URL
    #[arg(long)]
    country_info: Option<String>,

    /// Also import country records
    #[arg(long)]
    countries: bool,

    #[arg(long)]
    skip_timezones: bool,

    #[arg(long)]
    skip_admin1: bool,

    #[arg(long)]
    skip_admin2: bool,

    #[arg(long)]
    skip_geoname: bool,

    #[arg(long)]
    skip_hierarchy: bool,

    /// Keep only geographic names with one of these feature classes
    #[arg(long, value_delimiter = ',')]
    feature_class: Vec<String>,

    /// Keep only geographic names with one of these feature codes
    #[arg(long, value_delimiter = ',')]
    feature_code: Vec<String>,

    /// Suppress progress bars
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(loader) = report.downcast_ref::<LoaderError>() {
            return ExitCode::from(map_exit_code(loader));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &LoaderError) -> u8 {
    match error {
        LoaderError::MissingConfig(_)
        | LoaderError::ConfigRead(_)
        | LoaderError::ConfigParse(_)
        | LoaderError::UnsupportedDialect(_)
        | LoaderError::InvalidFilterKey(_) => 2,
        LoaderError::DownloadHttp(_) | LoaderError::DownloadStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref()).into_diagnostic()?;
    apply_overrides(&mut config, &cli);
    let resolved = ConfigLoader::resolve_config(config).into_diagnostic()?;

    if resolved.dialect != Dialect::Sqlite {
        return Err(miette::Report::msg(format!(
            "this binary executes against SQLite only; dialect `{}` is available through the library API",
            resolved.dialect
        )));
    }

    let store = SqliteStore::open(&resolved.database).into_diagnostic()?;
    store.init_schema(&resolved.schema).into_diagnostic()?;

    let downloader = HttpDownloadClient::new().into_diagnostic()?;
    let app = App::new(&store, downloader, &resolved).into_diagnostic()?;

    let options = ImportOptions {
        countries: cli.countries,
        skip_timezones: cli.skip_timezones,
        skip_admin1: cli.skip_admin1,
        skip_admin2: cli.skip_admin2,
        skip_geoname: cli.skip_geoname,
        skip_hierarchy: cli.skip_hierarchy,
    };

    let report = if cli.quiet {
        app.run(&options, &NopSink).into_diagnostic()?
    } else {
        app.run(&options, &BarSink::new()).into_diagnostic()?
    };

    let elapsed = report.finished_at - report.started_at;
    for stage in &report.stages {
        if stage.skipped {
            println!("  - {} (skipped)", stage.stage.label());
        } else {
            println!("  + {}", stage.stage.label());
        }
    }
    println!(
        "done in {}.{:03}s -> {}",
        elapsed.num_seconds(),
        elapsed.num_milliseconds().rem_euclid(1000),
        resolved.database
    );

    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(database) = &cli.database {
        config.database = Some(database.clone());
    }
    if let Some(dir) = &cli.download_dir {
        config.download_dir = Some(dir.clone());
    }
    if let Some(dialect) = cli.dialect {
        config.dialect = Some(dialect.to_string());
    }
    if let Some(url) = &cli.archive {
        config.sources.archive = url.clone();
    }
    if let Some(url) = &cli.timezones {
        config.sources.timezones = url.clone();
    }
    if let Some(url) = &cli.admin1_codes {
        config.sources.admin1_codes = url.clone();
    }
    if let Some(url) = &cli.admin2_codes {
        config.sources.admin2_codes = url.clone();
    }
    if let Some(url) = &cli.hierarchy {
        config.sources.hierarchy = url.clone();
    }
    if let Some(url) = &cli.country_info {
        config.sources.country_info = url.clone();
    }
    if !cli.feature_class.is_empty() {
        config
            .filters
            .entry("featureClass".to_string())
            .or_default()
            .extend(cli.feature_class.iter().cloned());
    }
    if !cli.feature_code.is_empty() {
        config
            .filters
            .entry("featureCode".to_string())
            .or_default()
            .extend(cli.feature_code.iter().cloned());
    }
}

/// Renders one progress bar at a time: a byte bar per download, a row bar
/// per import stage. Totals are fractional, so bars run on a fixed scale.
struct BarSink {
    current: RefCell<Option<ProgressBar>>,
}

const BAR_SCALE: u64 = 1000;

impl BarSink {
    fn new() -> Self {
        Self {
            current: RefCell::new(None),
        }
    }

    fn start(&self, message: String) {
        self.finish();
        let style = ProgressStyle::with_template("{msg:24} [{bar:40}] {percent:>3}% {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = ProgressBar::new(BAR_SCALE).with_style(style).with_message(message);
        *self.current.borrow_mut() = Some(bar);
    }

    fn set(&self, fraction: f64) {
        if let Some(bar) = self.current.borrow().as_ref() {
            bar.set_position((fraction.clamp(0.0, 1.0) * BAR_SCALE as f64) as u64);
        }
    }

    fn finish(&self) {
        if let Some(bar) = self.current.borrow_mut().take() {
            bar.finish();
        }
    }
}

impl ImportSink for BarSink {
    fn download_started(&self, url: &str) {
        let name = url.rsplit('/').next().unwrap_or(url);
        self.start(format!("fetch {name}"));
    }

    fn download_progress(&self, _url: &str, fraction: f64) {
        self.set(fraction);
    }

    fn cache_hit(&self, path: &Utf8Path) {
        println!("  = cached {path}");
    }

    fn stage_started(&self, stage: Stage) {
        self.start(stage.label().to_string());
    }

    fn stage_progress(&self, _stage: Stage, fraction: f64) {
        self.set(fraction);
    }

    fn stage_finished(&self, _stage: Stage, _ok: bool) {
        self.finish();
    }
}
