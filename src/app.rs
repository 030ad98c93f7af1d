use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use directories::BaseDirs;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::db::SqlStore;
use crate::download::DownloadClient;
use crate::error::LoaderError;
use crate::import::{
    AdministrativeImporter, CountryImporter, GeoNameImporter, HierarchyImporter, Importer,
    TimezoneImporter,
};

/// One ordered phase of the import run. `GeoName` resolves administrative
/// references against whatever `Admin1`/`Admin2` left in the store; running
/// it earlier is legal and simply leaves those references null until a
/// rerun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Timezones,
    CountryInfo,
    Admin1,
    Admin2,
    GeoName,
    Hierarchy,
}

impl Stage {
    pub const ORDER: [Stage; 6] = [
        Stage::Timezones,
        Stage::CountryInfo,
        Stage::Admin1,
        Stage::Admin2,
        Stage::GeoName,
        Stage::Hierarchy,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Timezones => "timezones",
            Stage::CountryInfo => "countries",
            Stage::Admin1 => "administrative 1",
            Stage::Admin2 => "administrative 2",
            Stage::GeoName => "geographic names",
            Stage::Hierarchy => "hierarchy",
        }
    }
}

/// Which stages to run. Country import is opt-in; the rest are opt-out.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub countries: bool,
    pub skip_timezones: bool,
    pub skip_admin1: bool,
    pub skip_admin2: bool,
    pub skip_geoname: bool,
    pub skip_hierarchy: bool,
}

impl ImportOptions {
    fn skips(&self, stage: Stage) -> bool {
        match stage {
            Stage::Timezones => self.skip_timezones,
            Stage::CountryInfo => !self.countries,
            Stage::Admin1 => self.skip_admin1,
            Stage::Admin2 => self.skip_admin2,
            Stage::GeoName => self.skip_geoname,
            Stage::Hierarchy => self.skip_hierarchy,
        }
    }
}

/// Receives run events: download progress, cache hits, per-stage fractional
/// progress. All methods default to no-ops.
pub trait ImportSink {
    fn download_started(&self, _url: &str) {}
    fn download_progress(&self, _url: &str, _fraction: f64) {}
    fn cache_hit(&self, _path: &Utf8Path) {}
    fn stage_started(&self, _stage: Stage) {}
    fn stage_progress(&self, _stage: Stage, _fraction: f64) {}
    fn stage_finished(&self, _stage: Stage, _ok: bool) {}
}

pub struct NopSink;

impl ImportSink for NopSink {}

#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub skipped: bool,
    pub ok: bool,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub stages: Vec<StageReport>,
}

/// Import orchestrator: ensures each stage's source file is cached locally,
/// then runs the per-entity importers in their fixed order against one
/// explicitly passed storage handle.
pub struct App<'a, D: DownloadClient> {
    store: &'a dyn SqlStore,
    downloader: D,
    config: &'a ResolvedConfig,
    download_dir: Utf8PathBuf,
}

impl<'a, D: DownloadClient> App<'a, D> {
    pub fn new(
        store: &'a dyn SqlStore,
        downloader: D,
        config: &'a ResolvedConfig,
    ) -> Result<Self, LoaderError> {
        let download_dir = match &config.download_dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir()?,
        };
        Ok(Self {
            store,
            downloader,
            config,
            download_dir,
        })
    }

    pub fn download_dir(&self) -> &Utf8Path {
        &self.download_dir
    }

    pub fn run(
        &self,
        options: &ImportOptions,
        sink: &dyn ImportSink,
    ) -> Result<RunReport, LoaderError> {
        let started_at = Utc::now();
        let mut stages = Vec::new();

        for stage in Stage::ORDER {
            if options.skips(stage) {
                info!(stage = stage.label(), "stage skipped");
                stages.push(StageReport {
                    stage,
                    skipped: true,
                    ok: true,
                });
                continue;
            }

            let local = self.ensure_cached(self.source_url(stage), sink)?;
            sink.stage_started(stage);
            let progress = |fraction: f64| sink.stage_progress(stage, fraction);
            let ok = self.importer_for(stage).import(&local, &progress)?;
            sink.stage_finished(stage, ok);
            stages.push(StageReport {
                stage,
                skipped: false,
                ok,
            });
        }

        Ok(RunReport {
            started_at,
            finished_at: Utc::now(),
            stages,
        })
    }

    fn source_url(&self, stage: Stage) -> &str {
        let sources = &self.config.sources;
        match stage {
            Stage::Timezones => &sources.timezones,
            Stage::CountryInfo => &sources.country_info,
            Stage::Admin1 => &sources.admin1_codes,
            Stage::Admin2 => &sources.admin2_codes,
            Stage::GeoName => &sources.archive,
            Stage::Hierarchy => &sources.hierarchy,
        }
    }

    fn importer_for(&self, stage: Stage) -> Box<dyn Importer + '_> {
        let schema = &self.config.schema;
        match stage {
            Stage::Timezones => Box::new(TimezoneImporter::new(self.store, schema)),
            Stage::CountryInfo => Box::new(CountryImporter::new(self.store, schema)),
            Stage::Admin1 | Stage::Admin2 => Box::new(
                AdministrativeImporter::new(self.store, schema)
                    .with_batch_size(self.config.small_batch_size),
            ),
            Stage::GeoName => Box::new(
                GeoNameImporter::new(self.store, schema, self.config.filters.clone())
                    .with_batch_size(self.config.large_batch_size),
            ),
            Stage::Hierarchy => Box::new(HierarchyImporter::new(self.store, schema)),
        }
    }

    /// Returns the local path for a source URL, downloading it first unless
    /// it is already in the cache.
    fn ensure_cached(
        &self,
        url: &str,
        sink: &dyn ImportSink,
    ) -> Result<Utf8PathBuf, LoaderError> {
        let name = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| LoaderError::SourceNotFound(url.to_string()))?;
        let local = self.download_dir.join(name);

        if local.exists() {
            sink.cache_hit(&local);
            return Ok(local);
        }

        fs::create_dir_all(self.download_dir.as_std_path())
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        sink.download_started(url);
        let progress = |fraction: f64| sink.download_progress(url, fraction);
        self.downloader.download(url, &local, &progress)?;
        Ok(local)
    }
}

fn default_cache_dir() -> Result<Utf8PathBuf, LoaderError> {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("geonames-loader")).ok()
        })
        .ok_or_else(|| LoaderError::Filesystem("unable to resolve cache directory".to_string()))
}
