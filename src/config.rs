use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::LoaderError;
use crate::filter::FilterSpec;
use crate::import::{LARGE_BATCH_SIZE, SMALL_BATCH_SIZE};
use crate::schema::SchemaMapping;

pub const DEFAULT_CONFIG_FILE: &str = "geonames-load.json";

/// On-disk configuration (`geonames-load.json`). Everything is optional;
/// CLI flags override whatever is set here.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub dialect: Option<String>,
    pub database: Option<String>,
    pub download_dir: Option<String>,
    pub sources: SourceUrls,
    pub filters: BTreeMap<String, Vec<String>>,
    pub schema: Option<SchemaMapping>,
    pub large_batch_size: Option<usize>,
    pub small_batch_size: Option<usize>,
}

/// Remote locations of the GeoNames dump files.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourceUrls {
    pub archive: String,
    pub timezones: String,
    pub admin1_codes: String,
    pub admin2_codes: String,
    pub hierarchy: String,
    pub country_info: String,
}

impl Default for SourceUrls {
    fn default() -> Self {
        const BASE: &str = "https://download.geonames.org/export/dump";
        Self {
            archive: format!("{BASE}/allCountries.zip"),
            timezones: format!("{BASE}/timeZones.txt"),
            admin1_codes: format!("{BASE}/admin1CodesASCII.txt"),
            admin2_codes: format!("{BASE}/admin2Codes.txt"),
            hierarchy: format!("{BASE}/hierarchy.zip"),
            country_info: format!("{BASE}/countryInfo.txt"),
        }
    }
}

#[derive(Debug)]
pub struct ResolvedConfig {
    pub dialect: Dialect,
    pub database: Utf8PathBuf,
    pub download_dir: Option<Utf8PathBuf>,
    pub sources: SourceUrls,
    pub filters: FilterSpec,
    pub schema: SchemaMapping,
    pub large_batch_size: usize,
    pub small_batch_size: usize,
}

impl Config {
    /// Reads the config file. An explicitly named file must exist; the
    /// default file is optional and its absence means defaults.
    pub fn load(path: Option<&str>) -> Result<Self, LoaderError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if !config_path.exists() {
            if path.is_some() {
                return Err(LoaderError::MissingConfig(config_path));
            }
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| LoaderError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| LoaderError::ConfigParse(err.to_string()))
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, LoaderError> {
        Self::resolve_config(Config::load(path)?)
    }

    /// Validation happens here, before any row is processed: an unsupported
    /// dialect string or an unknown filter key is fatal.
    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, LoaderError> {
        let dialect = match config.dialect {
            Some(value) => value.parse()?,
            None => Dialect::Sqlite,
        };
        let filters = FilterSpec::from_map(&config.filters)?;

        Ok(ResolvedConfig {
            dialect,
            database: Utf8PathBuf::from(config.database.unwrap_or_else(|| "geonames.db".to_string())),
            download_dir: config.download_dir.map(Utf8PathBuf::from),
            sources: config.sources,
            filters,
            schema: config.schema.unwrap_or_default(),
            large_batch_size: config.large_batch_size.unwrap_or(LARGE_BATCH_SIZE),
            small_batch_size: config.small_batch_size.unwrap_or(SMALL_BATCH_SIZE),
        })
    }
}
