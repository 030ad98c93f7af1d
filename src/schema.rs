use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::LoaderError;

/// Physical name of one table plus its logical-field to column-name mapping.
///
/// The import engine only ever *reads* this mapping; it is supplied by the
/// schema collaborator (defaults below, overridable through the config file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMapping {
    pub table: String,
    pub columns: BTreeMap<String, String>,
}

impl TableMapping {
    fn new(table: &str, columns: &[(&str, &str)]) -> Self {
        Self {
            table: table.to_string(),
            columns: columns
                .iter()
                .map(|(field, column)| (field.to_string(), column.to_string()))
                .collect(),
        }
    }

    /// Column name for a logical field; a missing entry is a configuration
    /// error, raised before any row is processed.
    pub fn column(&self, field: &str) -> Result<&str, LoaderError> {
        self.columns
            .get(field)
            .map(String::as_str)
            .ok_or_else(|| LoaderError::UnmappedField {
                table: self.table.clone(),
                field: field.to_string(),
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaMapping {
    pub geonames: TableMapping,
    pub administrative: TableMapping,
    pub timezones: TableMapping,
    pub countries: TableMapping,
    pub hierarchy: TableMapping,
}

impl Default for SchemaMapping {
    fn default() -> Self {
        Self {
            geonames: TableMapping::new(
                "geonames",
                &[
                    ("id", "id"),
                    ("name", "name"),
                    ("asciiName", "ascii_name"),
                    ("latitude", "latitude"),
                    ("longitude", "longitude"),
                    ("featureClass", "feature_class"),
                    ("featureCode", "feature_code"),
                    ("countryCode", "country_code"),
                    ("cc2", "cc2"),
                    ("admin1", "admin1_id"),
                    ("admin2", "admin2_id"),
                    ("admin3", "admin3_id"),
                    ("admin4", "admin4_id"),
                    ("population", "population"),
                    ("elevation", "elevation"),
                    ("dem", "dem"),
                    ("timezone", "timezone"),
                    ("adminCode", "admin_code"),
                    ("modificationDate", "modification_date"),
                ],
            ),
            administrative: TableMapping::new(
                "administrative",
                &[
                    ("id", "id"),
                    ("code", "code"),
                    ("name", "name"),
                    ("asciiName", "ascii_name"),
                ],
            ),
            timezones: TableMapping::new(
                "timezones",
                &[
                    ("timezone", "timezone"),
                    ("countryCode", "country_code"),
                    ("gmtOffset", "gmt_offset"),
                    ("dstOffset", "dst_offset"),
                    ("rawOffset", "raw_offset"),
                ],
            ),
            countries: TableMapping::new(
                "countries",
                &[
                    ("iso", "iso"),
                    ("iso3", "iso3"),
                    ("isoNumeric", "iso_numeric"),
                    ("fips", "fips"),
                    ("name", "name"),
                    ("capital", "capital"),
                    ("area", "area"),
                    ("population", "population"),
                    ("continent", "continent"),
                    ("tld", "tld"),
                    ("currencyCode", "currency_code"),
                    ("currencyName", "currency_name"),
                    ("phone", "phone"),
                    ("postalCodeFormat", "postal_code_format"),
                    ("postalCodeRegex", "postal_code_regex"),
                    ("languages", "languages"),
                    ("geonameId", "geoname_id"),
                    ("neighbours", "neighbours"),
                    ("equivalentFips", "equivalent_fips"),
                ],
            ),
            hierarchy: TableMapping::new(
                "hierarchy",
                &[
                    ("parentId", "parent_id"),
                    ("childId", "child_id"),
                    ("type", "type"),
                ],
            ),
        }
    }
}

impl SchemaMapping {
    /// `CREATE TABLE IF NOT EXISTS` statements for the SQLite backend,
    /// honoring any column-name overrides.
    pub fn create_statements(&self) -> Result<Vec<String>, LoaderError> {
        let g = &self.geonames;
        let a = &self.administrative;
        let t = &self.timezones;
        let c = &self.countries;
        let h = &self.hierarchy;

        Ok(vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 {} INTEGER PRIMARY KEY, {} TEXT, {} TEXT, {} REAL, {} REAL, \
                 {} TEXT, {} TEXT, {} TEXT, {} TEXT, \
                 {} INTEGER, {} INTEGER, {} INTEGER, {} INTEGER, \
                 {} INTEGER, {} INTEGER, {} INTEGER, {} TEXT, {} TEXT, {} TEXT)",
                g.table,
                g.column("id")?,
                g.column("name")?,
                g.column("asciiName")?,
                g.column("latitude")?,
                g.column("longitude")?,
                g.column("featureClass")?,
                g.column("featureCode")?,
                g.column("countryCode")?,
                g.column("cc2")?,
                g.column("admin1")?,
                g.column("admin2")?,
                g.column("admin3")?,
                g.column("admin4")?,
                g.column("population")?,
                g.column("elevation")?,
                g.column("dem")?,
                g.column("timezone")?,
                g.column("adminCode")?,
                g.column("modificationDate")?,
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 {} INTEGER PRIMARY KEY, {} TEXT UNIQUE, {} TEXT, {} TEXT)",
                a.table,
                a.column("id")?,
                a.column("code")?,
                a.column("name")?,
                a.column("asciiName")?,
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 {} TEXT PRIMARY KEY, {} TEXT, {} REAL, {} REAL, {} REAL)",
                t.table,
                t.column("timezone")?,
                t.column("countryCode")?,
                t.column("gmtOffset")?,
                t.column("dstOffset")?,
                t.column("rawOffset")?,
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 {} TEXT PRIMARY KEY, {} TEXT, {} TEXT, {} TEXT, {} TEXT, {} TEXT, \
                 {} REAL, {} INTEGER, {} TEXT, {} TEXT, {} TEXT, {} TEXT, {} TEXT, \
                 {} TEXT, {} TEXT, {} TEXT, {} INTEGER, {} TEXT, {} TEXT)",
                c.table,
                c.column("iso")?,
                c.column("iso3")?,
                c.column("isoNumeric")?,
                c.column("fips")?,
                c.column("name")?,
                c.column("capital")?,
                c.column("area")?,
                c.column("population")?,
                c.column("continent")?,
                c.column("tld")?,
                c.column("currencyCode")?,
                c.column("currencyName")?,
                c.column("phone")?,
                c.column("postalCodeFormat")?,
                c.column("postalCodeRegex")?,
                c.column("languages")?,
                c.column("geonameId")?,
                c.column("neighbours")?,
                c.column("equivalentFips")?,
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {} (\
                 {} INTEGER, {} INTEGER, {} TEXT, PRIMARY KEY ({}, {}))",
                h.table,
                h.column("parentId")?,
                h.column("childId")?,
                h.column("type")?,
                h.column("parentId")?,
                h.column("childId")?,
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn default_mapping_resolves_fields() {
        let mapping = SchemaMapping::default();
        assert_eq!(mapping.geonames.column("asciiName").unwrap(), "ascii_name");
        assert_eq!(mapping.administrative.column("code").unwrap(), "code");
    }

    #[test]
    fn unknown_field_is_config_error() {
        let mapping = SchemaMapping::default();
        let err = mapping.geonames.column("nope").unwrap_err();
        assert_matches!(err, LoaderError::UnmappedField { .. });
    }

    #[test]
    fn create_statements_cover_all_tables() {
        let statements = SchemaMapping::default().create_statements().unwrap();
        assert_eq!(statements.len(), 5);
        assert!(statements[0].contains("geonames"));
        assert!(statements[4].contains("PRIMARY KEY (parent_id, child_id)"));
    }
}
