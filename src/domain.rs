use regex::Regex;

/// One decoded row of the main geographic-names file
/// (19 tab-separated fields, see the GeoNames dump documentation).
#[derive(Debug, Clone, PartialEq)]
pub struct GeoNameRecord {
    pub id: i64,
    pub name: String,
    pub ascii_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub feature_class: String,
    pub feature_code: String,
    pub country_code: String,
    pub cc2: String,
    pub admin1_code: String,
    pub admin2_code: String,
    pub admin3_code: String,
    pub admin4_code: String,
    pub population: Option<i64>,
    pub elevation: Option<i64>,
    pub dem: Option<i64>,
    pub timezone: String,
    pub modification_date: String,
}

impl GeoNameRecord {
    /// Decodes a row, returning `None` for structurally invalid rows: short
    /// rows, a non-numeric identifier, or a modification date that does not
    /// match the strict `YYYY-MM-DD` pattern (truncated/corrupted rows in this
    /// feed reliably fail that check).
    pub fn parse(fields: &[String], date_pattern: &Regex) -> Option<Self> {
        if fields.len() < 19 {
            return None;
        }
        let id = fields[0].parse::<i64>().ok()?;
        let modification_date = fields[18].clone();
        if !date_pattern.is_match(&modification_date) {
            return None;
        }

        Some(Self {
            id,
            name: fields[1].clone(),
            ascii_name: fields[2].clone(),
            latitude: fields[4].parse().ok(),
            longitude: fields[5].parse().ok(),
            feature_class: fields[6].clone(),
            feature_code: fields[7].clone(),
            country_code: fields[8].clone(),
            cc2: fields[9].clone(),
            admin1_code: fields[10].clone(),
            admin2_code: fields[11].clone(),
            admin3_code: fields[12].clone(),
            admin4_code: fields[13].clone(),
            population: fields[14].parse().ok(),
            elevation: fields[15].parse().ok(),
            dem: fields[16].parse().ok(),
            timezone: fields[17].clone(),
            modification_date,
        })
    }

    /// Hierarchical code for administrative level 1..=4, built from the full
    /// chain (`CC.A1`, `CC.A1.A2`, ...). Returns `None` when any link of the
    /// chain up to the requested level is empty.
    pub fn admin_code(&self, level: u8) -> Option<String> {
        debug_assert!((1..=4).contains(&level));
        let parts = [
            self.country_code.as_str(),
            self.admin1_code.as_str(),
            self.admin2_code.as_str(),
            self.admin3_code.as_str(),
            self.admin4_code.as_str(),
        ];
        let take = level as usize + 1;
        if parts[..take].iter().any(|part| part.is_empty()) {
            return None;
        }
        Some(parts[..take].join("."))
    }

    /// The strict modification-date gate used by `parse`.
    pub fn date_pattern() -> Regex {
        Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static pattern")
    }
}

/// One decoded row of an administrative-codes file
/// (`admin1CodesASCII.txt` / `admin2Codes.txt`, 4 tab-separated fields).
#[derive(Debug, Clone, PartialEq)]
pub struct AdminRecord {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub ascii_name: String,
}

impl AdminRecord {
    pub fn parse(fields: &[String]) -> Option<Self> {
        if fields.len() < 4 {
            return None;
        }
        let id = fields[3].parse::<i64>().ok()?;
        let ascii_name = fields[2].clone();
        // The display name is occasionally blank; fall back to the ASCII name.
        let name = if fields[1].is_empty() {
            ascii_name.clone()
        } else {
            fields[1].clone()
        };
        Some(Self {
            id,
            code: fields[0].clone(),
            name,
            ascii_name,
        })
    }
}

/// One decoded row of `countryInfo.txt` (19 tab-separated fields; comment
/// lines start with `#` and are dropped by the record source).
#[derive(Debug, Clone, PartialEq)]
pub struct CountryRecord {
    pub iso: String,
    pub iso3: String,
    pub iso_numeric: String,
    pub fips: String,
    pub name: String,
    pub capital: String,
    pub area: Option<f64>,
    pub population: Option<i64>,
    pub continent: String,
    pub tld: String,
    pub currency_code: String,
    pub currency_name: String,
    pub phone: String,
    pub postal_code_format: String,
    pub postal_code_regex: String,
    pub languages: String,
    pub geoname_id: Option<i64>,
    pub neighbours: String,
    pub equivalent_fips: String,
}

impl CountryRecord {
    pub fn parse(fields: &[String]) -> Option<Self> {
        // Trailing empty columns are routinely dropped by the feed; anything
        // with the ISO block intact is usable.
        let get = |idx: usize| fields.get(idx).cloned().unwrap_or_default();
        let iso = get(0);
        if iso.len() != 2 || !iso.chars().all(|ch| ch.is_ascii_uppercase()) {
            return None;
        }
        Some(Self {
            iso,
            iso3: get(1),
            iso_numeric: get(2),
            fips: get(3),
            name: get(4),
            capital: get(5),
            area: get(6).parse().ok(),
            population: get(7).parse().ok(),
            continent: get(8),
            tld: get(9),
            currency_code: get(10),
            currency_name: get(11),
            phone: get(12),
            postal_code_format: get(13),
            postal_code_regex: get(14),
            languages: get(15),
            geoname_id: get(16).parse().ok(),
            neighbours: get(17),
            equivalent_fips: get(18),
        })
    }
}

/// One decoded row of `timeZones.txt` (header line, then 5 fields).
#[derive(Debug, Clone, PartialEq)]
pub struct TimezoneRecord {
    pub country_code: String,
    pub name: String,
    pub gmt_offset: Option<f64>,
    pub dst_offset: Option<f64>,
    pub raw_offset: Option<f64>,
}

impl TimezoneRecord {
    pub fn parse(fields: &[String]) -> Option<Self> {
        if fields.len() < 2 || fields[1].is_empty() {
            return None;
        }
        let get = |idx: usize| fields.get(idx).and_then(|v| v.parse().ok());
        Some(Self {
            country_code: fields[0].clone(),
            name: fields[1].clone(),
            gmt_offset: get(2),
            dst_offset: get(3),
            raw_offset: get(4),
        })
    }
}

/// One decoded row of `hierarchy.txt` (parent id, child id, optional type).
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyRecord {
    pub parent_id: i64,
    pub child_id: i64,
    pub kind: String,
}

impl HierarchyRecord {
    pub fn parse(fields: &[String]) -> Option<Self> {
        if fields.len() < 2 {
            return None;
        }
        Some(Self {
            parent_id: fields[0].parse().ok()?,
            child_id: fields[1].parse().ok()?,
            kind: fields.get(2).cloned().unwrap_or_default(),
        })
    }
}
