use crate::dialect::Dialect;
use crate::domain::{
    AdminRecord, CountryRecord, GeoNameRecord, HierarchyRecord, TimezoneRecord,
};
use crate::error::LoaderError;
use crate::index::ReferenceIndex;
use crate::schema::SchemaMapping;

/// A rendered column value. Empty strings map to SQL `NULL`, never to the
/// empty string literal; references to other tables render as deferred
/// correlated subqueries.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Subquery(String),
}

impl SqlValue {
    pub fn text(value: &str) -> Self {
        if value.is_empty() {
            SqlValue::Null
        } else {
            SqlValue::Text(value.to_string())
        }
    }

    pub fn integer(value: Option<i64>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::Integer)
    }

    pub fn float(value: Option<f64>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::Float)
    }

    pub fn render(&self, dialect: Dialect) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Integer(value) => value.to_string(),
            SqlValue::Float(value) => value.to_string(),
            SqlValue::Text(value) => dialect.quote(value),
            SqlValue::Subquery(sql) => format!("({sql})"),
        }
    }
}

/// Ordered `(column, rendered value)` pairs; key columns come first so the
/// dialect adapter can derive the conflict target.
pub type MappedRow = Vec<(String, String)>;

fn push(
    row: &mut MappedRow,
    column: Result<&str, LoaderError>,
    value: SqlValue,
    dialect: Dialect,
) -> Result<(), LoaderError> {
    row.push((column?.to_string(), value.render(dialect)));
    Ok(())
}

/// Deferred lookup of an administrative division by hierarchical code. The
/// referenced row may be committed in the same transaction slightly out of
/// order relative to the referencing row, so resolution is left to the
/// store; a miss yields no row and the column stays NULL.
fn admin_lookup(
    code: Option<String>,
    mapping: &SchemaMapping,
    dialect: Dialect,
) -> Result<SqlValue, LoaderError> {
    let admin = &mapping.administrative;
    Ok(match code {
        Some(code) => SqlValue::Subquery(format!(
            "SELECT {id} FROM {table} WHERE {code_col} = {code} LIMIT 1",
            id = admin.column("id")?,
            table = admin.table,
            code_col = admin.column("code")?,
            code = dialect.quote(&code),
        )),
        None => SqlValue::Null,
    })
}

/// Deferred timezone reference. The timezone table is keyed by name, so the
/// subquery yields the name itself when the row exists and no row (NULL)
/// when it does not, same miss semantics as the admin lookups.
fn timezone_lookup(
    name: &str,
    mapping: &SchemaMapping,
    dialect: Dialect,
) -> Result<SqlValue, LoaderError> {
    if name.is_empty() {
        return Ok(SqlValue::Null);
    }
    let tz = &mapping.timezones;
    Ok(SqlValue::Subquery(format!(
        "SELECT {col} FROM {table} WHERE {col} = {name} LIMIT 1",
        col = tz.column("timezone")?,
        table = tz.table,
        name = dialect.quote(name),
    )))
}

/// Maps a geographic-name row to its column-value pairs. Rows that anchor an
/// administrative division additionally carry their own admin code so the
/// joined schema can reconstruct the association.
pub fn map_geoname(
    record: &GeoNameRecord,
    index: &ReferenceIndex,
    mapping: &SchemaMapping,
    dialect: Dialect,
) -> Result<MappedRow, LoaderError> {
    let g = &mapping.geonames;
    let mut row = MappedRow::new();
    push(&mut row, g.column("id"), SqlValue::Integer(record.id), dialect)?;
    push(&mut row, g.column("name"), SqlValue::text(&record.name), dialect)?;
    push(
        &mut row,
        g.column("asciiName"),
        SqlValue::text(&record.ascii_name),
        dialect,
    )?;
    push(&mut row, g.column("latitude"), SqlValue::float(record.latitude), dialect)?;
    push(
        &mut row,
        g.column("longitude"),
        SqlValue::float(record.longitude),
        dialect,
    )?;
    push(
        &mut row,
        g.column("featureClass"),
        SqlValue::text(&record.feature_class),
        dialect,
    )?;
    push(
        &mut row,
        g.column("featureCode"),
        SqlValue::text(&record.feature_code),
        dialect,
    )?;
    push(
        &mut row,
        g.column("countryCode"),
        SqlValue::text(&record.country_code),
        dialect,
    )?;
    push(&mut row, g.column("cc2"), SqlValue::text(&record.cc2), dialect)?;
    push(
        &mut row,
        g.column("population"),
        SqlValue::integer(record.population),
        dialect,
    )?;
    push(
        &mut row,
        g.column("elevation"),
        SqlValue::integer(record.elevation),
        dialect,
    )?;
    push(&mut row, g.column("dem"), SqlValue::integer(record.dem), dialect)?;
    push(
        &mut row,
        g.column("modificationDate"),
        SqlValue::text(&record.modification_date),
        dialect,
    )?;
    push(
        &mut row,
        g.column("timezone"),
        timezone_lookup(&record.timezone, mapping, dialect)?,
        dialect,
    )?;
    for (field, level) in [("admin1", 1), ("admin2", 2), ("admin3", 3), ("admin4", 4)] {
        push(
            &mut row,
            g.column(field),
            admin_lookup(record.admin_code(level), mapping, dialect)?,
            dialect,
        )?;
    }
    if let Some(code) = index.code_of(record.id) {
        push(&mut row, g.column("adminCode"), SqlValue::text(code), dialect)?;
    }
    Ok(row)
}

pub fn map_admin(
    record: &AdminRecord,
    mapping: &SchemaMapping,
    dialect: Dialect,
) -> Result<MappedRow, LoaderError> {
    let a = &mapping.administrative;
    let mut row = MappedRow::new();
    push(&mut row, a.column("id"), SqlValue::Integer(record.id), dialect)?;
    push(&mut row, a.column("code"), SqlValue::text(&record.code), dialect)?;
    push(&mut row, a.column("name"), SqlValue::text(&record.name), dialect)?;
    push(
        &mut row,
        a.column("asciiName"),
        SqlValue::text(&record.ascii_name),
        dialect,
    )?;
    Ok(row)
}

/// Admin rows are imported before the main dataset, so a placeholder
/// geographic-name row is written alongside each division to avoid orphaned
/// references; the full row replaces it in the GeoName stage.
pub fn map_admin_anchor(
    record: &AdminRecord,
    mapping: &SchemaMapping,
    dialect: Dialect,
) -> Result<MappedRow, LoaderError> {
    let g = &mapping.geonames;
    let mut row = MappedRow::new();
    push(&mut row, g.column("id"), SqlValue::Integer(record.id), dialect)?;
    push(&mut row, g.column("name"), SqlValue::text(&record.name), dialect)?;
    push(
        &mut row,
        g.column("asciiName"),
        SqlValue::text(&record.ascii_name),
        dialect,
    )?;
    push(&mut row, g.column("adminCode"), SqlValue::text(&record.code), dialect)?;
    Ok(row)
}

pub fn map_country(
    record: &CountryRecord,
    mapping: &SchemaMapping,
    dialect: Dialect,
) -> Result<MappedRow, LoaderError> {
    let c = &mapping.countries;
    let mut row = MappedRow::new();
    push(&mut row, c.column("iso"), SqlValue::text(&record.iso), dialect)?;
    push(&mut row, c.column("iso3"), SqlValue::text(&record.iso3), dialect)?;
    push(
        &mut row,
        c.column("isoNumeric"),
        SqlValue::text(&record.iso_numeric),
        dialect,
    )?;
    push(&mut row, c.column("fips"), SqlValue::text(&record.fips), dialect)?;
    push(&mut row, c.column("name"), SqlValue::text(&record.name), dialect)?;
    push(&mut row, c.column("capital"), SqlValue::text(&record.capital), dialect)?;
    push(&mut row, c.column("area"), SqlValue::float(record.area), dialect)?;
    push(
        &mut row,
        c.column("population"),
        SqlValue::integer(record.population),
        dialect,
    )?;
    push(
        &mut row,
        c.column("continent"),
        SqlValue::text(&record.continent),
        dialect,
    )?;
    push(&mut row, c.column("tld"), SqlValue::text(&record.tld), dialect)?;
    push(
        &mut row,
        c.column("currencyCode"),
        SqlValue::text(&record.currency_code),
        dialect,
    )?;
    push(
        &mut row,
        c.column("currencyName"),
        SqlValue::text(&record.currency_name),
        dialect,
    )?;
    push(&mut row, c.column("phone"), SqlValue::text(&record.phone), dialect)?;
    push(
        &mut row,
        c.column("postalCodeFormat"),
        SqlValue::text(&record.postal_code_format),
        dialect,
    )?;
    push(
        &mut row,
        c.column("postalCodeRegex"),
        SqlValue::text(&record.postal_code_regex),
        dialect,
    )?;
    push(
        &mut row,
        c.column("languages"),
        SqlValue::text(&record.languages),
        dialect,
    )?;
    push(
        &mut row,
        c.column("geonameId"),
        SqlValue::integer(record.geoname_id),
        dialect,
    )?;
    push(
        &mut row,
        c.column("neighbours"),
        SqlValue::text(&record.neighbours),
        dialect,
    )?;
    push(
        &mut row,
        c.column("equivalentFips"),
        SqlValue::text(&record.equivalent_fips),
        dialect,
    )?;
    Ok(row)
}

pub fn map_timezone(
    record: &TimezoneRecord,
    mapping: &SchemaMapping,
    dialect: Dialect,
) -> Result<MappedRow, LoaderError> {
    let t = &mapping.timezones;
    let mut row = MappedRow::new();
    push(&mut row, t.column("timezone"), SqlValue::text(&record.name), dialect)?;
    push(
        &mut row,
        t.column("countryCode"),
        SqlValue::text(&record.country_code),
        dialect,
    )?;
    push(
        &mut row,
        t.column("gmtOffset"),
        SqlValue::float(record.gmt_offset),
        dialect,
    )?;
    push(
        &mut row,
        t.column("dstOffset"),
        SqlValue::float(record.dst_offset),
        dialect,
    )?;
    push(
        &mut row,
        t.column("rawOffset"),
        SqlValue::float(record.raw_offset),
        dialect,
    )?;
    Ok(row)
}

pub fn map_hierarchy(
    record: &HierarchyRecord,
    mapping: &SchemaMapping,
    dialect: Dialect,
) -> Result<MappedRow, LoaderError> {
    let h = &mapping.hierarchy;
    let mut row = MappedRow::new();
    push(
        &mut row,
        h.column("parentId"),
        SqlValue::Integer(record.parent_id),
        dialect,
    )?;
    push(
        &mut row,
        h.column("childId"),
        SqlValue::Integer(record.child_id),
        dialect,
    )?;
    push(&mut row, h.column("type"), SqlValue::text(&record.kind), dialect)?;
    Ok(row)
}
