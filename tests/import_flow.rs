use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use geonames_loader::db::SqliteStore;
use geonames_loader::filter::FilterSpec;
use geonames_loader::import::{
    AdministrativeImporter, CountryImporter, GeoNameImporter, HierarchyImporter, Importer,
    NopProgress, TimezoneImporter,
};
use geonames_loader::schema::SchemaMapping;

const CALIFORNIA_ID: i64 = 5332921;
const LOS_ANGELES_ID: i64 = 5368361;

fn store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store.init_schema(&SchemaMapping::default()).unwrap();
    store
}

fn write_fixture(dir: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn admin1_fixture(dir: &Utf8Path) -> Utf8PathBuf {
    write_fixture(
        dir,
        "admin1CodesASCII.txt",
        &format!(
            "code\tname\tasciiname\tgeonameid\n\
             US.CA\tCalifornia\tCalifornia\t{CALIFORNIA_ID}\n"
        ),
    )
}

fn geoname_line(
    id: i64,
    name: &str,
    feature_class: &str,
    feature_code: &str,
    admin1: &str,
    timezone: &str,
) -> String {
    format!(
        "{id}\t{name}\t{name}\t\t34.05223\t-118.24368\t{feature_class}\t{feature_code}\tUS\t\
         \t{admin1}\t\t\t\t3898747\t\t115\t{timezone}\t2023-01-01\n"
    )
}

fn geoname_fixture(dir: &Utf8Path, lines: &[String]) -> Utf8PathBuf {
    write_fixture(dir, "allCountries.txt", &lines.concat())
}

fn default_lines() -> Vec<String> {
    vec![
        geoname_line(
            LOS_ANGELES_ID,
            "Los Angeles",
            "P",
            "PPL",
            "CA",
            "America/Los_Angeles",
        ),
        geoname_line(
            CALIFORNIA_ID,
            "California",
            "A",
            "ADM1",
            "CA",
            "America/Los_Angeles",
        ),
    ]
}

fn query_opt_i64(store: &SqliteStore, sql: &str) -> Option<i64> {
    store
        .connection()
        .query_row(sql, [], |row| row.get::<_, Option<i64>>(0))
        .unwrap()
}

fn query_opt_text(store: &SqliteStore, sql: &str) -> Option<String> {
    store
        .connection()
        .query_row(sql, [], |row| row.get::<_, Option<String>>(0))
        .unwrap()
}

fn count(store: &SqliteStore, sql: &str) -> i64 {
    store
        .connection()
        .query_row(sql, [], |row| row.get(0))
        .unwrap()
}

#[test]
fn admin_references_resolve_during_main_import() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap();
    let store = store();
    let mapping = SchemaMapping::default();

    AdministrativeImporter::new(&store, &mapping)
        .import(&admin1_fixture(root), &NopProgress)
        .unwrap();
    GeoNameImporter::new(&store, &mapping, FilterSpec::default())
        .import(&geoname_fixture(root, &default_lines()), &NopProgress)
        .unwrap();

    let division = query_opt_i64(
        &store,
        "SELECT id FROM administrative WHERE code = 'US.CA'",
    );
    assert_eq!(division, Some(CALIFORNIA_ID));

    let admin1 = query_opt_i64(
        &store,
        &format!("SELECT admin1_id FROM geonames WHERE id = {LOS_ANGELES_ID}"),
    );
    assert_eq!(admin1, Some(CALIFORNIA_ID));

    // the division's own row carries its code and the full imported fields
    let code = query_opt_text(
        &store,
        &format!("SELECT admin_code FROM geonames WHERE id = {CALIFORNIA_ID}"),
    );
    assert_eq!(code.as_deref(), Some("US.CA"));
    let feature = query_opt_text(
        &store,
        &format!("SELECT feature_class FROM geonames WHERE id = {CALIFORNIA_ID}"),
    );
    assert_eq!(feature.as_deref(), Some("A"));
}

#[test]
fn rerunning_both_stages_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap();
    let store = store();
    let mapping = SchemaMapping::default();
    let admin = admin1_fixture(root);

    // malformed rows (bad date, non-numeric id, truncated line) are skipped,
    // never fatal
    let mut lines = default_lines();
    lines.push(geoname_line(400003, "Bad Date", "P", "PPL", "", "").replace("2023-01-01", "yesterday"));
    lines.push(geoname_line(400004, "Bad Id", "P", "PPL", "", "").replacen("400004", "not-a-number", 1));
    lines.push("400005\tTruncated\n".to_string());
    let names = geoname_fixture(root, &lines);

    for _ in 0..2 {
        AdministrativeImporter::new(&store, &mapping)
            .import(&admin, &NopProgress)
            .unwrap();
        GeoNameImporter::new(&store, &mapping, FilterSpec::default())
            .import(&names, &NopProgress)
            .unwrap();
    }

    assert_eq!(count(&store, "SELECT COUNT(*) FROM administrative"), 1);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM geonames"), 2);
    let admin1 = query_opt_i64(
        &store,
        &format!("SELECT admin1_id FROM geonames WHERE id = {LOS_ANGELES_ID}"),
    );
    assert_eq!(admin1, Some(CALIFORNIA_ID));
}

#[test]
fn main_import_before_admin_leaves_null_until_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap();
    let store = store();
    let mapping = SchemaMapping::default();
    let names = geoname_fixture(root, &default_lines());

    GeoNameImporter::new(&store, &mapping, FilterSpec::default())
        .import(&names, &NopProgress)
        .unwrap();
    let admin1 = query_opt_i64(
        &store,
        &format!("SELECT admin1_id FROM geonames WHERE id = {LOS_ANGELES_ID}"),
    );
    assert_eq!(admin1, None);

    AdministrativeImporter::new(&store, &mapping)
        .import(&admin1_fixture(root), &NopProgress)
        .unwrap();
    GeoNameImporter::new(&store, &mapping, FilterSpec::default())
        .import(&names, &NopProgress)
        .unwrap();
    let admin1 = query_opt_i64(
        &store,
        &format!("SELECT admin1_id FROM geonames WHERE id = {LOS_ANGELES_ID}"),
    );
    assert_eq!(admin1, Some(CALIFORNIA_ID));
}

#[test]
fn filters_never_drop_division_anchors() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap();
    let store = store();
    let mapping = SchemaMapping::default();

    let mut lines = default_lines();
    lines.push(geoname_line(400001, "Some Lake", "H", "LK", "CA", ""));
    let names = geoname_fixture(root, &lines);

    AdministrativeImporter::new(&store, &mapping)
        .import(&admin1_fixture(root), &NopProgress)
        .unwrap();

    let mut filter_map = BTreeMap::new();
    filter_map.insert("featureClass".to_string(), vec!["P".to_string()]);
    let filters = FilterSpec::from_map(&filter_map).unwrap();
    GeoNameImporter::new(&store, &mapping, filters)
        .import(&names, &NopProgress)
        .unwrap();

    assert_eq!(count(&store, "SELECT COUNT(*) FROM geonames WHERE id = 400001"), 0);
    assert_eq!(
        count(
            &store,
            &format!("SELECT COUNT(*) FROM geonames WHERE id = {LOS_ANGELES_ID}")
        ),
        1
    );
    // rejected by the feature filter, kept as a division anchor
    let feature = query_opt_text(
        &store,
        &format!("SELECT feature_class FROM geonames WHERE id = {CALIFORNIA_ID}"),
    );
    assert_eq!(feature.as_deref(), Some("A"));
}

#[test]
fn timezone_references_resolve_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap();
    let store = store();
    let mapping = SchemaMapping::default();

    let timezones = write_fixture(
        root,
        "timeZones.txt",
        "CountryCode\tTimeZoneId\tGMT offset\tDST offset\trawOffset\n\
         US\tAmerica/Los_Angeles\t-8.0\t-7.0\t-8.0\n",
    );
    TimezoneImporter::new(&store, &mapping)
        .import(&timezones, &NopProgress)
        .unwrap();

    let mut lines = default_lines();
    lines.push(geoname_line(400002, "Nowhere", "P", "PPL", "", "Mars/Olympus"));
    GeoNameImporter::new(&store, &mapping, FilterSpec::default())
        .import(&geoname_fixture(root, &lines), &NopProgress)
        .unwrap();

    let resolved = query_opt_text(
        &store,
        &format!("SELECT timezone FROM geonames WHERE id = {LOS_ANGELES_ID}"),
    );
    assert_eq!(resolved.as_deref(), Some("America/Los_Angeles"));
    // a name absent from the timezones table resolves to nothing
    let unresolved = query_opt_text(&store, "SELECT timezone FROM geonames WHERE id = 400002");
    assert_eq!(unresolved, None);
}

#[test]
fn hierarchy_links_are_keyed_by_pair() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap();
    let store = store();
    let mapping = SchemaMapping::default();

    let first = write_fixture(
        root,
        "hierarchy.txt",
        &format!("6252001\t{CALIFORNIA_ID}\tADM\n6252001\t{LOS_ANGELES_ID}\tADM\n"),
    );
    let importer = HierarchyImporter::new(&store, &mapping);
    importer.import(&first, &NopProgress).unwrap();
    importer.import(&first, &NopProgress).unwrap();
    assert_eq!(count(&store, "SELECT COUNT(*) FROM hierarchy"), 2);

    // same pair, new link type: replaced, not duplicated
    let second = write_fixture(
        root,
        "hierarchy2.txt",
        &format!("6252001\t{CALIFORNIA_ID}\tPOL\n"),
    );
    importer.import(&second, &NopProgress).unwrap();
    assert_eq!(count(&store, "SELECT COUNT(*) FROM hierarchy"), 2);
    let kind = query_opt_text(
        &store,
        &format!("SELECT type FROM hierarchy WHERE parent_id = 6252001 AND child_id = {CALIFORNIA_ID}"),
    );
    assert_eq!(kind.as_deref(), Some("POL"));
}

#[test]
fn country_info_imports_skipping_comments() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap();
    let store = store();
    let mapping = SchemaMapping::default();

    let countries = write_fixture(
        root,
        "countryInfo.txt",
        "# GeoNames country information\n\
         #ISO\tISO3\tISO-Numeric\tfips\tCountry\tCapital\tArea\tPopulation\tContinent\n\
         US\tUSA\t840\tUS\tUnited States\tWashington\t9629091\t327167434\tNA\t.us\tUSD\tDollar\t1\t\t\ten-US\t6252001\tCA,MX\t\n",
    );
    let importer = CountryImporter::new(&store, &mapping);
    importer.import(&countries, &NopProgress).unwrap();
    importer.import(&countries, &NopProgress).unwrap();

    assert_eq!(count(&store, "SELECT COUNT(*) FROM countries"), 1);
    let name = query_opt_text(&store, "SELECT name FROM countries WHERE iso = 'US'");
    assert_eq!(name.as_deref(), Some("United States"));
    let geoname_id = query_opt_i64(&store, "SELECT geoname_id FROM countries WHERE iso = 'US'");
    assert_eq!(geoname_id, Some(6252001));
}

#[test]
fn main_archive_imports_straight_from_zip() {
    let dir = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(dir.path()).unwrap();
    let store = store();
    let mapping = SchemaMapping::default();

    let path = root.join("allCountries.zip");
    let mut writer = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file("allCountries.txt", options).unwrap();
    writer
        .write_all(default_lines().concat().as_bytes())
        .unwrap();
    writer.finish().unwrap();

    GeoNameImporter::new(&store, &mapping, FilterSpec::default())
        .import(&path, &NopProgress)
        .unwrap();
    assert_eq!(count(&store, "SELECT COUNT(*) FROM geonames"), 2);
}
