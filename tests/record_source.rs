use std::fs::{self, File};
use std::io::Write;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use geonames_loader::error::LoaderError;
use geonames_loader::source::{RecordSource, SourceOptions};

fn write_file(dir: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn tempdir_utf8(dir: &tempfile::TempDir) -> &Utf8Path {
    Utf8Path::from_path(dir.path()).unwrap()
}

#[test]
fn plain_file_counts_are_exact_and_malformed_lines_skip() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        tempdir_utf8(&dir),
        "admin1CodesASCII.txt",
        "code\tname\tasciiname\tgeonameid\n\
         US.CA\tCalifornia\tCalifornia\t5332921\n\
         \n\
         not-enough-fields\n\
         US.AZ\t Arizona \tArizona\t5551752\n",
    );

    let source = RecordSource::open(
        &path,
        SourceOptions {
            skip_header: true,
            min_fields: 4,
            ..SourceOptions::default()
        },
    )
    .unwrap();
    assert!(source.is_exact());
    assert_eq!(source.estimated_rows(), 5);

    let rows: Vec<Vec<String>> = source.collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], "US.CA");
    // fields come out whitespace-trimmed
    assert_eq!(rows[1][1], "Arizona");
}

#[test]
fn comment_lines_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        tempdir_utf8(&dir),
        "countryInfo.txt",
        "# GeoNames country information\n\
         #ISO\tISO3\tISO-Numeric\tfips\tCountry\n\
         AD\tAND\t020\tAN\tAndorra\n",
    );

    let source = RecordSource::open(
        &path,
        SourceOptions {
            comment_prefix: Some('#'),
            min_fields: 5,
            ..SourceOptions::default()
        },
    )
    .unwrap();

    let rows: Vec<Vec<String>> = source.collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][4], "Andorra");
}

#[test]
fn numeric_first_gate_rejects_stray_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        tempdir_utf8(&dir),
        "hierarchy.txt",
        "6252001\t5332921\tADM\n\
         parent\tchild\ttype\n\
         6252001\t5368361\tADM\n",
    );

    let source = RecordSource::open(
        &path,
        SourceOptions {
            numeric_first: true,
            min_fields: 2,
            ..SourceOptions::default()
        },
    )
    .unwrap();
    assert_eq!(source.count(), 2);
}

#[test]
fn zip_entry_streams_with_estimated_total() {
    let dir = tempfile::tempdir().unwrap();
    let path = tempdir_utf8(&dir).join("places.zip");

    let mut writer = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    // a decoy entry first, so selection has to prefer the stem-named one
    writer.start_file("readme.txt", options).unwrap();
    writer.write_all(b"9\tdecoy\n").unwrap();
    writer.start_file("places.txt", options).unwrap();
    writer
        .write_all(b"1\tAlpha\n2\tBeta\n3\tGamma\n")
        .unwrap();
    writer.finish().unwrap();

    let source = RecordSource::open(
        &path,
        SourceOptions {
            numeric_first: true,
            min_fields: 2,
            ..SourceOptions::default()
        },
    )
    .unwrap();
    assert!(!source.is_exact());
    assert!(source.estimated_rows() >= 1);

    let rows: Vec<Vec<String>> = source.collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][1], "Alpha");
    assert_eq!(rows[2][1], "Gamma");
}

#[test]
fn stored_zip_entry_is_readable_too() {
    let dir = tempfile::tempdir().unwrap();
    let path = tempdir_utf8(&dir).join("stored.zip");

    let mut writer = ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer.start_file("stored.txt", options).unwrap();
    writer.write_all(b"1\tAlpha\n").unwrap();
    writer.finish().unwrap();

    let source = RecordSource::open(&path, SourceOptions::default()).unwrap();
    let rows: Vec<Vec<String>> = source.collect();
    assert_eq!(rows, vec![vec!["1".to_string(), "Alpha".to_string()]]);
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = tempdir_utf8(&dir).join("absent.txt");
    let Err(err) = RecordSource::open(&path, SourceOptions::default()) else {
        panic!("opening a missing file should fail");
    };
    assert_matches!(err, LoaderError::SourceNotFound(_));
}
