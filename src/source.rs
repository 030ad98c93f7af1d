use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};

use camino::Utf8Path;
use flate2::read::DeflateDecoder;
use tracing::debug;
use zip::CompressionMethod;
use zip::ZipArchive;

use crate::error::LoaderError;

/// Empirical average of compressed bytes per row in the GeoNames archives.
/// Only ever used to estimate progress, never as a correctness-relevant
/// count.
const AVG_COMPRESSED_BYTES_PER_ROW: f64 = 29.4;

#[derive(Debug, Clone, Copy)]
pub struct SourceOptions {
    /// Skip the first line (administrative-codes and timezone files carry a
    /// header).
    pub skip_header: bool,
    /// Require the first field of every row to parse as an integer.
    pub numeric_first: bool,
    /// Minimum number of fields for a row to count as well-formed.
    pub min_fields: usize,
    /// Drop lines starting with this prefix (`countryInfo.txt` comments).
    pub comment_prefix: Option<char>,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            skip_header: false,
            numeric_first: false,
            min_fields: 1,
            comment_prefix: None,
        }
    }
}

/// Lazy, finite, non-restartable sequence of decoded rows from a
/// tab-delimited file, transparently reading from inside a zip entry when
/// the input is an archive. Malformed lines are skipped, never fatal.
pub struct RecordSource {
    reader: Box<dyn BufRead>,
    options: SourceOptions,
    estimated_rows: u64,
    exact: bool,
    header_pending: bool,
}

impl RecordSource {
    pub fn open(path: &Utf8Path, options: SourceOptions) -> Result<Self, LoaderError> {
        if !path.exists() {
            return Err(LoaderError::SourceNotFound(path.to_string()));
        }
        if path.extension() == Some("zip") {
            Self::open_archive(path, options)
        } else {
            Self::open_plain(path, options)
        }
    }

    /// Plain files are cheap to scan twice, so the row total is exact.
    fn open_plain(path: &Utf8Path, options: SourceOptions) -> Result<Self, LoaderError> {
        let count_pass = File::open(path).map_err(|err| fs_error(path, err))?;
        let mut lines = 0u64;
        let mut reader = BufReader::new(count_pass);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|err| fs_error(path, err))?;
            if read == 0 {
                break;
            }
            lines += 1;
        }

        let file = File::open(path).map_err(|err| fs_error(path, err))?;
        Ok(Self {
            reader: Box::new(BufReader::new(file)),
            options,
            estimated_rows: lines.max(1),
            exact: true,
            header_pending: options.skip_header,
        })
    }

    /// The archive is compressed, so the true row count is unknown up front;
    /// it is estimated from the compressed size. The relevant entry is
    /// streamed by seeking a fresh handle to its data offset, keeping the
    /// decompressed file out of memory.
    fn open_archive(path: &Utf8Path, options: SourceOptions) -> Result<Self, LoaderError> {
        let archive_error = |message: String| LoaderError::Archive {
            path: path.to_string(),
            message,
        };

        let file = File::open(path).map_err(|err| fs_error(path, err))?;
        let compressed_len = file
            .metadata()
            .map_err(|err| fs_error(path, err))?
            .len();
        let mut archive = ZipArchive::new(file).map_err(|err| archive_error(err.to_string()))?;

        let entry_name = select_entry(&archive, path)
            .ok_or_else(|| archive_error("no .txt entry in archive".to_string()))?;
        let entry = archive
            .by_name(&entry_name)
            .map_err(|err| archive_error(err.to_string()))?;
        let method = entry.compression();
        let data_start = entry.data_start();
        let compressed_size = entry.compressed_size();
        drop(entry);
        drop(archive);

        debug!(archive = %path, entry = %entry_name, "streaming zip entry");

        let mut data = File::open(path).map_err(|err| fs_error(path, err))?;
        data.seek(SeekFrom::Start(data_start))
            .map_err(|err| fs_error(path, err))?;
        let data = data.take(compressed_size);
        let reader: Box<dyn BufRead> = match method {
            CompressionMethod::Stored => Box::new(BufReader::new(data)),
            CompressionMethod::Deflated => Box::new(BufReader::new(DeflateDecoder::new(data))),
            _ => return Err(LoaderError::UnsupportedCompression(path.to_string())),
        };

        let estimated_rows = ((compressed_len as f64 / AVG_COMPRESSED_BYTES_PER_ROW) as u64).max(1);
        Ok(Self {
            reader,
            options,
            estimated_rows,
            exact: false,
            header_pending: options.skip_header,
        })
    }

    /// Total row count: exact for plain files, a compressed-size heuristic
    /// for archives.
    pub fn estimated_rows(&self) -> u64 {
        self.estimated_rows
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    fn next_line(&mut self) -> Option<String> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => return None,
                Ok(_) => {}
                // An IO error mid-stream cannot be resynchronized; end the
                // sequence instead of aborting the run.
                Err(_) => return None,
            }
            match String::from_utf8(std::mem::take(&mut buf)) {
                Ok(line) => return Some(line),
                // Not valid UTF-8: structurally invalid row, skip.
                Err(_) => continue,
            }
        }
    }
}

impl Iterator for RecordSource {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.header_pending {
            self.header_pending = false;
            self.next_line()?;
        }
        loop {
            let line = self.next_line()?;
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }
            if let Some(prefix) = self.options.comment_prefix {
                if trimmed.starts_with(prefix) {
                    continue;
                }
            }
            let fields: Vec<String> = trimmed
                .split('\t')
                .map(|field| field.trim().to_string())
                .collect();
            if fields.len() < self.options.min_fields {
                continue;
            }
            if self.options.numeric_first && fields[0].parse::<i64>().is_err() {
                continue;
            }
            return Some(fields);
        }
    }
}

fn select_entry<R: Read + Seek>(archive: &ZipArchive<R>, path: &Utf8Path) -> Option<String> {
    // `allCountries.zip` holds `allCountries.txt`; fall back to the first
    // .txt entry for archives that do not follow the stem convention.
    let preferred = path.file_stem().map(|stem| format!("{stem}.txt"));
    let names: Vec<&str> = archive.file_names().collect();
    if let Some(preferred) = preferred {
        if names.iter().any(|name| *name == preferred.as_str()) {
            return Some(preferred);
        }
    }
    names
        .iter()
        .find(|name| name.ends_with(".txt"))
        .map(|name| name.to_string())
}

fn fs_error(path: &Utf8Path, err: io::Error) -> LoaderError {
    LoaderError::Filesystem(format!("{path}: {err}"))
}
