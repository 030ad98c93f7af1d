use std::fs;
use std::io::{Read, Write};
use std::time::Duration;

use camino::Utf8Path;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::info;

use crate::error::LoaderError;
use crate::import::ProgressSink;

/// Download collaborator: fetches a remote dump file into the local cache,
/// reporting byte-level progress. The import engine itself only ever sees
/// cached local paths.
pub trait DownloadClient {
    fn download(
        &self,
        url: &str,
        destination: &Utf8Path,
        progress: &dyn ProgressSink,
    ) -> Result<(), LoaderError>;
}

pub struct HttpDownloadClient {
    client: Client,
}

impl HttpDownloadClient {
    pub fn new() -> Result<Self, LoaderError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("geonames-load/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LoaderError::DownloadHttp(err.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| LoaderError::DownloadHttp(err.to_string()))?;

        Ok(Self { client })
    }
}

impl DownloadClient for HttpDownloadClient {
    fn download(
        &self,
        url: &str,
        destination: &Utf8Path,
        progress: &dyn ProgressSink,
    ) -> Result<(), LoaderError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| LoaderError::DownloadHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(LoaderError::DownloadStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        let total = response.content_length();

        let parent = destination
            .parent()
            .ok_or_else(|| LoaderError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        let mut temp = tempfile::Builder::new()
            .prefix("geonames-load")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;

        let mut buf = [0u8; 64 * 1024];
        let mut received = 0u64;
        loop {
            let read = response
                .read(&mut buf)
                .map_err(|err| LoaderError::DownloadHttp(err.to_string()))?;
            if read == 0 {
                break;
            }
            temp.write_all(&buf[..read])
                .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
            received += read as u64;
            if let Some(total) = total {
                if total > 0 {
                    progress.fraction((received as f64 / total as f64).min(1.0));
                }
            }
        }

        temp.persist(destination.as_std_path())
            .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
        progress.fraction(1.0);
        info!(url, bytes = received, "downloaded");
        Ok(())
    }
}
