//! Mirrored archive fetching.
//!
//! Every archive is published on several mirrors with an identical path
//! layout. Mirrors are tried strictly in order; only a 404 moves on to the
//! next one. Bodies are streamed to `<dest>.partial` and renamed into place
//! once complete, so a destination that exists is always a full download.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, StatusCode};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::config::FetchConfig;
use crate::error::FetchError;

/// What a fetch did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The destination already existed; nothing was requested.
    AlreadyPresent,
    /// Downloaded from `mirror` after `attempts` mirrors were asked.
    Downloaded {
        mirror: String,
        bytes: u64,
        attempts: usize,
    },
}

/// Retrieves an archive by its mirror-relative path.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Fetch `uri` into `dest` unless `dest` already exists.
    async fn fetch(&self, uri: &str, dest: &Path) -> Result<FetchOutcome, FetchError>;
}

/// [`ArchiveFetcher`] over an ordered list of HTTP mirrors.
pub struct MirroredFetcher {
    client: Client,
    mirrors: Vec<String>,
}

impl MirroredFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        config.validate().map_err(FetchError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| FetchError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            mirrors: config.mirrors.clone(),
        })
    }

    pub fn mirrors(&self) -> &[String] {
        &self.mirrors
    }

    /// Download one URL into `dest` via a `.partial` sibling.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| network_error(url, e))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(FetchError::NotFound {
                    url: url.to_string(),
                })
            }
            status => {
                return Err(FetchError::Server {
                    url: url.to_string(),
                    status: status.as_u16(),
                })
            }
        }

        let expected = response
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let temp_path = partial_path(dest);
        let written = match stream_to_file(response, &temp_path, url).await {
            Ok(written) => written,
            Err(e) => {
                fs::remove_file(&temp_path).await.ok();
                return Err(e);
            }
        };

        if let Some(expected) = expected {
            if written != expected {
                fs::remove_file(&temp_path).await.ok();
                return Err(FetchError::TransientNetwork {
                    url: url.to_string(),
                    message: format!("size mismatch: expected {} bytes, got {}", expected, written),
                });
            }
        }

        // rename fails across filesystems
        if fs::rename(&temp_path, dest).await.is_err() {
            fs::copy(&temp_path, dest).await?;
            fs::remove_file(&temp_path).await?;
        }

        Ok(written)
    }
}

#[async_trait]
impl ArchiveFetcher for MirroredFetcher {
    #[instrument(skip(self, dest), fields(dest = %dest.display()))]
    async fn fetch(&self, uri: &str, dest: &Path) -> Result<FetchOutcome, FetchError> {
        if dest.exists() {
            debug!("Archive already present, skipping download");
            return Ok(FetchOutcome::AlreadyPresent);
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }

        for (index, mirror) in self.mirrors.iter().enumerate() {
            let url = join_url(mirror, uri);
            match self.download(&url, dest).await {
                Ok(bytes) => {
                    info!(mirror = %mirror, bytes = bytes, attempts = index + 1, "Download completed");
                    return Ok(FetchOutcome::Downloaded {
                        mirror: mirror.clone(),
                        bytes,
                        attempts: index + 1,
                    });
                }
                Err(e) if e.is_not_found() => {
                    warn!(mirror = %mirror, "Archive not found on mirror, trying next");
                }
                Err(e) => return Err(e),
            }
        }

        Err(FetchError::FetchFailed {
            uri: uri.to_string(),
            attempts: self.mirrors.len(),
        })
    }
}

async fn stream_to_file(
    response: reqwest::Response,
    path: &Path,
    url: &str,
) -> Result<u64, FetchError> {
    let mut file = File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| network_error(url, e))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;

    Ok(written)
}

fn network_error(url: &str, err: reqwest::Error) -> FetchError {
    FetchError::TransientNetwork {
        url: url.to_string(),
        message: err.to_string(),
    }
}

fn join_url(mirror: &str, uri: &str) -> String {
    format!(
        "{}/{}",
        mirror.trim_end_matches('/'),
        uri.trim_start_matches('/')
    )
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://esgf3.dkrz.de/thredds/fileServer/cmip6/", "HighResMIP/x.nc"),
            "https://esgf3.dkrz.de/thredds/fileServer/cmip6/HighResMIP/x.nc"
        );
        assert_eq!(join_url("http://m", "/a.nc"), "http://m/a.nc");
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/d/tas_1990.nc")),
            PathBuf::from("/d/tas_1990.nc.partial")
        );
    }

    #[test]
    fn test_rejects_empty_mirror_list() {
        let config = FetchConfig {
            mirrors: vec![],
            ..Default::default()
        };
        assert!(matches!(
            MirroredFetcher::new(&config),
            Err(FetchError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_existing_destination_is_not_fetched() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("orog_fx.nc");
        std::fs::write(&dest, b"done").unwrap();

        // unroutable mirror; any request would fail
        let config = FetchConfig {
            mirrors: vec!["http://127.0.0.1:9/".to_string()],
            ..Default::default()
        };
        let fetcher = MirroredFetcher::new(&config).unwrap();
        let outcome = fetcher.fetch("a/b.nc", &dest).await.unwrap();
        assert_eq!(outcome, FetchOutcome::AlreadyPresent);
    }
}
