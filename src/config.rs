use std::io::ErrorKind;
use std::path::PathBuf;

use lazy_static::lazy_static;
use thiserror::Error;
use tokio::fs;
use url::Url;

use crate::resolution::{Resolution, ResolutionFallback};

pub const DEFAULT_LOCALE: &str = "en-US";
pub const DEFAULT_TOTAL: u32 = 1;

lazy_static! {
    pub static ref DEFAULT_SERVICE_URL: Url = Url::parse("https://www.bing.com").unwrap();
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Destination {0:?} does not exist")]
    MissingDestination(PathBuf),
    #[error("Destination {0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("At least one image has to be requested")]
    ZeroTotal,
    #[error("Could not build an archive url from {0}")]
    InvalidServiceUrl(Url),
    #[error("Could not inspect destination {0:?}")]
    Unreadable(PathBuf, #[source] std::io::Error),
}

/// Everything a single download run needs to know, owned by the caller
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    pub destination: PathBuf,
    /// Market code like `en-US`, handed to the archive as-is
    pub locale: String,
    pub resolution: Resolution,
    /// How many of the most recent days to fetch
    pub total: u32,
    pub service_url: Url,
    pub resolution_fallback: ResolutionFallback,
}

impl DownloaderConfig {
    pub fn new<P: Into<PathBuf>, L: Into<String>>(
        destination: P,
        locale: L,
        resolution: Resolution,
    ) -> Self {
        Self {
            destination: destination.into(),
            locale: locale.into(),
            resolution,
            total: DEFAULT_TOTAL,
            service_url: DEFAULT_SERVICE_URL.clone(),
            resolution_fallback: ResolutionFallback::default(),
        }
    }

    pub fn total(mut self, total: u32) -> Self {
        self.total = total;
        self
    }

    pub fn service_url(mut self, service_url: Url) -> Self {
        self.service_url = service_url;
        self
    }

    pub fn resolution_fallback(mut self, fallback: ResolutionFallback) -> Self {
        self.resolution_fallback = fallback;
        self
    }

    /// Checks the run can happen at all and resolves the destination to an absolute path
    pub async fn validate(&self) -> Result<PathBuf, ConfigError> {
        if self.total == 0 {
            return Err(ConfigError::ZeroTotal);
        }
        let destination = fs::canonicalize(&self.destination)
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => ConfigError::MissingDestination(self.destination.clone()),
                _ => ConfigError::Unreadable(self.destination.clone(), err),
            })?;
        let metadata = fs::metadata(&destination)
            .await
            .map_err(|err| ConfigError::Unreadable(destination.clone(), err))?;
        if !metadata.is_dir() {
            return Err(ConfigError::NotADirectory(destination));
        }
        Ok(destination)
    }
}
