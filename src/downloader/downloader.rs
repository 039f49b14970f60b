use std::path::PathBuf;

use log::{debug, info};
use reqwest::Client;
use thiserror::Error;

use super::fetch::{fetch_image, DownloadError};
use crate::archive::{fetch_archive, parse_archive, ArchiveQuery, MetadataError};
use crate::config::{ConfigError, DownloaderConfig};
use crate::image::ImageRecord;
use crate::request::{default_client, HttpError};

/// Every way a download run can end early. The first failure wins,
/// nothing is retried.
#[derive(Error, Debug)]
pub enum DownloaderError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error("Failed to fetch from the image service")]
    Http(#[from] HttpError),
    #[error("Failed to write image to disk")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for DownloaderError {
    fn from(err: reqwest::Error) -> Self {
        DownloaderError::Http(HttpError::ReqwestError(err))
    }
}

/// Fetches the most recent archive images and stores them as `<date>.jpg`
pub struct Downloader {
    config: DownloaderConfig,
    client: Client,
}

impl Downloader {
    pub fn new(config: DownloaderConfig) -> Result<Self, DownloaderError> {
        Ok(Self::with_client(config, default_client()?))
    }

    pub fn with_client(config: DownloaderConfig, client: Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Looks up the newest `total` days in the archive for the configured locale
    pub async fn image_records(&self) -> Result<Vec<ImageRecord>, DownloaderError> {
        let url = ArchiveQuery::latest(&self.config.locale, self.config.total)
            .build(&self.config.service_url)?;
        let archive = fetch_archive(&self.client, &url).await?;
        debug!("Archive returned {} image(s)", archive.images.len());
        Ok(parse_archive(
            archive,
            &self.config.service_url,
            self.config.total,
        )?)
    }

    /// Downloads every image in order and returns the written paths in the same order.
    /// Any failure stops the run; files already written by it are kept.
    pub async fn download(&self) -> Result<Vec<PathBuf>, DownloaderError> {
        let destination = self.config.validate().await?;
        let records = self.image_records().await?;

        let mut written = Vec::with_capacity(records.len());
        for record in &records {
            let path = fetch_image(
                &self.client,
                record,
                &destination,
                self.config.resolution,
                self.config.resolution_fallback,
            )
            .await?;
            written.push(path);
        }
        info!(
            "Downloaded {} image(s) in {} to {:?}",
            written.len(),
            self.config.resolution,
            destination
        );
        Ok(written)
    }
}
