use chrono::NaiveDate;
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::image::ImageRecord;
use crate::request::{parse_successful_response, HttpError};

/// `startdate` is always sent without separators
const ARCHIVE_DATE_FORMAT: &str = "%Y%m%d";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Could not get image JSON")]
    NoImages,
    #[error("Archive entry has an invalid startdate '{0}'")]
    InvalidDate(String),
    #[error("Could not build a url from '{0}'")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveImage {
    pub startdate: String,
    /// Path relative to the service origin
    pub url: String,
    pub title: Option<String>,
    pub copyright: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveResponse {
    // the archive leaves the key out entirely for unknown markets
    #[serde(default)]
    pub images: Vec<ArchiveImage>,
}

pub async fn fetch_archive(client: &Client, url: &Url) -> Result<ArchiveResponse, HttpError> {
    debug!("Requesting image archive {}", url);
    let response = client.get(url.as_str()).send().await?;
    parse_successful_response::<ArchiveResponse>(response).await
}

fn parse_date(startdate: &str) -> Result<NaiveDate, MetadataError> {
    // chrono is lenient about field widths, the archive never is
    if startdate.len() != 8 || !startdate.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MetadataError::InvalidDate(startdate.to_owned()));
    }
    NaiveDate::parse_from_str(startdate, ARCHIVE_DATE_FORMAT)
        .map_err(|_| MetadataError::InvalidDate(startdate.to_owned()))
}

impl ArchiveImage {
    pub fn into_record(self, service_url: &Url) -> Result<ImageRecord, MetadataError> {
        let date = parse_date(&self.startdate)?;
        let source_url = service_url
            .join(&self.url)
            .map_err(|_| MetadataError::InvalidUrl(self.url.clone()))?;
        Ok(ImageRecord {
            source_url,
            date,
            title: self.title,
            copyright: self.copyright,
        })
    }
}

/// Turns the archive document into records, newest first, never more than `total`
pub fn parse_archive(
    response: ArchiveResponse,
    service_url: &Url,
    total: u32,
) -> Result<Vec<ImageRecord>, MetadataError> {
    if response.images.is_empty() {
        return Err(MetadataError::NoImages);
    }
    let records = response
        .images
        .into_iter()
        .take(total as usize)
        .map(|image| image.into_record(service_url))
        .collect::<Result<Vec<_>, _>>()?;
    for record in &records {
        info!(
            "Found image for {}: {}",
            record.date,
            record.copyright.as_deref().unwrap_or("no description")
        );
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> Url {
        Url::parse("http://www.bing.com").unwrap()
    }

    fn response(json: &str) -> ArchiveResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn maps_entries_in_order() {
        let archive = response(
            r#"{"images": [
                {"startdate": "20240115", "url": "/th?id=abc", "copyright": "Somewhere (© Someone)"},
                {"startdate": "20240114", "url": "/th?id=def", "title": "Yesterday"}
            ], "tooltips": {}}"#,
        );
        let records = parse_archive(archive, &service(), 5).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source_url.as_str(), "http://www.bing.com/th?id=abc");
        assert_eq!(records[0].file_name(), "2024-01-15.jpg");
        assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());
        assert_eq!(records[1].title.as_deref(), Some("Yesterday"));
    }

    #[test]
    fn never_returns_more_than_requested() {
        let archive = response(
            r#"{"images": [
                {"startdate": "20240115", "url": "/a"},
                {"startdate": "20240114", "url": "/b"}
            ]}"#,
        );
        let records = parse_archive(archive, &service(), 1).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_url.path(), "/a");
    }

    #[test]
    fn empty_or_missing_images_fail() {
        for json in &[r#"{"images": []}"#, r#"{}"#] {
            let result = parse_archive(response(json), &service(), 1);
            assert!(matches!(result, Err(MetadataError::NoImages)));
        }
        assert_eq!(MetadataError::NoImages.to_string(), "Could not get image JSON");
    }

    #[test]
    fn rejects_malformed_dates() {
        for date in &["2024011", "2024-1-15", "20241345", "abcdefgh"] {
            let archive = ArchiveResponse {
                images: vec![ArchiveImage {
                    startdate: date.to_string(),
                    url: "/th?id=abc".to_owned(),
                    title: None,
                    copyright: None,
                }],
            };
            let result = parse_archive(archive, &service(), 1);
            assert!(
                matches!(result, Err(MetadataError::InvalidDate(_))),
                "{} should be rejected",
                date
            );
        }
    }
}
