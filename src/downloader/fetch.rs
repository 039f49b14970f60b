use std::fmt::Display;
use std::path::{Path, PathBuf};

use futures::{pin_mut, Stream, StreamExt};
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use url::Url;

use super::DownloaderError;
use crate::image::ImageRecord;
use crate::resolution::{select_resolution, Resolution, ResolutionFallback};

const JPEG_MEDIA_TYPE: &str = "image/jpeg";

/// Suffix for files that are still being written
const PARTIAL_SUFFIX: &str = "part";

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("No resolution component in {0}, refusing to guess which resolution it serves")]
    MissingResolution(Url),
    #[error("No image available in {resolution} resolution")]
    Unavailable {
        resolution: Resolution,
        status: StatusCode,
    },
    #[error("Unable to download latest image")]
    InvalidResponse {
        content_type: Option<String>,
        content_length: Option<u64>,
    },
    #[error("Unable to copy latest image")]
    IncompleteCopy { expected: u64, written: u64 },
}

fn header_str<'a>(headers: &'a HeaderMap, name: reqwest::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Makes sure the response is a jpeg of a known, non-zero size and returns that size
pub fn validate_headers(headers: &HeaderMap) -> Result<u64, DownloadError> {
    let content_type = header_str(headers, CONTENT_TYPE);
    let content_length = header_str(headers, CONTENT_LENGTH)
        .map(|length| length.trim())
        // u64's parser lets a leading `+` through, the header grammar doesn't
        .filter(|length| !length.is_empty() && length.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|length| length.parse::<u64>().ok());

    let is_jpeg = content_type
        .and_then(|value| value.split(';').next())
        .map(|media_type| media_type.trim().eq_ignore_ascii_case(JPEG_MEDIA_TYPE))
        .unwrap_or(false);

    match content_length {
        Some(length) if is_jpeg && length > 0 => Ok(length),
        _ => Err(DownloadError::InvalidResponse {
            content_type: content_type.map(|value| value.to_owned()),
            content_length,
        }),
    }
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    target.with_file_name(name)
}

/// Failures from `stream` mean the body ended early and surface as an incomplete copy,
/// only disk errors keep their own kind
async fn copy_chunks<S, B, E>(
    file: &mut File,
    stream: S,
    expected: u64,
) -> Result<u64, DownloaderError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    pin_mut!(stream);
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!(
                    "Image body broke off after {} of {} bytes: {}",
                    written, expected, err
                );
                return Err(DownloadError::IncompleteCopy { expected, written }.into());
            }
        };
        let bytes = chunk.as_ref();
        file.write_all(bytes).await?;
        written += bytes.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

async fn discard(partial: &Path) {
    if let Err(err) = fs::remove_file(partial).await {
        warn!("Could not remove partial download {:?}: {}", partial, err);
    }
}

/// Streams `stream` into `target`, but only moves it into place once exactly
/// `expected` bytes made it to disk. Anything else leaves `target` untouched.
pub async fn persist_stream<S, B, E>(
    stream: S,
    target: &Path,
    expected: u64,
) -> Result<u64, DownloaderError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let partial = partial_path(target);
    let mut file = File::create(&partial).await?;
    let copied = copy_chunks(&mut file, stream, expected).await;
    drop(file);

    let written = match copied {
        Ok(written) => written,
        Err(err) => {
            discard(&partial).await;
            return Err(err);
        }
    };
    if written != expected {
        discard(&partial).await;
        return Err(DownloadError::IncompleteCopy { expected, written }.into());
    }
    fs::rename(&partial, target).await?;
    Ok(written)
}

/// Downloads a single archive image into `destination`, returning where it landed
pub async fn fetch_image(
    client: &Client,
    record: &ImageRecord,
    destination: &Path,
    resolution: Resolution,
    fallback: ResolutionFallback,
) -> Result<PathBuf, DownloaderError> {
    let url = select_resolution(&record.source_url, resolution, fallback)
        .ok_or_else(|| DownloadError::MissingResolution(record.source_url.clone()))?
        .into_url();

    debug!("Fetching image {}", url);
    let response = client.get(url.as_str()).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Unavailable { resolution, status }.into());
    }
    let expected = validate_headers(response.headers())?;

    let target = record.target_path(destination);
    let written = persist_stream(response.bytes_stream(), &target, expected).await?;
    info!("Saved {} ({} bytes) to {:?}", url, written, target);
    Ok(target)
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers(content_type: Option<&'static str>, length: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        }
        if let Some(value) = length {
            headers.insert(CONTENT_LENGTH, HeaderValue::from_static(value));
        }
        headers
    }

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> {
        stream::iter(
            parts
                .iter()
                .map(|part| Ok(part.as_bytes().to_vec()))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn accepts_sized_jpegs() {
        assert_eq!(
            validate_headers(&headers(Some("image/jpeg"), Some("1024"))).unwrap(),
            1024
        );
        assert_eq!(
            validate_headers(&headers(Some("Image/JPEG; charset=binary"), Some("3"))).unwrap(),
            3
        );
    }

    #[test]
    fn rejects_other_media_and_missing_sizes() {
        let cases = vec![
            headers(Some("text/html"), Some("1024")),
            headers(None, Some("1024")),
            headers(Some("image/jpeg"), Some("0")),
            headers(Some("image/jpeg"), Some("lots")),
            headers(Some("image/jpeg"), Some("+5")),
            headers(Some("image/jpeg"), None),
        ];
        for case in cases {
            let err = validate_headers(&case).unwrap_err();
            assert!(matches!(err, DownloadError::InvalidResponse { .. }));
            assert_eq!(err.to_string(), "Unable to download latest image");
        }
    }

    #[tokio::test]
    async fn persists_complete_streams() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("2024-01-15.jpg");
        let written = persist_stream(chunks(&["jp", "eg"]), &target, 4)
            .await
            .unwrap();
        assert_eq!(written, 4);
        assert_eq!(std::fs::read(&target).unwrap(), b"jpeg");
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn discards_short_streams() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("2024-01-15.jpg");
        let err = persist_stream(chunks(&["jp"]), &target, 4)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DownloaderError::Download(DownloadError::IncompleteCopy {
                expected: 4,
                written: 2
            })
        ));
        assert_eq!(err.to_string(), "Unable to copy latest image");
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn broken_off_streams_are_incomplete_copies() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("2024-01-15.jpg");
        let body = stream::iter(vec![
            Ok(b"jp".to_vec()),
            Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed",
            )),
        ]);
        let err = persist_stream(body, &target, 4).await.unwrap_err();
        assert!(matches!(
            err,
            DownloaderError::Download(DownloadError::IncompleteCopy {
                expected: 4,
                written: 2
            })
        ));
        assert!(!target.exists());
        assert!(!partial_path(&target).exists());
    }

    #[tokio::test]
    async fn overwrites_previous_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("2024-01-15.jpg");
        std::fs::write(&target, b"old image").unwrap();
        persist_stream(chunks(&["new"]), &target, 3).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }

    #[test]
    fn partial_files_sit_next_to_the_target() {
        assert_eq!(
            partial_path(Path::new("/walls/2024-01-15.jpg")),
            PathBuf::from("/walls/2024-01-15.jpg.part")
        );
    }
}
