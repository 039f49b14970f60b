pub mod downloader;
mod fetch;

pub use downloader::{Downloader, DownloaderError};
pub use fetch::{fetch_image, persist_stream, validate_headers, DownloadError};
