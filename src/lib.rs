pub mod archive;
pub mod config;
pub mod downloader;
pub mod image;
pub mod request;
pub mod resolution;
pub use dotenv::dotenv;

pub use config::DownloaderConfig;
pub use downloader::{Downloader, DownloaderError};
pub use resolution::{Resolution, ResolutionFallback};
