mod metadata;
mod query;

pub use metadata::{fetch_archive, parse_archive, ArchiveImage, ArchiveResponse, MetadataError};
pub use query::{ArchiveQuery, UrlBuilder, ARCHIVE_PATH};
