use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use url::Url;

/// Format used for the on-disk file stem of every downloaded image
pub const FILE_DATE_FORMAT: &str = "%Y-%m-%d";

pub const IMAGE_EXTENSION: &str = "jpg";

// A single day from the archive, resolved against the service origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub source_url: Url,
    pub date: NaiveDate,
    // purely informational, the archive doesn't always send these
    pub title: Option<String>,
    pub copyright: Option<String>,
}

impl ImageRecord {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.date.format(FILE_DATE_FORMAT), IMAGE_EXTENSION)
    }

    pub fn target_path(&self, destination: &Path) -> PathBuf {
        destination.join(self.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_is_dashed_date() {
        let record = ImageRecord {
            source_url: Url::parse("https://www.bing.com/th?id=abc").unwrap(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            title: None,
            copyright: None,
        };
        assert_eq!(record.file_name(), "2024-01-15.jpg");
        assert_eq!(
            record.target_path(Path::new("/tmp/walls")),
            PathBuf::from("/tmp/walls/2024-01-15.jpg")
        );
    }
}
