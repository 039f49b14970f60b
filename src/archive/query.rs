use url::Url;

use crate::config::ConfigError;

pub const ARCHIVE_PATH: &str = "/HPImageArchive.aspx";

/// `js` asks the archive for json instead of xml
const RESPONSE_FORMAT: &str = "js";

/// Parameters for a single archive lookup. `idx` counts backwards from today
#[derive(Debug, Clone)]
pub struct ArchiveQuery<'a> {
    pub locale: &'a str,
    pub total: u32,
    pub index: u32,
}

impl<'a> ArchiveQuery<'a> {
    pub fn latest(locale: &'a str, total: u32) -> Self {
        Self {
            locale,
            total,
            index: 0,
        }
    }

    pub fn build(&self, service_url: &Url) -> Result<Url, ConfigError> {
        let mut builder = UrlBuilder::from_queries(vec![("format", RESPONSE_FORMAT)]);
        builder
            .param("idx", self.index)
            .param("n", self.total)
            .param("mkt", self.locale);
        builder.build(service_url, ARCHIVE_PATH)
    }
}

pub struct UrlBuilder {
    pub params: Vec<(&'static str, String)>,
}

impl UrlBuilder {
    pub fn from_queries(params: Vec<(&'static str, &'static str)>) -> Self {
        Self {
            params: params
                .into_iter()
                .map(|(key, value)| (key, value.to_owned()))
                .collect::<Vec<_>>(),
        }
    }
    pub fn param<T: ToString>(&mut self, key: &'static str, value: T) -> &mut Self {
        self.params.push((key, value.to_string()));
        self
    }
    pub fn build(&self, base_url: &Url, path: &str) -> Result<Url, ConfigError> {
        let mut url = base_url
            .join(path)
            .map_err(|_| ConfigError::InvalidServiceUrl(base_url.clone()))?;
        url.query_pairs_mut().clear().extend_pairs(self.params.iter());
        Ok(url)
    }
}
