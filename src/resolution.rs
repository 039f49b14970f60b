use std::fmt::{self, Display};
use std::str::FromStr;

use lazy_static::lazy_static;
use log::warn;
use regex::{Captures, Regex};
use strum_macros::{Display as StrumDisplay, EnumString};
use thiserror::Error;
use url::Url;

/// The resolution the archive links to when nothing else is requested
pub const DEFAULT_RESOLUTION: Resolution = Resolution {
    width: 1920,
    height: 1080,
};

lazy_static! {
    // Image names end in `_<width>x<height>.jpg`, both in paths and in the `id`/`rf` params
    static ref RESOLUTION_COMPONENT: Regex =
        Regex::new(r"_(?P<width>\d+)x(?P<height>\d+)(?P<ext>\.jpe?g)").unwrap();
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Resolution '{0}' is not in the WIDTHxHEIGHT format")]
    Format(String),
    #[error("Resolution '{0}' has a zero dimension")]
    Zero(String),
}

impl FromStr for Resolution {
    type Err = ResolutionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (width, height) = input
            .trim()
            .split_once(|c: char| c == 'x' || c == 'X')
            .ok_or_else(|| ResolutionError::Format(input.to_owned()))?;
        let parse = |dimension: &str| {
            dimension
                .parse::<u32>()
                .map_err(|_| ResolutionError::Format(input.to_owned()))
        };
        let resolution = Resolution {
            width: parse(width)?,
            height: parse(height)?,
        };
        if resolution.width == 0 || resolution.height == 0 {
            return Err(ResolutionError::Zero(input.to_owned()));
        }
        Ok(resolution)
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What to do when an image url carries no recognizable resolution component
#[derive(StrumDisplay, Debug, Copy, Clone, EnumString, PartialEq, Eq)]
pub enum ResolutionFallback {
    /// Refuse to download anything
    #[strum(serialize = "strict")]
    Strict,
    /// Download whatever resolution the archive linked to
    #[strum(serialize = "default")]
    Default,
}

impl Default for ResolutionFallback {
    fn default() -> Self {
        ResolutionFallback::Default
    }
}

/// Outcome of rewriting an image url
#[derive(Debug, PartialEq, Eq)]
pub enum Selection {
    /// At least one resolution component was rewritten
    Rewritten(Url),
    /// No component found and the fallback allowed the url through untouched
    Unchanged(Url),
}

impl Selection {
    pub fn into_url(self) -> Url {
        match self {
            Selection::Rewritten(url) | Selection::Unchanged(url) => url,
        }
    }
}

fn rewrite_component(value: &str, resolution: Resolution) -> Option<String> {
    if !RESOLUTION_COMPONENT.is_match(value) {
        return None;
    }
    let rewritten = RESOLUTION_COMPONENT.replace_all(value, |caps: &Captures| {
        format!("_{}{}", resolution, &caps["ext"])
    });
    Some(rewritten.into_owned())
}

/// Rewrites the value half of every `key=value` pair, keys and separators stay verbatim
fn rewrite_query(query: &str, resolution: Resolution) -> Option<String> {
    let mut rewrites = 0usize;
    let pairs = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => match rewrite_component(value, resolution) {
                Some(rewritten) => {
                    rewrites += 1;
                    format!("{}={}", key, rewritten)
                }
                None => pair.to_owned(),
            },
            None => pair.to_owned(),
        })
        .collect::<Vec<_>>();
    if rewrites > 0 {
        Some(pairs.join("&"))
    } else {
        None
    }
}

/// Points every resolution component of the url at `resolution`.
/// Returns `None` when the url has no component to rewrite.
///
/// Works on the serialized path and query so percent-encoding the archive
/// chose survives untouched.
fn rewrite_url(source: &Url, resolution: Resolution) -> Option<Url> {
    let mut url = source.clone();
    let mut rewrites = 0usize;

    let path = source.path();
    let (parent, last_segment) = match path.rfind('/') {
        Some(index) => path.split_at(index + 1),
        None => ("", path),
    };
    if let Some(segment) = rewrite_component(last_segment, resolution) {
        url.set_path(&format!("{}{}", parent, segment));
        rewrites += 1;
    }

    if let Some(query) = source.query().and_then(|q| rewrite_query(q, resolution)) {
        url.set_query(Some(&query));
        rewrites += 1;
    }

    if rewrites > 0 {
        Some(url)
    } else {
        None
    }
}

/// Picks the url to download for the requested resolution, honoring the fallback
/// when the archive url doesn't follow the expected naming scheme
pub fn select_resolution(
    source: &Url,
    resolution: Resolution,
    fallback: ResolutionFallback,
) -> Option<Selection> {
    match rewrite_url(source, resolution) {
        Some(url) => Some(Selection::Rewritten(url)),
        None => match fallback {
            ResolutionFallback::Strict => None,
            ResolutionFallback::Default => {
                warn!(
                    "No resolution component in {}, downloading it as linked",
                    source
                );
                Some(Selection::Unchanged(source.clone()))
            }
        },
    }
}
