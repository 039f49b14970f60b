use std::env;
use std::iter::FromIterator;

use log::{error, warn};
use reqwest;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct ResponseErrorContext {
    pub body: String,
    pub code: StatusCode,
}

/// Wrapper for providing actual useful information about
/// why responses failed since reqwest throws that information
/// away when it encounters errors
#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Failed response code {0:?}")]
    FailStatus(ResponseErrorContext),
    #[error("Unexpected body {0:?}")]
    UnexpectedBody(ResponseErrorContext),
    #[error("Request error")]
    ReqwestError(#[from] reqwest::Error),
}

pub async fn parse_successful_response<T: DeserializeOwned>(
    response: Response,
) -> Result<T, HttpError> {
    let response_code = response.status();
    let url = response.url().clone();
    let response_body = response.text().await?;
    if !response_code.is_success() {
        return Err(HttpError::FailStatus(ResponseErrorContext {
            body: response_body,
            code: response_code,
        }));
    }
    serde_json::from_str::<T>(&response_body).map_err(|_error| {
        error!("Failed to parse response from {}", url);
        HttpError::UnexpectedBody(ResponseErrorContext {
            body: response_body,
            code: response_code,
        })
    })
}

fn user_agent() -> HeaderValue {
    env::var("USER_AGENT")
        .ok()
        .and_then(|agent| match HeaderValue::from_str(&agent) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("USER_AGENT is not a valid header value, using the default");
                None
            }
        })
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_USER_AGENT))
}

pub fn request_default_headers() -> HeaderMap {
    HeaderMap::from_iter([(HeaderName::from_static("user-agent"), user_agent())])
}

/// Shared client for both the archive and the image requests
pub fn default_client() -> Result<Client, HttpError> {
    Ok(Client::builder()
        .default_headers(request_default_headers())
        .build()?)
}
