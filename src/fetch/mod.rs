//! Loading source bytes (tiles, reading CSVs) from disk or over HTTP.

mod access_token;
mod basic;
mod client;

pub use access_token::AccessToken;
pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Result, bail};
use tracing::debug;

use crate::config::Settings;

/// Fetches `url` and returns the response body.
///
/// # Errors
///
/// Fails on transport errors and non-success status codes.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        bail!("GET {url} returned status {status}");
    }
    Ok(resp.bytes().await?.to_vec())
}

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Builds the client for upstream requests, adding the access token when
/// one is configured.
pub fn client_from_settings(settings: &Settings) -> Result<Box<dyn HttpClient>> {
    let basic = BasicClient::new()?;
    Ok(match &settings.access_token {
        Some(token) => Box::new(AccessToken::new(
            basic,
            settings.access_token_param.clone(),
            token.clone(),
        )),
        None => Box::new(basic),
    })
}

/// Loads source data from a local file path or fetches it over HTTP.
#[tracing::instrument(skip_all, fields(source = %source))]
pub async fn load_source<C: HttpClient + ?Sized>(client: &C, source: &str) -> Result<Vec<u8>> {
    let bytes = if is_url(source) {
        fetch_bytes(client, source).await?
    } else {
        tokio::fs::read(source).await?
    };
    debug!(bytes = bytes.len(), "Source loaded");
    Ok(bytes)
}
