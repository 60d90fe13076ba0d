//! Loading dataset bytes from disk or over HTTP.

mod http;

pub use http::{BasicClient, DatasetClient};

use anyhow::{Context, Result};
use tracing::debug;

/// Downloads `url` and returns the response body.
///
/// # Errors
///
/// Fails on an unparseable URL, a transport error or a non-success status.
pub async fn fetch_bytes<C: DatasetClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    let bytes = resp.bytes().await?.to_vec();
    debug!(url, bytes = bytes.len(), "Dataset downloaded");
    Ok(bytes)
}

/// Reads the dataset from a local path, or fetches it when `source` is an
/// `http(s)` URL.
#[tracing::instrument(skip_all, fields(source = %source))]
pub async fn load_dataset(source: &str) -> Result<Vec<u8>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let client = BasicClient::new()?;
        fetch_bytes(&client, source).await
    } else {
        tokio::fs::read(source)
            .await
            .with_context(|| format!("dataset file '{source}' could not be read"))
    }
}
