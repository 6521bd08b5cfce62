//! One-shot download of the published IOC list.

use crate::cache::IocCache;
use crate::ioc::IocDatabase;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

/// Datadog's consolidated Shai-Hulud 2.0 IOC list.
pub const DEFAULT_IOC_URL: &str =
    "https://raw.githubusercontent.com/DataDog/indicators-of-compromise/main/shai-hulud-2.0/consolidated_iocs.csv";

/// Fetches the CSV at `url`.
pub async fn download(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .header("Accept", "text/csv")
        .send()
        .await
        .with_context(|| format!("Failed to request {}", url))?
        .error_for_status()
        .with_context(|| format!("IOC download from {} failed", url))?;

    let bytes = response.bytes().await.context("Failed to read IOC response body")?;
    Ok(bytes.to_vec())
}

/// Downloads the IOC list and stores it in the cache.
///
/// The payload is parsed before it is written so a bad response never
/// replaces a good cached copy. Returns the cache path.
pub async fn refresh(url: &str, cache: &IocCache) -> Result<PathBuf> {
    let client = reqwest::Client::new();
    let bytes = download(&client, url).await?;

    let db = IocDatabase::from_csv_reader(bytes.as_slice())
        .context("Downloaded IOC list is not valid CSV")?;
    if db.is_empty() {
        anyhow::bail!("Downloaded IOC list from {} contains no packages", url);
    }

    let path = cache.store(&bytes)?;
    info!(path = %path.display(), packages = db.len(), "IOC database updated");
    Ok(path)
}
