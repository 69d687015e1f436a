use anyhow::{Context, Result};
use reqwest::header::CONTENT_TYPE;

/// Sends a finished ZIP archive to an HTTP endpoint.
pub fn send_http(url: &str, archive: Vec<u8>) -> Result<()> {
    let size = archive.len();
    let client = reqwest::blocking::Client::new();
    let resp = client
        .post(url)
        .header(CONTENT_TYPE, "application/zip")
        .body(archive)
        .send()
        .with_context(|| format!("uploading archive to {url}"))?;

    tracing::info!(status = %resp.status(), bytes = size, "upload finished");
    resp.error_for_status()
        .with_context(|| format!("server at {url} rejected the archive"))?;
    Ok(())
}
