use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;
use url::Url;

use crate::emoji::EmojiCatalog;
use crate::error::{AppError, Result};

/// Download every catalog image that is not already on disk. Images
/// arrive either as hosted URLs or as inline base64 data URIs. Returns
/// how many files were written.
pub async fn cache_images(catalog: &EmojiCatalog, dir: &Path) -> Result<usize> {
    fs::create_dir_all(dir).map_err(|e| AppError::WriteFile {
        path: dir.display().to_string(),
        source: e,
    })?;

    let client = reqwest::Client::new();
    let mut written = 0;
    for emoji in catalog.emojis() {
        if let Some((ext, payload)) = data_uri_parts(&emoji.url) {
            let path = dir.join(format!("{}.{}", emoji.name, ext));
            if path.exists() {
                continue;
            }
            let bytes = STANDARD.decode(payload).map_err(|e| {
                AppError::SlackApi(format!("invalid image data for {}: {}", emoji.name, e))
            })?;
            write_image(&path, &bytes)?;
            written += 1;
        } else if emoji.url.starts_with("data:") {
            debug!(name = %emoji.name, "skipping unrecognized data uri");
        } else {
            let file_name = match url_extension(&emoji.url) {
                Some(ext) => format!("{}.{}", emoji.name, ext),
                None => emoji.name.clone(),
            };
            let path = dir.join(file_name);
            if path.exists() {
                continue;
            }
            let response = client
                .get(&emoji.url)
                .send()
                .await
                .map_err(|e| AppError::SlackApi(e.to_string()))?;
            if !response.status().is_success() {
                return Err(AppError::SlackApi(format!(
                    "image download failed for {}: HTTP {}",
                    emoji.name,
                    response.status()
                )));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| AppError::SlackApi(e.to_string()))?;
            write_image(&path, &bytes)?;
            written += 1;
        }
    }
    Ok(written)
}

fn write_image(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|e| AppError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// Split "data:image/gif;base64,R0lGO..." into ("gif", "R0lGO...").
fn data_uri_parts(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:image/")?;
    let (ext, tail) = rest.split_once(';')?;
    let (_, payload) = tail.split_once(',')?;
    Some((ext, payload))
}

fn url_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path();
    let (stem, ext) = path.rsplit_once('.')?;
    // a dot inside a directory segment is not an extension
    if ext.is_empty() || ext.contains('/') || stem.is_empty() {
        return None;
    }
    Some(ext.to_string())
}
