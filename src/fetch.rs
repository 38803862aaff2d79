use tracing::info;

use crate::emoji::{strip_colons, EmojiListResponse};
use crate::error::{AppError, Result};

pub const PAGE_SIZE: u32 = 10_000;
pub const FAST_PAGE_SIZE: u32 = 1_000;

/// One page of the emoji admin list. The only real implementation talks
/// to Slack, tests swap in canned pages.
pub trait EmojiPageSource {
    async fn emoji_page(&self, page: u32, page_size: u32) -> Result<EmojiListResponse>;
}

/// Fetch every page of the catalog, newest uploads first.
pub async fn fetch_catalog(
    source: &impl EmojiPageSource,
    page_size: u32,
) -> Result<EmojiListResponse> {
    fetch_pages(source, page_size, None).await
}

/// Fetch pages until one of them contains `last_emoji`. Pages are sorted
/// by creation time descending, so everything newer than the marker is
/// already in hand once its page arrives.
pub async fn fetch_catalog_until(
    source: &impl EmojiPageSource,
    page_size: u32,
    last_emoji: &str,
) -> Result<EmojiListResponse> {
    let marker = strip_colons(last_emoji);
    fetch_pages(source, page_size, Some(&marker)).await
}

async fn fetch_pages(
    source: &impl EmojiPageSource,
    page_size: u32,
    stop_at: Option<&str>,
) -> Result<EmojiListResponse> {
    let mut merged: Option<EmojiListResponse> = None;
    let mut page = 1;
    loop {
        info!(page, "fetching emoji page");
        let current = source.emoji_page(page, page_size).await?;
        if !current.ok {
            return Err(AppError::SlackApi(format!(
                "emoji list request failed: {}",
                current.error
            )));
        }

        let stop_seen = stop_at.is_some_and(|name| current.emoji.iter().any(|e| e.name == name));
        let pages = current.paging.pages;
        match merged.as_mut() {
            Some(all) => all.emoji.extend(current.emoji),
            None => merged = Some(current),
        }

        if stop_seen || page >= pages {
            break;
        }
        page += 1;
    }
    Ok(merged.unwrap_or_default())
}
