use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::ts_to_datetime;

/// How far back the weekly run searches for the vote prompt. The report
/// runs weekly, so two missed weeks and a margin is plenty.
pub const VOTE_SEARCH_WINDOW_DAYS: i64 = 16;
/// The year-in-review walk stops once messages are older than this.
pub const WRAPPED_SEARCH_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reaction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelMessage {
    #[serde(default)]
    pub ts: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

/// One page of channel history, newest message first.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub messages: Vec<ChannelMessage>,
    pub next_cursor: Option<String>,
}

pub trait HistorySource {
    async fn history_page(&self, channel_id: &str, cursor: Option<&str>) -> Result<HistoryPage>;
}

pub trait ChannelResolver {
    /// Look up a channel id by name, with or without the leading '#'.
    async fn resolve_channel(&self, name: &str) -> Result<String>;
}

pub async fn resolve_channel_id(
    resolver: &impl ChannelResolver,
    channel_name: &str,
    cached_id: &str,
) -> Result<String> {
    if !cached_id.is_empty() {
        return Ok(cached_id.to_string());
    }
    if channel_name.is_empty() {
        return Err(AppError::ChannelNotFound(
            "no channel name configured".to_string(),
        ));
    }
    resolver.resolve_channel(channel_name).await
}

/// What last week's run left in the channel: the vote prompt with its
/// reactions, plus the markers recovered from the announcement batches
/// that directly preceded this week's prompt and the one before it.
#[derive(Debug, Clone)]
pub struct LastWeekMessages {
    pub vote_message: ChannelMessage,
    /// Newest emoji announced last week, the walk marker for this run.
    pub last_announced: String,
    /// Newest emoji announced the week before last.
    pub previous_announced: String,
}

/// Walk the channel backwards looking for the vote prompt. The message
/// right after a prompt (one older, in page order) is the tail of that
/// week's announcement batch and its last emoji name is the marker.
pub async fn find_last_week_messages(
    source: &impl HistorySource,
    channel_id: &str,
    prompts: &[String],
) -> Result<LastWeekMessages> {
    let cutoff = Duration::days(VOTE_SEARCH_WINDOW_DAYS);
    let mut cursor: Option<String> = None;
    let mut vote_message: Option<ChannelMessage> = None;
    let mut companions: Vec<String> = Vec::new();
    let mut awaiting_companion = false;

    'pages: loop {
        let page = source.history_page(channel_id, cursor.as_deref()).await?;
        for message in &page.messages {
            if awaiting_companion {
                companions.push(extract_last_emoji(&message.text)?);
                awaiting_companion = false;
            } else if prompts.iter().any(|p| p == &message.text) {
                if vote_message.is_none() {
                    vote_message = Some(message.clone());
                }
                awaiting_companion = true;
            }
            if companions.len() == 2 {
                break 'pages;
            }
        }

        match page.next_cursor {
            Some(next) if !next.is_empty() => {
                let Some(oldest) = page.messages.last() else {
                    return Err(AppError::MessageNotFound(
                        "vote prompt not found in channel history".to_string(),
                    ));
                };
                let seen = ts_to_datetime(&oldest.ts)?;
                if Utc::now().signed_duration_since(seen) > cutoff {
                    return Err(AppError::MessageNotFound(format!(
                        "no vote prompt in the last {} days",
                        VOTE_SEARCH_WINDOW_DAYS
                    )));
                }
                cursor = Some(next);
            }
            _ => {
                return Err(AppError::MessageNotFound(
                    "vote prompt not found in channel history".to_string(),
                ))
            }
        }
    }

    let mut markers = companions.into_iter();
    match (vote_message, markers.next(), markers.next()) {
        (Some(vote_message), Some(last_announced), Some(previous_announced)) => {
            debug!(last = %last_announced, previous = %previous_announced, "recovered markers");
            Ok(LastWeekMessages {
                vote_message,
                last_announced,
                previous_announced,
            })
        }
        _ => Err(AppError::MessageNotFound(
            "vote prompt scan ended without both markers".to_string(),
        )),
    }
}

/// Collect every vote prompt posted in the last year. Running out of
/// history here is normal, not an error.
pub async fn find_all_vote_prompts(
    source: &impl HistorySource,
    channel_id: &str,
    prompts: &[String],
) -> Result<Vec<ChannelMessage>> {
    let cutoff = Duration::days(WRAPPED_SEARCH_WINDOW_DAYS);
    let mut cursor: Option<String> = None;
    let mut found = Vec::new();

    loop {
        let page = source.history_page(channel_id, cursor.as_deref()).await?;
        for message in &page.messages {
            if prompts.iter().any(|p| p == &message.text) {
                found.push(message.clone());
            }
        }

        match page.next_cursor {
            Some(next) if !next.is_empty() => {
                let Some(oldest) = page.messages.last() else {
                    return Ok(found);
                };
                let seen = ts_to_datetime(&oldest.ts)?;
                if Utc::now().signed_duration_since(seen) > cutoff {
                    return Ok(found);
                }
                cursor = Some(next);
            }
            _ => return Ok(found),
        }
    }
}

/// The announcement batches end with ":name:", so the name sits between
/// the last two colons of the text.
fn extract_last_emoji(text: &str) -> Result<String> {
    text.rsplit(':')
        .nth(1)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::MessageNotFound(format!(
                "no emoji name at the end of announcement message {:?}",
                text
            ))
        })
}
