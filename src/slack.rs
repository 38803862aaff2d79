use serde::Deserialize;
use slack_morphism::prelude::*;
use tracing::{debug, info};

use crate::dispatch::{with_rate_limit_retry, MessagePoster, TokioSleeper};
use crate::emoji::EmojiListResponse;
use crate::error::{AppError, Result};
use crate::fetch::EmojiPageSource;
use crate::history::{ChannelResolver, HistoryPage, HistorySource};
use crate::users::{UserInfoSource, UserRecord};

const HISTORY_PAGE_SIZE: u32 = 200;

/// All Slack traffic goes through this type. The rest of the crate only
/// sees the source traits it implements, so tests swap in fakes.
///
/// Two tokens are in play: the bot token drives the documented Web API,
/// while the admin token (plus an optional session cookie) is what the
/// undocumented `emoji.adminList` endpoint accepts.
pub struct SlackGateway {
    client: SlackHyperClient,
    api_token: SlackApiToken,
    bot_token: String,
    admin_token: String,
    admin_cookie: Option<String>,
    admin_base_url: String,
    http: reqwest::Client,
    sleeper: TokioSleeper,
}

impl SlackGateway {
    pub fn new(
        bot_token: String,
        admin_token: String,
        admin_cookie: Option<String>,
        admin_base_url: String,
    ) -> Result<Self> {
        let connector =
            SlackClientHyperConnector::new().map_err(|e| AppError::SlackApi(e.to_string()))?;
        Ok(Self {
            client: SlackClient::new(connector),
            api_token: SlackApiToken::new(SlackApiTokenValue(bot_token.clone())),
            bot_token,
            admin_token,
            admin_cookie,
            admin_base_url,
            http: reqwest::Client::new(),
            sleeper: TokioSleeper,
        })
    }

    async fn fetch_history_page(
        &self,
        channel_id: &str,
        cursor: Option<&str>,
    ) -> Result<HistoryPage> {
        let mut query: Vec<(&str, String)> = vec![
            ("channel", channel_id.to_string()),
            ("limit", HISTORY_PAGE_SIZE.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }

        let response = self
            .http
            .get(api_url(&self.admin_base_url, "conversations.history"))
            .header("Authorization", format!("Bearer {}", self.bot_token))
            .query(&query)
            .send()
            .await
            .map_err(|e| AppError::SlackApi(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(1);
            return Err(AppError::SlackRateLimit { retry_after_secs });
        }
        if !response.status().is_success() {
            return Err(AppError::SlackApi(format!(
                "conversations.history returned HTTP {}",
                response.status()
            )));
        }

        let body: HistoryResponse = response
            .json()
            .await
            .map_err(|e| AppError::JsonParse(e.to_string()))?;
        if !body.ok {
            return Err(AppError::SlackApi(format!(
                "conversations.history request failed: {}",
                body.error
            )));
        }

        let next_cursor = Some(body.response_metadata.next_cursor).filter(|c| !c.is_empty());
        Ok(HistoryPage {
            messages: body.messages,
            next_cursor,
        })
    }
}

impl EmojiPageSource for SlackGateway {
    async fn emoji_page(&self, page: u32, page_size: u32) -> Result<EmojiListResponse> {
        let page_value = page.to_string();
        let count_value = page_size.to_string();
        let form = [
            ("token", self.admin_token.as_str()),
            ("page", page_value.as_str()),
            ("count", count_value.as_str()),
            ("sort_by", "created"),
            ("sort_dir", "desc"),
            ("_x_mode", "online"),
        ];

        debug!(page, page_size, "requesting emoji admin list page");
        let mut request = self
            .http
            .post(api_url(&self.admin_base_url, "emoji.adminList"))
            .form(&form);
        if let Some(cookie) = &self.admin_cookie {
            request = request.header("cookie", cookie.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::SlackApi(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AppError::SlackApi(format!(
                "emoji.adminList returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<EmojiListResponse>()
            .await
            .map_err(|e| AppError::JsonParse(e.to_string()))
    }
}

impl UserInfoSource for SlackGateway {
    async fn users_info(&self, ids: &[String]) -> Result<Vec<UserRecord>> {
        let response = self
            .http
            .get(api_url(&self.admin_base_url, "users.info"))
            .header("Authorization", format!("Bearer {}", self.bot_token))
            .query(&[("users", ids.join(","))])
            .send()
            .await
            .map_err(|e| AppError::SlackApi(e.to_string()))?;
        if !response.status().is_success() {
            return Err(AppError::SlackApi(format!(
                "users.info returned HTTP {}",
                response.status()
            )));
        }

        let body: UsersInfoResponse = response
            .json()
            .await
            .map_err(|e| AppError::JsonParse(e.to_string()))?;
        if !body.ok {
            return Err(AppError::SlackApi(format!(
                "users.info request failed: {}",
                body.error
            )));
        }

        // batched lookups answer with `users`, a single id with `user`
        let mut records = body.users;
        if let Some(single) = body.user {
            records.push(single);
        }
        Ok(records)
    }
}

impl HistorySource for SlackGateway {
    async fn history_page(&self, channel_id: &str, cursor: Option<&str>) -> Result<HistoryPage> {
        with_rate_limit_retry(&self.sleeper, async || {
            self.fetch_history_page(channel_id, cursor).await
        })
        .await
    }
}

impl ChannelResolver for SlackGateway {
    async fn resolve_channel(&self, name: &str) -> Result<String> {
        let wanted = name.trim_start_matches('#');
        let session = self.client.open_session(&self.api_token);
        let mut cursor: Option<SlackCursorId> = None;

        loop {
            let request = SlackApiConversationsListRequest::new()
                .with_limit(HISTORY_PAGE_SIZE as u16)
                .with_types(vec![SlackConversationType::Public])
                .with_exclude_archived(true)
                .opt_cursor(cursor);

            let response = with_rate_limit_retry(&self.sleeper, async || {
                session
                    .conversations_list(&request)
                    .await
                    .map_err(classify_slack_error)
            })
            .await?;

            for channel in response.channels {
                if channel.name.as_deref() == Some(wanted) {
                    let id = channel.id.0;
                    info!(
                        id = %id,
                        name = wanted,
                        "resolved channel, set channel.id in the settings file to skip this walk"
                    );
                    return Ok(id);
                }
            }

            match response.response_metadata.and_then(|meta| meta.next_cursor) {
                Some(next) if !next.0.is_empty() => cursor = Some(next),
                _ => return Err(AppError::ChannelNotFound(name.to_string())),
            }
        }
    }
}

impl MessagePoster for SlackGateway {
    async fn post_message(
        &self,
        dest: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<String> {
        let session = self.client.open_session(&self.api_token);
        let content = SlackMessageContent::new().with_text(text.to_string());
        let mut request =
            SlackApiChatPostMessageRequest::new(SlackChannelId(dest.to_string()), content);
        if let Some(ts) = thread_ts {
            request = request.with_thread_ts(SlackTs(ts.to_string()));
        }

        let response = session
            .chat_post_message(&request)
            .await
            .map_err(classify_slack_error)?;
        Ok(response.ts.0)
    }
}

#[derive(Debug, Default, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: String,
    #[serde(default)]
    messages: Vec<crate::history::ChannelMessage>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Default, Deserialize)]
struct UsersInfoResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    error: String,
    #[serde(default)]
    users: Vec<UserRecord>,
    user: Option<UserRecord>,
}

fn api_url(base: &str, method: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), method)
}

fn classify_slack_error(error: impl std::fmt::Display) -> AppError {
    let message = error.to_string();
    match parse_retry_after(&message) {
        Some(retry_after_secs) => AppError::SlackRateLimit { retry_after_secs },
        None => AppError::SlackApi(message),
    }
}

/// Rate limit errors read "... retry after 30s"; pull out the seconds.
fn parse_retry_after(message: &str) -> Option<u64> {
    let (_, rest) = message.split_once("retry after ")?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok().filter(|secs| *secs > 0)
}
