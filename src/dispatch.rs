use std::time::Duration;

use tracing::info;

use crate::error::{AppError, Result};
use crate::settings::RunMode;

/// How a report message wants to be delivered. The run mode decides
/// what that means in practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Channel-bound content.
    Send,
    /// Content only reviewers should ever see.
    ReviewOnly,
    /// Channel-bound content that reviewers also get a copy of.
    SendAndReview,
    /// Content for reviewer DMs, printed in every other mode.
    DmOnly,
    /// Console output in every mode.
    PrintOnly,
}

pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `attempt`, and if it fails with a rate limit, sleep for the time
/// the platform asked for and try exactly once more. Any other error,
/// and any error on the retry, propagates as-is.
pub async fn with_rate_limit_retry<T, S, F>(sleeper: &S, mut attempt: F) -> Result<T>
where
    S: Sleeper,
    F: AsyncFnMut() -> Result<T>,
{
    match attempt().await {
        Err(AppError::SlackRateLimit { retry_after_secs }) => {
            info!(retry_after_secs, "rate limited, sleeping before one retry");
            sleeper.sleep(Duration::from_secs(retry_after_secs)).await;
            attempt().await
        }
        result => result,
    }
}

pub trait MessagePoster {
    /// Post `text` to a channel id, channel name or user id, optionally
    /// threaded, and return the new message's timestamp.
    async fn post_message(&self, dest: &str, text: &str, thread_ts: Option<&str>)
        -> Result<String>;
}

/// Routes report messages according to the run mode. Returns the posted
/// message's timestamp when one single message went out, so callers can
/// thread follow-ups under it.
pub struct Dispatcher<'a, P, S> {
    poster: &'a P,
    sleeper: S,
    mode: RunMode,
    channel: String,
    owner: String,
    reviewers: Vec<String>,
}

impl<'a, P: MessagePoster, S: Sleeper> Dispatcher<'a, P, S> {
    pub fn new(
        poster: &'a P,
        sleeper: S,
        mode: RunMode,
        channel: String,
        owner: String,
        reviewers: Vec<String>,
    ) -> Self {
        Self {
            poster,
            sleeper,
            mode,
            channel,
            owner,
            reviewers,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub async fn post(&self, kind: MessageKind, text: &str) -> Result<Option<String>> {
        self.post_in_thread(kind, text, None).await
    }

    pub async fn post_in_thread(
        &self,
        kind: MessageKind,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<Option<String>> {
        use MessageKind as K;
        use RunMode as M;
        match (kind, self.mode) {
            (K::Send | K::SendAndReview, M::Print) => self.print(text),
            (K::Send, M::Review) => self.print(text),
            (K::Send | K::SendAndReview, M::Test) => self.send(&self.owner, text, thread_ts).await,
            (K::Send | K::SendAndReview, M::Send) => {
                self.send(&self.channel, text, thread_ts).await
            }
            (K::SendAndReview | K::ReviewOnly | K::DmOnly, M::Review) => {
                self.review(text, thread_ts).await
            }
            (K::ReviewOnly, _) => Ok(None),
            (K::DmOnly | K::PrintOnly, _) => self.print(text),
        }
    }

    fn print(&self, text: &str) -> Result<Option<String>> {
        println!("\n\n{}\n\n", text);
        Ok(None)
    }

    async fn send(&self, dest: &str, text: &str, thread_ts: Option<&str>) -> Result<Option<String>> {
        let ts = with_rate_limit_retry(&self.sleeper, async || {
            self.poster.post_message(dest, text, thread_ts).await
        })
        .await?;
        Ok(Some(ts))
    }

    /// DM the reviewers and then the owner. The thread handle applies to
    /// the first recipient only, and the first send's timestamp is the
    /// one returned for later threading.
    async fn review(&self, text: &str, thread_ts: Option<&str>) -> Result<Option<String>> {
        let mut first_ts = None;
        let mut thread = thread_ts;
        for dest in self.reviewers.iter().chain(std::iter::once(&self.owner)) {
            let ts = self.send(dest, text, thread).await?;
            thread = None;
            if first_ts.is_none() {
                first_ts = ts;
            }
        }
        Ok(first_ts)
    }
}
