//! The weekly report and the year-in-review run, stitched together from
//! the fetch, history, ranking and dispatch pieces.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Utc};
use tracing::info;

use crate::dispatch::{Dispatcher, MessageKind, MessagePoster, Sleeper, TokioSleeper};
use crate::emoji::{Emoji, EmojiCatalog};
use crate::error::Result;
use crate::fetch::{fetch_catalog, EmojiPageSource, FAST_PAGE_SIZE, PAGE_SIZE};
use crate::filter;
use crate::history::{
    find_all_vote_prompts, find_last_week_messages, resolve_channel_id, ChannelMessage,
    ChannelResolver, HistorySource,
};
use crate::images::cache_images;
use crate::memes::meme_sentence;
use crate::ranking::{
    audit_batches, display_batches, first_time_uploaders, longest_names, newest_since,
    sort_counted, tally_uploads, vote_leaders, Counted, VoteWinner, MAX_LONGEST_NAMES,
    MAX_TOP_UPLOADERS, WEEKLY_VOTE_ENTRIES, WRAPPED_VOTE_ENTRIES,
};
use crate::settings::{RunMode, Settings};
use crate::snapshot::{detect_deleted, SnapshotStore};
use crate::ts_to_datetime;
use crate::users::{UserDirectory, UserInfoSource, UserRecord};

/// Ranked lists show this many entries up front, the rest rolls into a
/// threaded follow-up message.
const LEAD_LIST_ENTRIES: usize = 5;
/// The year-in-review winner list gets a longer lead, it has a whole
/// year of votes to show.
const WRAPPED_LEAD_ENTRIES: usize = 20;

const TOP_THIS_WEEK_HEADING: &str = "Top Emoji Uploaders This Week:";
const TOP_THIS_WEEK_MORE: &str = "More Top Emoji Uploaders This Week!";
const TOP_ALL_TIME_HEADING: &str = "Top Emoji Uploaders of All Time:";
const TOP_ALL_TIME_MORE: &str = "More Top Emoji Uploaders of All Time!";
const FIRST_TIME_MORE: &str = "More First Time Uploaders!";
const VOTE_WINNERS_MORE: &str = "More Top Uploaders\n";

/// One full weekly run: recover last week's markers, fetch the catalog,
/// rank the votes, announce the new emojis and close with the uploader
/// lists.
pub async fn run_weekly<G>(gateway: &G, settings: &Settings) -> Result<()>
where
    G: EmojiPageSource + HistorySource + ChannelResolver + UserInfoSource + MessagePoster,
{
    let dispatcher = Dispatcher::new(
        gateway,
        TokioSleeper,
        settings.run_mode,
        settings.channel.name.clone(),
        settings.owner.user_id.clone(),
        settings.reviewers.clone(),
    );

    let (vote_message, last_announced) = last_week_markers(gateway, settings).await?;

    // Fast fetch shrinks the pages, not the walk; the deleted diff and
    // the all-time tallies need every page.
    let page_size = if settings.features.fast_fetch {
        FAST_PAGE_SIZE
    } else {
        PAGE_SIZE
    };
    let response = fetch_catalog(gateway, page_size).await?;

    let store = SnapshotStore::new(settings.storage.snapshot_path());
    if settings.features.cache_snapshots {
        let path = store.write(&response)?;
        info!(path = %path.display(), "wrote catalog snapshot");
    }
    let mut catalog = EmojiCatalog::new(response.emoji);

    // Rank last week's votes before any filter touches the catalog, so
    // every voted emoji can still be resolved to its uploader.
    if let Some(vote_message) = &vote_message {
        let outcome = vote_leaders(
            std::slice::from_ref(vote_message),
            &catalog,
            WEEKLY_VOTE_ENTRIES,
        );
        let heading = format!(
            "Congratulations to the top emojis from last week (sorted by emoji reactions from {} people):\n",
            outcome.voters
        );
        post_vote_winners(
            &dispatcher,
            gateway,
            settings,
            &heading,
            &outcome.winners,
            LEAD_LIST_ENTRIES,
        )
        .await?;
    }

    if settings.features.cache_images {
        let cached = cache_images(&catalog, &settings.storage.images_path()).await?;
        info!(cached, "cached new emoji images");
    }

    // This run's snapshot is offset 0, last week's is one further back.
    if let Some(previous) = store.read_back(1)? {
        let deleted = detect_deleted(&previous, &catalog);
        let uploader_ids: Vec<String> = deleted.iter().map(|e| e.user_id.clone()).collect();
        let directory = UserDirectory::fetch(gateway, uploader_ids).await?;
        if let Some(message) = deleted_report(&deleted, &directory)? {
            dispatcher.post(MessageKind::ReviewOnly, &message).await?;
        }
    }

    filter::apply(settings, &mut catalog);

    let new = newest_since(&catalog, &last_announced);

    let intro = format!(
        "Here are all the new emojis! There are {} new emojis from {} people.",
        new.names.len(),
        new.uploaders.len()
    );
    dispatcher.post(MessageKind::Send, &intro).await?;

    for batch in display_batches(&new.names) {
        dispatcher.post(MessageKind::SendAndReview, &batch).await?;
    }

    let prompt_thread = dispatcher
        .post(MessageKind::Send, &settings.markers.vote_prompt)
        .await?;

    // Name-by-name list in the prompt's thread, for anyone checking what
    // the display batches actually contained.
    for part in audit_batches(&new.names) {
        dispatcher
            .post_in_thread(MessageKind::Send, &part, prompt_thread.as_deref())
            .await?;
    }

    let thanks = thanks_sentence(&new.uploaders);
    if !thanks.is_empty() {
        dispatcher
            .post_in_thread(MessageKind::Send, &thanks, prompt_thread.as_deref())
            .await?;
    }

    post_uploader_list(
        &dispatcher,
        gateway,
        settings,
        TOP_THIS_WEEK_HEADING,
        TOP_THIS_WEEK_MORE,
        &new.uploaders,
        usize::MAX,
        false,
    )
    .await?;

    let sentence = meme_sentence(&new.names, &settings.memes, &mut rand::rng());
    if let Some(sentence) = sentence {
        dispatcher
            .post(MessageKind::SendAndReview, &sentence)
            .await?;
    }

    let all_time = tally_uploads(&catalog);
    println!(
        "{} people have uploaded {} emojis",
        all_time.len(),
        catalog.len()
    );
    post_uploader_list(
        &dispatcher,
        gateway,
        settings,
        TOP_ALL_TIME_HEADING,
        TOP_ALL_TIME_MORE,
        &all_time,
        MAX_TOP_UPLOADERS,
        !settings.features.send_top_uploaders_all_time,
    )
    .await?;

    let first_timers = first_time_uploaders(&new.uploaders, &all_time);
    let heading = format!(
        "{} people uploaded their first emoji this week!",
        first_timers.len()
    );
    post_uploader_list(
        &dispatcher,
        gateway,
        settings,
        &heading,
        FIRST_TIME_MORE,
        &first_timers,
        MAX_TOP_UPLOADERS,
        false,
    )
    .await?;

    let mut longest = String::from("Longest Emoji Names:\n");
    for (position, name) in longest_names(&catalog, MAX_LONGEST_NAMES).iter().enumerate() {
        longest.push_str(&format!(
            "{}. :{}: {} ({})\n",
            position + 1,
            name,
            name,
            name.len()
        ));
    }
    dispatcher.post(MessageKind::PrintOnly, &longest).await?;

    Ok(())
}

/// The year-in-review run: collect every vote prompt from the last
/// year, print per-prompt stats and post one big winner list.
pub async fn run_wrapped<G>(gateway: &G, settings: &Settings) -> Result<()>
where
    G: EmojiPageSource + HistorySource + ChannelResolver + UserInfoSource + MessagePoster,
{
    let dispatcher = Dispatcher::new(
        gateway,
        TokioSleeper,
        settings.run_mode,
        settings.channel.name.clone(),
        settings.owner.user_id.clone(),
        settings.reviewers.clone(),
    );

    let channel_id =
        resolve_channel_id(gateway, &settings.channel.name, &settings.channel.id).await?;
    let prompt_messages =
        find_all_vote_prompts(gateway, &channel_id, &vote_prompts(settings)).await?;
    info!(prompts = prompt_messages.len(), "collected vote prompts");

    for message in &prompt_messages {
        let voters: HashSet<&str> = message
            .reactions
            .iter()
            .flat_map(|reaction| reaction.users.iter().map(String::as_str))
            .collect();
        let posted = ts_to_datetime(&message.ts)?;
        println!(
            "Reactions {}, voters {}, date {}",
            message.reactions.len(),
            voters.len(),
            posted
        );
    }

    let response = fetch_catalog(gateway, PAGE_SIZE).await?;
    let catalog = EmojiCatalog::new(response.emoji);

    let outcome = vote_leaders(&prompt_messages, &catalog, WRAPPED_VOTE_ENTRIES);
    let heading = format!(
        "Congratulations to the top emojis of {}! (sorted by emoji reactions from {} people):\n",
        wrapped_year(Utc::now()),
        outcome.voters
    );
    post_vote_winners(
        &dispatcher,
        gateway,
        settings,
        &heading,
        &outcome.winners,
        WRAPPED_LEAD_ENTRIES,
    )
    .await?;

    Ok(())
}

/// The marker that anchors a weekly run. An override in the settings
/// skips the channel walk entirely, which also means there is no vote
/// message to rank.
async fn last_week_markers<G>(
    gateway: &G,
    settings: &Settings,
) -> Result<(Option<ChannelMessage>, String)>
where
    G: HistorySource + ChannelResolver,
{
    let marker = &settings.markers.last_emoji_override;
    if !marker.is_empty() {
        info!(last_announced = %marker, "override set, skipping the history walk");
        return Ok((None, marker.clone()));
    }

    let channel_id =
        resolve_channel_id(gateway, &settings.channel.name, &settings.channel.id).await?;
    let last_week = find_last_week_messages(gateway, &channel_id, &vote_prompts(settings)).await?;
    Ok((Some(last_week.vote_message), last_week.last_announced))
}

fn vote_prompts(settings: &Settings) -> Vec<String> {
    vec![
        settings.markers.vote_prompt.clone(),
        settings.markers.vote_prompt_previous.clone(),
    ]
}

/// A January run reports on the year that just ended.
fn wrapped_year(now: DateTime<Utc>) -> i32 {
    if now.month() == 1 {
        now.year() - 1
    } else {
        now.year()
    }
}

/// Decorate a user for a ranked list line. Muted handles lose the @ so
/// they are not pinged, and console-bound output uses the readable
/// @handle form instead of the <@id> markup the API wants.
fn mention(user: &UserRecord, mode: RunMode, print_only: bool, muted: bool) -> String {
    if muted {
        format!("({})", user.name)
    } else if print_only || matches!(mode, RunMode::Print | RunMode::Review) {
        format!("(@{})", user.name)
    } else {
        format!("(<@{}>)", user.id)
    }
}

fn mute_footer(owner_handle: &str) -> String {
    format!(
        "If you do not want to be pinged by this list, message @{} to be added to the mute list, which prints your name without the @ sign.\n",
        owner_handle
    )
}

fn skip_footer(owner_handle: &str) -> String {
    format!(
        "If you want to be left out of the list altogether, ask @{} to add you to the skip list.\n",
        owner_handle
    )
}

/// Post one ranked uploader list as a lead message plus a threaded
/// follow-up that carries the overflow and the mute and skip footers.
/// Skipped handles keep the numbering contiguous.
#[allow(clippy::too_many_arguments)]
async fn post_uploader_list<P, S, U>(
    dispatcher: &Dispatcher<'_, P, S>,
    users: &U,
    settings: &Settings,
    heading: &str,
    more_heading: &str,
    entries: &[Counted],
    max_entries: usize,
    print_only: bool,
) -> Result<()>
where
    P: MessagePoster,
    S: Sleeper,
    U: UserInfoSource,
{
    let mut ranked = entries.to_vec();
    sort_counted(&mut ranked);
    ranked.truncate(max_entries);

    let ids: Vec<String> = ranked.iter().map(|entry| entry.key.clone()).collect();
    let directory = UserDirectory::fetch(users, ids).await?;

    let mut lead = format!("{}\n", heading);
    let mut more = format!("{}\n", more_heading);
    let mut skipped = 0;
    for (position, entry) in ranked.iter().enumerate() {
        let user = directory.resolve(&entry.key)?;
        if settings.lists.skip_handles.iter().any(|h| h == &user.name) {
            skipped += 1;
            continue;
        }
        let muted = settings.lists.mute_handles.iter().any(|h| h == &user.name);
        let line = format!(
            "{}. {} {} {}\n",
            position + 1 - skipped,
            entry.name,
            mention(user, dispatcher.mode(), print_only, muted),
            entry.count
        );
        if position < LEAD_LIST_ENTRIES {
            lead.push_str(&line);
        } else {
            more.push_str(&line);
        }
    }
    more.push_str(&mute_footer(&settings.owner.handle));
    more.push_str(&skip_footer(&settings.owner.handle));

    if print_only {
        dispatcher.post(MessageKind::PrintOnly, &lead).await?;
        dispatcher.post(MessageKind::PrintOnly, &more).await?;
    } else {
        let thread = dispatcher.post(MessageKind::Send, &lead).await?;
        dispatcher
            .post_in_thread(MessageKind::Send, &more, thread.as_deref())
            .await?;
    }
    Ok(())
}

/// Post the vote winner list to the channel with review copies, lead
/// plus threaded follow-up.
async fn post_vote_winners<P, S, U>(
    dispatcher: &Dispatcher<'_, P, S>,
    users: &U,
    settings: &Settings,
    heading: &str,
    winners: &[VoteWinner],
    lead_entries: usize,
) -> Result<()>
where
    P: MessagePoster,
    S: Sleeper,
    U: UserInfoSource,
{
    let ids: Vec<String> = winners.iter().map(|w| w.uploader_id.clone()).collect();
    let directory = UserDirectory::fetch(users, ids).await?;

    let mut lead = heading.to_string();
    let mut more = VOTE_WINNERS_MORE.to_string();
    let mut skipped = 0;
    for (position, winner) in winners.iter().enumerate() {
        let user = directory.resolve(&winner.uploader_id)?;
        if settings.lists.skip_handles.iter().any(|h| h == &user.name) {
            skipped += 1;
            continue;
        }
        let muted = settings.lists.mute_handles.iter().any(|h| h == &user.name);
        let shown = if settings.features.april_fools {
            settings.features.april_fools_emoji.as_str()
        } else {
            winner.emoji.as_str()
        };
        let line = format!(
            "{}. {} {} :{}: {}\n",
            position + 1 - skipped,
            user.real_name,
            mention(user, dispatcher.mode(), false, muted),
            shown,
            winner.votes
        );
        if position < lead_entries {
            lead.push_str(&line);
        } else {
            more.push_str(&line);
        }
    }

    let thread = dispatcher.post(MessageKind::SendAndReview, &lead).await?;
    more.push('\n');
    more.push_str(&mute_footer(&settings.owner.handle));
    more.push('\n');
    more.push_str(&skip_footer(&settings.owner.handle));
    dispatcher
        .post_in_thread(MessageKind::SendAndReview, &more, thread.as_deref())
        .await?;
    Ok(())
}

/// "Thanks to A, B, and C." for everyone who uploaded this week.
fn thanks_sentence(uploaders: &[Counted]) -> String {
    let mut names: Vec<&str> = uploaders.iter().map(|entry| entry.name.as_str()).collect();
    names.sort_unstable();
    match names.split_last() {
        None => String::new(),
        Some((only, [])) => format!("Thanks to {}.", only),
        Some((last, rest)) => format!("Thanks to {}, and {}.", rest.join(", "), last),
    }
}

/// Reviewer-only summary of emojis that were in last week's snapshot
/// but are gone from the current catalog.
fn deleted_report(deleted: &[Emoji], directory: &UserDirectory) -> Result<Option<String>> {
    if deleted.is_empty() {
        return Ok(None);
    }
    let mut message = String::from("\nDeleted Emojis:\n\n");
    for emoji in deleted {
        let user = directory.resolve(&emoji.user_id)?;
        let uploaded = DateTime::from_timestamp(emoji.created, 0)
            .map(|when| when.to_string())
            .unwrap_or_else(|| emoji.created.to_string());
        message.push_str(&format!(
            "{} (@{}) {} {}\n",
            emoji.name, user.name, uploaded, emoji.url
        ));
    }
    message.push('\n');
    Ok(Some(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emoji::{EmojiListResponse, Paging};
    use crate::error::AppError;
    use crate::history::{HistoryPage, Reaction};
    use chrono::TimeZone;
    use std::cell::RefCell;

    struct FakeSlack {
        pages: Vec<EmojiListResponse>,
        history: Vec<HistoryPage>,
        posted: RefCell<Vec<(String, String, Option<String>)>>,
        history_calls: RefCell<usize>,
    }

    impl FakeSlack {
        fn new(pages: Vec<EmojiListResponse>, history: Vec<HistoryPage>) -> Self {
            Self {
                pages,
                history,
                posted: RefCell::new(Vec::new()),
                history_calls: RefCell::new(0),
            }
        }
    }

    impl EmojiPageSource for FakeSlack {
        async fn emoji_page(&self, page: u32, _page_size: u32) -> Result<EmojiListResponse> {
            self.pages
                .get(page as usize - 1)
                .cloned()
                .ok_or_else(|| AppError::SlackApi(format!("no such page: {}", page)))
        }
    }

    impl HistorySource for FakeSlack {
        async fn history_page(
            &self,
            _channel_id: &str,
            cursor: Option<&str>,
        ) -> Result<HistoryPage> {
            *self.history_calls.borrow_mut() += 1;
            let index: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
            Ok(self.history.get(index).cloned().unwrap_or(HistoryPage {
                messages: Vec::new(),
                next_cursor: None,
            }))
        }
    }

    impl ChannelResolver for FakeSlack {
        async fn resolve_channel(&self, _name: &str) -> Result<String> {
            Ok("C0FAKE".to_string())
        }
    }

    impl UserInfoSource for FakeSlack {
        async fn users_info(&self, ids: &[String]) -> Result<Vec<UserRecord>> {
            Ok(ids
                .iter()
                .map(|id| UserRecord {
                    id: id.clone(),
                    name: id.to_lowercase(),
                    real_name: format!("Real {}", id),
                })
                .collect())
        }
    }

    impl MessagePoster for FakeSlack {
        async fn post_message(
            &self,
            dest: &str,
            text: &str,
            thread_ts: Option<&str>,
        ) -> Result<String> {
            let mut posted = self.posted.borrow_mut();
            posted.push((
                dest.to_string(),
                text.to_string(),
                thread_ts.map(str::to_string),
            ));
            Ok(format!("ts-{}", posted.len()))
        }
    }

    fn emoji(name: &str, user_id: &str, display: &str, created: i64) -> Emoji {
        Emoji {
            name: name.to_string(),
            user_id: user_id.to_string(),
            user_display_name: display.to_string(),
            created,
            ..Emoji::default()
        }
    }

    fn catalog_page(emojis: Vec<Emoji>) -> EmojiListResponse {
        EmojiListResponse {
            ok: true,
            paging: Paging {
                count: emojis.len() as u64,
                total: emojis.len() as u64,
                page: 1,
                pages: 1,
            },
            emoji: emojis,
            ..EmojiListResponse::default()
        }
    }

    fn message(ts: &str, text: &str, reactions: Vec<Reaction>) -> ChannelMessage {
        ChannelMessage {
            ts: ts.to_string(),
            text: text.to_string(),
            reactions,
        }
    }

    fn reaction(name: &str, users: &[&str]) -> Reaction {
        Reaction {
            name: name.to_string(),
            count: users.len(),
            users: users.iter().map(|u| u.to_string()).collect(),
        }
    }

    fn counted(key: &str, name: &str, count: usize) -> Counted {
        Counted {
            key: key.to_string(),
            name: name.to_string(),
            count,
        }
    }

    /// Five emojis, e3 announced last week, e1 the week before. The vote
    /// prompt from last week carries reactions on e2 and e1.
    fn weekly_fixture() -> FakeSlack {
        let pages = vec![catalog_page(vec![
            emoji("e5", "U2", "Dana R", 500),
            emoji("e4", "U2", "Dana R", 400),
            emoji("e3", "U1", "Ana G", 300),
            emoji("e2", "U1", "Ana G", 200),
            emoji("e1", "U1", "Ana G", 100),
        ])];
        let history = vec![HistoryPage {
            messages: vec![
                message("1756000400.000000", "weekend chatter", vec![]),
                message(
                    "1756000300.000000",
                    "React here with the best new emojis!",
                    vec![
                        reaction("e2", &["UA", "UB", "UC", "UD"]),
                        reaction("e1", &["UA", "UB", "UE"]),
                    ],
                ),
                message("1756000200.000000", ":e2::e3:", vec![]),
                message(
                    "1756000100.000000",
                    "React here with the best new emojis!",
                    vec![],
                ),
                message("1756000000.000000", ":e1:", vec![]),
            ],
            next_cursor: None,
        }];
        FakeSlack::new(pages, history)
    }

    fn send_settings(dir: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.run_mode = RunMode::Send;
        settings.owner.user_id = "U0OWNER".to_string();
        settings.owner.handle = "owner".to_string();
        settings.features.cache_images = false;
        settings.storage.snapshot_dir = dir.join("snapshots").display().to_string();
        settings
    }

    #[tokio::test]
    async fn test_weekly_run_posts_the_full_report() {
        let dir = tempfile::tempdir().unwrap();
        let slack = weekly_fixture();
        let settings = send_settings(dir.path());

        run_weekly(&slack, &settings).await.unwrap();

        let posted = slack.posted.borrow();
        assert!(posted.iter().all(|p| p.0 == "#emojis"));

        // last week's vote winners with the threaded follow-up
        assert_eq!(
            posted[0].1,
            "Congratulations to the top emojis from last week (sorted by emoji reactions from 5 people):\n\
             1. Real U1 (<@U1>) :e2: 4\n\
             2. Real U1 (<@U1>) :e1: 3\n"
        );
        assert!(posted[1].1.starts_with("More Top Uploaders\n"));
        assert!(posted[1].1.contains("message @owner"));
        assert_eq!(posted[1].2.as_deref(), Some("ts-1"));

        assert_eq!(
            posted[2].1,
            "Here are all the new emojis! There are 2 new emojis from 1 people."
        );
        assert_eq!(posted[3].1, ":e4::e5:");

        // the vote prompt anchors the audit thread
        assert_eq!(posted[4].1, "React here with the best new emojis!");
        assert_eq!(posted[5].1, ":e4: e4\n:e5: e5\n");
        assert_eq!(posted[5].2.as_deref(), Some("ts-5"));
        assert_eq!(posted[6].1, "Thanks to Dana R.");
        assert_eq!(posted[6].2.as_deref(), Some("ts-5"));

        assert_eq!(
            posted[7].1,
            "Top Emoji Uploaders This Week:\n1. Dana R (<@U2>) 2\n"
        );
        assert!(posted[8].1.starts_with("More Top Emoji Uploaders This Week!\n"));
        assert_eq!(posted[8].2.as_deref(), Some("ts-8"));

        // the all-time list stays on the console by default, first
        // timers go out for real
        assert_eq!(
            posted[9].1,
            "1 people uploaded their first emoji this week!\n1. Dana R (<@U2>) 2\n"
        );
        assert_eq!(posted[10].2.as_deref(), Some("ts-10"));
        assert_eq!(posted.len(), 11);
    }

    #[tokio::test]
    async fn test_weekly_run_writes_a_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let slack = weekly_fixture();
        let settings = send_settings(dir.path());

        run_weekly(&slack, &settings).await.unwrap();

        let store = SnapshotStore::new(settings.storage.snapshot_path());
        let written = store.read_back(0).unwrap().unwrap();
        assert_eq!(written.emoji.len(), 5);
    }

    #[tokio::test]
    async fn test_weekly_run_print_mode_posts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let slack = weekly_fixture();
        let mut settings = send_settings(dir.path());
        settings.run_mode = RunMode::Print;

        run_weekly(&slack, &settings).await.unwrap();

        assert!(slack.posted.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_weekly_run_override_skips_history_and_votes() {
        let dir = tempfile::tempdir().unwrap();
        let slack = weekly_fixture();
        let mut settings = send_settings(dir.path());
        settings.markers.last_emoji_override = ":e3:".to_string();

        run_weekly(&slack, &settings).await.unwrap();

        assert_eq!(*slack.history_calls.borrow(), 0);
        let posted = slack.posted.borrow();
        assert!(posted[0].1.starts_with("Here are all the new emojis!"));
    }

    #[tokio::test]
    async fn test_weekly_run_april_fools_renames_winners() {
        let dir = tempfile::tempdir().unwrap();
        let slack = weekly_fixture();
        let mut settings = send_settings(dir.path());
        settings.features.april_fools = true;

        run_weekly(&slack, &settings).await.unwrap();

        let posted = slack.posted.borrow();
        assert!(posted[0].1.contains(":upside_down_face: 4"));
        assert!(posted[0].1.contains(":upside_down_face: 3"));
        assert!(!posted[0].1.contains(":e2:"));
    }

    #[tokio::test]
    async fn test_weekly_run_reports_deleted_emojis_to_reviewers() {
        let dir = tempfile::tempdir().unwrap();
        let slack = weekly_fixture();
        let mut settings = send_settings(dir.path());
        settings.run_mode = RunMode::Review;

        // seed a snapshot from last week that still had an emoji the
        // current catalog lost; the name sorts before this run's file
        let snapshot_dir = settings.storage.snapshot_path();
        std::fs::create_dir_all(&snapshot_dir).unwrap();
        let old = catalog_page(vec![
            emoji("gone-emoji", "U1", "Ana G", 50),
            emoji("e1", "U1", "Ana G", 100),
        ]);
        std::fs::write(
            snapshot_dir.join("0000-last-week.json"),
            serde_json::to_string(&old).unwrap(),
        )
        .unwrap();

        run_weekly(&slack, &settings).await.unwrap();

        let posted = slack.posted.borrow();
        let deleted = posted
            .iter()
            .find(|p| p.1.contains("Deleted Emojis:"))
            .expect("deleted emoji report not posted");
        assert_eq!(deleted.0, "U0OWNER");
        assert!(deleted.1.contains("gone-emoji (@u1) 1970-01-01 00:00:50 UTC"));
    }

    #[tokio::test]
    async fn test_wrapped_run_ranks_votes_across_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![catalog_page(vec![
            emoji("e2", "U1", "Ana G", 200),
            emoji("e1", "U1", "Ana G", 100),
        ])];
        let history = vec![HistoryPage {
            messages: vec![
                message(
                    "1756000300.000000",
                    "React here with the best new emojis!",
                    vec![reaction("e2", &["UA", "UB", "UC"])],
                ),
                message("1756000200.000000", "chatter", vec![]),
                message(
                    "1756000100.000000",
                    "React with the best new emojis!",
                    vec![reaction("e1", &["UA", "UB", "UC"])],
                ),
            ],
            next_cursor: None,
        }];
        let slack = FakeSlack::new(pages, history);
        let settings = send_settings(dir.path());

        run_wrapped(&slack, &settings).await.unwrap();

        let posted = slack.posted.borrow();
        assert_eq!(posted.len(), 2);
        assert!(posted[0].1.starts_with("Congratulations to the top emojis of 2"));
        // equal counts rank by name, both prompts contribute
        assert!(posted[0].1.contains(
            "(sorted by emoji reactions from 3 people):\n\
             1. Real U1 (<@U1>) :e1: 3\n\
             2. Real U1 (<@U1>) :e2: 3\n"
        ));
        assert_eq!(posted[1].2.as_deref(), Some("ts-1"));
    }

    #[tokio::test]
    async fn test_uploader_list_skips_keep_numbering_contiguous() {
        let slack = FakeSlack::new(Vec::new(), Vec::new());
        let dispatcher = Dispatcher::new(
            &slack,
            TokioSleeper,
            RunMode::Send,
            "#emojis".to_string(),
            "U0OWNER".to_string(),
            Vec::new(),
        );
        let mut settings = Settings::default();
        settings.owner.handle = "owner".to_string();
        settings.lists.skip_handles = vec!["ub".to_string()];
        settings.lists.mute_handles = vec!["uc".to_string()];

        let entries = vec![
            counted("UA", "Ana", 9),
            counted("UB", "Bo", 8),
            counted("UC", "Cleo", 7),
        ];
        post_uploader_list(
            &dispatcher,
            &slack,
            &settings,
            "Top:",
            "More!",
            &entries,
            usize::MAX,
            false,
        )
        .await
        .unwrap();

        let posted = slack.posted.borrow();
        assert_eq!(posted[0].1, "Top:\n1. Ana (<@UA>) 9\n2. Cleo (uc) 7\n");
    }

    #[test]
    fn test_mention_forms() {
        let user = UserRecord {
            id: "U1".to_string(),
            name: "ana".to_string(),
            real_name: "Ana".to_string(),
        };

        assert_eq!(mention(&user, RunMode::Send, false, false), "(<@U1>)");
        assert_eq!(mention(&user, RunMode::Test, false, false), "(<@U1>)");
        assert_eq!(mention(&user, RunMode::Print, false, false), "(@ana)");
        assert_eq!(mention(&user, RunMode::Review, false, false), "(@ana)");
        // console-bound lists never use the api markup
        assert_eq!(mention(&user, RunMode::Send, true, false), "(@ana)");
        assert_eq!(mention(&user, RunMode::Send, false, true), "(ana)");
    }

    #[test]
    fn test_thanks_sentence_joins_sorted_names() {
        assert_eq!(thanks_sentence(&[]), "");
        assert_eq!(
            thanks_sentence(&[counted("U1", "Ana", 1)]),
            "Thanks to Ana."
        );
        assert_eq!(
            thanks_sentence(&[counted("U1", "Cleo", 1), counted("U2", "Ana", 2)]),
            "Thanks to Ana, and Cleo."
        );
        assert_eq!(
            thanks_sentence(&[
                counted("U1", "Cleo", 1),
                counted("U2", "Ana", 2),
                counted("U3", "Bo", 3),
            ]),
            "Thanks to Ana, Bo, and Cleo."
        );
    }

    #[test]
    fn test_wrapped_year_rolls_back_in_january() {
        let january = Utc.with_ymd_and_hms(2026, 1, 3, 12, 0, 0).unwrap();
        assert_eq!(wrapped_year(january), 2025);

        let june = Utc.with_ymd_and_hms(2026, 6, 3, 12, 0, 0).unwrap();
        assert_eq!(wrapped_year(june), 2026);
    }

    #[test]
    fn test_deleted_report_lines() {
        let directory = UserDirectory::from_records(vec![UserRecord {
            id: "U1".to_string(),
            name: "ana".to_string(),
            real_name: "Ana".to_string(),
        }]);
        let deleted = vec![emoji("gone", "U1", "Ana", 1_726_000_000)];

        let report = deleted_report(&deleted, &directory).unwrap().unwrap();

        assert!(report.starts_with("\nDeleted Emojis:\n\n"));
        assert!(report.contains("gone (@ana) 2024-09-10 20:26:40 UTC"));
        assert!(report.ends_with("\n\n"));
    }

    #[test]
    fn test_deleted_report_empty_is_none() {
        let directory = UserDirectory::from_records(Vec::new());
        assert!(deleted_report(&[], &directory).unwrap().is_none());
    }

    #[test]
    fn test_deleted_report_unknown_uploader_errors() {
        let directory = UserDirectory::from_records(Vec::new());
        let deleted = vec![emoji("gone", "U9", "Who", 100)];

        let result = deleted_report(&deleted, &directory);

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }
}
