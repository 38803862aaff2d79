use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::emoji::{strip_colons, EmojiCatalog};
use crate::history::ChannelMessage;

/// The channel gets announcements in batches so one deleted message does
/// not take a whole week's emojis with it.
pub const MAX_EMOJIS_PER_MESSAGE: usize = 22;
/// Slack rejects very long messages, so list-style output splits here.
pub const MAX_CHARACTERS_PER_MESSAGE: usize = 10_000;
pub const MAX_TOP_UPLOADERS: usize = 100;
pub const MAX_LONGEST_NAMES: usize = 100;
pub const WEEKLY_VOTE_ENTRIES: usize = 10;
pub const WRAPPED_VOTE_ENTRIES: usize = 100;
pub const MIN_VOTES_TO_WIN: usize = 3;

/// One (key, display name, count) tally row. Upload tallies and reaction
/// tallies rank the same way: highest count first, names breaking ties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counted {
    pub key: String,
    pub name: String,
    pub count: usize,
}

pub fn sort_counted(entries: &mut [Counted]) {
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
}

/// This week's additions: names newest first plus per-uploader counts.
#[derive(Debug, Clone, Default)]
pub struct NewEmojis {
    pub names: Vec<String>,
    pub uploaders: Vec<Counted>,
}

/// Walk the catalog, which must be sorted by creation descending, until
/// the marker emoji from last week's run turns up. Everything before it
/// is new. A missing marker usually means the announcement message was
/// edited or deleted; the whole catalog counts as new then.
pub fn newest_since(catalog: &EmojiCatalog, last_announced: &str) -> NewEmojis {
    let marker = strip_colons(last_announced);
    let mut names = Vec::new();
    let mut counts: HashMap<String, Counted> = HashMap::new();
    let mut found_marker = false;

    for emoji in catalog.emojis() {
        if emoji.name == marker {
            found_marker = true;
            break;
        }
        counts
            .entry(emoji.user_id.clone())
            .and_modify(|entry| entry.count += 1)
            .or_insert_with(|| Counted {
                key: emoji.user_id.clone(),
                name: emoji.user_display_name.clone(),
                count: 1,
            });
        names.push(emoji.name.clone());
    }
    if !found_marker {
        warn!(
            marker = %marker,
            "last announced emoji not found in the catalog, treating everything as new"
        );
    }

    NewEmojis {
        names,
        uploaders: counts.into_values().collect(),
    }
}

/// Announcement batches, oldest first so the channel reads in upload
/// order. Batches are capped on both item count and character length.
pub fn display_batches(names: &[String]) -> Vec<String> {
    let mut batches: Vec<String> = Vec::new();
    let mut items_in_batch = 0;
    for name in names.iter().rev() {
        let part = format!(":{}:", name);
        match batches.last_mut() {
            Some(batch)
                if items_in_batch < MAX_EMOJIS_PER_MESSAGE
                    && batch.len() + part.len() <= MAX_CHARACTERS_PER_MESSAGE =>
            {
                batch.push_str(&part);
                items_in_batch += 1;
            }
            _ => {
                batches.push(part);
                items_in_batch = 1;
            }
        }
    }
    batches
}

/// The side-by-side review listing, one ":name: name" line per emoji,
/// oldest first, split into message-sized parts.
pub fn audit_batches(names: &[String]) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    for name in names.iter().rev() {
        let line = format!(":{}: {}\n", name, name);
        match parts.last_mut() {
            Some(part) if part.len() + line.len() <= MAX_CHARACTERS_PER_MESSAGE => {
                part.push_str(&line)
            }
            _ => parts.push(line),
        }
    }
    parts
}

/// Upload counts per user across the whole catalog, ranked.
pub fn tally_uploads(catalog: &EmojiCatalog) -> Vec<Counted> {
    let mut counts: HashMap<String, Counted> = HashMap::new();
    for emoji in catalog.emojis() {
        counts
            .entry(emoji.user_id.clone())
            .and_modify(|entry| entry.count += 1)
            .or_insert_with(|| Counted {
                key: emoji.user_id.clone(),
                name: emoji.user_display_name.clone(),
                count: 1,
            });
    }
    let mut entries: Vec<Counted> = counts.into_values().collect();
    sort_counted(&mut entries);
    entries
}

/// Uploaders whose all-time count equals their count this week: every
/// emoji they ever uploaded arrived in this batch.
pub fn first_time_uploaders(this_week: &[Counted], all_time: &[Counted]) -> Vec<Counted> {
    let totals: HashMap<&str, usize> = all_time
        .iter()
        .map(|entry| (entry.key.as_str(), entry.count))
        .collect();
    let mut first_timers: Vec<Counted> = this_week
        .iter()
        .filter(|entry| {
            totals
                .get(entry.key.as_str())
                .is_none_or(|total| *total == entry.count)
        })
        .cloned()
        .collect();
    sort_counted(&mut first_timers);
    first_timers
}

pub fn longest_names(catalog: &EmojiCatalog, limit: usize) -> Vec<String> {
    let mut names: Vec<&str> = catalog
        .emojis()
        .iter()
        .map(|emoji| emoji.name.as_str())
        .collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    names.into_iter().take(limit).map(str::to_string).collect()
}

/// One emoji that won the reaction vote, with its original uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteWinner {
    pub emoji: String,
    pub uploader_id: String,
    pub votes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct VoteOutcome {
    pub winners: Vec<VoteWinner>,
    /// Distinct users who reacted at all, winners or not.
    pub voters: usize,
}

/// Rank the reactions on the vote prompt messages. The cutoff keeps
/// whole tie groups: entries past `max_entries` still win while they
/// share a count with a ranked one, and nothing below the minimum vote
/// count wins at all. A reaction that is not a custom emoji in the
/// catalog (a built-in, or one deleted mid-week) cannot win.
pub fn vote_leaders(
    messages: &[ChannelMessage],
    catalog: &EmojiCatalog,
    max_entries: usize,
) -> VoteOutcome {
    let mut entries: Vec<Counted> = Vec::new();
    let mut voters: HashSet<&str> = HashSet::new();
    for message in messages {
        for reaction in &message.reactions {
            entries.push(Counted {
                key: reaction.name.clone(),
                name: reaction.name.clone(),
                count: reaction.count,
            });
            for user in &reaction.users {
                voters.insert(user.as_str());
            }
        }
    }
    sort_counted(&mut entries);

    let mut winners = Vec::new();
    let mut previous_count = usize::MAX;
    for entry in entries {
        if entry.count != previous_count && winners.len() >= max_entries {
            break;
        }
        if entry.count < MIN_VOTES_TO_WIN {
            break;
        }
        let Some(emoji) = catalog.get(&entry.key) else {
            warn!(name = %entry.key, "vote for an emoji that is not in the catalog, skipping");
            continue;
        };
        winners.push(VoteWinner {
            emoji: entry.key,
            uploader_id: emoji.user_id.clone(),
            votes: entry.count,
        });
        previous_count = entry.count;
    }

    VoteOutcome {
        winners,
        voters: voters.len(),
    }
}
