use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

pub const SETTINGS_FILE: &str = "emoji-bot.toml";

/// Where report messages end up. `Print` is the safe default, `Send`
/// posts to the configured channel for real.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Print every message to the console
    #[default]
    Print,
    /// DM review copies to the reviewers and the owner
    Review,
    /// DM channel-bound messages to the owner
    Test,
    /// Post to the configured channel
    Send,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, rename = "run-mode")]
    pub run_mode: RunMode,
    /// User ids that receive review copies in addition to the owner.
    #[serde(default)]
    pub reviewers: Vec<String>,
    #[serde(default)]
    pub channel: ChannelSettings,
    #[serde(default)]
    pub owner: OwnerSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub features: FeatureSettings,
    #[serde(default)]
    pub lists: ListSettings,
    #[serde(default)]
    pub markers: MarkerSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub memes: MemeSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSettings {
    /// Channel that receives the report, with or without the leading '#'.
    #[serde(default = "default_channel_name")]
    pub name: String,
    /// Known channel id. Setting it skips the conversations.list lookup.
    #[serde(default)]
    pub id: String,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            name: default_channel_name(),
            id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OwnerSettings {
    /// User id that receives test DMs and review copies.
    #[serde(default, rename = "user-id")]
    pub user_id: String,
    /// Workspace handle shown in the mute and skip footers.
    #[serde(default)]
    pub handle: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL for the emoji admin endpoint. Workspaces that proxy the
    /// admin API through their own subdomain set it here.
    #[serde(default = "default_admin_base_url", rename = "admin-base-url")]
    pub admin_base_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            admin_base_url: default_admin_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSettings {
    #[serde(default = "default_true", rename = "cache-images")]
    pub cache_images: bool,
    #[serde(default = "default_true", rename = "cache-snapshots")]
    pub cache_snapshots: bool,
    /// Collapse names that differ only by case, '-' and '_', keeping the
    /// newest upload.
    #[serde(default, rename = "strict-unique")]
    pub strict_unique: bool,
    #[serde(default = "default_true", rename = "screenshot-filter")]
    pub screenshot_filter: bool,
    /// Drop bulk-upload duplicates like "party-2" and "party-3".
    #[serde(default, rename = "bulk-duplicate-filter")]
    pub bulk_duplicate_filter: bool,
    #[serde(default, rename = "april-fools")]
    pub april_fools: bool,
    /// Emoji shown in place of every vote winner while april-fools is on.
    #[serde(default = "default_april_fools_emoji", rename = "april-fools-emoji")]
    pub april_fools_emoji: String,
    /// Post the all-time uploader list instead of only printing it.
    #[serde(default, rename = "send-top-uploaders-all-time")]
    pub send_top_uploaders_all_time: bool,
    /// Fetch smaller catalog pages and stop at the last announced emoji.
    #[serde(default, rename = "fast-fetch")]
    pub fast_fetch: bool,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            cache_images: true,
            cache_snapshots: true,
            strict_unique: false,
            screenshot_filter: true,
            bulk_duplicate_filter: false,
            april_fools: false,
            april_fools_emoji: default_april_fools_emoji(),
            send_top_uploaders_all_time: false,
            fast_fetch: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSettings {
    /// Emoji names never mentioned in reports, with or without colons.
    #[serde(default, rename = "skip-emojis")]
    pub skip_emojis: Vec<String>,
    /// Handles listed without an @ so they are not pinged.
    #[serde(default, rename = "mute-handles")]
    pub mute_handles: Vec<String>,
    /// Handles left out of uploader lists entirely.
    #[serde(default, rename = "skip-handles")]
    pub skip_handles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerSettings {
    /// When set, skips the channel history walk and treats this name as
    /// the last announced emoji.
    #[serde(default, rename = "last-emoji-override")]
    pub last_emoji_override: String,
    /// Text of the weekly vote message. It is posted at the end of each
    /// run and looked up again the following week.
    #[serde(default = "default_vote_prompt", rename = "vote-prompt")]
    pub vote_prompt: String,
    /// Older wording of the vote message, still matched during lookup.
    #[serde(default = "default_vote_prompt_previous", rename = "vote-prompt-previous")]
    pub vote_prompt_previous: String,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            last_emoji_override: String::new(),
            vote_prompt: default_vote_prompt(),
            vote_prompt_previous: default_vote_prompt_previous(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_snapshot_dir", rename = "snapshot-dir")]
    pub snapshot_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
        }
    }
}

impl StorageSettings {
    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.snapshot_dir)
    }

    pub fn images_path(&self) -> PathBuf {
        Path::new(&self.snapshot_dir).join("images")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemeSettings {
    /// Emoji that fronts the meme sentence when no group had uploads.
    #[serde(default = "default_sad_lead", rename = "sad-lead")]
    pub sad_lead: String,
    #[serde(default)]
    pub groups: Vec<MemeGroup>,
}

impl Default for MemeSettings {
    fn default() -> Self {
        Self {
            sad_lead: default_sad_lead(),
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemeGroup {
    /// Display name used in the meme sentence.
    pub label: String,
    /// Name substrings that count an upload toward this group.
    #[serde(default)]
    pub substrings: Vec<String>,
    /// Emoji that fronts the sentence when this group has the most uploads.
    #[serde(default, rename = "lead-emoji")]
    pub lead_emoji: String,
    /// Emoji name shown when the group had no uploads this week.
    #[serde(default)]
    pub fallback: String,
}

fn default_true() -> bool {
    true
}

fn default_channel_name() -> String {
    "#emojis".to_string()
}

fn default_admin_base_url() -> String {
    "https://slack.com/api".to_string()
}

fn default_april_fools_emoji() -> String {
    "upside_down_face".to_string()
}

fn default_vote_prompt() -> String {
    "React here with the best new emojis!".to_string()
}

fn default_vote_prompt_previous() -> String {
    "React with the best new emojis!".to_string()
}

fn default_snapshot_dir() -> String {
    "emoji-snapshots".to_string()
}

fn default_sad_lead() -> String {
    "disappointed".to_string()
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| AppError::ReadFile {
            path: path.display().to_string(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| AppError::TomlParse(e.to_string()))
    }
}
