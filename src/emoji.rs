use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One custom emoji as returned by the emoji admin list endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Emoji {
    pub name: String,
    #[serde(default)]
    pub is_alias: i64,
    #[serde(default)]
    pub alias_for: String,
    #[serde(default)]
    pub url: String,
    /// Upload time as a Unix timestamp in seconds.
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_display_name: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub pages: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmojiListResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub emoji: Vec<Emoji>,
    #[serde(default)]
    pub custom_emoji_total_count: u64,
    #[serde(default)]
    pub paging: Paging,
}

/// Emoji names are written with and without colons all over Slack
/// messages and settings files. Everything internal works on the bare
/// name.
pub fn strip_colons(name: &str) -> String {
    name.replace(':', "")
}

/// The full catalog with a name index kept in sync with the list.
#[derive(Debug, Clone, Default)]
pub struct EmojiCatalog {
    emojis: Vec<Emoji>,
    index: HashMap<String, usize>,
}

impl EmojiCatalog {
    pub fn new(emojis: Vec<Emoji>) -> Self {
        let mut catalog = Self {
            emojis,
            index: HashMap::new(),
        };
        catalog.rebuild_index();
        catalog
    }

    pub fn emojis(&self) -> &[Emoji] {
        &self.emojis
    }

    pub fn len(&self) -> usize {
        self.emojis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emojis.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Emoji> {
        self.index.get(name).and_then(|i| self.emojis.get(*i))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn sort_by_created_desc(&mut self) {
        self.emojis.sort_by(|a, b| b.created.cmp(&a.created));
        self.rebuild_index();
    }

    pub fn retain(&mut self, keep: impl FnMut(&Emoji) -> bool) {
        self.emojis.retain(keep);
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .emojis
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
    }
}
