use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::error::{AppError, Result};

/// The users.info endpoint caps comma-joined lookups well below its
/// documented limit, 30 per request stays reliably under it.
pub const USERS_PER_BATCH: usize = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub id: String,
    /// Workspace handle, the part after the @ in mentions.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub real_name: String,
}

pub trait UserInfoSource {
    async fn users_info(&self, ids: &[String]) -> Result<Vec<UserRecord>>;
}

/// User records fetched for one report section, keyed by user id.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<String, UserRecord>,
}

impl UserDirectory {
    pub async fn fetch(
        source: &impl UserInfoSource,
        ids: impl IntoIterator<Item = String>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        let unique: Vec<String> = ids
            .into_iter()
            .filter(|id| !id.is_empty() && seen.insert(id.clone()))
            .collect();

        let mut users = HashMap::new();
        for batch in unique.chunks(USERS_PER_BATCH) {
            for user in source.users_info(batch).await? {
                users.insert(user.id.clone(), user);
            }
        }
        Ok(Self { users })
    }

    pub fn from_records(records: Vec<UserRecord>) -> Self {
        Self {
            users: records.into_iter().map(|u| (u.id.clone(), u)).collect(),
        }
    }

    /// A listed uploader without a user record means the report would
    /// misattribute someone, so resolution failures are hard errors.
    pub fn resolve(&self, id: &str) -> Result<&UserRecord> {
        self.users
            .get(id)
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
