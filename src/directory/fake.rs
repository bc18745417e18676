//! In-memory directory for local development and tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use super::{DirectoryClient, DirectoryUser, Result};

/// Directory backed by a fixed list of accounts.
#[derive(Debug, Clone)]
pub struct FakeDirectory {
    users: Vec<DirectoryUser>,
}

impl FakeDirectory {
    /// Create an empty [`FakeDirectory`].
    pub fn empty() -> Self {
        Self { users: Vec::new() }
    }

    /// Add an account to the directory.
    pub fn with_user(
        mut self,
        id: &str,
        display_name: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        self.users.push(DirectoryUser {
            id: id.to_owned(),
            login: display_name.to_lowercase(),
            display_name: display_name.to_owned(),
            created_at,
        });
        self
    }
}

impl Default for FakeDirectory {
    fn default() -> Self {
        let date = |y, m, d| {
            Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
                .single()
                .unwrap_or_default()
        };

        Self::empty()
            .with_user("19571641", "Ninja", date(2011, 11, 20))
            .with_user("37402112", "shroud", date(2012, 11, 3))
            .with_user("44445592", "pokimane", date(2013, 6, 14))
            .with_user("71092938", "xQc", date(2014, 9, 12))
    }
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    async fn lookup(&self, login: &str) -> Result<Option<DirectoryUser>> {
        let login = login.to_lowercase();
        Ok(self.users.iter().find(|u| u.login == login).cloned())
    }
}
