//! Handle directory requests.

use std::sync::Arc;

use crate::account::Account;
use crate::directory::{DirectoryClient, Result};

#[derive(Clone)]
pub struct AccountRepository {
    directory: Arc<dyn DirectoryClient>,
}

impl AccountRepository {
    /// Create a new [`AccountRepository`].
    pub fn new(directory: Arc<dyn DirectoryClient>) -> Self {
        Self { directory }
    }

    /// Find an [`Account`] using its display name.
    ///
    /// Absence is `Ok(None)`; only transport or upstream faults are errors.
    pub async fn find_by_display_name(
        &self,
        name: &str,
    ) -> Result<Option<Account>> {
        let user = self.directory.lookup(name).await?;

        Ok(user.map(|user| Account {
            display_name: user.display_name,
            created_at: user.created_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::directory::FakeDirectory;

    #[tokio::test]
    async fn test_find_by_display_name() {
        let created_at = Utc.with_ymd_and_hms(2015, 3, 4, 12, 30, 0).unwrap();
        let directory =
            FakeDirectory::empty().with_user("1", "Streamer", created_at);
        let repo = AccountRepository::new(Arc::new(directory));

        let account = repo.find_by_display_name("streamer").await.unwrap();
        assert_eq!(
            account,
            Some(Account {
                display_name: "Streamer".into(),
                created_at,
            })
        );

        assert_eq!(repo.find_by_display_name("other").await.unwrap(), None);
    }
}
