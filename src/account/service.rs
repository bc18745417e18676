use std::sync::Arc;

use crate::account::{AccountAge, AccountError, AccountRepository, Result};
use crate::clock::Clock;

/// Computes the platform age of accounts.
#[derive(Clone)]
pub struct AccountAgeService {
    repo: AccountRepository,
    clock: Arc<dyn Clock>,
}

impl AccountAgeService {
    /// Create a new [`AccountAgeService`].
    pub fn new(repo: AccountRepository, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Get how many whole days an account has existed.
    ///
    /// `name` must already be validated. A creation date in the future
    /// yields zero days.
    #[tracing::instrument(skip(self))]
    pub async fn get_account_age(&self, name: &str) -> Result<AccountAge> {
        let account = match self.repo.find_by_display_name(name).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                record("not_found");
                return Err(AccountError::UserNotFound {
                    name: name.to_owned(),
                });
            },
            Err(err) => {
                record("error");
                return Err(err.into());
            },
        };

        let now = self.clock.now();
        let days = (now - account.created_at).num_days().max(0) as u64;

        record("found");
        Ok(AccountAge {
            name: account.display_name,
            created_at: account.created_at,
            days_since_creation: days,
        })
    }
}

fn record(outcome: &'static str) {
    metrics::counter!("platform_age_lookups_total", "outcome" => outcome)
        .increment(1);
}
