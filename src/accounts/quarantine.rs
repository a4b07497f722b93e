//! Day-keyed credential quarantine.

use crate::config::QuarantineConfig;
use crate::error::{Error, Result};
use chrono::{FixedOffset, NaiveDate, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-memory set of credentials barred from use for the rest of a day
///
/// Days are calendar dates in a fixed reference zone. A day's list only comes
/// into existence through [`open_day`](Self::open_day); [`quarantine`](Self::quarantine)
/// never creates one, so quarantining before the day is opened is a no-op.
/// Nothing is persisted: a restart clears every quarantine.
#[derive(Debug)]
pub struct QuarantineLedger {
    days: RwLock<BTreeMap<NaiveDate, Vec<String>>>,
    zone: FixedOffset,
}

impl QuarantineLedger {
    /// Create an empty ledger for the configured reference zone
    pub fn new(config: &QuarantineConfig) -> Result<Self> {
        let zone = FixedOffset::east_opt(config.utc_offset_hours * 3600).ok_or_else(|| {
            Error::Config {
                message: format!("invalid UTC offset: {} hours", config.utc_offset_hours),
                key: Some("quarantine.utc_offset_hours".to_string()),
            }
        })?;

        Ok(Self {
            days: RwLock::new(BTreeMap::new()),
            zone,
        })
    }

    /// Current calendar day in the reference zone
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.zone).date_naive()
    }

    /// Create the list for `day` if missing, dropping every other day
    pub async fn open_day(&self, day: NaiveDate) {
        let mut days = self.days.write().await;
        days.retain(|d, _| *d == day);
        days.entry(day).or_default();
        tracing::debug!(%day, "Quarantine day opened");
    }

    /// Append a credential to `day`'s list
    ///
    /// Returns `false` (and records nothing) when no list exists for that day.
    pub async fn quarantine(&self, day: NaiveDate, credential_id: &str) -> bool {
        let mut days = self.days.write().await;
        match days.get_mut(&day) {
            Some(list) => {
                if !list.iter().any(|id| id == credential_id) {
                    list.push(credential_id.to_string());
                }
                true
            }
            None => false,
        }
    }

    /// Remove a credential from today's list, returning whether it was present
    pub async fn release(&self, credential_id: &str) -> bool {
        let today = self.today();
        let mut days = self.days.write().await;
        let Some(list) = days.get_mut(&today) else {
            return false;
        };

        let before = list.len();
        list.retain(|id| id != credential_id);
        list.len() != before
    }

    /// Today's quarantined credential IDs, in quarantine order
    pub async fn list_today(&self) -> Vec<String> {
        let today = self.today();
        self.list_day(today).await.unwrap_or_default()
    }

    /// The list for `day`, if one was opened
    pub async fn list_day(&self, day: NaiveDate) -> Option<Vec<String>> {
        let days = self.days.read().await;
        days.get(&day).map(|list| {
            list.iter()
                .filter(|id| !id.is_empty())
                .cloned()
                .collect()
        })
    }

    /// Whether a credential is quarantined today
    pub async fn is_quarantined(&self, credential_id: &str) -> bool {
        let today = self.today();
        let days = self.days.read().await;
        days.get(&today)
            .is_some_and(|list| list.iter().any(|id| id == credential_id))
    }
}
