//! Credential selection, daily quarantine and failure classification
//!
//! - [`AccountPool`] draws a usable credential for each upstream call
//! - [`QuarantineLedger`] tracks credentials barred for the current day
//! - [`ErrorClassifier`] updates both after a failed call

mod classifier;
mod quarantine;

pub use classifier::ErrorClassifier;
pub use quarantine::QuarantineLedger;

use crate::error::{Error, Result};
use crate::store::{CredentialFilter, SyncStore};
use crate::types::{Credential, CredentialStatus};
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Picks credentials for upstream calls
///
/// Every selection is an independent uniform draw among the enabled credentials
/// not quarantined today, so load spreads across the pool instead of pinning
/// to one account.
pub struct AccountPool {
    store: Arc<dyn SyncStore>,
    ledger: Arc<QuarantineLedger>,
    candidate_limit: usize,
}

impl AccountPool {
    /// Create a pool reading credentials from `store`
    pub fn new(store: Arc<dyn SyncStore>, ledger: Arc<QuarantineLedger>, candidate_limit: usize) -> Self {
        Self {
            store,
            ledger,
            candidate_limit,
        }
    }

    /// Select one enabled, unquarantined credential at random
    ///
    /// # Errors
    /// [`Error::NoAvailableCredential`] when no candidate is left; storage errors otherwise.
    pub async fn select_account(&self) -> Result<Credential> {
        let filter = CredentialFilter {
            status: CredentialStatus::Enabled,
            exclude_ids: self.ledger.list_today().await,
            limit: self.candidate_limit,
        };

        let candidates = self.store.get_credentials(&filter).await?;
        let credential = candidates
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(Error::NoAvailableCredential)?;

        tracing::debug!(
            credential_id = %credential.id,
            candidates = candidates.len(),
            "Credential selected"
        );
        Ok(credential)
    }

    /// The quarantine ledger consulted by this pool
    pub fn ledger(&self) -> &Arc<QuarantineLedger> {
        &self.ledger
    }
}
