//! Credential quarantine administration.

use super::FeedSyncer;

impl FeedSyncer {
    /// Credentials quarantined today, in quarantine order
    pub async fn list_quarantined_credentials(&self) -> Vec<String> {
        self.ledger.list_today().await
    }

    /// Lift today's quarantine of a credential
    ///
    /// Returns whether the credential was quarantined.
    pub async fn release_credential(&self, credential_id: &str) -> bool {
        let released = self.ledger.release(credential_id).await;
        if released {
            tracing::info!(credential_id, "Credential released from quarantine");
        }
        released
    }

    /// Open today's quarantine list
    ///
    /// Automatic quarantining only records credentials once today's list
    /// exists; until then failed credentials stay selectable. Lists of other
    /// days are dropped.
    pub async fn open_quarantine_day(&self) {
        let today = self.ledger.today();
        self.ledger.open_day(today).await;
        tracing::info!(%today, "Quarantine list opened for today");
    }
}
