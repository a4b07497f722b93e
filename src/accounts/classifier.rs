//! Bookkeeping for failed upstream calls.

use super::QuarantineLedger;
use crate::config::ErrorMarkers;
use crate::error::UpstreamError;
use crate::store::SyncStore;
use crate::types::{Credential, CredentialStatus, Event};
use crate::upstream::UpstreamFailure;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Inspects failed upstream calls and updates credential state accordingly
///
/// Markers are matched as substrings of the failure message:
/// - auth-expired: the credential is set to [`CredentialStatus::Invalid`] in storage
/// - rate-limited: logged only
///
/// Independently of the markers, the credential is appended to today's
/// quarantine list when that list exists. When it does not and the message
/// carries the bad-request marker, the caller is held for the configured penalty.
pub struct ErrorClassifier {
    store: Arc<dyn SyncStore>,
    ledger: Arc<QuarantineLedger>,
    markers: ErrorMarkers,
    bad_request_penalty: Duration,
    event_tx: broadcast::Sender<Event>,
}

impl ErrorClassifier {
    /// Create a classifier writing to `store` and `ledger`
    pub fn new(
        store: Arc<dyn SyncStore>,
        ledger: Arc<QuarantineLedger>,
        markers: ErrorMarkers,
        bad_request_penalty: Duration,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            store,
            ledger,
            markers,
            bad_request_penalty,
            event_tx,
        }
    }

    /// Record a failed call made with `credential`
    ///
    /// Never fails; storage errors during bookkeeping are logged. Returns the
    /// failure as a typed [`UpstreamError`] for the caller to surface.
    pub async fn classify(&self, credential: &Credential, failure: &UpstreamFailure) -> UpstreamError {
        let message = failure.message.as_str();
        let credential_id = credential.id.as_str();

        let auth_expired = carries(message, &self.markers.auth_expired);
        let rate_limited = carries(message, &self.markers.rate_limited);
        let bad_request = carries(message, &self.markers.bad_request);

        if auth_expired {
            match self
                .store
                .set_credential_status(credential_id, CredentialStatus::Invalid)
                .await
            {
                Ok(()) => {
                    tracing::error!(
                        credential_id,
                        credential_name = %credential.name,
                        error = %failure,
                        "Credential expired, disabled"
                    );
                    self.event_tx
                        .send(Event::CredentialDisabled {
                            credential_id: credential_id.to_string(),
                        })
                        .ok();
                }
                Err(e) => {
                    tracing::warn!(credential_id, error = %e, "Failed to disable expired credential");
                }
            }
        }

        if rate_limited {
            tracing::warn!(
                credential_id,
                credential_name = %credential.name,
                error = %failure,
                "Credential rate limited"
            );
        }

        let today = self.ledger.today();
        if self.ledger.quarantine(today, credential_id).await {
            tracing::info!(credential_id, %today, "Credential quarantined for today");
            self.event_tx
                .send(Event::CredentialQuarantined {
                    credential_id: credential_id.to_string(),
                })
                .ok();
        } else if bad_request {
            tracing::warn!(
                credential_id,
                penalty_secs = self.bad_request_penalty.as_secs(),
                error = %failure,
                "Upstream rejected request, waiting before retry"
            );
            tokio::time::sleep(self.bad_request_penalty).await;
        }

        if !(auth_expired || rate_limited || bad_request) {
            tracing::warn!(credential_id, error = %failure, "Unhandled upstream failure");
        }

        let credential_id = credential_id.to_string();
        let message = failure.message.clone();
        if auth_expired {
            UpstreamError::CredentialExpired {
                credential_id,
                message,
            }
        } else if rate_limited {
            UpstreamError::RateLimited {
                credential_id,
                message,
            }
        } else if bad_request {
            UpstreamError::BadRequest {
                credential_id,
                message,
            }
        } else {
            UpstreamError::Rejected {
                credential_id,
                status: failure.status,
                message,
            }
        }
    }
}

/// Whether `message` contains `marker`; an empty marker never matches
fn carries(message: &str, marker: &str) -> bool {
    !marker.is_empty() && message.contains(marker)
}
