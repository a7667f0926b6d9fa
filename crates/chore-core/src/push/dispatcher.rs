use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::{DispatchReport, ErrorDetail, HttpPushTransport, PushConfig, PushPayload, PushTransport};
use crate::error::CoreError;
use crate::repository::SubscriptionRepository;

/// Fans a payload out to every registered device of a member.
///
/// A missing transport is the deliberate "unconfigured" mode: dispatches
/// succeed with `configured: false` and attempt nothing.
pub struct PushDispatcher {
    store: Arc<dyn SubscriptionRepository>,
    transport: Option<Arc<dyn PushTransport>>,
    /// Upper bound for one delivery attempt
    attempt_timeout: Duration,
}

impl PushDispatcher {
    pub fn new(
        store: Arc<dyn SubscriptionRepository>,
        transport: Option<Arc<dyn PushTransport>>,
        attempt_timeout: Duration,
    ) -> Self {
        Self { store, transport, attempt_timeout }
    }

    /// Uses [`HttpPushTransport`] when credentials are configured and the
    /// no-op mode otherwise.
    pub fn from_config(
        store: Arc<dyn SubscriptionRepository>,
        config: &PushConfig,
    ) -> Result<Self, CoreError> {
        let transport: Option<Arc<dyn PushTransport>> = if config.is_configured() {
            Some(Arc::new(HttpPushTransport::new(config)?))
        } else {
            None
        };
        // Leave headroom over the client's own timeout so it reports first
        let attempt_timeout = Duration::from_secs(config.timeout_secs.max(1) + 1);
        Ok(Self::new(store, transport, attempt_timeout))
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Delivers `payload` to every subscription of `member_id`.
    ///
    /// # Returns
    /// * `Ok(DispatchReport)` - Counts of sent/failed/pruned deliveries
    /// * `Err(CoreError)` - Only when the member's subscriptions cannot be read
    ///
    /// # Behavior
    /// - Each subscription is attempted independently, bounded by the attempt timeout
    /// - Gone subscriptions are deleted and not counted as failures
    /// - Other failures are counted and reported; the subscription is kept
    pub async fn dispatch(
        &self,
        member_id: Uuid,
        payload: &PushPayload,
    ) -> Result<DispatchReport, CoreError> {
        let Some(transport) = &self.transport else {
            debug!(%member_id, "push not configured, skipping dispatch");
            return Ok(DispatchReport::unconfigured());
        };

        let subscriptions = self.store.find_subscriptions_for_member(member_id).await?;
        let mut report = DispatchReport::configured();

        for subscription in subscriptions {
            let attempt = tokio::time::timeout(self.attempt_timeout, transport.send(&subscription, payload)).await;
            match attempt {
                Ok(Ok(())) => report.sent += 1,
                Ok(Err(e)) if e.is_permanent() => {
                    match self.store.delete_subscription(subscription.id).await {
                        Ok(_) => {
                            warn!(%member_id, subscription_id = %subscription.id, "pruned dead push subscription: {e}");
                            report.pruned += 1;
                        }
                        Err(store_error) => {
                            error!(subscription_id = %subscription.id, "cannot prune push subscription: {store_error}");
                            report.record_failure(ErrorDetail::new("store", store_error.to_string()));
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!(%member_id, subscription_id = %subscription.id, "push delivery failed: {e}");
                    report.record_failure(e.detail());
                }
                Err(_) => {
                    warn!(%member_id, subscription_id = %subscription.id, "push delivery stalled past {:?}", self.attempt_timeout);
                    report.record_failure(ErrorDetail::new("timeout", "delivery timed out"));
                }
            }
        }

        Ok(report)
    }

    /// Dispatches to a de-duplicated set of members, skipping `exclude`
    /// (typically the member who triggered the notification).
    ///
    /// A member whose subscriptions cannot be read counts as one failure.
    pub async fn dispatch_many(
        &self,
        member_ids: &[Uuid],
        payload: &PushPayload,
        exclude: Option<Uuid>,
    ) -> DispatchReport {
        if !self.is_configured() {
            return DispatchReport::unconfigured();
        }

        let mut seen = HashSet::with_capacity(member_ids.len());
        let mut total = DispatchReport::configured();

        for &member_id in member_ids {
            if Some(member_id) == exclude || !seen.insert(member_id) {
                continue;
            }
            match self.dispatch(member_id, payload).await {
                Ok(report) => total.absorb(report),
                Err(e) => {
                    error!(%member_id, "dispatch failed: {e}");
                    total.record_failure(ErrorDetail::new("store", e.to_string()));
                }
            }
        }

        total
    }
}
