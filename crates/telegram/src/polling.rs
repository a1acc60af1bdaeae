use std::future::Future;
use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiError, BotApi};
use crate::events::EventPipeline;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollingError {
    #[error("bot token rejected by telegram: {0}")]
    Unauthorized(ApiError),
    #[error("polling gave up after {attempts} consecutive failures: {last}")]
    RetriesExhausted { attempts: u32, last: ApiError },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 20, base_delay_ms: 500, max_delay_ms: 30_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Long-polls `getUpdates` and feeds every update through the pipeline, one
/// at a time, in arrival order.
pub struct PollingRunner {
    api: Arc<dyn BotApi>,
    pipeline: Arc<EventPipeline>,
    reconnect_policy: ReconnectPolicy,
    poll_timeout_secs: u64,
    drop_pending_updates: bool,
}

impl PollingRunner {
    pub fn new(
        api: Arc<dyn BotApi>,
        pipeline: Arc<EventPipeline>,
        reconnect_policy: ReconnectPolicy,
        poll_timeout_secs: u64,
        drop_pending_updates: bool,
    ) -> Self {
        Self { api, pipeline, reconnect_policy, poll_timeout_secs, drop_pending_updates }
    }

    pub async fn start(&self) -> Result<(), PollingError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Polls until `shutdown` resolves. An update already being processed
    /// finishes first.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), PollingError>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        let mut offset = None;
        let mut failures = 0_u32;
        if self.drop_pending_updates {
            tokio::select! {
                biased;
                () = &mut shutdown => return Ok(()),
                skipped = self.drop_pending_updates() => match skipped {
                    Ok(next) => offset = next,
                    Err(error) => self.record_failure(&mut failures, error)?,
                },
            }
        }

        info!(
            event_name = "ingress.telegram.polling_started",
            poll_timeout_secs = self.poll_timeout_secs,
            "telegram long polling started"
        );

        loop {
            let polled = tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!(event_name = "ingress.telegram.polling_stopped", "telegram long polling stopped");
                    return Ok(());
                }
                polled = self.fetch(offset) => polled,
            };

            match polled {
                Ok(updates) => {
                    failures = 0;
                    for update in updates {
                        offset = Some(update.update_id + 1);
                        if let Err(error) = self.pipeline.process(&update).await {
                            warn!(
                                correlation_id = %format!("upd-{}", update.update_id),
                                error = %error,
                                "update processing failed; continuing poll loop"
                            );
                        }
                    }
                }
                Err(error) => {
                    let attempt = failures;
                    self.record_failure(&mut failures, error)?;
                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::select! {
                            biased;
                            () = &mut shutdown => return Ok(()),
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }
    }

    /// Confirms everything queued before startup and returns the offset to
    /// resume from.
    pub async fn drop_pending_updates(&self) -> Result<Option<i64>, ApiError> {
        let latest = self.api.get_updates(Some(-1), 0).await?;
        let Some(last) = latest.last() else {
            debug!("no pending telegram updates to drop");
            return Ok(None);
        };
        let next = last.update_id + 1;
        self.api.get_updates(Some(next), 0).await?;
        info!(
            event_name = "ingress.telegram.pending_dropped",
            next_offset = next,
            "dropped pending telegram updates"
        );
        Ok(Some(next))
    }

    /// One `getUpdates` round trip, processing whatever arrives.
    pub async fn poll_once(&self, offset: &mut Option<i64>) -> Result<usize, ApiError> {
        let updates = self.fetch(*offset).await?;
        let count = updates.len();
        for update in updates {
            *offset = Some(update.update_id + 1);
            if let Err(error) = self.pipeline.process(&update).await {
                warn!(
                    correlation_id = %format!("upd-{}", update.update_id),
                    error = %error,
                    "update processing failed"
                );
            }
        }
        Ok(count)
    }

    async fn fetch(&self, offset: Option<i64>) -> Result<Vec<crate::api::Update>, ApiError> {
        let updates = self.api.get_updates(offset, self.poll_timeout_secs).await?;
        if !updates.is_empty() {
            debug!(count = updates.len(), offset = ?offset, "fetched telegram updates");
        }
        Ok(updates)
    }

    fn record_failure(&self, failures: &mut u32, error: ApiError) -> Result<(), PollingError> {
        if matches!(error, ApiError::Unauthorized(_)) {
            warn!(error = %error, "telegram rejected bot token; stopping");
            return Err(PollingError::Unauthorized(error));
        }

        *failures += 1;
        warn!(
            attempt = *failures,
            max_retries = self.reconnect_policy.max_retries,
            error = %error,
            "telegram polling failed"
        );
        if *failures > self.reconnect_policy.max_retries {
            return Err(PollingError::RetriesExhausted { attempts: *failures, last: error });
        }
        Ok(())
    }
}
