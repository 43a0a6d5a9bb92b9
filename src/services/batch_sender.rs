use crate::config::DripConfig;
use crate::error::Result;
use crate::models::campaign::{Campaign, Wave};
use crate::models::recruiter::Recruiter;
use crate::services::email_dispatcher::{EmailDispatcher, TemplateParams};
use crate::services::plan_catalog::PlanCatalog;
use crate::services::recruiter_directory::{RecruiterDirectory, RecruiterFilter};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Counts from one batch of one wave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTally {
    pub sent: i32,
    pub failed: i32,
    pub duplicates: i32,
    /// Successful sends for the wave including this batch.
    pub cumulative: i32,
    /// Failed sends for the wave including this batch.
    pub failed_total: i32,
    /// Directory offset for the next batch.
    pub cursor: i32,
    pub wave_complete: bool,
    /// The directory returned fewer recipients than the batch needed.
    pub exhausted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Today's batch for this wave was already sent.
    QuotaUsed,
    /// Nothing left to send for this wave.
    AlreadyComplete,
    Sent(BatchTally),
}

#[derive(Clone)]
pub struct BatchSender {
    plans: PlanCatalog,
    templates: [i64; 3],
    dedup_buffer: i64,
    send_timeout: Duration,
    directory: Arc<dyn RecruiterDirectory>,
    dispatcher: Arc<dyn EmailDispatcher>,
}

impl BatchSender {
    pub fn new(
        config: &DripConfig,
        directory: Arc<dyn RecruiterDirectory>,
        dispatcher: Arc<dyn EmailDispatcher>,
    ) -> Self {
        Self {
            plans: config.plans.clone(),
            templates: config.templates,
            dedup_buffer: config.dedup_buffer.max(0),
            send_timeout: config.send_timeout,
            directory,
            dispatcher,
        }
    }

    pub fn template_for(&self, wave: Wave) -> i64 {
        self.templates[wave.number() as usize - 1]
    }

    /// Sends the next batch of `wave` for `campaign`. The caller has already
    /// checked the quota gate and the send window.
    ///
    /// A directory error aborts before any email goes out. Dispatcher errors
    /// and timeouts are counted per recipient and never abort the batch.
    pub async fn send_batch(&self, campaign: &Campaign, wave: Wave) -> Result<BatchOutcome> {
        let state = campaign.wave(wave);
        let target = campaign.recruiter_target;
        let remaining = target - state.delivered;
        if remaining <= 0 {
            info!(campaign_id = %campaign.id, %wave, delivered = state.delivered, target, "Wave already complete");
            return Ok(BatchOutcome::AlreadyComplete);
        }

        let need = campaign.daily_quota.min(remaining).max(0) as usize;
        let page = self
            .directory
            .page(
                &RecruiterFilter::default(),
                state.cursor as i64,
                need as i64 + self.dedup_buffer,
            )
            .await?;

        let mut seen = HashSet::new();
        let mut recipients: Vec<Recruiter> = Vec::with_capacity(need);
        let mut consumed = 0i32;
        let mut duplicates = 0i32;
        for recruiter in page {
            if recipients.len() >= need {
                break;
            }
            consumed += 1;
            let email = recruiter.normalized_email();
            if email.is_empty() || !seen.insert(email.clone()) {
                duplicates += 1;
                continue;
            }
            recipients.push(Recruiter { email, ..recruiter });
        }
        let exhausted = recipients.len() < need;
        if exhausted {
            warn!(
                campaign_id = %campaign.id,
                %wave,
                offset = state.cursor,
                need,
                found = recipients.len(),
                "Recruiter directory returned a short page"
            );
        }

        // Unknown plan names were already reported when the campaign was created.
        let delay = self
            .plans
            .get(&campaign.plan_name)
            .unwrap_or_else(|| self.plans.default_plan())
            .send_delay;
        let template_id = self.template_for(wave);
        let params = TemplateParams::render(&campaign.candidate, wave);

        info!(
            campaign_id = %campaign.id,
            %wave,
            from = state.cursor + 1,
            count = recipients.len(),
            delivered = state.delivered,
            target,
            "Sending batch"
        );

        let mut sent = 0i32;
        let mut failed = 0i32;
        let total = recipients.len();
        for (i, recruiter) in recipients.iter().enumerate() {
            match tokio::time::timeout(
                self.send_timeout,
                self.dispatcher.send(recruiter, template_id, &params),
            )
            .await
            {
                Ok(Ok(_)) => sent += 1,
                Ok(Err(e)) => {
                    failed += 1;
                    warn!(campaign_id = %campaign.id, %wave, recipient = %recruiter.email, error = %e, "Send failed");
                }
                Err(_) => {
                    failed += 1;
                    warn!(campaign_id = %campaign.id, %wave, recipient = %recruiter.email, "Send timed out");
                }
            }
            if i + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let cumulative = state.delivered + sent;
        let tally = BatchTally {
            sent,
            failed,
            duplicates,
            cumulative,
            failed_total: state.failed + failed,
            cursor: state.cursor + consumed,
            wave_complete: cumulative >= target,
            exhausted,
        };
        info!(
            campaign_id = %campaign.id,
            %wave,
            sent,
            failed,
            cumulative,
            target,
            complete = tally.wave_complete,
            "Batch done"
        );
        Ok(BatchOutcome::Sent(tally))
    }
}
