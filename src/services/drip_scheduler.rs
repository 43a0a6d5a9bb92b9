//! Tick orchestrator for the three-wave drip campaigns.
//!
//! Every tick re-reads campaign state from the store, picks the campaigns
//! due for each wave, and for each one runs at most one batch:
//! lease, send, persist. Wave 1 runs at any hour; waves 2 and 3 only while
//! the send window is open. One campaign failing never stops the others.

use crate::config::DripConfig;
use crate::database::{CampaignFilter, CampaignPatch, CampaignStore};
use crate::error::{Error, Result};
use crate::models::campaign::{Campaign, CampaignDraft, CampaignStatus, CandidateSnapshot, UserType, Wave};
use crate::services::batch_sender::{BatchOutcome, BatchSender, BatchTally};
use crate::services::plan_catalog::PlanCatalog;
use crate::services::progress_service::ProgressService;
use crate::services::quota_gate::quota_available;
use crate::services::wave_clock::{self, SendWindow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotActive,
    PreviousWavePending,
    NotDue,
    WaveComplete,
    QuotaUsed,
    Leased,
}

/// What happened to one campaign's wave during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaveRun {
    Skipped(SkipReason),
    Sent(BatchTally),
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub send_window_open: bool,
    /// Another tick was still running, so this one did nothing.
    pub overlapped: bool,
    pub batches: usize,
    pub emails_sent: i64,
    pub emails_failed: i64,
    pub waves_completed: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl TickReport {
    fn record(&mut self, run: &WaveRun) {
        match run {
            WaveRun::Skipped(_) => self.skipped += 1,
            WaveRun::Sent(tally) => {
                self.batches += 1;
                self.emails_sent += tally.sent as i64;
                self.emails_failed += tally.failed as i64;
                if tally.wave_complete {
                    self.waves_completed += 1;
                }
            }
        }
    }
}

/// Input for a new campaign, supplied by the payment-completion handler.
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub user_id: String,
    pub user_type: UserType,
    pub stripe_session_id: Option<String>,
    pub plan_name: String,
    pub candidate: CandidateSnapshot,
}

pub struct DripScheduler {
    store: Arc<dyn CampaignStore>,
    sender: BatchSender,
    progress: ProgressService,
    plans: PlanCatalog,
    window: SendWindow,
    lease_ttl: chrono::Duration,
    tick_guard: Mutex<()>,
}

impl DripScheduler {
    pub fn new(config: &DripConfig, store: Arc<dyn CampaignStore>, sender: BatchSender) -> Self {
        let lease_ttl = chrono::Duration::from_std(config.lease_ttl)
            .unwrap_or_else(|_| chrono::Duration::minutes(30));
        Self {
            progress: ProgressService::new(store.clone()),
            store,
            sender,
            plans: config.plans.clone(),
            window: config.window.clone(),
            lease_ttl,
            tick_guard: Mutex::new(()),
        }
    }

    pub fn send_window_open(&self, now: DateTime<Utc>) -> bool {
        self.window.is_open(now)
    }

    pub async fn tick(&self) -> TickReport {
        self.tick_at(Utc::now()).await
    }

    /// One pass over all due campaigns as of `now`.
    pub async fn tick_at(&self, now: DateTime<Utc>) -> TickReport {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            warn!("Previous drip tick still running, skipping this one");
            return TickReport {
                overlapped: true,
                ..Default::default()
            };
        };

        let mut report = TickReport {
            send_window_open: self.window.is_open(now),
            ..Default::default()
        };
        info!(at = %now.format("%Y-%m-%d %H:%M UTC"), send_window_open = report.send_window_open, "Drip tick started");

        let mut touched = HashSet::new();
        self.run_due(Wave::First, now, &mut touched, &mut report).await;
        if report.send_window_open {
            self.run_due(Wave::Second, now, &mut touched, &mut report).await;
            self.run_due(Wave::Third, now, &mut touched, &mut report).await;
        } else {
            info!("Outside send window, waves 2 and 3 skipped");
        }

        info!(
            batches = report.batches,
            sent = report.emails_sent,
            failed = report.emails_failed,
            completed = report.waves_completed,
            errors = report.errors,
            "Drip tick complete"
        );
        report
    }

    async fn run_due(
        &self,
        wave: Wave,
        now: DateTime<Utc>,
        touched: &mut HashSet<Uuid>,
        report: &mut TickReport,
    ) {
        let campaigns = match self.store.query(&CampaignFilter::due_for(wave, now)).await {
            Ok(campaigns) => campaigns,
            Err(e) => {
                error!(%wave, error = ?e, "Failed to query due campaigns");
                report.errors += 1;
                return;
            }
        };
        info!(%wave, due = campaigns.len(), "Campaigns due");

        for campaign in campaigns {
            if !touched.insert(campaign.id) {
                continue;
            }
            match self.run_wave(&campaign, wave, now).await {
                Ok(run) => report.record(&run),
                Err(e) => {
                    error!(campaign_id = %campaign.id, %wave, error = ?e, "Drip batch failed");
                    report.errors += 1;
                }
            }
        }
    }

    /// Sends today's first batch of wave 1 right away instead of waiting for
    /// the next tick.
    pub async fn start_wave1(&self, campaign_id: Uuid) -> Result<WaveRun> {
        self.start_wave1_at(campaign_id, Utc::now()).await
    }

    pub async fn start_wave1_at(&self, campaign_id: Uuid, now: DateTime<Utc>) -> Result<WaveRun> {
        let campaign = self.store.get(campaign_id).await?;
        info!(
            campaign_id = %campaign.id,
            plan = %campaign.plan_name,
            delivered = campaign.wave(Wave::First).delivered,
            target = campaign.recruiter_target,
            "Starting wave 1"
        );
        self.run_wave(&campaign, Wave::First, now).await
    }

    /// Runs one batch of `wave` for `campaign` if every gate allows it.
    pub async fn run_wave(&self, campaign: &Campaign, wave: Wave, now: DateTime<Utc>) -> Result<WaveRun> {
        if let Some(reason) = self.skip_reason(campaign, wave, now) {
            info!(campaign_id = %campaign.id, %wave, ?reason, "Wave skipped");
            return Ok(WaveRun::Skipped(reason));
        }

        let lease = CampaignPatch::lease(now + self.lease_ttl, Uuid::new_v4(), campaign.version);
        let leased = match self.store.patch(campaign.id, &lease).await {
            Ok(leased) => leased,
            Err(Error::Conflict(_)) => {
                warn!(campaign_id = %campaign.id, %wave, "Campaign taken by another worker, skipping");
                return Ok(WaveRun::Skipped(SkipReason::Leased));
            }
            Err(e) => return Err(e),
        };

        let outcome = match self.sender.send_batch(&leased, wave).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.release(&leased).await;
                return Err(e);
            }
        };

        if self.progress.apply(&leased, wave, &outcome, now).await?.is_none() {
            self.release(&leased).await;
        }

        Ok(match outcome {
            BatchOutcome::Sent(tally) => WaveRun::Sent(tally),
            BatchOutcome::AlreadyComplete => WaveRun::Skipped(SkipReason::WaveComplete),
            BatchOutcome::QuotaUsed => WaveRun::Skipped(SkipReason::QuotaUsed),
        })
    }

    fn skip_reason(&self, campaign: &Campaign, wave: Wave, now: DateTime<Utc>) -> Option<SkipReason> {
        let state = campaign.wave(wave);
        if campaign.status != CampaignStatus::Active {
            return Some(SkipReason::NotActive);
        }
        if !campaign.wave_unlocked(wave) {
            return Some(SkipReason::PreviousWavePending);
        }
        if state.is_complete() {
            return Some(SkipReason::WaveComplete);
        }
        if wave != Wave::First && state.scheduled_not_before.map_or(true, |at| now < at) {
            return Some(SkipReason::NotDue);
        }
        if campaign.is_leased(now) {
            return Some(SkipReason::Leased);
        }
        if !quota_available(state, now.date_naive()) {
            return Some(SkipReason::QuotaUsed);
        }
        None
    }

    async fn release(&self, leased: &Campaign) {
        let Some(token) = leased.lease_token else {
            return;
        };
        if let Err(e) = self.store.patch(leased.id, &CampaignPatch::release(token)).await {
            error!(campaign_id = %leased.id, error = ?e, "Failed to release campaign lease");
        }
    }

    /// Creates a campaign for a completed payment. Calling it again for the
    /// same checkout session returns the existing campaign.
    pub async fn create_campaign(&self, input: NewCampaign) -> Result<(Campaign, bool)> {
        self.create_campaign_at(input, Utc::now()).await
    }

    pub async fn create_campaign_at(&self, input: NewCampaign, now: DateTime<Utc>) -> Result<(Campaign, bool)> {
        if let Some(session) = input.stripe_session_id.as_deref() {
            if let Some(existing) = self.store.find_by_session(session).await? {
                info!(campaign_id = %existing.id, session, "Campaign already exists for session");
                return Ok((existing, false));
            }
        }

        let plan = self.plans.resolve(&input.plan_name).clone();
        let starts = |wave: Wave| {
            wave_clock::scheduled_not_before(now, plan.recruiter_target, plan.daily_quota, wave, &self.window)
                .ok_or_else(|| Error::Internal(format!("no start time for {}", wave)))
        };
        let wave2_not_before = starts(Wave::Second)?;
        let wave3_not_before = starts(Wave::Third)?;

        let draft = CampaignDraft {
            user_id: input.user_id,
            user_type: input.user_type,
            stripe_session_id: input.stripe_session_id.clone(),
            plan_name: input.plan_name.trim().to_string(),
            recruiter_target: plan.recruiter_target,
            daily_quota: plan.daily_quota,
            candidate: input.candidate,
            wave2_not_before,
            wave3_not_before,
            created_at: now,
        };

        match self.store.create(draft).await {
            Ok(campaign) => {
                info!(
                    campaign_id = %campaign.id,
                    plan = %campaign.plan_name,
                    resolved_plan = %plan.name,
                    target = campaign.recruiter_target,
                    days_per_wave = plan.days_per_wave(),
                    wave2_start = %wave2_not_before.format("%Y-%m-%d %H:%M UTC"),
                    wave3_start = %wave3_not_before.format("%Y-%m-%d %H:%M UTC"),
                    "Campaign created"
                );
                Ok((campaign, true))
            }
            Err(Error::Conflict(msg)) => {
                let session = input.stripe_session_id.as_deref().unwrap_or_default();
                match self.store.find_by_session(session).await? {
                    Some(existing) => Ok((existing, false)),
                    None => Err(Error::Conflict(msg)),
                }
            }
            Err(e) => Err(e),
        }
    }
}
