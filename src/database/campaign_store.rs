use crate::error::Result;
use crate::models::campaign::{
    Campaign, CampaignDraft, CampaignStatus, Wave, WaveStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Durable home of campaign state. Every scheduler decision is made on state
/// read from here during the current tick.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Campaign>;

    /// Campaigns matching every condition of `filter`, oldest first.
    async fn query(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>>;

    /// Applies a partial update and returns the new state. Fails with
    /// `Error::Conflict` when `expected_version` or `expected_lease` no
    /// longer matches.
    async fn patch(&self, id: Uuid, patch: &CampaignPatch) -> Result<Campaign>;

    async fn create(&self, draft: CampaignDraft) -> Result<Campaign>;

    async fn find_by_session(&self, stripe_session_id: &str) -> Result<Option<Campaign>>;
}

/// Conjunction of conditions over a campaign.
#[derive(Debug, Clone, Default)]
pub struct CampaignFilter {
    pub status: Option<CampaignStatus>,
    /// `(wave, true)` requires `completed_at` set, `(wave, false)` requires it unset.
    pub wave_completed: Vec<(Wave, bool)>,
    /// Requires the wave's `scheduled_not_before` to be set and `<=` the instant.
    pub due_by: Option<(Wave, DateTime<Utc>)>,
    pub user_id: Option<String>,
    pub newest_first: bool,
    pub limit: Option<i64>,
}

impl CampaignFilter {
    /// Active campaigns on which `wave` still has work and is allowed to start.
    pub fn due_for(wave: Wave, now: DateTime<Utc>) -> Self {
        let mut filter = Self {
            status: Some(CampaignStatus::Active),
            wave_completed: vec![(wave, false)],
            ..Default::default()
        };
        if let Some(prev) = wave.previous() {
            filter.wave_completed.insert(0, (prev, true));
            filter.due_by = Some((wave, now));
        }
        filter
    }

    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            newest_first: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, campaign: &Campaign) -> bool {
        if let Some(status) = self.status {
            if campaign.status != status {
                return false;
            }
        }
        let completion_ok = self
            .wave_completed
            .iter()
            .all(|(wave, done)| campaign.wave(*wave).is_complete() == *done);
        if !completion_ok {
            return false;
        }
        if let Some((wave, now)) = self.due_by {
            match campaign.wave(wave).scheduled_not_before {
                Some(at) if at <= now => {}
                _ => return false,
            }
        }
        if let Some(user_id) = &self.user_id {
            if &campaign.user_id != user_id {
                return false;
            }
        }
        true
    }
}

/// Progress written for one wave after a batch, always as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveProgress {
    pub delivered: i32,
    pub failed: i32,
    pub cursor: i32,
    pub last_send_date: Option<NaiveDate>,
    pub status: WaveStatus,
    /// Only ever fills an empty `completed_at`; never overwrites it.
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignPatch {
    pub wave: Option<(Wave, WaveProgress)>,
    pub status: Option<CampaignStatus>,
    /// `Some(None)` clears the lease.
    pub lease_until: Option<Option<DateTime<Utc>>>,
    pub lease_token: Option<Option<Uuid>>,
    pub expected_version: Option<i64>,
    /// Only applies while the campaign is still held under this lease.
    pub expected_lease: Option<Uuid>,
}

impl CampaignPatch {
    /// Takes the lease if nobody wrote the campaign since `expected_version`.
    pub fn lease(until: DateTime<Utc>, token: Uuid, expected_version: i64) -> Self {
        Self {
            lease_until: Some(Some(until)),
            lease_token: Some(Some(token)),
            expected_version: Some(expected_version),
            ..Default::default()
        }
    }

    pub fn release(token: Uuid) -> Self {
        Self {
            lease_until: Some(None),
            lease_token: Some(None),
            expected_lease: Some(token),
            ..Default::default()
        }
    }

    pub fn status(status: CampaignStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}
