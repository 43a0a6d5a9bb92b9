//! In-process campaign store with the same semantics as the Postgres store.

use crate::database::campaign_store::{CampaignFilter, CampaignPatch, CampaignStore};
use crate::error::{Error, Result};
use crate::models::campaign::{Campaign, CampaignDraft};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryCampaignStore {
    campaigns: RwLock<HashMap<Uuid, Campaign>>,
}

impl MemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites a stored campaign as-is, the way an operator editing the row would.
    pub async fn put(&self, campaign: Campaign) {
        self.campaigns.write().await.insert(campaign.id, campaign);
    }

    pub async fn len(&self) -> usize {
        self.campaigns.read().await.len()
    }
}

#[async_trait]
impl CampaignStore for MemoryCampaignStore {
    async fn get(&self, id: Uuid) -> Result<Campaign> {
        self.campaigns
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("campaign {} not found", id)))
    }

    async fn query(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>> {
        let campaigns = self.campaigns.read().await;
        let mut found: Vec<Campaign> = campaigns
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        found.sort_by_key(|c| (c.created_at, c.id));
        if filter.newest_first {
            found.reverse();
        }
        if let Some(limit) = filter.limit {
            found.truncate(limit.max(0) as usize);
        }
        Ok(found)
    }

    async fn patch(&self, id: Uuid, patch: &CampaignPatch) -> Result<Campaign> {
        let mut campaigns = self.campaigns.write().await;
        let campaign = campaigns
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("campaign {} not found", id)))?;

        if let Some(expected) = patch.expected_version {
            if campaign.version != expected {
                return Err(Error::Conflict(format!(
                    "campaign {} changed concurrently (version {} != {})",
                    id, campaign.version, expected
                )));
            }
        }
        if let Some(token) = patch.expected_lease {
            if campaign.lease_token != Some(token) {
                return Err(Error::Conflict(format!("campaign {} lease is no longer held", id)));
            }
        }

        if let Some((wave, progress)) = &patch.wave {
            let state = &mut campaign.waves[*wave];
            state.delivered = progress.delivered;
            state.failed = progress.failed;
            state.cursor = progress.cursor;
            state.last_send_date = progress.last_send_date;
            state.status = progress.status;
            if state.completed_at.is_none() {
                state.completed_at = progress.completed_at;
            }
        }
        if let Some(status) = patch.status {
            campaign.status = status;
        }
        if let Some(lease_until) = patch.lease_until {
            campaign.lease_until = lease_until;
        }
        if let Some(lease_token) = patch.lease_token {
            campaign.lease_token = lease_token;
        }
        campaign.version += 1;
        campaign.updated_at = Utc::now();
        Ok(campaign.clone())
    }

    async fn create(&self, draft: CampaignDraft) -> Result<Campaign> {
        let mut campaigns = self.campaigns.write().await;
        if let Some(session) = &draft.stripe_session_id {
            if campaigns
                .values()
                .any(|c| c.stripe_session_id.as_ref() == Some(session))
            {
                return Err(Error::Conflict(format!(
                    "campaign for session {} already exists",
                    session
                )));
            }
        }
        let campaign = draft.into_campaign(Uuid::new_v4());
        campaigns.insert(campaign.id, campaign.clone());
        Ok(campaign)
    }

    async fn find_by_session(&self, stripe_session_id: &str) -> Result<Option<Campaign>> {
        Ok(self
            .campaigns
            .read()
            .await
            .values()
            .find(|c| c.stripe_session_id.as_deref() == Some(stripe_session_id))
            .cloned())
    }
}
