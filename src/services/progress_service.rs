use crate::database::{CampaignPatch, CampaignStore, WaveProgress};
use crate::error::Result;
use crate::models::campaign::{Campaign, CampaignStatus, Wave, WaveStatus};
use crate::services::batch_sender::BatchOutcome;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;

/// Writes batch results back to the campaign store. This is the only writer
/// of wave progress and of `completed_at`.
#[derive(Clone)]
pub struct ProgressService {
    store: Arc<dyn CampaignStore>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        Self { store }
    }

    /// Builds the single write for `outcome`, or `None` when nothing changes.
    /// The write also releases the campaign's processing lease. A leased
    /// campaign is guarded by its lease token so that unrelated writes made
    /// during the batch cannot discard the result; an unleased one falls back
    /// to its version.
    pub fn patch_for(
        campaign: &Campaign,
        wave: Wave,
        outcome: &BatchOutcome,
        now: DateTime<Utc>,
    ) -> Option<CampaignPatch> {
        let state = campaign.wave(wave);
        let progress = match outcome {
            BatchOutcome::QuotaUsed => return None,
            BatchOutcome::AlreadyComplete => {
                if state.completed_at.is_some() || state.delivered < campaign.recruiter_target {
                    return None;
                }
                WaveProgress {
                    delivered: state.delivered,
                    failed: state.failed,
                    cursor: state.cursor,
                    last_send_date: state.last_send_date,
                    status: WaveStatus::Sent,
                    completed_at: Some(now),
                }
            }
            BatchOutcome::Sent(tally) => {
                let delivered = tally.cumulative.min(campaign.recruiter_target);
                let complete = delivered >= campaign.recruiter_target;
                WaveProgress {
                    delivered,
                    failed: tally.failed_total,
                    cursor: tally.cursor,
                    last_send_date: Some(now.date_naive()),
                    status: if complete { WaveStatus::Sent } else { WaveStatus::Sending },
                    completed_at: complete.then_some(now),
                }
            }
        };

        let finishes_campaign = wave.is_last() && progress.completed_at.is_some();
        Some(CampaignPatch {
            wave: Some((wave, progress)),
            status: finishes_campaign.then_some(CampaignStatus::Completed),
            lease_until: Some(None),
            lease_token: Some(None),
            expected_version: campaign.lease_token.is_none().then_some(campaign.version),
            expected_lease: campaign.lease_token,
        })
    }

    /// Persists `outcome` for `wave`. `campaign` must be the state the batch
    /// was computed from; losing the lease surfaces as `Error::Conflict`.
    pub async fn apply(
        &self,
        campaign: &Campaign,
        wave: Wave,
        outcome: &BatchOutcome,
        now: DateTime<Utc>,
    ) -> Result<Option<Campaign>> {
        let Some(patch) = Self::patch_for(campaign, wave, outcome, now) else {
            return Ok(None);
        };
        let updated = self.store.patch(campaign.id, &patch).await?;

        let state = updated.wave(wave);
        if state.completed_at.is_some() && campaign.wave(wave).completed_at.is_none() {
            info!(campaign_id = %updated.id, %wave, delivered = state.delivered, "Wave complete");
        } else {
            info!(
                campaign_id = %updated.id,
                %wave,
                delivered = state.delivered,
                target = updated.recruiter_target,
                "Wave in progress, resuming next batch day"
            );
        }
        if updated.status == CampaignStatus::Completed && campaign.status != CampaignStatus::Completed {
            info!(campaign_id = %updated.id, "Campaign completed");
        }
        Ok(Some(updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::campaign::{CampaignDraft, CandidateSnapshot, UserType};
    use crate::services::batch_sender::BatchTally;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn campaign() -> Campaign {
        let created = Utc.with_ymd_and_hms(2026, 10, 13, 9, 0, 0).unwrap();
        CampaignDraft {
            user_id: "u".into(),
            user_type: UserType::Registered,
            stripe_session_id: None,
            plan_name: "starter".into(),
            recruiter_target: 250,
            daily_quota: 50,
            candidate: CandidateSnapshot {
                name: "Dana".into(),
                email: "dana@example.com".into(),
                phone: String::new(),
                job_role: "Engineer".into(),
                years_experience: "5".into(),
                key_skills: "Rust".into(),
                location: "Remote".into(),
                resume_url: "https://files.example.com/cv.pdf".into(),
                resume_name: "cv.pdf".into(),
            },
            wave2_not_before: created + Duration::days(6),
            wave3_not_before: created + Duration::days(13),
            created_at: created,
        }
        .into_campaign(Uuid::new_v4())
    }

    fn tally(cumulative: i32) -> BatchOutcome {
        BatchOutcome::Sent(BatchTally {
            sent: 47,
            failed: 3,
            duplicates: 0,
            cumulative,
            failed_total: 3,
            cursor: cumulative + 3,
            wave_complete: cumulative >= 250,
            exhausted: false,
        })
    }

    #[test]
    fn quota_skip_writes_nothing() {
        let now = Utc::now();
        assert!(ProgressService::patch_for(&campaign(), Wave::First, &BatchOutcome::QuotaUsed, now).is_none());
    }

    #[test]
    fn partial_batch_records_progress_without_completion() {
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 15, 0, 0).unwrap();
        let patch = ProgressService::patch_for(&campaign(), Wave::First, &tally(47), now).unwrap();
        let (wave, progress) = patch.wave.unwrap();
        assert_eq!(wave, Wave::First);
        assert_eq!(progress.delivered, 47);
        assert_eq!(progress.cursor, 50);
        assert_eq!(progress.last_send_date, Some(now.date_naive()));
        assert_eq!(progress.status, WaveStatus::Sending);
        assert_eq!(progress.completed_at, None);
        assert_eq!(patch.status, None);
        assert_eq!(patch.lease_until, Some(None));
        assert_eq!(patch.expected_version, Some(0));
        assert_eq!(patch.expected_lease, None);
    }

    #[test]
    fn leased_batch_is_guarded_by_lease_token() {
        let mut c = campaign();
        let token = Uuid::new_v4();
        c.lease_token = Some(token);
        c.version = 7;
        let patch = ProgressService::patch_for(&c, Wave::First, &tally(50), Utc::now()).unwrap();
        assert_eq!(patch.expected_lease, Some(token));
        assert_eq!(patch.expected_version, None);
        assert_eq!(patch.lease_token, Some(None));
    }

    #[test]
    fn final_wave_completion_completes_campaign() {
        let now = Utc::now();
        let patch = ProgressService::patch_for(&campaign(), Wave::Third, &tally(250), now).unwrap();
        let (_, progress) = patch.wave.as_ref().unwrap();
        assert_eq!(progress.completed_at, Some(now));
        assert_eq!(progress.status, WaveStatus::Sent);
        assert_eq!(patch.status, Some(CampaignStatus::Completed));

        let patch = ProgressService::patch_for(&campaign(), Wave::Second, &tally(250), now).unwrap();
        assert_eq!(patch.status, None);
    }

    #[test]
    fn already_complete_backfills_missing_completion_only() {
        let now = Utc::now();
        let mut c = campaign();
        assert!(ProgressService::patch_for(&c, Wave::First, &BatchOutcome::AlreadyComplete, now).is_none());

        c.waves[Wave::First].delivered = 250;
        let patch = ProgressService::patch_for(&c, Wave::First, &BatchOutcome::AlreadyComplete, now).unwrap();
        assert_eq!(patch.wave.unwrap().1.completed_at, Some(now));

        c.waves[Wave::First].completed_at = Some(now);
        assert!(ProgressService::patch_for(&c, Wave::First, &BatchOutcome::AlreadyComplete, now).is_none());
    }
}
