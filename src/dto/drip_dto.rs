use crate::models::campaign::{Campaign, CampaignStatus, CandidateSnapshot, UserType, WaveStatus};
use crate::services::drip_scheduler::NewCampaign;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

fn default_job_role() -> String {
    "Professional".to_string()
}

fn default_location() -> String {
    "Remote".to_string()
}

fn default_resume_name() -> String {
    "Resume.pdf".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCampaignPayload {
    #[validate(length(min = 1, max = 255))]
    pub user_id: String,
    #[serde(default)]
    pub user_type: UserType,
    pub stripe_session_id: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub plan_name: String,
    #[validate(length(min = 1, max = 255))]
    pub candidate_name: String,
    #[validate(email)]
    pub candidate_email: String,
    #[serde(default)]
    pub candidate_phone: String,
    #[serde(default = "default_job_role")]
    pub job_role: String,
    #[serde(default)]
    pub years_experience: String,
    #[serde(default)]
    pub key_skills: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[validate(url)]
    pub resume_url: String,
    #[serde(default = "default_resume_name")]
    pub resume_name: String,
}

impl From<CreateCampaignPayload> for NewCampaign {
    fn from(p: CreateCampaignPayload) -> Self {
        Self {
            user_id: p.user_id,
            user_type: p.user_type,
            stripe_session_id: p.stripe_session_id.filter(|s| !s.trim().is_empty()),
            plan_name: p.plan_name,
            candidate: CandidateSnapshot {
                name: p.candidate_name,
                email: p.candidate_email,
                phone: p.candidate_phone,
                job_role: p.job_role,
                years_experience: p.years_experience,
                key_skills: p.key_skills,
                location: p.location,
                resume_url: p.resume_url,
                resume_name: p.resume_name,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveSummary {
    pub wave: u8,
    pub delivered: i32,
    pub failed: i32,
    pub status: WaveStatus,
    pub last_send_date: Option<NaiveDate>,
    pub scheduled_not_before: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub id: Uuid,
    pub plan_name: String,
    pub recruiter_target: i32,
    pub daily_quota: i32,
    pub status: CampaignStatus,
    pub waves: Vec<WaveSummary>,
    pub created_at: DateTime<Utc>,
}

impl From<&Campaign> for CampaignSummary {
    fn from(c: &Campaign) -> Self {
        Self {
            id: c.id,
            plan_name: c.plan_name.clone(),
            recruiter_target: c.recruiter_target,
            daily_quota: c.daily_quota,
            status: c.status,
            waves: c
                .waves
                .iter()
                .map(|(wave, state)| WaveSummary {
                    wave: wave.number(),
                    delivered: state.delivered,
                    failed: state.failed,
                    status: state.status,
                    last_send_date: state.last_send_date,
                    scheduled_not_before: state.scheduled_not_before,
                    completed_at: state.completed_at,
                })
                .collect(),
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaignResponse {
    pub campaign_id: Uuid,
    pub created: bool,
    pub campaign: CampaignSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignStatusResponse {
    pub user_id: String,
    pub campaigns: Vec<CampaignSummary>,
}
