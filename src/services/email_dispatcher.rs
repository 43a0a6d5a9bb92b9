use crate::config::BrevoConfig;
use crate::error::{Error, Result};
use crate::models::campaign::{CandidateSnapshot, Wave};
use crate::models::recruiter::Recruiter;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Template parameters for one wave's email, rendered from the candidate snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateParams {
    pub candidate_name: String,
    pub candidate_email: String,
    pub candidate_phone: String,
    pub job_role: String,
    pub years_experience: String,
    pub key_skills: String,
    pub location: String,
    pub resume_url: String,
    pub resume_name: String,
    pub drip_day: u8,
}

impl TemplateParams {
    pub fn render(candidate: &CandidateSnapshot, wave: Wave) -> Self {
        Self {
            candidate_name: candidate.name.clone(),
            candidate_email: candidate.email.clone(),
            candidate_phone: candidate.phone.clone(),
            job_role: candidate.job_role.clone(),
            years_experience: candidate.years_experience.clone(),
            key_skills: candidate.key_skills.clone(),
            location: candidate.location.clone(),
            resume_url: candidate.resume_url.clone(),
            resume_name: candidate.resume_name.clone(),
            drip_day: wave.drip_day(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    pub message_id: Option<String>,
}

/// Outbound email provider. An `Err` is a failure for this one recipient.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(
        &self,
        recipient: &Recruiter,
        template_id: i64,
        params: &TemplateParams,
    ) -> Result<DispatchReceipt>;
}

#[derive(Debug, Deserialize)]
struct BrevoSendResponse {
    #[serde(rename = "messageId")]
    message_id: Option<String>,
}

#[derive(Clone)]
pub struct BrevoDispatcher {
    client: Client,
    config: BrevoConfig,
}

impl BrevoDispatcher {
    pub fn new(config: BrevoConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("Brevo API key is not configured".to_string()));
        }
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl EmailDispatcher for BrevoDispatcher {
    async fn send(
        &self,
        recipient: &Recruiter,
        template_id: i64,
        params: &TemplateParams,
    ) -> Result<DispatchReceipt> {
        let reply_to = if params.candidate_email.trim().is_empty() {
            self.config.sender_email.as_str()
        } else {
            params.candidate_email.as_str()
        };
        let body = json!({
            "to": [{ "email": recipient.email, "name": recipient.name }],
            "templateId": template_id,
            "params": params,
            "sender": { "name": self.config.sender_name, "email": self.config.sender_email },
            "replyTo": { "email": reply_to },
        });

        let url = format!("{}/v3/smtp/email", self.config.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let parsed = resp.json::<BrevoSendResponse>().await.ok();
            Ok(DispatchReceipt {
                message_id: parsed.and_then(|p| p.message_id),
            })
        } else {
            let text = resp.text().await.unwrap_or_default();
            Err(Error::Dispatch(format!(
                "Brevo rejected {} ({}): {}",
                recipient.email,
                status.as_u16(),
                text.chars().take(200).collect::<String>()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_follow_the_snapshot_and_wave() {
        let candidate = CandidateSnapshot {
            name: "Dana".into(),
            email: "dana@example.com".into(),
            phone: "+1 555".into(),
            job_role: "Data Engineer".into(),
            years_experience: "7".into(),
            key_skills: "Rust, SQL".into(),
            location: "Austin".into(),
            resume_url: "https://files.example.com/dana.pdf".into(),
            resume_name: "dana.pdf".into(),
        };
        let params = TemplateParams::render(&candidate, Wave::Third);
        assert_eq!(params.drip_day, 8);
        assert_eq!(params.job_role, "Data Engineer");

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["candidate_email"], "dana@example.com");
        assert_eq!(value["drip_day"], 8);
    }

    #[test]
    fn brevo_dispatcher_requires_api_key() {
        let err = BrevoDispatcher::new(BrevoConfig {
            api_key: "  ".into(),
            sender_email: "noreply@example.com".into(),
            sender_name: "Sender".into(),
            base_url: "http://localhost".into(),
        })
        .err()
        .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
