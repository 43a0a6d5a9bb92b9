#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use drip_backend::config::DripConfig;
use drip_backend::database::MemoryCampaignStore;
use drip_backend::error::{Error, Result};
use drip_backend::models::campaign::{CandidateSnapshot, UserType};
use drip_backend::models::recruiter::Recruiter;
use drip_backend::services::batch_sender::BatchSender;
use drip_backend::services::drip_scheduler::{DripScheduler, NewCampaign};
use drip_backend::services::email_dispatcher::{DispatchReceipt, EmailDispatcher, TemplateParams};
use drip_backend::services::plan_catalog::{Plan, PlanCatalog};
use drip_backend::services::recruiter_directory::{RecruiterDirectory, RecruiterFilter};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn recruiter_email(i: usize) -> String {
    format!("recruiter{:04}@firm.example", i)
}

/// Directory ordered by insertion, like `ORDER BY id`.
pub struct FakeDirectory {
    pub rows: Vec<Recruiter>,
    unavailable: AtomicBool,
}

impl FakeDirectory {
    pub fn with_count(n: usize) -> Self {
        Self {
            rows: (0..n)
                .map(|i| Recruiter::new(&recruiter_email(i), Some("Alex"), Some("Acme")))
                .collect(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// While set, every page request fails like a dropped database connection.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecruiterDirectory for FakeDirectory {
    async fn page(&self, _filter: &RecruiterFilter, offset: i64, limit: i64) -> Result<Vec<Recruiter>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Internal("recruiter directory unavailable".into()));
        }
        Ok(self
            .rows
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub email: String,
    pub template_id: i64,
    pub drip_day: u8,
    pub delivered: bool,
}

/// Records every attempt and rejects the configured addresses.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub failing: HashSet<String>,
    pub delay: Duration,
    attempts: Mutex<Vec<Attempt>>,
}

impl RecordingDispatcher {
    pub fn failing(emails: &[String]) -> Self {
        Self {
            failing: emails.iter().cloned().collect(),
            ..Default::default()
        }
    }

    /// Every send takes `delay`, long enough to overlap other work in a test.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> Vec<Attempt> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn delivered_for(&self, template_id: i64) -> Vec<String> {
        self.attempts()
            .into_iter()
            .filter(|a| a.delivered && a.template_id == template_id)
            .map(|a| a.email)
            .collect()
    }
}

#[async_trait]
impl EmailDispatcher for RecordingDispatcher {
    async fn send(&self, recipient: &Recruiter, template_id: i64, params: &TemplateParams) -> Result<DispatchReceipt> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let delivered = !self.failing.contains(&recipient.email);
        self.attempts.lock().unwrap().push(Attempt {
            email: recipient.email.clone(),
            template_id,
            drip_day: params.drip_day,
            delivered,
        });
        if delivered {
            Ok(DispatchReceipt {
                message_id: Some(format!("<{}@test>", recipient.email)),
            })
        } else {
            Err(Error::Dispatch(format!("{} bounced", recipient.email)))
        }
    }
}

/// Default plan table without the pause between sends.
pub fn drip_config() -> DripConfig {
    let starter = PlanCatalog::with_defaults(50, "starter")
        .unwrap()
        .default_plan()
        .clone();
    let catalog = PlanCatalog::new(
        vec![
            Plan {
                send_delay: Duration::ZERO,
                ..starter
            },
            Plan {
                name: "basic".into(),
                recruiter_target: 500,
                daily_quota: 50,
                send_delay: Duration::ZERO,
            },
        ],
        "starter",
    )
    .unwrap();
    DripConfig {
        plans: catalog,
        send_timeout: Duration::from_secs(2),
        ..DripConfig::default()
    }
}

pub struct Harness {
    pub store: Arc<MemoryCampaignStore>,
    pub directory: Arc<FakeDirectory>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub scheduler: DripScheduler,
}

pub fn harness(recruiters: usize, dispatcher: RecordingDispatcher) -> Harness {
    let store = Arc::new(MemoryCampaignStore::new());
    harness_on(store, recruiters, dispatcher)
}

/// A fresh scheduler on an existing store, as after a process restart.
pub fn harness_on(store: Arc<MemoryCampaignStore>, recruiters: usize, dispatcher: RecordingDispatcher) -> Harness {
    let config = drip_config();
    let directory = Arc::new(FakeDirectory::with_count(recruiters));
    let dispatcher = Arc::new(dispatcher);
    let sender = BatchSender::new(&config, directory.clone(), dispatcher.clone());
    let scheduler = DripScheduler::new(&config, store.clone(), sender);
    Harness {
        store,
        directory,
        dispatcher,
        scheduler,
    }
}

pub fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, day, hour, minute, 0).unwrap()
}

pub fn candidate() -> CandidateSnapshot {
    CandidateSnapshot {
        name: "Dana Reyes".into(),
        email: "dana@example.com".into(),
        phone: "+1 555 0100".into(),
        job_role: "Data Engineer".into(),
        years_experience: "7".into(),
        key_skills: "Rust, SQL, Airflow".into(),
        location: "Austin, TX".into(),
        resume_url: "https://files.example.com/dana.pdf".into(),
        resume_name: "dana.pdf".into(),
    }
}

pub fn new_campaign(session: &str, plan: &str) -> NewCampaign {
    NewCampaign {
        user_id: "user-42".into(),
        user_type: UserType::Registered,
        stripe_session_id: Some(session.into()),
        plan_name: plan.into(),
        candidate: candidate(),
    }
}
