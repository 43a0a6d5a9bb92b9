use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;
use uuid::Uuid;

/// One of the three outreach rounds sent to the same recruiter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Wave {
    First,
    Second,
    Third,
}

impl Wave {
    pub const ALL: [Wave; 3] = [Wave::First, Wave::Second, Wave::Third];

    pub fn number(self) -> u8 {
        match self {
            Wave::First => 1,
            Wave::Second => 2,
            Wave::Third => 3,
        }
    }

    /// Day label the email templates were designed around.
    pub fn drip_day(self) -> u8 {
        match self {
            Wave::First => 1,
            Wave::Second => 4,
            Wave::Third => 8,
        }
    }

    pub fn previous(self) -> Option<Wave> {
        match self {
            Wave::First => None,
            Wave::Second => Some(Wave::First),
            Wave::Third => Some(Wave::Second),
        }
    }

    pub fn is_last(self) -> bool {
        self == Wave::Third
    }

    fn index(self) -> usize {
        self.number() as usize - 1
    }
}

impl fmt::Display for Wave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WaveStatus {
    #[default]
    NotStarted,
    Sending,
    Sent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    #[default]
    Registered,
    Guest,
}

macro_rules! text_enum {
    ($ty:ty { $($variant:path => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($variant => $text),+
                }
            }
        }

        impl FromStr for $ty {
            type Err = crate::error::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($variant),)+
                    other => Err(crate::error::Error::Internal(format!(
                        "unknown {} value: {}",
                        stringify!($ty),
                        other
                    ))),
                }
            }
        }
    };
}

text_enum!(WaveStatus {
    WaveStatus::NotStarted => "not_started",
    WaveStatus::Sending => "sending",
    WaveStatus::Sent => "sent",
});

text_enum!(CampaignStatus {
    CampaignStatus::Active => "active",
    CampaignStatus::Completed => "completed",
    CampaignStatus::Cancelled => "cancelled",
});

text_enum!(UserType {
    UserType::Registered => "registered",
    UserType::Guest => "guest",
});

/// Progress of a single wave.
///
/// `delivered` counts successful sends only. `cursor` is the number of
/// directory rows consumed so far, including failed recipients and
/// duplicate rows, and is the offset of the next page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WaveState {
    pub delivered: i32,
    pub failed: i32,
    pub cursor: i32,
    pub last_send_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: WaveStatus,
    pub scheduled_not_before: Option<DateTime<Utc>>,
}

impl WaveState {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Waves([WaveState; 3]);

impl Waves {
    pub fn new(states: [WaveState; 3]) -> Self {
        Self(states)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Wave, &WaveState)> {
        Wave::ALL.into_iter().zip(self.0.iter())
    }
}

impl Index<Wave> for Waves {
    type Output = WaveState;

    fn index(&self, wave: Wave) -> &WaveState {
        &self.0[wave.index()]
    }
}

impl IndexMut<Wave> for Waves {
    fn index_mut(&mut self, wave: Wave) -> &mut WaveState {
        &mut self.0[wave.index()]
    }
}

/// Candidate details frozen at purchase time so emails never change mid-campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSnapshot {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub job_role: String,
    pub years_experience: String,
    pub key_skills: String,
    pub location: String,
    pub resume_url: String,
    pub resume_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub user_id: String,
    pub user_type: UserType,
    pub stripe_session_id: Option<String>,
    pub plan_name: String,
    pub recruiter_target: i32,
    pub daily_quota: i32,
    pub candidate: CandidateSnapshot,
    pub waves: Waves,
    pub status: CampaignStatus,
    pub lease_until: Option<DateTime<Utc>>,
    /// Identifies the holder of the current lease.
    pub lease_token: Option<Uuid>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn wave(&self, wave: Wave) -> &WaveState {
        &self.waves[wave]
    }

    /// Whether the waves before `wave` have all completed.
    pub fn wave_unlocked(&self, wave: Wave) -> bool {
        match wave.previous() {
            None => true,
            Some(prev) => self.waves[prev].is_complete(),
        }
    }

    pub fn is_leased(&self, now: DateTime<Utc>) -> bool {
        self.lease_until.map(|until| until > now).unwrap_or(false)
    }
}

/// Everything the store needs to insert a new campaign.
#[derive(Debug, Clone)]
pub struct CampaignDraft {
    pub user_id: String,
    pub user_type: UserType,
    pub stripe_session_id: Option<String>,
    pub plan_name: String,
    pub recruiter_target: i32,
    pub daily_quota: i32,
    pub candidate: CandidateSnapshot,
    pub wave2_not_before: DateTime<Utc>,
    pub wave3_not_before: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl CampaignDraft {
    pub fn into_campaign(self, id: Uuid) -> Campaign {
        let mut waves = Waves::default();
        waves[Wave::Second].scheduled_not_before = Some(self.wave2_not_before);
        waves[Wave::Third].scheduled_not_before = Some(self.wave3_not_before);
        Campaign {
            id,
            user_id: self.user_id,
            user_type: self.user_type,
            stripe_session_id: self.stripe_session_id,
            plan_name: self.plan_name,
            recruiter_target: self.recruiter_target,
            daily_quota: self.daily_quota,
            candidate: self.candidate,
            waves,
            status: CampaignStatus::Active,
            lease_until: None,
            lease_token: None,
            version: 0,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_ordering_helpers() {
        assert_eq!(Wave::First.previous(), None);
        assert_eq!(Wave::Third.previous(), Some(Wave::Second));
        assert_eq!(Wave::Third.number(), 3);
        assert_eq!(Wave::Second.drip_day(), 4);
        assert!(Wave::Third.is_last());
    }

    #[test]
    fn text_enums_parse_their_own_output() {
        assert_eq!("sending".parse::<WaveStatus>().unwrap(), WaveStatus::Sending);
        assert_eq!(CampaignStatus::Cancelled.as_str(), "cancelled");
        assert!("paused".parse::<CampaignStatus>().is_err());
        assert_eq!("guest".parse::<UserType>().unwrap(), UserType::Guest);
    }

    #[test]
    fn waves_are_indexed_by_wave() {
        let mut waves = Waves::default();
        waves[Wave::Second].delivered = 7;
        assert_eq!(waves[Wave::Second].delivered, 7);
        assert_eq!(waves[Wave::First].delivered, 0);
        let numbers: Vec<u8> = waves.iter().map(|(w, _)| w.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }
}
