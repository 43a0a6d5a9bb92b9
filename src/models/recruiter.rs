use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const DEFAULT_RECRUITER_NAME: &str = "Hiring Manager";
pub const DEFAULT_RECRUITER_COMPANY: &str = "Verified Firm";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Recruiter {
    pub email: String,
    pub name: String,
    pub company: String,
}

impl Recruiter {
    pub fn new(email: &str, name: Option<&str>, company: Option<&str>) -> Self {
        let pick = |v: Option<&str>, fallback: &str| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };
        Self {
            email: email.to_string(),
            name: pick(name, DEFAULT_RECRUITER_NAME),
            company: pick(company, DEFAULT_RECRUITER_COMPANY),
        }
    }

    /// Address used for dedup: trimmed and lower-cased.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}
