use crate::error::Result;
use crate::models::recruiter::{Recruiter, DEFAULT_RECRUITER_COMPANY, DEFAULT_RECRUITER_NAME};
use async_trait::async_trait;
use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecruiterFilter {
    pub active_only: bool,
}

impl Default for RecruiterFilter {
    fn default() -> Self {
        Self { active_only: true }
    }
}

/// Read-only, stably ordered list of recruiters. The same `offset` must
/// always point at the same recruiter, so implementations order by a fixed key.
#[async_trait]
pub trait RecruiterDirectory: Send + Sync {
    async fn page(&self, filter: &RecruiterFilter, offset: i64, limit: i64) -> Result<Vec<Recruiter>>;
}

#[derive(Clone)]
pub struct PgRecruiterDirectory {
    pool: PgPool,
}

impl PgRecruiterDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecruiterDirectory for PgRecruiterDirectory {
    async fn page(&self, filter: &RecruiterFilter, offset: i64, limit: i64) -> Result<Vec<Recruiter>> {
        let recruiters = sqlx::query_as::<_, Recruiter>(
            r#"
            SELECT
                email,
                COALESCE(NULLIF(TRIM(name), ''), $4) AS name,
                COALESCE(NULLIF(TRIM(company), ''), $5) AS company
            FROM recruiters
            WHERE ($1 = FALSE OR (is_active AND email_status = 'active'))
            ORDER BY id ASC
            OFFSET $2
            LIMIT $3
            "#,
        )
        .bind(filter.active_only)
        .bind(offset.max(0))
        .bind(limit.max(0))
        .bind(DEFAULT_RECRUITER_NAME)
        .bind(DEFAULT_RECRUITER_COMPANY)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(offset, limit, fetched = recruiters.len(), "Fetched recruiter page");
        Ok(recruiters)
    }
}
