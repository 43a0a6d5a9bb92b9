use crate::database::campaign_store::{CampaignFilter, CampaignPatch, CampaignStore};
use crate::error::{Error, Result};
use crate::models::campaign::{
    Campaign, CampaignDraft, CandidateSnapshot, Wave, WaveState, Waves,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgCampaignStore {
    pool: PgPool,
}

impl PgCampaignStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn col(wave: Wave, field: &str) -> String {
    format!("wave{}_{}", wave.number(), field)
}

fn wave_from_row(row: &PgRow, wave: Wave) -> Result<WaveState> {
    let status: String = row.try_get(col(wave, "status").as_str())?;
    Ok(WaveState {
        delivered: row.try_get(col(wave, "delivered").as_str())?,
        failed: row.try_get(col(wave, "failed").as_str())?,
        cursor: row.try_get(col(wave, "cursor").as_str())?,
        last_send_date: row.try_get::<Option<NaiveDate>, _>(col(wave, "last_send_date").as_str())?,
        completed_at: row
            .try_get::<Option<DateTime<Utc>>, _>(col(wave, "completed_at").as_str())?,
        status: status.parse()?,
        scheduled_not_before: row
            .try_get::<Option<DateTime<Utc>>, _>(col(wave, "scheduled_for").as_str())?,
    })
}

fn campaign_from_row(row: &PgRow) -> Result<Campaign> {
    let user_type: String = row.try_get("user_type")?;
    let status: String = row.try_get("status")?;
    Ok(Campaign {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        user_type: user_type.parse()?,
        stripe_session_id: row.try_get("stripe_session_id")?,
        plan_name: row.try_get("plan_name")?,
        recruiter_target: row.try_get("recruiter_target")?,
        daily_quota: row.try_get("daily_quota")?,
        candidate: CandidateSnapshot {
            name: row.try_get("candidate_name")?,
            email: row.try_get("candidate_email")?,
            phone: row.try_get("candidate_phone")?,
            job_role: row.try_get("job_role")?,
            years_experience: row.try_get("years_experience")?,
            key_skills: row.try_get("key_skills")?,
            location: row.try_get("location")?,
            resume_url: row.try_get("resume_url")?,
            resume_name: row.try_get("resume_name")?,
        },
        waves: Waves::new([
            wave_from_row(row, Wave::First)?,
            wave_from_row(row, Wave::Second)?,
            wave_from_row(row, Wave::Third)?,
        ]),
        status: status.parse()?,
        lease_until: row.try_get("lease_until")?,
        lease_token: row.try_get("lease_token")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &CampaignFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    for (wave, done) in &filter.wave_completed {
        builder.push(format!(
            " AND {} IS {}NULL",
            col(*wave, "completed_at"),
            if *done { "NOT " } else { "" }
        ));
    }
    if let Some((wave, now)) = filter.due_by {
        builder
            .push(format!(" AND {} <= ", col(wave, "scheduled_for")))
            .push_bind(now);
    }
    if let Some(user_id) = &filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id.clone());
    }
    builder.push(if filter.newest_first {
        " ORDER BY created_at DESC, id DESC"
    } else {
        " ORDER BY created_at ASC, id ASC"
    });
    if let Some(limit) = filter.limit {
        builder.push(" LIMIT ").push_bind(limit);
    }
}

#[async_trait]
impl CampaignStore for PgCampaignStore {
    async fn get(&self, id: Uuid) -> Result<Campaign> {
        let row = sqlx::query("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        campaign_from_row(&row)
    }

    async fn query(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>> {
        let mut builder = QueryBuilder::new("SELECT * FROM campaigns WHERE TRUE");
        push_filter(&mut builder, filter);
        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(campaign_from_row).collect()
    }

    async fn patch(&self, id: Uuid, patch: &CampaignPatch) -> Result<Campaign> {
        let mut builder =
            QueryBuilder::new("UPDATE campaigns SET version = version + 1, updated_at = NOW()");

        if let Some((wave, progress)) = &patch.wave {
            builder
                .push(format!(", {} = ", col(*wave, "delivered")))
                .push_bind(progress.delivered);
            builder
                .push(format!(", {} = ", col(*wave, "failed")))
                .push_bind(progress.failed);
            builder
                .push(format!(", {} = ", col(*wave, "cursor")))
                .push_bind(progress.cursor);
            builder
                .push(format!(", {} = ", col(*wave, "last_send_date")))
                .push_bind(progress.last_send_date);
            builder
                .push(format!(", {} = ", col(*wave, "status")))
                .push_bind(progress.status.as_str());
            if let Some(completed_at) = progress.completed_at {
                let column = col(*wave, "completed_at");
                builder
                    .push(format!(", {column} = COALESCE({column}, "))
                    .push_bind(completed_at)
                    .push(")");
            }
        }
        if let Some(status) = patch.status {
            builder.push(", status = ").push_bind(status.as_str());
        }
        if let Some(lease_until) = patch.lease_until {
            builder.push(", lease_until = ").push_bind(lease_until);
        }
        if let Some(lease_token) = patch.lease_token {
            builder.push(", lease_token = ").push_bind(lease_token);
        }

        builder.push(" WHERE id = ").push_bind(id);
        if let Some(expected) = patch.expected_version {
            builder.push(" AND version = ").push_bind(expected);
        }
        if let Some(token) = patch.expected_lease {
            builder.push(" AND lease_token = ").push_bind(token);
        }
        builder.push(" RETURNING *");

        let guarded = patch.expected_version.is_some() || patch.expected_lease.is_some();
        match builder.build().fetch_optional(&self.pool).await? {
            Some(row) => campaign_from_row(&row),
            None if guarded => Err(Error::Conflict(format!(
                "campaign {} changed concurrently or does not exist",
                id
            ))),
            None => Err(Error::NotFound(format!("campaign {} not found", id))),
        }
    }

    async fn create(&self, draft: CampaignDraft) -> Result<Campaign> {
        let row = sqlx::query(
            r#"
            INSERT INTO campaigns (
                user_id, user_type, stripe_session_id, plan_name, recruiter_target, daily_quota,
                candidate_name, candidate_email, candidate_phone, job_role, years_experience,
                key_skills, location, resume_url, resume_name,
                wave2_scheduled_for, wave3_scheduled_for, status, created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, $8, $9, $10, $11,
                $12, $13, $14, $15,
                $16, $17, 'active', $18, $18
            )
            RETURNING *
            "#,
        )
        .bind(&draft.user_id)
        .bind(draft.user_type.as_str())
        .bind(&draft.stripe_session_id)
        .bind(&draft.plan_name)
        .bind(draft.recruiter_target)
        .bind(draft.daily_quota)
        .bind(&draft.candidate.name)
        .bind(&draft.candidate.email)
        .bind(&draft.candidate.phone)
        .bind(&draft.candidate.job_role)
        .bind(&draft.candidate.years_experience)
        .bind(&draft.candidate.key_skills)
        .bind(&draft.candidate.location)
        .bind(&draft.candidate.resume_url)
        .bind(&draft.candidate.resume_name)
        .bind(draft.wave2_not_before)
        .bind(draft.wave3_not_before)
        .bind(draft.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Error::Conflict(format!(
                "campaign for session {} already exists",
                draft.stripe_session_id.as_deref().unwrap_or("-")
            )),
            other => Error::from(other),
        })?;
        campaign_from_row(&row)
    }

    async fn find_by_session(&self, stripe_session_id: &str) -> Result<Option<Campaign>> {
        let row = sqlx::query("SELECT * FROM campaigns WHERE stripe_session_id = $1")
            .bind(stripe_session_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(campaign_from_row).transpose()
    }
}
