use crate::{
    database::CampaignFilter,
    dto::drip_dto::{CampaignStatusResponse, CampaignSummary, CreateCampaignPayload, CreateCampaignResponse},
    error::{Error, Result},
    models::campaign::Wave,
    services::drip_scheduler::NewCampaign,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use subtle::ConstantTimeEq;
use validator::Validate;

/// Called by the payment handler once checkout completes.
#[axum::debug_handler]
pub async fn create_campaign(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCampaignPayload>,
) -> Result<impl IntoResponse> {
    verify_secret(&headers, &state.drip_api_secret)?;
    payload.validate()?;

    let (campaign, created) = state.scheduler.create_campaign(NewCampaign::from(payload)).await?;

    if created || !campaign.wave(Wave::First).is_complete() {
        let scheduler = state.scheduler.clone();
        let campaign_id = campaign.id;
        tokio::spawn(async move {
            if let Err(e) = scheduler.start_wave1(campaign_id).await {
                tracing::error!(%campaign_id, error = ?e, "Failed to start wave 1");
            }
        });
    }

    let response = CreateCampaignResponse {
        campaign_id: campaign.id,
        created,
        campaign: CampaignSummary::from(&campaign),
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

pub async fn campaign_status(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let campaigns = state.store.query(&CampaignFilter::for_user(&user_id)).await?;
    if campaigns.is_empty() {
        return Err(Error::NotFound(format!("no campaigns for user {}", user_id)));
    }
    Ok(Json(CampaignStatusResponse {
        user_id,
        campaigns: campaigns.iter().map(CampaignSummary::from).collect(),
    }))
}

fn verify_secret(headers: &HeaderMap, expected: &str) -> Result<()> {
    let Some(secret_hdr) = headers.get("x-drip-secret") else {
        return Err(Error::Unauthorized("missing_drip_secret".into()));
    };
    let provided = secret_hdr
        .to_str()
        .map_err(|_| Error::Unauthorized("invalid_secret_header".into()))?;
    if !expected.is_empty() && bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(Error::Unauthorized("invalid_drip_secret".into()))
    }
}
