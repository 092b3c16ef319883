//! Expiring links: issue one for an asset, and serve the original through
//! one without credentials.

use axum::{
  Json,
  extract::{Path, Query, State},
  response::Response,
};
use pictier_core::store::RecordStore;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
  AppState,
  auth::Principal,
  error::ApiError,
  handlers::{load_asset, parse_asset_id, stream_file},
};

// ─── Issue ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LinkParams {
  pub expiration_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LinkResponse {
  pub asset_id:   Uuid,
  pub token:      String,
  pub link:       String,
  pub expires_in: u64,
}

/// `GET /images/{asset_id}/expiring-link[?expiration_seconds=N]`
pub async fn issue<S>(
  State(state): State<AppState<S>>,
  principal: Principal,
  Path(asset_id): Path<String>,
  Query(params): Query<LinkParams>,
) -> Result<Json<LinkResponse>, ApiError>
where
  S: RecordStore + 'static,
{
  let asset_id = parse_asset_id(&asset_id)?;
  let asset = load_asset(&state, asset_id).await?;

  if !principal.policy.grants_expiring_links {
    return Err(ApiError::Forbidden(
      "your tier does not include expiring links".to_owned(),
    ));
  }

  let max = state.config.max_link_ttl_secs;
  let ttl = params
    .expiration_seconds
    .unwrap_or(state.config.default_link_ttl_secs);
  if !(1..=max).contains(&ttl) {
    return Err(ApiError::BadRequest(format!(
      "expiration_seconds must be between 1 and {max}"
    )));
  }

  if state.config.restrict_original_to_owner
    && asset.owner_id != principal.account.account_id
  {
    return Err(ApiError::Forbidden("not the owner of this image".to_owned()));
  }

  let token = state.verifier.issue_link(asset_id, ttl)?;
  debug!(%asset_id, ttl, "expiring link issued");

  Ok(Json(LinkResponse {
    asset_id,
    link: format!("/images/expiring/{token}/"),
    token,
    expires_in: ttl,
  }))
}

// ─── Fetch ───────────────────────────────────────────────────────────────────

/// `GET /images/expiring/{token}` — no credentials; the token is the grant.
///
/// Bad signatures, expired tokens and vanished assets all get the same 404.
pub async fn fetch<S>(
  State(state): State<AppState<S>>,
  Path(token): Path<String>,
) -> Result<Response, ApiError>
where
  S: RecordStore + 'static,
{
  let asset_id = state.verifier.authorize_expiring(&token).map_err(|e| {
    debug!(error = %e, "expiring link rejected");
    ApiError::InvalidLink
  })?;

  let asset = match load_asset(&state, asset_id).await {
    Ok(asset) => asset,
    Err(ApiError::NotFound) => return Err(ApiError::InvalidLink),
    Err(e) => return Err(e),
  };

  stream_file(&state.media, &asset.storage_path, &asset.content_type, None)
    .await
    .map_err(|e| match e {
      ApiError::Media(pictier_media::Error::NotFound(_)) => ApiError::InvalidLink,
      other => other,
    })
}
