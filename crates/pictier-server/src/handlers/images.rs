//! `GET /images` and `DELETE /images/{asset_id}`.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use chrono::{DateTime, Utc};
use pictier_core::{asset::Asset, store::RecordStore};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{AppState, auth::Principal, error::ApiError, handlers::{load_asset, parse_asset_id}};

/// Client-facing view of an asset record.
#[derive(Debug, Serialize)]
pub struct AssetSummary {
  pub asset_id:     Uuid,
  pub content_type: String,
  pub content_hash: String,
  pub created_at:   DateTime<Utc>,
}

impl From<Asset> for AssetSummary {
  fn from(asset: Asset) -> Self {
    Self {
      asset_id:     asset.asset_id,
      content_type: asset.content_type,
      content_hash: asset.content_hash,
      created_at:   asset.created_at,
    }
  }
}

/// `GET /images` — the caller's own uploads, newest first.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  principal: Principal,
) -> Result<Json<Vec<AssetSummary>>, ApiError>
where
  S: RecordStore + 'static,
{
  let assets = state
    .store
    .list_assets(principal.account.account_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(assets.into_iter().map(AssetSummary::from).collect()))
}

/// `DELETE /images/{asset_id}` — owner only. Removes the record, the
/// original, and every derived thumbnail.
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  principal: Principal,
  Path(asset_id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore + 'static,
{
  let asset_id = parse_asset_id(&asset_id)?;
  let asset = load_asset(&state, asset_id).await?;
  if asset.owner_id != principal.account.account_id {
    return Err(ApiError::Forbidden("not the owner of this image".to_owned()));
  }

  if !state
    .store
    .delete_asset(asset_id)
    .await
    .map_err(ApiError::store)?
  {
    return Err(ApiError::NotFound);
  }

  // The record is gone; file cleanup failures only leave orphans behind.
  if let Err(e) = state.media.remove(&asset.storage_path).await {
    warn!(%asset_id, error = %e, "failed to remove original");
  }
  match state.media.purge_variants(&asset.storage_path).await {
    Ok(removed) => info!(%asset_id, thumbnails = removed, "image deleted"),
    Err(e) => warn!(%asset_id, error = %e, "failed to purge thumbnails"),
  }

  Ok(StatusCode::NO_CONTENT)
}
