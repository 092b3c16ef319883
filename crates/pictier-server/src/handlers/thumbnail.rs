//! `GET /images/thumbnails/{asset_id}/{size}` — stream a derived thumbnail.
//!
//! The only gate is whether the thumbnail was ever derived.

use axum::{
  extract::{Path, State},
  response::Response,
};
use pictier_core::store::RecordStore;
use pictier_media::layout;
use crate::{
  AppState,
  auth::Principal,
  error::ApiError,
  handlers::{load_asset, parse_asset_id, stream_file},
};

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  _principal: Principal,
  Path((asset_id, size)): Path<(String, String)>,
) -> Result<Response, ApiError>
where
  S: RecordStore + 'static,
{
  let asset_id = parse_asset_id(&asset_id)?;
  let size = layout::parse_size(&size).ok_or(ApiError::NotFound)?;
  let asset = load_asset(&state, asset_id).await?;

  if !state.verifier.authorize_thumbnail(&asset, size).await? {
    return Err(ApiError::NotFound);
  }

  stream_file(
    &state.media,
    &layout::thumbnail_path(&asset.storage_path, size),
    &asset.content_type,
    None,
  )
  .await
}
