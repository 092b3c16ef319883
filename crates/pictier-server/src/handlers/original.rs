//! `GET /images/original/{asset_id}` — stream the original upload.

use axum::{
  extract::{Path, State},
  response::Response,
};
use pictier_core::store::RecordStore;
use crate::{
  AppState,
  auth::Principal,
  error::ApiError,
  handlers::{load_asset, parse_asset_id, stream_file},
};

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  principal: Principal,
  Path(asset_id): Path<String>,
) -> Result<Response, ApiError>
where
  S: RecordStore + 'static,
{
  let asset = load_asset(&state, parse_asset_id(&asset_id)?).await?;

  if !state.verifier.authorize_original(&principal.policy) {
    return Err(ApiError::Forbidden(
      "your tier does not include original file access".to_owned(),
    ));
  }

  if state.config.restrict_original_to_owner
    && asset.owner_id != principal.account.account_id
  {
    return Err(ApiError::Forbidden("not the owner of this image".to_owned()));
  }

  stream_file(
    &state.media,
    &asset.storage_path,
    &asset.content_type,
    Some(&asset.content_hash),
  )
  .await
}
