//! `POST /images` — accept an upload and derive its variants.
//!
//! Body: `multipart/form-data` with the image in a field named `image` (or
//! `file`). Responds `201` with the asset id and a variant map, e.g.
//! `{"200px": "/images/thumbnails/…/200px/", "expiring": "<token>"}`.

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Multipart, State},
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use pictier_core::{
  asset::{AccessDescriptor, NewAsset},
  store::RecordStore,
};
use pictier_media::{codec, layout};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{AppState, auth::Principal, error::ApiError};

const IMAGE_FIELDS: [&str; 2] = ["image", "file"];

#[derive(Debug, Serialize)]
pub struct UploadResponse {
  pub asset_id:   Uuid,
  pub owner_id:   Uuid,
  pub created_at: DateTime<Utc>,
  pub variants:   BTreeMap<String, AccessDescriptor>,
}

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  principal: Principal,
  mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + 'static,
{
  let (filename, bytes) = read_image_field(&mut multipart).await?;
  if bytes.is_empty() {
    return Err(ApiError::BadRequest("empty upload".to_owned()));
  }
  let content_type = codec::content_type(&bytes)
    .map_err(|_| ApiError::BadRequest("not a supported image format".to_owned()))?;

  let asset_id     = Uuid::new_v4();
  let storage_path = layout::original_storage_path(asset_id, &filename);
  let content_hash = hex::encode(Sha256::digest(&bytes));

  state.media.write(&storage_path, &bytes).await?;

  let recorded = state
    .store
    .record_asset(NewAsset {
      asset_id,
      owner_id: principal.account.account_id,
      storage_path: storage_path.clone(),
      content_type: content_type.to_owned(),
      content_hash,
    })
    .await;
  let asset = match recorded {
    Ok(asset) => asset,
    Err(e) => {
      if let Err(cleanup) = state.media.remove(&storage_path).await {
        warn!(%asset_id, error = %cleanup, "failed to remove orphaned upload");
      }
      return Err(ApiError::store(e));
    }
  };

  let report = state
    .engine
    .derive_from(&asset, bytes, &principal.policy)
    .await;
  let variants = report.into_descriptors();

  info!(
    %asset_id,
    owner = %principal.account.username,
    variants = variants.len(),
    "image uploaded"
  );

  Ok((
    StatusCode::CREATED,
    Json(UploadResponse {
      asset_id,
      owner_id: asset.owner_id,
      created_at: asset.created_at,
      variants,
    }),
  ))
}

/// Find the image field and read it fully. Other fields are skipped.
async fn read_image_field(multipart: &mut Multipart) -> Result<(String, Bytes), ApiError> {
  while let Some(field) = multipart.next_field().await? {
    if !field.name().is_some_and(|name| IMAGE_FIELDS.contains(&name)) {
      continue;
    }
    let filename = field.file_name().unwrap_or("upload").to_owned();
    let bytes = field.bytes().await?;
    return Ok((filename, bytes));
  }
  Err(ApiError::BadRequest(
    "expected a multipart field named `image`".to_owned(),
  ))
}
