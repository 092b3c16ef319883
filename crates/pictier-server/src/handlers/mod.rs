//! Route handlers.
//!
//! | Method   | Path                                      | Handler                |
//! |----------|-------------------------------------------|------------------------|
//! | `POST`   | `/images`                                 | [`upload::handler`]    |
//! | `GET`    | `/images`                                 | [`images::list`]       |
//! | `DELETE` | `/images/{asset_id}`                      | [`images::remove`]     |
//! | `GET`    | `/images/original/{asset_id}`             | [`original::handler`]  |
//! | `GET`    | `/images/thumbnails/{asset_id}/{size}`    | [`thumbnail::handler`] |
//! | `GET`    | `/images/{asset_id}/expiring-link`        | [`expiring::issue`]    |
//! | `GET`    | `/images/expiring/{token}`                | [`expiring::fetch`]    |

pub mod expiring;
pub mod images;
pub mod original;
pub mod thumbnail;
pub mod upload;

use axum::{
  body::Body,
  http::{HeaderValue, header},
  response::Response,
};
use pictier_core::{asset::Asset, store::RecordStore};
use pictier_media::LocalAssetStore;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Look up an asset record, mapping absence to 404.
pub(crate) async fn load_asset<S>(state: &AppState<S>, asset_id: Uuid) -> Result<Asset, ApiError>
where
  S: RecordStore + 'static,
{
  state
    .store
    .get_asset(asset_id)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::NotFound)
}

/// Parse an asset id path segment. A segment that is not a UUID names no
/// asset.
pub(crate) fn parse_asset_id(segment: &str) -> Result<Uuid, ApiError> {
  segment.parse().map_err(|_| ApiError::NotFound)
}

/// Stream a stored file back to the client.
pub(crate) async fn stream_file(
  media:        &LocalAssetStore,
  path:         &str,
  content_type: &str,
  etag:         Option<&str>,
) -> Result<Response, ApiError> {
  let opened = media.open_stream(path).await?;

  let mut response = Response::new(Body::from_stream(opened.stream));
  let headers = response.headers_mut();
  headers.insert(
    header::CONTENT_TYPE,
    HeaderValue::from_str(content_type)
      .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
  );
  headers.insert(header::CONTENT_LENGTH, HeaderValue::from(opened.len));
  if let Some(tag) = etag
    && let Ok(value) = HeaderValue::from_str(&format!("\"{tag}\""))
  {
    headers.insert(header::ETAG, value);
  }

  Ok(response)
}
