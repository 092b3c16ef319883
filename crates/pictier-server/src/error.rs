//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Client-caused errors carry their message to the caller. Everything else
//! is logged in full and answered with a bare 500.

use axum::{
  Json,
  extract::multipart::MultipartError,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use pictier_token::TokenError;
use serde_json::json;
use thiserror::Error;

/// Shown for every rejected expiring link, whatever the cause.
pub const INVALID_LINK: &str = "invalid or expired link";

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found")]
  NotFound,

  #[error("invalid or expired link")]
  InvalidLink,

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("multipart error: {0}")]
  Multipart(#[from] MultipartError),

  #[error("tier error: {0}")]
  Tier(#[from] pictier_core::Error),

  #[error("media error: {0}")]
  Media(#[from] pictier_media::Error),

  #[error("token error: {0}")]
  Token(#[from] TokenError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthorized => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": "unauthorized" })),
        )
          .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"pictier\""),
        );
        return res;
      }
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::NotFound
      | ApiError::Media(pictier_media::Error::NotFound(_) | pictier_media::Error::InvalidPath(_)) => {
        (StatusCode::NOT_FOUND, "not found".to_owned())
      }
      ApiError::InvalidLink => (StatusCode::NOT_FOUND, INVALID_LINK.to_owned()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Multipart(e) => (e.status(), e.body_text()),
      ApiError::Tier(_) | ApiError::Media(_) | ApiError::Token(_) | ApiError::Store(_) => {
        tracing::error!(error = %self, "request failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "internal server error".to_owned(),
        )
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
