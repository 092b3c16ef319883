//! Router tests against an in-memory store and a temporary media root.

use std::{io::Cursor, path::PathBuf, sync::Arc};

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{TimeDelta, Utc};
use pictier_core::{
  account::NewAccount,
  store::RecordStore,
  tier::NewCustomTier,
};
use pictier_store_sqlite::SqliteStore;
use pictier_token::TokenCodec;
use rand_core::OsRng;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{AppState, ServerConfig, error::INVALID_LINK, router};

const PASSWORD: &str = "secret";
const SECRET: &str = "0123456789abcdef0123456789abcdef";
const BOUNDARY: &str = "pictier-test-boundary";

struct Harness {
  state:  AppState<SqliteStore>,
  _media: TempDir,
}

fn config(media_root: PathBuf) -> ServerConfig {
  ServerConfig {
    host:                       "127.0.0.1".to_string(),
    port:                       8080,
    store_path:                 PathBuf::from(":memory:"),
    media_root,
    signing_secret:             SECRET.to_string(),
    default_link_ttl_secs:      1800,
    max_link_ttl_secs:          86_400,
    derivation_workers:         2,
    max_upload_bytes:           1024 * 1024,
    restrict_original_to_owner: false,
  }
}

/// Accounts: `basic` (no tier), `premium`, `enterprise`, `gold` (custom
/// tier `Gold`: sizes 100,500, original, no expiring links).
async fn harness_with(tweak: impl FnOnce(&mut ServerConfig)) -> Harness {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(PASSWORD.as_bytes(), &salt)
    .unwrap()
    .to_string();

  store
    .create_custom_tier(NewCustomTier {
      name:                   "Gold".into(),
      thumbnail_sizes:        "100,500".into(),
      original_file_link:     true,
      expiring_links_enabled: false,
    })
    .await
    .unwrap();

  for (username, tier) in [
    ("basic", None),
    ("premium", Some("Premium")),
    ("enterprise", Some("Enterprise")),
    ("gold", Some("Gold")),
  ] {
    store
      .create_account(NewAccount {
        username:      username.into(),
        password_hash: hash.clone(),
        account_tier:  tier.map(str::to_owned),
      })
      .await
      .unwrap();
  }

  let media = TempDir::new().unwrap();
  let mut cfg = config(media.path().to_path_buf());
  tweak(&mut cfg);

  Harness {
    state:  AppState::new(Arc::new(store), cfg).unwrap(),
    _media: media,
  }
}

async fn harness() -> Harness { harness_with(|_| {}).await }

fn auth_header(user: &str) -> String {
  format!("Basic {}", B64.encode(format!("{user}:{PASSWORD}")))
}

fn png(width: u32, height: u32) -> Vec<u8> {
  let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 120, 240]));
  let mut buf = Cursor::new(Vec::new());
  img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
  buf.into_inner()
}

/// A PNG that does not compress away.
fn gradient_png(width: u32, height: u32) -> Vec<u8> {
  let img = image::RgbImage::from_fn(width, height, |x, y| {
    image::Rgb([x as u8, y as u8, (x ^ y) as u8])
  });
  let mut buf = Cursor::new(Vec::new());
  img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
  buf.into_inner()
}

fn multipart(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
  let mut body = format!(
    "--{BOUNDARY}\r\n\
     Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
     Content-Type: application/octet-stream\r\n\r\n"
  )
  .into_bytes();
  body.extend_from_slice(bytes);
  body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
  body
}

impl Harness {
  async fn send(&self, req: Request<Body>) -> Response {
    router(self.state.clone()).oneshot(req).await.unwrap()
  }

  async fn get(&self, uri: &str, user: Option<&str>) -> Response {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(user) = user {
      builder = builder.header(header::AUTHORIZATION, auth_header(user));
    }
    self.send(builder.body(Body::empty()).unwrap()).await
  }

  async fn delete(&self, uri: &str, user: &str) -> Response {
    let req = Request::builder()
      .method("DELETE")
      .uri(uri)
      .header(header::AUTHORIZATION, auth_header(user))
      .body(Body::empty())
      .unwrap();
    self.send(req).await
  }

  async fn upload_raw(&self, user: &str, field: &str, bytes: &[u8]) -> Response {
    let req = Request::builder()
      .method("POST")
      .uri("/images")
      .header(header::AUTHORIZATION, auth_header(user))
      .header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={BOUNDARY}"),
      )
      .body(Body::from(multipart(field, "photo.png", bytes)))
      .unwrap();
    self.send(req).await
  }

  /// Upload a 640×480 PNG and return the JSON response body.
  async fn upload(&self, user: &str) -> Value {
    let resp = self.upload_raw(user, "image", &png(640, 480)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    json(resp).await
  }
}

async fn body_bytes(resp: Response) -> Vec<u8> {
  axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap()
    .to_vec()
}

async fn json(resp: Response) -> Value { serde_json::from_slice(&body_bytes(resp).await).unwrap() }

fn variant_keys(upload: &Value) -> Vec<String> {
  upload["variants"]
    .as_object()
    .unwrap()
    .keys()
    .cloned()
    .collect()
}

fn asset_id(upload: &Value) -> String { upload["asset_id"].as_str().unwrap().to_owned() }

// ─── Auth ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unauthenticated_requests_return_401() {
  let h = harness().await;
  let resp = h.get("/images", None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let challenge = resp.headers().get(header::WWW_AUTHENTICATE).unwrap();
  assert_eq!(challenge, "Basic realm=\"pictier\"");
}

#[tokio::test]
async fn wrong_password_returns_401() {
  let h = harness().await;
  let req = Request::builder()
    .uri("/images")
    .header(
      header::AUTHORIZATION,
      format!("Basic {}", B64.encode("basic:nope")),
    )
    .body(Body::empty())
    .unwrap();
  assert_eq!(h.send(req).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_user_returns_401() {
  let h = harness().await;
  let resp = h.get("/images", Some("mallory")).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// ─── Upload ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn basic_upload_returns_one_thumbnail() {
  let h = harness().await;
  let upload = h.upload("basic").await;

  assert_eq!(variant_keys(&upload), ["200px"]);
  let id = asset_id(&upload);
  assert_eq!(
    upload["variants"]["200px"],
    format!("/images/thumbnails/{id}/200px/")
  );
}

#[tokio::test]
async fn enterprise_upload_returns_every_variant() {
  let h = harness().await;
  let upload = h.upload("enterprise").await;

  assert_eq!(
    variant_keys(&upload),
    ["200px", "400px", "expiring", "original"]
  );
  let id = asset_id(&upload);
  assert_eq!(upload["variants"]["original"], format!("/images/original/{id}/"));

  let token = upload["variants"]["expiring"].as_str().unwrap();
  let claims = TokenCodec::new(SECRET).unwrap().decode(token).unwrap();
  assert_eq!(claims.asset_id.to_string(), id);
}

#[tokio::test]
async fn custom_tier_upload_follows_tier_sizes() {
  let h = harness().await;
  let upload = h.upload("gold").await;
  assert_eq!(variant_keys(&upload), ["100px", "500px", "original"]);
}

#[tokio::test]
async fn upload_accepts_file_field() {
  let h = harness().await;
  let resp = h.upload_raw("basic", "file", &png(20, 20)).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn upload_without_image_field_is_400() {
  let h = harness().await;
  let resp = h.upload_raw("basic", "avatar", &png(20, 20)).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_upload_is_413_and_writes_nothing() {
  let h = harness_with(|cfg| cfg.max_upload_bytes = 1000).await;
  let bytes = gradient_png(640, 480);
  assert!(bytes.len() > 1000);

  let resp = h.upload_raw("basic", "image", &bytes).await;
  assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

  let written = std::fs::read_dir(h.state.media.root()).unwrap().count();
  assert_eq!(written, 0);
  let listed = json(h.get("/images", Some("basic")).await).await;
  assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn upload_of_non_image_is_400() {
  let h = harness().await;
  let resp = h.upload_raw("basic", "image", b"plain text, not pixels").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json(resp).await["error"], "not a supported image format");

  let listed = json(h.get("/images", Some("basic")).await).await;
  assert!(listed.as_array().unwrap().is_empty());
}

// ─── Original ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn original_requires_a_tier_that_grants_it() {
  let h = harness().await;
  let upload = h.upload("basic").await;
  let uri = format!("/images/original/{}/", asset_id(&upload));

  let resp = h.get(&uri, Some("basic")).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = h.get(&uri, Some("enterprise")).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
  assert!(resp.headers().contains_key(header::ETAG));
  assert_eq!(body_bytes(resp).await, png(640, 480));
}

#[tokio::test]
async fn original_route_accepts_no_trailing_slash() {
  let h = harness().await;
  let upload = h.upload("premium").await;
  let resp = h
    .get(&format!("/images/original/{}", asset_id(&upload)), Some("premium"))
    .await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn original_of_unknown_asset_is_404() {
  let h = harness().await;
  let resp = h
    .get(&format!("/images/original/{}/", Uuid::new_v4()), Some("enterprise"))
    .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_original_is_404_even_without_the_grant() {
  let h = harness().await;
  let resp = h
    .get(&format!("/images/original/{}/", Uuid::new_v4()), Some("basic"))
    .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(json(resp).await["error"], "not found");

  let resp = h
    .get(&format!("/images/{}/expiring-link", Uuid::new_v4()), Some("basic"))
    .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_asset_ids_are_404() {
  let h = harness().await;
  for uri in [
    "/images/original/42/",
    "/images/thumbnails/42/200px/",
    "/images/42/expiring-link",
  ] {
    let resp = h.get(uri, Some("enterprise")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
    assert_eq!(json(resp).await["error"], "not found", "{uri}");
  }

  let resp = h.delete("/images/42/", "enterprise").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(json(resp).await["error"], "not found");
}

#[tokio::test]
async fn owner_restriction_blocks_other_accounts() {
  let h = harness_with(|cfg| cfg.restrict_original_to_owner = true).await;
  let upload = h.upload("gold").await;
  let uri = format!("/images/original/{}/", asset_id(&upload));

  assert_eq!(h.get(&uri, Some("enterprise")).await.status(), StatusCode::FORBIDDEN);
  assert_eq!(h.get(&uri, Some("gold")).await.status(), StatusCode::OK);
}

// ─── Thumbnails ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn derived_thumbnail_is_served() {
  let h = harness().await;
  let upload = h.upload("basic").await;
  let id = asset_id(&upload);

  for uri in [
    format!("/images/thumbnails/{id}/200px/"),
    format!("/images/thumbnails/{id}/200px"),
    format!("/images/thumbnails/{id}/200"),
  ] {
    let resp = h.get(&uri, Some("basic")).await;
    assert_eq!(resp.status(), StatusCode::OK, "{uri}");
    let img = image::load_from_memory(&body_bytes(resp).await).unwrap();
    assert_eq!((img.width(), img.height()), (200, 150));
  }
}

#[tokio::test]
async fn never_derived_size_is_404() {
  let h = harness().await;
  let upload = h.upload("basic").await;
  let id = asset_id(&upload);

  let resp = h.get(&format!("/images/thumbnails/{id}/400px/"), Some("enterprise")).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let resp = h.get(&format!("/images/thumbnails/{id}/huge/"), Some("basic")).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn thumbnail_survives_a_tier_downgrade() {
  let h = harness().await;
  let upload = h.upload("enterprise").await;
  let id = asset_id(&upload);

  let account = h
    .state
    .store
    .find_account_by_username("enterprise")
    .await
    .unwrap()
    .unwrap();
  h.state
    .store
    .set_account_tier(account.account_id, None)
    .await
    .unwrap();

  let resp = h.get(&format!("/images/thumbnails/{id}/400px/"), Some("enterprise")).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

// ─── Expiring links ──────────────────────────────────────────────────────────

#[tokio::test]
async fn expiring_link_requires_tier_grant() {
  let h = harness().await;
  let upload = h.upload("gold").await;
  let uri = format!("/images/{}/expiring-link", asset_id(&upload));

  assert_eq!(h.get(&uri, Some("gold")).await.status(), StatusCode::FORBIDDEN);
  assert_eq!(h.get(&uri, Some("enterprise")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn issued_link_serves_original_without_auth() {
  let h = harness().await;
  let upload = h.upload("enterprise").await;
  let id = asset_id(&upload);

  let resp = h
    .get(
      &format!("/images/{id}/expiring-link?expiration_seconds=60"),
      Some("enterprise"),
    )
    .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let link = json(resp).await;
  assert_eq!(link["expires_in"], 60);

  let resp = h.get(link["link"].as_str().unwrap(), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(body_bytes(resp).await, png(640, 480));
}

#[tokio::test]
async fn upload_token_serves_original() {
  let h = harness().await;
  let upload = h.upload("enterprise").await;
  let token = upload["variants"]["expiring"].as_str().unwrap();

  let resp = h.get(&format!("/images/expiring/{token}"), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn expiration_out_of_range_is_400() {
  let h = harness().await;
  let upload = h.upload("enterprise").await;
  let id = asset_id(&upload);

  for secs in ["0", "86401"] {
    let resp = h
      .get(
        &format!("/images/{id}/expiring-link?expiration_seconds={secs}"),
        Some("enterprise"),
      )
      .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{secs}");
  }
}

#[tokio::test]
async fn bad_and_expired_links_look_the_same() {
  let h = harness().await;
  let upload = h.upload("enterprise").await;
  let id: Uuid = asset_id(&upload).parse().unwrap();

  let codec = TokenCodec::new(SECRET).unwrap();
  let expired = codec
    .encode_at(id, 1, Utc::now() - TimeDelta::hours(1))
    .unwrap();
  let forged = TokenCodec::new([0xa5_u8; 32]).unwrap().encode(id, 600).unwrap();

  let mut bodies = Vec::new();
  for token in [expired.as_str(), forged.as_str(), "garbage"] {
    let resp = h.get(&format!("/images/expiring/{token}/"), None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{token}");
    bodies.push(json(resp).await);
  }
  assert!(bodies.iter().all(|b| b["error"] == INVALID_LINK));
}

#[tokio::test]
async fn link_to_deleted_asset_is_invalid() {
  let h = harness().await;
  let upload = h.upload("enterprise").await;
  let id = asset_id(&upload);
  let token = upload["variants"]["expiring"].as_str().unwrap().to_owned();

  let resp = h.delete(&format!("/images/{id}"), "enterprise").await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = h.get(&format!("/images/expiring/{token}/"), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(json(resp).await["error"], INVALID_LINK);
}

// ─── List / delete ───────────────────────────────────────────────────────────

#[tokio::test]
async fn list_shows_only_own_assets() {
  let h = harness().await;
  let mine = h.upload("basic").await;
  h.upload("premium").await;

  let listed = json(h.get("/images", Some("basic")).await).await;
  let ids: Vec<_> = listed
    .as_array()
    .unwrap()
    .iter()
    .map(|a| a["asset_id"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(ids, [asset_id(&mine)]);
}

#[tokio::test]
async fn delete_is_owner_only_and_purges_files() {
  let h = harness().await;
  let upload = h.upload("gold").await;
  let id = asset_id(&upload);

  let resp = h.delete(&format!("/images/{id}/"), "enterprise").await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = h.delete(&format!("/images/{id}/"), "gold").await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = h.get(&format!("/images/thumbnails/{id}/100px/"), Some("gold")).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let thumbs = h.state.media.root().join("thumbnails/100px_images");
  assert_eq!(std::fs::read_dir(thumbs).unwrap().count(), 0);
  let originals = h.state.media.root().join("images");
  assert_eq!(std::fs::read_dir(originals).unwrap().count(), 0);

  let resp = h.delete(&format!("/images/{id}/"), "gold").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
