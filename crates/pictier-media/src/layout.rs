//! Deterministic naming of originals, thumbnails, and the server paths that
//! reach them.
//!
//! ```text
//! images/{asset_id}_{filename}               original
//! thumbnails/{size}px_images/{basename}      one thumbnail size
//! ```
//!
//! A thumbnail path depends only on the original's storage path and the size,
//! so re-deriving the same size always lands on the same file.

use pictier_core::tier::MAX_THUMBNAIL_SIZE;
use uuid::Uuid;

/// Directory holding uploaded originals.
pub const ORIGINALS_DIR: &str = "images";

/// Directory holding one sub-directory per thumbnail size.
pub const THUMBNAILS_DIR: &str = "thumbnails";

/// Suffix of every per-size thumbnail directory.
pub const SIZE_DIR_SUFFIX: &str = "px_images";

const MAX_FILENAME_CHARS: usize = 200;

/// Last path segment of a storage path.
pub fn basename(storage_path: &str) -> &str {
  storage_path
    .rsplit('/')
    .next()
    .unwrap_or(storage_path)
}

/// `thumbnails/{size}px_images`
pub fn thumbnail_dir(size: u32) -> String {
  format!("{THUMBNAILS_DIR}/{size}{SIZE_DIR_SUFFIX}")
}

/// Where the `size` thumbnail of the original at `storage_path` lives.
pub fn thumbnail_path(storage_path: &str, size: u32) -> String {
  format!("{}/{}", thumbnail_dir(size), basename(storage_path))
}

/// Storage path for a freshly uploaded original. The asset id prefix keeps
/// uploads with the same client filename apart.
pub fn original_storage_path(asset_id: Uuid, filename: &str) -> String {
  format!(
    "{ORIGINALS_DIR}/{}_{}",
    asset_id.simple(),
    sanitize_filename(filename)
  )
}

/// Server path handed out for a thumbnail variant.
pub fn thumbnail_descriptor(asset_id: Uuid, size: u32) -> String {
  format!("/images/thumbnails/{asset_id}/{size}px/")
}

/// Server path handed out for the original variant.
pub fn original_descriptor(asset_id: Uuid) -> String {
  format!("/images/original/{asset_id}/")
}

/// Parse a size path segment: `"200px"` or `"200"`.
pub fn parse_size(segment: &str) -> Option<u32> {
  let digits = segment.strip_suffix("px").unwrap_or(segment);
  digits
    .parse::<u32>()
    .ok()
    .filter(|size| (1..=MAX_THUMBNAIL_SIZE).contains(size))
}

/// Reduce a client-supplied filename to a safe single path segment.
///
/// Directory parts are dropped, characters outside `[A-Za-z0-9._-]` become
/// `_`, leading dots are stripped, and the result is capped at 200 chars.
pub fn sanitize_filename(filename: &str) -> String {
  let name = filename
    .rsplit(|c: char| c == '/' || c == '\\')
    .next()
    .unwrap_or(filename);

  let cleaned: String = name
    .chars()
    .map(|c| match c {
      'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
      _ => '_',
    })
    .take(MAX_FILENAME_CHARS)
    .collect();

  let cleaned = cleaned.trim_start_matches('.');
  if cleaned.is_empty() {
    "upload".to_owned()
  } else {
    cleaned.to_owned()
  }
}
