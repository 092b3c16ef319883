//! Image decoding and resizing, kept synchronous. Callers run it on the
//! blocking pool.

use std::io::Cursor;

use image::{ImageFormat, imageops::FilterType};

use crate::Result;

/// Detect the format of an encoded image from its leading bytes.
pub fn sniff(bytes: &[u8]) -> Result<ImageFormat> { Ok(image::guess_format(bytes)?) }

/// MIME type of an encoded image, e.g. `image/png`.
pub fn content_type(bytes: &[u8]) -> Result<&'static str> {
  Ok(sniff(bytes)?.to_mime_type())
}

/// Produce a thumbnail whose longest edge is at most `size`, keeping the
/// aspect ratio and the source format. Images already within bounds are
/// re-encoded unscaled.
pub fn thumbnail(bytes: &[u8], size: u32) -> Result<Vec<u8>> {
  let format = sniff(bytes)?;
  let img = image::load_from_memory_with_format(bytes, format)?;

  let img = if img.width() > size || img.height() > size {
    img.resize(size, size, FilterType::Lanczos3)
  } else {
    img
  };

  let mut buf = Cursor::new(Vec::new());
  img.write_to(&mut buf, format)?;
  Ok(buf.into_inner())
}
