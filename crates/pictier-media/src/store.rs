//! [`LocalAssetStore`] — originals and derived variants on the local
//! filesystem.
//!
//! Every path handed to the store is relative to its root. Paths with `..`,
//! a root, or a drive prefix are rejected before touching the filesystem.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

use crate::{
  Error, Result,
  layout::{SIZE_DIR_SUFFIX, THUMBNAILS_DIR, basename},
};

/// Chunk size used when streaming a file to a client.
pub const STREAM_CHUNK_BYTES: usize = 8 * 1024;

/// An open file ready to be streamed. Dropping it closes the handle.
pub struct AssetStream {
  pub len:    u64,
  pub stream: ReaderStream<fs::File>,
}

#[derive(Debug, Clone)]
pub struct LocalAssetStore {
  root: PathBuf,
}

impl LocalAssetStore {
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  pub fn root(&self) -> &Path { &self.root }

  fn resolve(&self, path: &str) -> Result<PathBuf> {
    let relative = Path::new(path);
    let mut normal = 0;
    for component in relative.components() {
      match component {
        Component::Normal(_) => normal += 1,
        Component::CurDir => {}
        Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
          return Err(Error::InvalidPath(path.to_owned()));
        }
      }
    }
    if normal == 0 {
      return Err(Error::InvalidPath(path.to_owned()));
    }
    Ok(self.root.join(relative))
  }

  /// Whether a regular file exists at `path`.
  pub async fn exists(&self, path: &str) -> Result<bool> {
    let full = self.resolve(path)?;
    match fs::metadata(&full).await {
      Ok(meta) => Ok(meta.is_file()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(Error::io(path, e)),
    }
  }

  /// Write `bytes` to `path`, replacing any existing file.
  ///
  /// Data lands in a temporary sibling first and is renamed into place, so
  /// readers see either the old file or the new one.
  pub async fn write(&self, path: &str, bytes: &[u8]) -> Result<()> {
    let full = self.resolve(path)?;

    if let Some(parent) = full.parent() {
      fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::io(path, e))?;
    }

    let tmp = full.with_file_name(format!(
      ".{}.{}.tmp",
      basename(path),
      Uuid::new_v4().simple()
    ));

    if let Err(e) = fs::write(&tmp, bytes).await {
      let _ = fs::remove_file(&tmp).await;
      return Err(Error::io(path, e));
    }
    if let Err(e) = fs::rename(&tmp, &full).await {
      let _ = fs::remove_file(&tmp).await;
      return Err(Error::io(path, e));
    }

    debug!(path, size = bytes.len(), "file written");
    Ok(())
  }

  /// Read a whole file into memory.
  pub async fn read(&self, path: &str) -> Result<Vec<u8>> {
    let full = self.resolve(path)?;
    let data = fs::read(&full).await.map_err(|e| Error::io(path, e))?;
    debug!(path, size = data.len(), "file read");
    Ok(data)
  }

  /// Open a file for streaming in [`STREAM_CHUNK_BYTES`] chunks.
  pub async fn open_stream(&self, path: &str) -> Result<AssetStream> {
    let full = self.resolve(path)?;
    let file = fs::File::open(&full)
      .await
      .map_err(|e| Error::io(path, e))?;
    let meta = file.metadata().await.map_err(|e| Error::io(path, e))?;
    if !meta.is_file() {
      return Err(Error::NotFound(path.to_owned()));
    }

    Ok(AssetStream {
      len:    meta.len(),
      stream: ReaderStream::with_capacity(file, STREAM_CHUNK_BYTES),
    })
  }

  /// Remove a file. Returns `false` if it was already gone.
  pub async fn remove(&self, path: &str) -> Result<bool> {
    let full = self.resolve(path)?;
    match fs::remove_file(&full).await {
      Ok(()) => {
        debug!(path, "file removed");
        Ok(true)
      }
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(Error::io(path, e)),
    }
  }

  /// Remove every thumbnail derived from the original at `storage_path`,
  /// whatever sizes were produced for it. Returns how many were removed.
  pub async fn purge_variants(&self, storage_path: &str) -> Result<usize> {
    let name = basename(storage_path);
    let mut entries = match fs::read_dir(self.root.join(THUMBNAILS_DIR)).await {
      Ok(entries) => entries,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
      Err(e) => return Err(Error::io(THUMBNAILS_DIR, e)),
    };

    let mut removed = 0;
    while let Some(entry) = entries
      .next_entry()
      .await
      .map_err(|e| Error::io(THUMBNAILS_DIR, e))?
    {
      let dir_name = entry.file_name();
      let Some(dir_name) = dir_name.to_str() else {
        continue;
      };
      if !dir_name.ends_with(SIZE_DIR_SUFFIX) {
        continue;
      }
      if self.remove(&format!("{THUMBNAILS_DIR}/{dir_name}/{name}")).await? {
        removed += 1;
      }
    }

    debug!(storage_path, removed, "variants purged");
    Ok(removed)
  }
}
