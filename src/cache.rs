//! Content-addressed chunk cache and file materializer
//!
//! Every remote checksum owns one directory under `<store>/.c.cache/`
//! holding the fetched chunk files (named by index) and, once assembled
//! and verified, the whole-file artifact. Chunk files already on disk are
//! never fetched again, so an interrupted pass resumes where it stopped,
//! and two targets that share content share one cache entry.

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::SyncError;
use crate::logging::*;
use crate::provider::RemoteProvider;
use crate::util;

/// Cache directory name, a hidden sibling of the sync roots.
pub const CACHE_FOLDER_NAME: &str = ".c.cache";

/// Name of the assembled whole-file artifact inside a cache entry.
const ARTIFACT_NAME: &str = "current";

/// Temp name the artifact is assembled under before it becomes visible.
const ARTIFACT_TMP_NAME: &str = "current.part";

pub struct ChunkCache {
	root: PathBuf,
}

impl ChunkCache {
	/// Open the cache directory under `store_folder`, creating it if needed.
	pub async fn open(store_folder: &Path) -> Result<Self, SyncError> {
		let root = store_folder.join(CACHE_FOLDER_NAME);
		if !root.is_dir() {
			fs::create_dir_all(&root).await?;
		}
		Ok(ChunkCache { root })
	}

	/// Fetch, assemble and verify the remote file at `path`, returning the
	/// path of an artifact whose content checksum equals `checksum`.
	///
	/// Resumable at every step: present chunk files are reused, a valid
	/// artifact from an earlier run is returned as-is, and a stale or
	/// corrupt artifact is rebuilt from the chunk files. If the rebuilt
	/// artifact still fails verification the entire cache entry is purged
	/// so the next attempt starts from nothing, and
	/// [`SyncError::Integrity`] is returned.
	pub async fn materialize(
		&self,
		provider: &dyn RemoteProvider,
		path: &str,
		checksum: &str,
		chunks: u32,
	) -> Result<PathBuf, SyncError> {
		let entry = self.root.join(checksum);
		if !entry.is_dir() {
			fs::create_dir_all(&entry).await?;
		}

		for index in 0..chunks {
			let chunk_path = entry.join(index.to_string());
			if chunk_path.is_file() {
				continue;
			}
			let data = provider.chunk(path, index).await?;
			// Write through a temp name so a killed process never leaves a
			// short chunk file that a later run would trust.
			let tmp = entry.join(format!("{}.part", index));
			fs::write(&tmp, &data).await?;
			fs::rename(&tmp, &chunk_path).await?;
		}

		let artifact = entry.join(ARTIFACT_NAME);
		if artifact.is_dir() {
			warn!("removing directory at artifact path: {}", artifact.display());
			fs::remove_dir_all(&artifact).await?;
		}
		if artifact.is_file() && util::hash_file(&artifact).await? != checksum {
			debug!("discarding stale artifact for {}", checksum);
			fs::remove_file(&artifact).await?;
		}

		if !artifact.exists() {
			let tmp = entry.join(ARTIFACT_TMP_NAME);
			let mut out = fs::File::create(&tmp).await?;
			for index in 0..chunks {
				let data = fs::read(entry.join(index.to_string())).await?;
				out.write_all(&data).await?;
			}
			out.flush().await?;
			drop(out);
			fs::rename(&tmp, &artifact).await?;
		}

		let actual = util::hash_file(&artifact).await?;
		if actual != checksum {
			warn!("cache entry {} failed verification, purging", checksum);
			fs::remove_dir_all(&entry).await?;
			return Err(SyncError::Integrity {
				path: path.to_string(),
				expected: checksum.to_string(),
				actual,
			});
		}

		Ok(artifact)
	}
}

// vim: ts=4
