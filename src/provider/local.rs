//! Local-filesystem provider
//!
//! Serves a directory tree on this machine through the [`RemoteProvider`]
//! contract. Also the backing store of the serve loop, which answers
//! network clients by delegating to one of these per served folder.

use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::RemoteProvider;
use crate::error::SyncError;
use crate::types::{RemoteEntry, CHUNK_SIZE};
use crate::util;

#[derive(Debug)]
pub struct LocalProvider {
	root: PathBuf,
}

impl LocalProvider {
	pub fn new(root: PathBuf) -> Self {
		LocalProvider { root }
	}

	/// Map an opaque remote identifier onto the provider root. Identifiers
	/// are relative, slash-separated and may not escape the root.
	fn resolve(&self, path: &str) -> Result<PathBuf, SyncError> {
		let rel = Path::new(path);
		for comp in rel.components() {
			match comp {
				Component::Normal(_) => {}
				_ => return Err(SyncError::NotFound { path: path.to_string() }),
			}
		}
		Ok(self.root.join(rel))
	}
}

fn map_fs_err(path: &str, e: std::io::Error) -> SyncError {
	if e.kind() == std::io::ErrorKind::NotFound {
		SyncError::NotFound { path: path.to_string() }
	} else {
		SyncError::Io(e)
	}
}

#[async_trait]
impl RemoteProvider for LocalProvider {
	async fn list(&self, path: Option<&str>) -> Result<Vec<RemoteEntry>, SyncError> {
		let (dir, prefix) = match path {
			Some(p) => (self.resolve(p)?, format!("{}/", p)),
			None => (self.root.clone(), String::new()),
		};
		let shown = path.unwrap_or("");

		let mut rd = fs::read_dir(&dir).await.map_err(|e| map_fs_err(shown, e))?;
		let mut entries = Vec::new();
		while let Some(ent) = rd.next_entry().await.map_err(|e| map_fs_err(shown, e))? {
			let name = match ent.file_name().into_string() {
				Ok(n) => n,
				Err(other) => {
					tracing::warn!("skipping non-UTF8 name: {:?}", other);
					continue;
				}
			};
			let ftype = ent.file_type().await.map_err(|e| map_fs_err(shown, e))?;
			if ftype.is_symlink() {
				// Symlinks are not mirrored.
				continue;
			}
			let meta = ent.metadata().await.map_err(|e| map_fs_err(shown, e))?;
			if !meta.is_dir() && !meta.is_file() {
				continue;
			}
			entries.push(RemoteEntry {
				path: format!("{}{}", prefix, name),
				name,
				folder: meta.is_dir(),
				length: if meta.is_dir() { 0 } else { meta.len() },
				modified: util::mtime_millis(&meta),
			});
		}
		entries.sort_by(|a, b| a.name.cmp(&b.name));
		Ok(entries)
	}

	async fn checksum(&self, path: &str) -> Result<String, SyncError> {
		let full = self.resolve(path)?;
		let meta = fs::metadata(&full).await.map_err(|e| map_fs_err(path, e))?;
		if !meta.is_file() {
			return Err(SyncError::NotFound { path: path.to_string() });
		}
		util::hash_file(&full).await
	}

	async fn chunk(&self, path: &str, index: u32) -> Result<Vec<u8>, SyncError> {
		let full = self.resolve(path)?;
		let meta = fs::metadata(&full).await.map_err(|e| map_fs_err(path, e))?;
		if !meta.is_file() {
			return Err(SyncError::NotFound { path: path.to_string() });
		}
		if index >= self.chunk_count(meta.len()) {
			return Err(SyncError::NotFound { path: format!("{}#{}", path, index) });
		}

		let offset = index as u64 * CHUNK_SIZE;
		let size = CHUNK_SIZE.min(meta.len() - offset) as usize;
		let mut f = fs::File::open(&full).await.map_err(|e| map_fs_err(path, e))?;
		f.seek(SeekFrom::Start(offset)).await?;
		let mut buf = vec![0u8; size];
		f.read_exact(&mut buf).await?;
		Ok(buf)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	async fn provider_with_tree() -> (TempDir, LocalProvider) {
		let tmp = TempDir::new().unwrap();
		tokio::fs::write(tmp.path().join("a.txt"), b"hello").await.unwrap();
		tokio::fs::create_dir(tmp.path().join("sub")).await.unwrap();
		tokio::fs::write(tmp.path().join("sub/b.txt"), b"bye").await.unwrap();
		let provider = LocalProvider::new(tmp.path().to_path_buf());
		(tmp, provider)
	}

	#[tokio::test]
	async fn test_list_root() {
		let (_tmp, provider) = provider_with_tree().await;
		let entries = provider.list(None).await.unwrap();
		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0].name, "a.txt");
		assert!(!entries[0].folder);
		assert_eq!(entries[0].length, 5);
		assert_eq!(entries[0].path, "a.txt");
		assert_eq!(entries[1].name, "sub");
		assert!(entries[1].folder);
	}

	#[tokio::test]
	async fn test_list_subdirectory_builds_child_paths() {
		let (_tmp, provider) = provider_with_tree().await;
		let entries = provider.list(Some("sub")).await.unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].path, "sub/b.txt");
		assert_eq!(entries[0].name, "b.txt");
		assert_eq!(entries[0].length, 3);
	}

	#[tokio::test]
	async fn test_list_missing_directory() {
		let (_tmp, provider) = provider_with_tree().await;
		let err = provider.list(Some("gone")).await.unwrap_err();
		assert!(matches!(err, SyncError::NotFound { .. }));
	}

	#[tokio::test]
	async fn test_checksum() {
		let (_tmp, provider) = provider_with_tree().await;
		let digest = provider.checksum("a.txt").await.unwrap();
		assert_eq!(digest, util::hash_bytes(b"hello"));
	}

	#[tokio::test]
	async fn test_checksum_of_directory_is_not_found() {
		let (_tmp, provider) = provider_with_tree().await;
		assert!(matches!(
			provider.checksum("sub").await.unwrap_err(),
			SyncError::NotFound { .. }
		));
	}

	#[tokio::test]
	async fn test_chunk_reads_content() {
		let (_tmp, provider) = provider_with_tree().await;
		assert_eq!(provider.chunk("a.txt", 0).await.unwrap(), b"hello");
	}

	#[tokio::test]
	async fn test_chunk_out_of_range() {
		let (_tmp, provider) = provider_with_tree().await;
		assert!(matches!(
			provider.chunk("a.txt", 1).await.unwrap_err(),
			SyncError::NotFound { .. }
		));
	}

	#[tokio::test]
	async fn test_chunk_boundaries() {
		let tmp = TempDir::new().unwrap();
		// One full chunk plus three bytes
		let content = vec![0x42u8; CHUNK_SIZE as usize + 3];
		tokio::fs::write(tmp.path().join("big.bin"), &content).await.unwrap();
		let provider = LocalProvider::new(tmp.path().to_path_buf());

		assert_eq!(provider.chunk_count(content.len() as u64), 2);
		assert_eq!(provider.chunk("big.bin", 0).await.unwrap().len(), CHUNK_SIZE as usize);
		assert_eq!(provider.chunk("big.bin", 1).await.unwrap(), vec![0x42u8; 3]);
	}

	#[tokio::test]
	async fn test_chunk_count_edges() {
		let (_tmp, provider) = provider_with_tree().await;
		assert_eq!(provider.chunk_count(0), 0);
		assert_eq!(provider.chunk_count(1), 1);
		assert_eq!(provider.chunk_count(CHUNK_SIZE), 1);
		assert_eq!(provider.chunk_count(CHUNK_SIZE + 1), 2);
	}

	#[tokio::test]
	async fn test_path_escape_is_rejected() {
		let (_tmp, provider) = provider_with_tree().await;
		assert!(provider.checksum("../a.txt").await.is_err());
		assert!(provider.checksum("/etc/passwd").await.is_err());
		assert!(provider.list(Some("sub/../..")).await.is_err());
	}
}

// vim: ts=4
