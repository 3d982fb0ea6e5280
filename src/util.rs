//! Checksum and metadata helpers

use std::path::Path;
use std::time::UNIX_EPOCH;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::SyncError;

/// Hex digest of an in-memory buffer.
pub fn hash_bytes(buf: &[u8]) -> String {
	hex::encode(blake3::hash(buf).as_bytes())
}

/// Hex digest of a file's content, computed streaming.
pub async fn hash_file(path: &Path) -> Result<String, SyncError> {
	let mut f = File::open(path).await?;
	let mut hasher = blake3::Hasher::new();
	let mut buf = vec![0u8; 64 * 1024];
	loop {
		let n = f.read(&mut buf).await?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
	}
	Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Modification time as unix milliseconds. Files older than the epoch or
/// without a readable mtime report 0.
pub fn mtime_millis(meta: &std::fs::Metadata) -> i64 {
	match meta.modified() {
		Ok(t) => match t.duration_since(UNIX_EPOCH) {
			Ok(d) => d.as_millis() as i64,
			Err(_) => 0,
		},
		Err(_) => 0,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hash_bytes_empty() {
		// BLAKE3 of the empty input
		assert_eq!(
			hash_bytes(b""),
			"af1349b9f5f9a1a6a0404dee36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
		);
	}

	#[test]
	fn test_hash_bytes_stable() {
		assert_eq!(hash_bytes(b"hello"), hash_bytes(b"hello"));
		assert_ne!(hash_bytes(b"hello"), hash_bytes(b"hellp"));
	}

	#[tokio::test]
	async fn test_hash_file_matches_hash_bytes() {
		let tmp = tempfile::TempDir::new().unwrap();
		let path = tmp.path().join("data.bin");
		let content = vec![0xA5u8; 200_000];
		tokio::fs::write(&path, &content).await.unwrap();

		assert_eq!(hash_file(&path).await.unwrap(), hash_bytes(&content));
	}
}

// vim: ts=4
