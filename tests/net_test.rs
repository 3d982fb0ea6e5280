//! Client and server talking the real wire protocol over a loopback
//! socket bound to an ephemeral port.

use filetime::FileTime;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::net::TcpListener;

use mirsync::config::FolderMapping;
use mirsync::provider::{NetProvider, ProviderFactory};
use mirsync::sync::SyncFolder;
use mirsync::{serve, RemoteProvider, SyncError};

fn write_file(path: &Path, content: &[u8], mtime_millis: i64) {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent).unwrap();
	}
	fs::write(path, content).unwrap();
	let ft = FileTime::from_unix_time(
		mtime_millis.div_euclid(1000),
		(mtime_millis.rem_euclid(1000) * 1_000_000) as u32,
	);
	filetime::set_file_mtime(path, ft).unwrap();
}

/// Serve `root` as folder "data" on an ephemeral loopback port.
async fn spawn_server(root: PathBuf) -> u16 {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let port = listener.local_addr().unwrap().port();
	let mut folders = BTreeMap::new();
	folders.insert("data".to_string(), root);
	tokio::spawn(async move {
		let _ = serve::run(listener, folders).await;
	});
	port
}

#[tokio::test]
async fn test_connect_unknown_folder() {
	let remote = TempDir::new().unwrap();
	let port = spawn_server(remote.path().to_path_buf()).await;

	let err = NetProvider::connect("127.0.0.1", port, "nope").await.unwrap_err();
	assert!(matches!(err, SyncError::NotFound { .. }));
}

#[tokio::test]
async fn test_list_over_wire() {
	let remote = TempDir::new().unwrap();
	write_file(&remote.path().join("a.txt"), b"hello", 1000);
	fs::create_dir(remote.path().join("sub")).unwrap();
	write_file(&remote.path().join("sub/b.txt"), b"bye", 2000);
	let port = spawn_server(remote.path().to_path_buf()).await;

	let provider = NetProvider::connect("127.0.0.1", port, "data").await.unwrap();

	let root = provider.list(None).await.unwrap();
	assert_eq!(root.len(), 2);
	assert_eq!(root[0].name, "a.txt");
	assert!(!root[0].folder);
	assert_eq!(root[0].length, 5);
	assert_eq!(root[0].modified, 1000);
	assert_eq!(root[1].name, "sub");
	assert!(root[1].folder);

	let sub = provider.list(Some(&root[1].path)).await.unwrap();
	assert_eq!(sub.len(), 1);
	assert_eq!(sub[0].path, "sub/b.txt");
	assert_eq!(sub[0].length, 3);
}

#[tokio::test]
async fn test_checksum_and_chunk_over_wire() {
	let remote = TempDir::new().unwrap();
	write_file(&remote.path().join("a.txt"), b"hello", 1000);
	let port = spawn_server(remote.path().to_path_buf()).await;

	let provider = NetProvider::connect("127.0.0.1", port, "data").await.unwrap();

	let digest = provider.checksum("a.txt").await.unwrap();
	assert_eq!(digest, mirsync::util::hash_bytes(b"hello"));

	let chunk = provider.chunk("a.txt", 0).await.unwrap();
	assert_eq!(chunk, b"hello");
}

#[tokio::test]
async fn test_errors_over_wire_keep_connection_usable() {
	let remote = TempDir::new().unwrap();
	write_file(&remote.path().join("a.txt"), b"hello", 1000);
	let port = spawn_server(remote.path().to_path_buf()).await;

	let provider = NetProvider::connect("127.0.0.1", port, "data").await.unwrap();

	let err = provider.checksum("missing.txt").await.unwrap_err();
	assert!(matches!(err, SyncError::NotFound { .. }));

	let err = provider.chunk("a.txt", 7).await.unwrap_err();
	assert!(matches!(err, SyncError::NotFound { .. }));

	// The connection survives engine-level errors
	assert_eq!(provider.chunk("a.txt", 0).await.unwrap(), b"hello");
}

#[tokio::test]
async fn test_names_with_colons_over_wire() {
	let remote = TempDir::new().unwrap();
	write_file(&remote.path().join("odd:name.txt"), b"colon", 1000);
	let port = spawn_server(remote.path().to_path_buf()).await;

	let provider = NetProvider::connect("127.0.0.1", port, "data").await.unwrap();

	let root = provider.list(None).await.unwrap();
	assert_eq!(root[0].name, "odd:name.txt");
	assert_eq!(provider.chunk("odd:name.txt", 0).await.unwrap(), b"colon");
}

#[tokio::test]
async fn test_end_to_end_sync_over_tcp() {
	let remote = TempDir::new().unwrap();
	let store = TempDir::new().unwrap();
	write_file(&remote.path().join("a.txt"), b"hello", 1000);
	write_file(&remote.path().join("sub/b.txt"), b"bye", 2000);
	let port = spawn_server(remote.path().to_path_buf()).await;

	let mapping = FolderMapping {
		name: "mirror".to_string(),
		store: store.path().to_path_buf(),
		url: format!("from:127.0.0.1:{}/data", port),
	};
	let mut folder = SyncFolder::new(&mapping, ProviderFactory::default());
	folder.sync().await.unwrap();

	let root = store.path().join("mirror");
	assert_eq!(fs::read(root.join("a.txt")).unwrap(), b"hello");
	assert_eq!(fs::read(root.join("sub/b.txt")).unwrap(), b"bye");

	// Second pass over the same connection, after a change and a delete
	write_file(&remote.path().join("a.txt"), b"changed", 3000);
	fs::remove_dir_all(remote.path().join("sub")).unwrap();
	folder.sync().await.unwrap();

	assert_eq!(fs::read(root.join("a.txt")).unwrap(), b"changed");
	assert!(!root.join("sub").exists());
}

// vim: ts=4
