//! Tree reconciliation and the per-folder sync session

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;

use crate::cache::ChunkCache;
use crate::config::FolderMapping;
use crate::error::SyncError;
use crate::logging::*;
use crate::provider::{ProviderFactory, RemoteProvider};
use crate::types::RemoteEntry;
use crate::util;

/// One configured folder mapping being mirrored from its source.
///
/// The resolved provider is cached across [`SyncFolder::sync`] calls.
/// Passes against the same sync root must not run concurrently; callers
/// serialize invocations per folder.
pub struct SyncFolder {
	name: String,
	store_folder: PathBuf,
	url: String,
	factory: ProviderFactory,
	provider: Option<Box<dyn RemoteProvider>>,
}

impl SyncFolder {
	pub fn new(mapping: &FolderMapping, factory: ProviderFactory) -> Self {
		SyncFolder {
			name: mapping.name.clone(),
			store_folder: mapping.store.clone(),
			url: mapping.url.clone(),
			factory,
			provider: None,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Run one full reconciliation pass for this folder.
	///
	/// Prepares the sync root, then drives the reconciler from the remote
	/// root down. Duration is reported whether the pass succeeds or fails.
	pub async fn sync(&mut self) -> Result<(), SyncError> {
		if self.provider.is_none() {
			debug!("resolving provider for {}", self.url);
			self.provider = Some(self.factory.resolve(&self.url).await?);
		}
		let Some(provider) = self.provider.as_deref() else {
			return Err(SyncError::Config {
				message: format!("no provider for source url: {}", self.url),
			});
		};

		let root = self.store_folder.join(&self.name);
		if !root.exists() {
			fs::create_dir_all(&root).await?;
		}
		if !root.is_dir() {
			return Err(SyncError::Config {
				message: format!("sync root must be a directory: {}", root.display()),
			});
		}
		let cache = ChunkCache::open(&self.store_folder).await?;

		info!("sync[{}] {} => {}", self.name, self.url, root.display());
		let started = Instant::now();
		let result = reconcile(provider, &cache, None, &root).await;
		match &result {
			Ok(()) => info!("sync[{}] finished in {:.2?}", self.name, started.elapsed()),
			Err(e) => {
				warn!("sync[{}] failed after {:.2?}: {}", self.name, started.elapsed(), e)
			}
		}
		result
	}
}

/// Recursively bring `target` to match the remote subtree rooted at
/// `entry`; `None` stands for the remote root.
pub fn reconcile<'a>(
	provider: &'a dyn RemoteProvider,
	cache: &'a ChunkCache,
	entry: Option<&'a RemoteEntry>,
	target: &'a Path,
) -> BoxFuture<'a, Result<(), SyncError>> {
	async move {
		match entry {
			Some(e) if !e.folder => sync_file(provider, cache, e, target).await,
			_ => sync_folder(provider, cache, entry, target).await,
		}
	}
	.boxed()
}

async fn sync_folder(
	provider: &dyn RemoteProvider,
	cache: &ChunkCache,
	entry: Option<&RemoteEntry>,
	target: &Path,
) -> Result<(), SyncError> {
	let remotes = provider.list(entry.map(|e| e.path.as_str())).await?;

	if target.is_file() {
		info!("remove file {}", target.display());
		fs::remove_file(target).await?;
	}
	if !target.exists() {
		info!("create folder {}", target.display());
		fs::create_dir(target).await?;
	}

	// Local names minus remote names are stale and get purged; then every
	// remote child is reconciled in listing order.
	let mut stale: BTreeSet<OsString> = BTreeSet::new();
	let mut rd = fs::read_dir(target).await?;
	while let Some(ent) = rd.next_entry().await? {
		stale.insert(ent.file_name());
	}
	for item in &remotes {
		stale.remove(OsStr::new(&item.name));
	}
	for name in &stale {
		let path = target.join(name);
		if path.is_dir() {
			info!("remove folder {}", path.display());
			fs::remove_dir_all(&path).await?;
		} else {
			info!("remove file {}", path.display());
			fs::remove_file(&path).await?;
		}
	}

	for item in &remotes {
		let child = target.join(&item.name);
		reconcile(provider, cache, Some(item), &child).await?;
	}
	Ok(())
}

async fn sync_file(
	provider: &dyn RemoteProvider,
	cache: &ChunkCache,
	entry: &RemoteEntry,
	target: &Path,
) -> Result<(), SyncError> {
	if is_same(entry, target).await? {
		return Ok(());
	}
	info!("sync file {} => {}", entry.path, target.display());

	let checksum = provider.checksum(&entry.path).await?;

	if target.is_dir() {
		info!("remove folder {}", target.display());
		fs::remove_dir_all(target).await?;
	}

	let local = match target.is_file() {
		true => Some(util::hash_file(target).await?),
		false => None,
	};
	if local.as_deref() != Some(checksum.as_str()) {
		let count = provider.chunk_count(entry.length);
		let artifact = cache.materialize(provider, &entry.path, &checksum, count).await?;
		if target.is_file() {
			fs::remove_file(target).await?;
		}
		// The target only ever changes through this single rename; an
		// observer never sees a half-written file at its final name.
		fs::rename(&artifact, target).await?;
	}

	// Stamping the remote mtime is what lets the next pass short-circuit
	// on the metadata comparison alone.
	set_modified(target, entry.modified)?;
	Ok(())
}

/// The cheap metadata gate: type, name, exact size and exact mtime match.
/// Content is never hashed here; a local edit that preserves all four goes
/// undetected until the remote side changes. Documented trade-off.
async fn is_same(entry: &RemoteEntry, target: &Path) -> Result<bool, SyncError> {
	let meta = match fs::metadata(target).await {
		Ok(m) => m,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
		Err(e) => return Err(e.into()),
	};
	if entry.folder != meta.is_dir() {
		return Ok(false);
	}
	if target.file_name().and_then(|n| n.to_str()) != Some(entry.name.as_str()) {
		return Ok(false);
	}
	Ok(entry.length == meta.len() && entry.modified == util::mtime_millis(&meta))
}

fn set_modified(path: &Path, millis: i64) -> Result<(), SyncError> {
	let ft = filetime::FileTime::from_unix_time(
		millis.div_euclid(1000),
		(millis.rem_euclid(1000) * 1_000_000) as u32,
	);
	filetime::set_file_mtime(path, ft)?;
	Ok(())
}


// vim: ts=4
