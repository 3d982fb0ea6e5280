//! TOML configuration: folder mappings and the serving section
//!
//! ```toml
//! truststore = "client.p12@secret"   # optional, TLS client transports
//!
//! [[folder]]
//! name = "docs"
//! store = "/data/mirror"
//! url = "from:backup.example.com:9958/docs"
//!
//! [server]
//! port = 9958
//! [server.folders]
//! docs = "/srv/docs"
//! ```

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::SyncError;

fn default_port() -> u16 {
	9958
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
	/// Folder mappings driven by the `sync` subcommand
	#[serde(default, rename = "folder")]
	pub folders: Vec<FolderMapping>,

	/// Serving section used by the `serve` subcommand
	#[serde(default)]
	pub server: Option<ServerConfig>,

	/// Truststore (`path@password`) for TLS client transports
	#[serde(default)]
	pub truststore: Option<String>,
}

/// One remote folder mirrored into a local store directory.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FolderMapping {
	pub name: String,

	/// Parent directory, holds the sync root `<store>/<name>` and the
	/// chunk cache beside it
	pub store: PathBuf,

	/// Source url: a local path or `from:<host>:<port>/<folder>`
	pub url: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
	#[serde(default = "default_port")]
	pub port: u16,

	/// Keystore (`path@password`) for TLS serving
	#[serde(default)]
	pub keystore: Option<String>,

	/// Served folders: name to local directory
	#[serde(default)]
	pub folders: BTreeMap<String, PathBuf>,
}

impl Config {
	pub fn load(path: &Path) -> Result<Self, SyncError> {
		let text = std::fs::read_to_string(path).map_err(|e| SyncError::Config {
			message: format!("cannot read {}: {}", path.display(), e),
		})?;
		let config: Config = toml::from_str(&text).map_err(|e| SyncError::Config {
			message: format!("cannot parse {}: {}", path.display(), e),
		})?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), SyncError> {
		let mut names = BTreeSet::new();
		for folder in &self.folders {
			// The name becomes a directory under the store, next to the
			// hidden cache directory.
			if folder.name.is_empty()
				|| folder.name.starts_with('.')
				|| folder.name.contains(['/', '\\'])
			{
				return Err(SyncError::Config {
					message: format!("invalid folder name: {:?}", folder.name),
				});
			}
			if !names.insert(folder.name.as_str()) {
				return Err(SyncError::Config {
					message: format!("duplicate folder name: {}", folder.name),
				});
			}
			if folder.store.as_os_str().is_empty() {
				return Err(SyncError::Config {
					message: format!("empty store path for folder: {}", folder.name),
				});
			}
			if folder.url.is_empty() {
				return Err(SyncError::Config {
					message: format!("empty source url for folder: {}", folder.name),
				});
			}
		}
		Ok(())
	}
}


// vim: ts=4
