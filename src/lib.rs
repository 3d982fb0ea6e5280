//! # mirsync - Checksum-Verified One-Way Directory Mirroring
//!
//! mirsync keeps a local directory tree identical to a remote tree,
//! transferring only files whose metadata changed, in fixed-size chunks
//! that are cached, resumable and verified against the remote checksum
//! before a single atomic rename replaces the target. The remote tree may
//! be another local path or a folder exposed by `mirsync serve` over TCP;
//! the engine is identical either way.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mirsync::config::FolderMapping;
//! use mirsync::provider::ProviderFactory;
//! use mirsync::sync::SyncFolder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mapping = FolderMapping {
//!         name: "docs".into(),
//!         store: "/data/mirror".into(),
//!         url: "from:backup.example.com:9958/docs".into(),
//!     };
//!     let mut folder = SyncFolder::new(&mapping, ProviderFactory::default());
//!     folder.sync().await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod provider;
pub mod serve;
pub mod sync;
pub mod types;
pub mod util;

// Re-export commonly used types
pub use config::Config;
pub use error::SyncError;
pub use provider::{ProviderFactory, RemoteProvider};
pub use sync::SyncFolder;
pub use types::RemoteEntry;

// vim: ts=4
