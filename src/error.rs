//! Error types for mirsync operations

use std::error::Error;
use std::fmt;
use std::io;

/// Main error type for mirroring operations
#[derive(Debug)]
pub enum SyncError {
	/// Malformed source URL or unusable configuration
	Config { message: String },

	/// A referenced remote path vanished between listing and use
	NotFound { path: String },

	/// The network peer went away or violated the protocol
	Transport { message: String },

	/// Assembled file data does not match the expected checksum
	Integrity { path: String, expected: String, actual: String },

	/// Local filesystem failure
	Io(io::Error),
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::Config { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			SyncError::NotFound { path } => {
				write!(f, "Remote path not found: {}", path)
			}
			SyncError::Transport { message } => {
				write!(f, "Transport error: {}", message)
			}
			SyncError::Integrity { path, expected, actual } => {
				write!(
					f,
					"Checksum mismatch for {}: expected {}, got {}",
					path, expected, actual
				)
			}
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_display_integrity() {
		let e = SyncError::Integrity {
			path: "docs/a.txt".to_string(),
			expected: "aa".to_string(),
			actual: "bb".to_string(),
		};
		assert_eq!(e.to_string(), "Checksum mismatch for docs/a.txt: expected aa, got bb");
	}

	#[test]
	fn test_io_conversion() {
		let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
		let e: SyncError = io_err.into();
		assert!(matches!(e, SyncError::Io(_)));
		assert!(e.source().is_some());
	}
}

// vim: ts=4
