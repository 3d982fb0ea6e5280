//! Core data types for the mirror engine

/// Fixed chunk size in bytes. Remote files are transferred as a sequence of
/// slices of this size; only the last chunk of a file may be shorter.
pub const CHUNK_SIZE: u64 = 1 << 20;

/// One node of the remote tree as reported by a provider listing.
///
/// A snapshot, re-queried on every reconciliation pass. The `path` is an
/// opaque identifier handed back to the provider for subsequent calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEntry {
	/// Opaque remote identifier for follow-up provider calls
	pub path: String,

	/// Leaf name, unique among siblings
	pub name: String,

	/// Directory marker
	pub folder: bool,

	/// Byte size (0 for folders)
	pub length: u64,

	/// Modification time in unix milliseconds
	pub modified: i64,
}

// vim: ts=4
