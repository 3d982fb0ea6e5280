//! Wire protocol shared by the network provider and the serve loop
//!
//! One request or response per line. Lines are colon-separated fields with
//! the path or name always in the final position, so it may itself contain
//! colons. Chunk payloads travel base64-encoded on a single `C:` line.
//!
//! Requests:
//! ```text
//! FOLDER:<name>          select the served folder (first request)
//! LIST:                  list the remote root
//! LIST:<path>            list a remote directory
//! SUM:<path>             checksum of a remote file
//! PART:<index>:<path>    one chunk of a remote file
//! QUIT                   close the connection
//! ```
//!
//! Responses:
//! ```text
//! MIRSYNC:<version>         greeting, sent on connect
//! OK                        folder accepted
//! OK:<hex>                  checksum reply
//! F:<mtime>:<length>:<name> listing entry (file)
//! D:<mtime>:<name>          listing entry (folder)
//! .                         end of listing
//! C:<base64>                chunk payload
//! E:<KIND>:<message>        error reply (NOTFOUND, RANGE or FAIL)
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::SyncError;

/// Protocol version announced in the server greeting.
pub const PROTOCOL_VERSION: u8 = 1;

/// Greeting line sent by the server on connect.
pub fn greeting() -> String {
	format!("MIRSYNC:{}", PROTOCOL_VERSION)
}

/// Split a protocol line into exactly `fields` colon-separated fields.
///
/// The final field keeps any embedded colons, which is what lets paths and
/// names travel unescaped.
pub fn split_line(line: &str, fields: usize) -> Result<Vec<&str>, SyncError> {
	let parts: Vec<&str> =
		line.trim_end_matches(['\r', '\n']).splitn(fields, ':').collect();
	if parts.len() < fields {
		return Err(SyncError::Transport {
			message: format!(
				"expected {} fields, got {} in line: {}",
				fields,
				parts.len(),
				line.trim_end()
			),
		});
	}
	Ok(parts)
}

/// Encode a chunk payload for a `C:` line.
pub fn encode_chunk(data: &[u8]) -> String {
	BASE64.encode(data)
}

/// Decode a chunk payload from a `C:` line.
pub fn decode_chunk(b64: &str) -> Result<Vec<u8>, SyncError> {
	BASE64.decode(b64.trim()).map_err(|e| SyncError::Transport {
		message: format!("invalid chunk payload: {}", e),
	})
}

/// Map an error reply to the engine error it stands for.
///
/// `E:NOTFOUND` and `E:RANGE` become [`SyncError::NotFound`]; every other
/// well-formed `E:` line, and anything that is not one, is a transport
/// violation.
pub fn response_error(line: &str) -> SyncError {
	if let Ok(fields) = split_line(line, 3) {
		if fields[0] == "E" {
			return match fields[1] {
				"NOTFOUND" | "RANGE" => SyncError::NotFound { path: fields[2].to_string() },
				_ => SyncError::Transport { message: fields[2].to_string() },
			};
		}
	}
	SyncError::Transport { message: format!("unexpected reply: {}", line.trim_end()) }
}


// vim: ts=4
