//! Network provider speaking the mirsync wire protocol over TCP
//!
//! One connection per provider, reused for every request. Requests are
//! strictly request/response, serialized through the connection lock.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use super::RemoteProvider;
use crate::error::SyncError;
use crate::protocol;
use crate::types::RemoteEntry;

#[derive(Debug)]
pub struct NetProvider {
	conn: Mutex<Connection>,
}

#[derive(Debug)]
struct Connection {
	send: OwnedWriteHalf,
	recv: BufReader<OwnedReadHalf>,
}

fn transport(e: std::io::Error) -> SyncError {
	SyncError::Transport { message: e.to_string() }
}

impl Connection {
	async fn send_line(&mut self, line: &str) -> Result<(), SyncError> {
		self.send.write_all(line.as_bytes()).await.map_err(transport)?;
		self.send.write_all(b"\n").await.map_err(transport)?;
		self.send.flush().await.map_err(transport)?;
		Ok(())
	}

	async fn read_line(&mut self) -> Result<String, SyncError> {
		let mut buf = String::new();
		let n = self.recv.read_line(&mut buf).await.map_err(transport)?;
		if n == 0 {
			return Err(SyncError::Transport {
				message: "connection closed by peer".to_string(),
			});
		}
		Ok(buf.trim_end_matches(['\r', '\n']).to_string())
	}
}

fn parse_field<T: std::str::FromStr>(value: &str, what: &str) -> Result<T, SyncError> {
	value.parse().map_err(|_| SyncError::Transport {
		message: format!("invalid {} in listing: {}", what, value),
	})
}

fn child_path(parent: Option<&str>, name: &str) -> String {
	match parent {
		Some(p) => format!("{}/{}", p, name),
		None => name.to_string(),
	}
}

impl NetProvider {
	/// Connect to a serving peer, verify the protocol greeting and select
	/// the served folder.
	pub async fn connect(host: &str, port: u16, folder: &str) -> Result<Self, SyncError> {
		let stream = TcpStream::connect((host, port)).await.map_err(transport)?;
		let (r, w) = stream.into_split();
		let mut conn = Connection { send: w, recv: BufReader::new(r) };

		let hello = conn.read_line().await?;
		let fields = protocol::split_line(&hello, 2)?;
		if fields[0] != "MIRSYNC" {
			return Err(SyncError::Transport {
				message: format!("unexpected greeting: {}", hello),
			});
		}
		let version: u8 = parse_field(fields[1], "protocol version")?;
		if version != protocol::PROTOCOL_VERSION {
			return Err(SyncError::Transport {
				message: format!(
					"protocol version mismatch: local={}, remote={}",
					protocol::PROTOCOL_VERSION,
					version
				),
			});
		}

		conn.send_line(&format!("FOLDER:{}", folder)).await?;
		let reply = conn.read_line().await?;
		if reply != "OK" {
			return Err(protocol::response_error(&reply));
		}

		Ok(NetProvider { conn: Mutex::new(conn) })
	}
}

#[async_trait]
impl RemoteProvider for NetProvider {
	async fn list(&self, path: Option<&str>) -> Result<Vec<RemoteEntry>, SyncError> {
		let mut conn = self.conn.lock().await;
		conn.send_line(&format!("LIST:{}", path.unwrap_or(""))).await?;

		let mut entries = Vec::new();
		loop {
			let line = conn.read_line().await?;
			if line == "." {
				break;
			}
			match line.split(':').next().unwrap_or("") {
				"F" => {
					let fields = protocol::split_line(&line, 4)?;
					let modified = parse_field(fields[1], "mtime")?;
					let length = parse_field(fields[2], "length")?;
					let name = fields[3].to_string();
					entries.push(RemoteEntry {
						path: child_path(path, &name),
						name,
						folder: false,
						length,
						modified,
					});
				}
				"D" => {
					let fields = protocol::split_line(&line, 3)?;
					let modified = parse_field(fields[1], "mtime")?;
					let name = fields[2].to_string();
					entries.push(RemoteEntry {
						path: child_path(path, &name),
						name,
						folder: true,
						length: 0,
						modified,
					});
				}
				"E" => return Err(protocol::response_error(&line)),
				_ => {
					return Err(SyncError::Transport {
						message: format!("unexpected listing line: {}", line),
					})
				}
			}
		}
		Ok(entries)
	}

	async fn checksum(&self, path: &str) -> Result<String, SyncError> {
		let mut conn = self.conn.lock().await;
		conn.send_line(&format!("SUM:{}", path)).await?;
		let reply = conn.read_line().await?;
		match reply.strip_prefix("OK:") {
			Some(digest) => Ok(digest.to_string()),
			None => Err(protocol::response_error(&reply)),
		}
	}

	async fn chunk(&self, path: &str, index: u32) -> Result<Vec<u8>, SyncError> {
		let mut conn = self.conn.lock().await;
		conn.send_line(&format!("PART:{}:{}", index, path)).await?;
		let reply = conn.read_line().await?;
		match reply.strip_prefix("C:") {
			Some(payload) => protocol::decode_chunk(payload),
			None => Err(protocol::response_error(&reply)),
		}
	}
}


// vim: ts=4
