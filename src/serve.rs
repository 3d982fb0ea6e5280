//! Serving mode: exposes configured folders to network clients
//!
//! Each accepted connection runs in its own task and talks the wire
//! protocol from [`crate::protocol`], answering from a [`LocalProvider`]
//! for the folder the client selected. Engine-level failures go back to
//! the client as `E:` lines; I/O failures end the connection.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

use crate::config::ServerConfig;
use crate::error::SyncError;
use crate::logging::*;
use crate::protocol;
use crate::provider::{LocalProvider, RemoteProvider};

/// Bind the configured port and serve forever.
pub async fn serve(config: ServerConfig) -> Result<(), SyncError> {
	if config.folders.is_empty() {
		return Err(SyncError::Config {
			message: "no served folders configured".to_string(),
		});
	}
	if config.keystore.is_some() {
		// TLS terminates in front of the server in this build.
		return Err(SyncError::Config {
			message: "keystore is configured but this build has no TLS transport".to_string(),
		});
	}
	let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
	for (name, root) in &config.folders {
		info!("serving folder {}: {}", name, root.display());
	}
	info!("listening on port {}", config.port);
	run(listener, config.folders).await
}

/// Accept loop, split from [`serve`] so tests can bind an ephemeral port.
pub async fn run(
	listener: TcpListener,
	folders: BTreeMap<String, PathBuf>,
) -> Result<(), SyncError> {
	let folders = Arc::new(folders);
	loop {
		let (stream, peer) = listener.accept().await?;
		let folders = Arc::clone(&folders);
		tokio::spawn(async move {
			debug!("client connected: {}", peer);
			match handle_client(stream, &folders).await {
				Ok(()) => debug!("client disconnected: {}", peer),
				Err(e) => warn!("client {} failed: {}", peer, e),
			}
		});
	}
}

async fn handle_client(
	stream: TcpStream,
	folders: &BTreeMap<String, PathBuf>,
) -> Result<(), SyncError> {
	let (r, w) = stream.into_split();
	let mut recv = BufReader::new(r);
	let mut send = w;

	send_line(&mut send, &protocol::greeting()).await?;

	// Folder selection comes first; every later request runs against it.
	let provider = loop {
		let Some(line) = read_line(&mut recv).await? else {
			return Ok(());
		};
		if line == "QUIT" {
			return Ok(());
		}
		let fields = match protocol::split_line(&line, 2) {
			Ok(f) => f,
			Err(_) => {
				send_line(&mut send, "E:FAIL:expected FOLDER selection").await?;
				continue;
			}
		};
		match fields[0] {
			"FOLDER" => match folders.get(fields[1]) {
				Some(root) => {
					send_line(&mut send, "OK").await?;
					break LocalProvider::new(root.clone());
				}
				None => {
					send_line(&mut send, &format!("E:NOTFOUND:no such folder: {}", fields[1]))
						.await?;
				}
			},
			_ => send_line(&mut send, "E:FAIL:expected FOLDER selection").await?,
		}
	};

	loop {
		let Some(line) = read_line(&mut recv).await? else {
			return Ok(());
		};
		if line == "QUIT" {
			return Ok(());
		}
		let result = match line.split(':').next().unwrap_or("") {
			"LIST" => handle_list(&provider, &line, &mut send).await,
			"SUM" => handle_sum(&provider, &line, &mut send).await,
			"PART" => handle_part(&provider, &line, &mut send).await,
			cmd => {
				send_line(&mut send, &format!("E:FAIL:unknown command: {}", cmd)).await?;
				Ok(())
			}
		};
		if let Err(e) = result {
			match e {
				SyncError::NotFound { path } => {
					send_line(&mut send, &format!("E:NOTFOUND:{}", path)).await?
				}
				SyncError::Io(e) => return Err(SyncError::Io(e)),
				other => send_line(&mut send, &format!("E:FAIL:{}", other)).await?,
			}
		}
	}
}

async fn handle_list(
	provider: &LocalProvider,
	line: &str,
	send: &mut OwnedWriteHalf,
) -> Result<(), SyncError> {
	let fields = protocol::split_line(line, 2)?;
	let path = match fields[1] {
		"" => None,
		p => Some(p),
	};
	let entries = provider.list(path).await?;
	for e in &entries {
		let reply = match e.folder {
			true => format!("D:{}:{}", e.modified, e.name),
			false => format!("F:{}:{}:{}", e.modified, e.length, e.name),
		};
		send_line(send, &reply).await?;
	}
	send_line(send, ".").await
}

async fn handle_sum(
	provider: &LocalProvider,
	line: &str,
	send: &mut OwnedWriteHalf,
) -> Result<(), SyncError> {
	let fields = protocol::split_line(line, 2)?;
	let digest = provider.checksum(fields[1]).await?;
	send_line(send, &format!("OK:{}", digest)).await
}

async fn handle_part(
	provider: &LocalProvider,
	line: &str,
	send: &mut OwnedWriteHalf,
) -> Result<(), SyncError> {
	let fields = protocol::split_line(line, 3)?;
	let Ok(index) = fields[1].parse::<u32>() else {
		return send_line(send, &format!("E:RANGE:invalid chunk index: {}", fields[1])).await;
	};
	let data = provider.chunk(fields[2], index).await?;
	send_line(send, &format!("C:{}", protocol::encode_chunk(&data))).await
}

async fn send_line(send: &mut OwnedWriteHalf, line: &str) -> Result<(), SyncError> {
	send.write_all(line.as_bytes()).await?;
	send.write_all(b"\n").await?;
	send.flush().await?;
	Ok(())
}

async fn read_line(recv: &mut BufReader<OwnedReadHalf>) -> Result<Option<String>, SyncError> {
	let mut buf = String::new();
	let n = recv.read_line(&mut buf).await?;
	if n == 0 {
		return Ok(None);
	}
	Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
}

// vim: ts=4
