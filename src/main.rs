use clap::{Arg, ArgAction, Command};
use std::error::Error;
use std::path::PathBuf;

use mirsync::logging;
use mirsync::provider::ProviderFactory;
use mirsync::sync::SyncFolder;
use mirsync::{serve, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	logging::init_tracing();

	let matches = Command::new("mirsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Checksum-verified one-way directory mirroring")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.default_value("mirsync.toml")
				.help("Configuration file"),
		)
		.subcommand(
			Command::new("sync").about("Mirror configured folders from their sources").arg(
				Arg::new("name")
					.action(ArgAction::Append)
					.num_args(0..)
					.help("Only sync the named folders"),
			),
		)
		.subcommand(Command::new("serve").about("Serve configured folders to network clients"))
		.get_matches();

	let config_path =
		matches.get_one::<String>("config").map(PathBuf::from).ok_or("config file required")?;
	let config = Config::load(&config_path)?;

	if let Some(sub) = matches.subcommand_matches("sync") {
		let only: Vec<&String> =
			sub.get_many::<String>("name").map(|v| v.collect()).unwrap_or_default();
		if config.folders.is_empty() {
			return Err("no folder mappings configured".into());
		}

		let factory = ProviderFactory::new(config.truststore.clone());
		let mut failed = false;
		for mapping in &config.folders {
			if !only.is_empty() && !only.iter().any(|n| n.as_str() == mapping.name) {
				continue;
			}
			let mut folder = SyncFolder::new(mapping, factory.clone());
			if let Err(e) = folder.sync().await {
				logging::error!("sync[{}] pass failed: {}", folder.name(), e);
				failed = true;
			}
		}
		if failed {
			return Err("one or more folders failed to sync".into());
		}
	} else if matches.subcommand_matches("serve").is_some() {
		let server = config.server.clone().ok_or("no [server] section in configuration")?;
		serve::serve(server).await?;
	}

	Ok(())
}

// vim: ts=4
