// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! `roster`: bulk cloud-identity provisioning and teardown.
//!
//! Exit code is 0 only when every identity in the batch succeeded; any
//! per-identity failure yields exit code 1 so schedulers and scripts can
//! notice partial batches.

mod args;

use std::process::ExitCode;

use clap::Parser;
use roster_core::{
	teardown_all, teardown_batch, MembershipScope, ProvisionOutcome, ProvisionSettings,
	Provisioner,
};
use roster_directory::{IamDirectory, IamSettings, IdentityDirectory, MemoryDirectory};
use roster_notify::{LogNotifier, Notifier, SmtpConfig, SmtpNotifier};
use roster_secret::SecretString;
use roster_source::RosterFile;
use tracing_subscriber::EnvFilter;

use args::{Cli, Command, ProvisionArgs, TeardownArgs};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let cli = Cli::parse();
	match cli.command {
		Command::Provision(args) => provision(args).await,
		Command::Teardown(args) => teardown(args).await,
	}
}

async fn provision(args: ProvisionArgs) -> anyhow::Result<ExitCode> {
	let names = RosterFile::new(&args.source)
		.with_delimiter(args.delimiter)
		.with_column(args.column)
		.read()?;
	if names.is_empty() {
		println!("roster {} lists no identities", args.source.display());
		return Ok(ExitCode::SUCCESS);
	}

	let settings = ProvisionSettings {
		group: args.group.clone(),
		region: args.region.clone(),
	};

	if args.dry_run {
		let directory = MemoryDirectory::new();
		return run_provision(directory, LogNotifier, settings, &names).await;
	}

	let mut smtp = SmtpConfig::from_env()?;
	if let Some(sender) = args.sender {
		smtp = smtp.with_sender(sender, args.sender_password.map(SecretString::new));
	} else if let Some(password) = args.sender_password {
		smtp.password = Some(SecretString::new(password));
	}
	let notifier = SmtpNotifier::new(smtp)?;
	let directory = IamDirectory::connect(IamSettings::from_env()?).await;
	run_provision(directory, notifier, settings, &names).await
}

async fn run_provision<D, N>(
	directory: D,
	notifier: N,
	settings: ProvisionSettings,
	names: &[String],
) -> anyhow::Result<ExitCode>
where
	D: IdentityDirectory,
	N: Notifier,
{
	let provisioner = Provisioner::new(directory, notifier, settings);
	let outcomes = provisioner.provision_batch(names).await;

	let mut succeeded = 0usize;
	for (name, outcome) in &outcomes {
		match outcome {
			ProvisionOutcome::Succeeded => {
				succeeded += 1;
				println!("{name}: provisioned");
			}
			other => println!("{name}: {other}"),
		}
	}
	println!("provisioned {succeeded} of {} identities", outcomes.len());

	Ok(exit_for(succeeded, outcomes.len()))
}

async fn teardown(args: TeardownArgs) -> anyhow::Result<ExitCode> {
	let names = match &args.source {
		Some(path) => Some(
			RosterFile::new(path)
				.with_delimiter(args.delimiter)
				.with_column(args.column)
				.read()?,
		),
		None => None,
	};

	if args.dry_run {
		let directory = rehearsal_directory(names.as_deref().unwrap_or(&[]));
		return run_teardown(&directory, names).await;
	}

	let directory = IamDirectory::connect(IamSettings::from_env()?).await;
	run_teardown(&directory, names).await
}

async fn run_teardown<D>(directory: &D, names: Option<Vec<String>>) -> anyhow::Result<ExitCode>
where
	D: IdentityDirectory,
{
	let results = match names {
		Some(names) => teardown_batch(directory, &names, MembershipScope::All).await,
		None => teardown_all(directory).await?,
	};

	let mut succeeded = 0usize;
	for (name, result) in &results {
		match result {
			Ok(()) => {
				succeeded += 1;
				println!("{name}: deleted");
			}
			Err(error) => println!("{name}: deletion failed: {error}"),
		}
	}
	println!("deleted {succeeded} of {} identities", results.len());

	Ok(exit_for(succeeded, results.len()))
}

/// In-memory account pre-populated with the roster names, each holding
/// one credential and the default group membership, so a teardown dry
/// run walks the full dependency-ordered path for every name.
fn rehearsal_directory(names: &[String]) -> MemoryDirectory {
	let directory = MemoryDirectory::new();
	for (index, name) in names.iter().enumerate() {
		let key_id = format!("AKIA{index:016X}");
		directory.seed_identity(name, &[key_id.as_str()], &["students"]);
	}
	directory
}

fn exit_for(succeeded: usize, total: usize) -> ExitCode {
	if succeeded == total {
		ExitCode::SUCCESS
	} else {
		ExitCode::FAILURE
	}
}
