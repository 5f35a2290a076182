// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
	name = "roster",
	about = "Bulk cloud-identity provisioning and teardown",
	version
)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Provision every identity in a roster file and email each owner
	/// their credentials
	Provision(ProvisionArgs),

	/// Tear down identities from a roster file, or sweep the whole account
	Teardown(TeardownArgs),
}

#[derive(Debug, Args)]
pub struct ProvisionArgs {
	/// Roster file listing the identities to create
	#[arg(long)]
	pub source: PathBuf,

	/// Policy group every new identity is attached to
	#[arg(long, default_value = "students")]
	pub group: String,

	/// Region label included in the credential email
	#[arg(long, default_value = "eu-west-2")]
	pub region: String,

	/// Field separator of the roster file
	#[arg(long, default_value_t = ';')]
	pub delimiter: char,

	/// Zero-based column index holding the identity name
	#[arg(long, default_value_t = 3)]
	pub column: usize,

	/// Sender mailbox, overriding ROSTER_SMTP_FROM_ADDRESS and username
	#[arg(long)]
	pub sender: Option<String>,

	/// Sender password, overriding ROSTER_SMTP_PASSWORD
	#[arg(long, env = "ROSTER_SENDER_PASSWORD", hide_env_values = true)]
	pub sender_password: Option<String>,

	/// Rehearse against an in-memory directory, logging instead of
	/// emailing
	#[arg(long)]
	pub dry_run: bool,
}

#[derive(Debug, Args)]
#[command(group = ArgGroup::new("selection").required(true).multiple(false))]
pub struct TeardownArgs {
	/// Roster file listing the identities to delete
	#[arg(long, group = "selection")]
	pub source: Option<PathBuf>,

	/// Delete every identity in the account
	#[arg(long, group = "selection")]
	pub all: bool,

	/// Field separator of the roster file
	#[arg(long, default_value_t = ';')]
	pub delimiter: char,

	/// Zero-based column index holding the identity name
	#[arg(long, default_value_t = 3)]
	pub column: usize,

	/// Rehearse against an in-memory directory
	#[arg(long)]
	pub dry_run: bool,
}
