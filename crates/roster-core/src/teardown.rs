// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Teardown orchestrator.
//!
//! Removal is dependency-ordered: every credential, then the membership
//! edges, then the identity itself. The directory refuses to delete an
//! identity while dependents remain, so the order here is a correctness
//! requirement, not a style choice.

use roster_directory::{DirectoryError, IdentityDirectory};
use tracing::{debug, info, instrument};

/// Which membership edges teardown removes before deleting the identity.
///
/// `Group` removes the one configured policy group, matching what
/// provisioning attached; rollback of a fresh identity uses this.
/// `All` enumerates every membership first, for identities in unknown
/// states (by-list deletion and the whole-account sweep).
#[derive(Debug, Clone, Copy)]
pub enum MembershipScope<'a> {
	Group(&'a str),
	All,
}

/// Remove one identity and everything it owns.
///
/// Any step failure aborts this identity's teardown and is returned to
/// the caller; batch drivers treat it as that identity's failure only.
#[instrument(skip(directory), fields(identity = %name))]
pub async fn teardown_identity<D>(
	directory: &D,
	name: &str,
	scope: MembershipScope<'_>,
) -> Result<(), DirectoryError>
where
	D: IdentityDirectory + ?Sized,
{
	for credential in directory.list_credentials(name).await? {
		directory.delete_credential(&credential.key_id, name).await?;
		debug!(key_id = %credential.key_id, "credential deleted");
	}

	match scope {
		MembershipScope::Group(group) => {
			directory.remove_membership(group, name).await?;
			debug!(group = %group, "membership removed");
		}
		MembershipScope::All => {
			for group in directory.list_memberships(name).await? {
				directory.remove_membership(&group, name).await?;
				debug!(group = %group, "membership removed");
			}
		}
	}

	directory.delete_identity(name).await?;
	info!("identity deleted");
	Ok(())
}

/// Tear down each named identity in order, one result per name.
///
/// A failure on one identity never prevents the attempt on the next.
pub async fn teardown_batch<D>(
	directory: &D,
	names: &[String],
	scope: MembershipScope<'_>,
) -> Vec<(String, Result<(), DirectoryError>)>
where
	D: IdentityDirectory + ?Sized,
{
	let mut results = Vec::with_capacity(names.len());
	for name in names {
		let result = teardown_identity(directory, name, scope).await;
		if let Err(error) = &result {
			tracing::warn!(identity = %name, error = %error, "teardown failed");
		}
		results.push((name.clone(), result));
	}
	results
}

/// Whole-account sweep: enumerate every identity, then tear each down
/// with full membership removal.
///
/// Only the initial enumeration is fatal; per-identity failures are
/// reported in the returned sequence.
pub async fn teardown_all<D>(
	directory: &D,
) -> Result<Vec<(String, Result<(), DirectoryError>)>, DirectoryError>
where
	D: IdentityDirectory + ?Sized,
{
	let names = directory.list_identities().await?;
	info!(count = names.len(), "sweep enumerated identities");
	Ok(teardown_batch(directory, &names, MembershipScope::All).await)
}
