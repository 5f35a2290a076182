// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! In-memory directory backend.
//!
//! Behaves like the real thing where it matters to the orchestrators:
//! names are unique, credentials and memberships belong to an identity,
//! and identity deletion is refused while dependents remain. Failure
//! injection makes the partial-failure paths deterministic in tests, and
//! the CLI's dry-run mode rehearses a batch against this backend without
//! touching a real account.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use roster_secret::SecretString;
use tracing::debug;

use crate::directory::{Credential, Identity, IdentityDirectory};
use crate::error::DirectoryError;

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectoryOp {
	CreateIdentity,
	CreateCredential,
	AddMembership,
	RemoveMembership,
	DeleteCredential,
	DeleteIdentity,
	ListCredentials,
	ListMemberships,
	ListIdentities,
}

#[derive(Debug, Default)]
struct IdentityRecord {
	credentials: Vec<(String, SecretString)>,
	groups: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct State {
	identities: BTreeMap<String, IdentityRecord>,
	failures: HashSet<(DirectoryOp, String)>,
	key_counter: u64,
}

/// Shared, clonable in-memory directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
	state: Arc<Mutex<State>>,
}

impl MemoryDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Make `op` fail with a transport error whenever it targets `name`.
	///
	/// For membership operations `name` is the identity, not the group.
	/// [`DirectoryOp::ListIdentities`] ignores the name.
	pub fn fail_on(&self, op: DirectoryOp, name: &str) {
		let mut state = self.state.lock().expect("directory state poisoned");
		state.failures.insert((op, name.to_string()));
	}

	/// Stop failing `op` for `name`.
	pub fn clear_failure(&self, op: DirectoryOp, name: &str) {
		let mut state = self.state.lock().expect("directory state poisoned");
		state.failures.remove(&(op, name.to_string()));
	}

	/// Whether the identity currently exists.
	pub fn identity_exists(&self, name: &str) -> bool {
		let state = self.state.lock().expect("directory state poisoned");
		state.identities.contains_key(name)
	}

	/// Number of credentials currently held by the identity (0 if absent).
	pub fn credential_count(&self, name: &str) -> usize {
		let state = self.state.lock().expect("directory state poisoned");
		state
			.identities
			.get(name)
			.map(|record| record.credentials.len())
			.unwrap_or(0)
	}

	/// Group names the identity currently belongs to (empty if absent).
	pub fn memberships_of(&self, name: &str) -> Vec<String> {
		let state = self.state.lock().expect("directory state poisoned");
		state
			.identities
			.get(name)
			.map(|record| record.groups.iter().cloned().collect())
			.unwrap_or_default()
	}

	/// Seed an identity that already holds the given credentials and
	/// groups, for exercising teardown against pre-existing state.
	pub fn seed_identity(&self, name: &str, key_ids: &[&str], groups: &[&str]) {
		let mut state = self.state.lock().expect("directory state poisoned");
		let record = state.identities.entry(name.to_string()).or_default();
		for key_id in key_ids {
			record
				.credentials
				.push((key_id.to_string(), SecretString::new(random_secret())));
		}
		for group in groups {
			record.groups.insert(group.to_string());
		}
	}

	fn check(state: &State, op: DirectoryOp, name: &str) -> Result<(), DirectoryError> {
		if state.failures.contains(&(op, name.to_string())) {
			return Err(DirectoryError::Transport(format!(
				"injected failure: {op:?} for {name}"
			)));
		}
		Ok(())
	}
}

fn random_secret() -> String {
	let mut secret = String::with_capacity(40);
	for _ in 0..40 {
		let c = fastrand::alphanumeric();
		secret.push(c);
	}
	secret
}

#[async_trait]
impl IdentityDirectory for MemoryDirectory {
	async fn create_identity(&self, name: &str) -> Result<Identity, DirectoryError> {
		let mut state = self.state.lock().expect("directory state poisoned");
		Self::check(&state, DirectoryOp::CreateIdentity, name)?;
		if state.identities.contains_key(name) {
			return Err(DirectoryError::AlreadyExists(name.to_string()));
		}
		state
			.identities
			.insert(name.to_string(), IdentityRecord::default());
		debug!(identity = %name, "memory: identity created");
		Ok(Identity {
			name: name.to_string(),
		})
	}

	async fn create_credential(&self, identity: &str) -> Result<Credential, DirectoryError> {
		let mut state = self.state.lock().expect("directory state poisoned");
		Self::check(&state, DirectoryOp::CreateCredential, identity)?;
		state.key_counter += 1;
		let key_id = format!("AKIA{:016X}", state.key_counter);
		let secret = SecretString::new(random_secret());
		let record = state
			.identities
			.get_mut(identity)
			.ok_or_else(|| DirectoryError::NotFound(identity.to_string()))?;
		record.credentials.push((key_id.clone(), secret.clone()));
		Ok(Credential {
			identity: identity.to_string(),
			key_id,
			secret: Some(secret),
		})
	}

	async fn add_membership(&self, group: &str, identity: &str) -> Result<bool, DirectoryError> {
		let mut state = self.state.lock().expect("directory state poisoned");
		Self::check(&state, DirectoryOp::AddMembership, identity)?;
		let record = state
			.identities
			.get_mut(identity)
			.ok_or_else(|| DirectoryError::NotFound(identity.to_string()))?;
		record.groups.insert(group.to_string());
		Ok(true)
	}

	async fn remove_membership(&self, group: &str, identity: &str) -> Result<(), DirectoryError> {
		let mut state = self.state.lock().expect("directory state poisoned");
		Self::check(&state, DirectoryOp::RemoveMembership, identity)?;
		let record = state
			.identities
			.get_mut(identity)
			.ok_or_else(|| DirectoryError::NotFound(identity.to_string()))?;
		if !record.groups.remove(group) {
			return Err(DirectoryError::NotFound(format!(
				"{identity} is not in group {group}"
			)));
		}
		Ok(())
	}

	async fn delete_credential(&self, key_id: &str, identity: &str) -> Result<(), DirectoryError> {
		let mut state = self.state.lock().expect("directory state poisoned");
		Self::check(&state, DirectoryOp::DeleteCredential, identity)?;
		let record = state
			.identities
			.get_mut(identity)
			.ok_or_else(|| DirectoryError::NotFound(identity.to_string()))?;
		let before = record.credentials.len();
		record.credentials.retain(|(id, _)| id != key_id);
		if record.credentials.len() == before {
			return Err(DirectoryError::NotFound(format!(
				"credential {key_id} for {identity}"
			)));
		}
		Ok(())
	}

	async fn delete_identity(&self, name: &str) -> Result<(), DirectoryError> {
		let mut state = self.state.lock().expect("directory state poisoned");
		Self::check(&state, DirectoryOp::DeleteIdentity, name)?;
		let record = state
			.identities
			.get(name)
			.ok_or_else(|| DirectoryError::NotFound(name.to_string()))?;
		if !record.credentials.is_empty() || !record.groups.is_empty() {
			return Err(DirectoryError::DependentsExist(name.to_string()));
		}
		state.identities.remove(name);
		debug!(identity = %name, "memory: identity deleted");
		Ok(())
	}

	async fn list_credentials(&self, identity: &str) -> Result<Vec<Credential>, DirectoryError> {
		let state = self.state.lock().expect("directory state poisoned");
		Self::check(&state, DirectoryOp::ListCredentials, identity)?;
		let record = state
			.identities
			.get(identity)
			.ok_or_else(|| DirectoryError::NotFound(identity.to_string()))?;
		Ok(record
			.credentials
			.iter()
			.map(|(key_id, _)| Credential {
				identity: identity.to_string(),
				key_id: key_id.clone(),
				secret: None,
			})
			.collect())
	}

	async fn list_memberships(&self, identity: &str) -> Result<Vec<String>, DirectoryError> {
		let state = self.state.lock().expect("directory state poisoned");
		Self::check(&state, DirectoryOp::ListMemberships, identity)?;
		let record = state
			.identities
			.get(identity)
			.ok_or_else(|| DirectoryError::NotFound(identity.to_string()))?;
		Ok(record.groups.iter().cloned().collect())
	}

	async fn list_identities(&self) -> Result<Vec<String>, DirectoryError> {
		let state = self.state.lock().expect("directory state poisoned");
		Self::check(&state, DirectoryOp::ListIdentities, "")?;
		Ok(state.identities.keys().cloned().collect())
	}
}
