// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use roster_secret::SecretString;

use crate::error::DirectoryError;

/// A named principal in the remote account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
	pub name: String,
}

/// An access-key/secret-key pair bound to one identity.
///
/// The secret is only ever returned by [`IdentityDirectory::create_credential`];
/// enumeration yields key metadata without it, mirroring how IAM-style
/// directories behave.
#[derive(Debug, Clone)]
pub struct Credential {
	pub identity: String,
	pub key_id: String,
	pub secret: Option<SecretString>,
}

/// Remote identity-directory operations the orchestrators depend on.
///
/// Implementations are injected capabilities, never ambient globals: the
/// same orchestrator code runs against [`crate::MemoryDirectory`] in tests
/// and [`crate::IamDirectory`] in production.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
	/// Create a new identity. Fails with [`DirectoryError::AlreadyExists`]
	/// if the name is taken.
	async fn create_identity(&self, name: &str) -> Result<Identity, DirectoryError>;

	/// Create an access key for an existing identity.
	async fn create_credential(&self, identity: &str) -> Result<Credential, DirectoryError>;

	/// Add the identity to a pre-existing policy group. Returns whether the
	/// directory acknowledged the attachment.
	async fn add_membership(&self, group: &str, identity: &str) -> Result<bool, DirectoryError>;

	/// Remove the identity from a policy group.
	async fn remove_membership(&self, group: &str, identity: &str) -> Result<(), DirectoryError>;

	/// Delete one access key of an identity.
	async fn delete_credential(&self, key_id: &str, identity: &str) -> Result<(), DirectoryError>;

	/// Delete the identity itself. Directories reject this while the
	/// identity still owns credentials or memberships.
	async fn delete_identity(&self, name: &str) -> Result<(), DirectoryError>;

	/// Enumerate all access keys owned by the identity.
	async fn list_credentials(&self, identity: &str) -> Result<Vec<Credential>, DirectoryError>;

	/// Enumerate the names of every group the identity belongs to.
	async fn list_memberships(&self, identity: &str) -> Result<Vec<String>, DirectoryError>;

	/// Enumerate every identity name in the account.
	async fn list_identities(&self) -> Result<Vec<String>, DirectoryError>;
}
