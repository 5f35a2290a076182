// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

/// Errors surfaced by an identity-directory backend.
///
/// Every remote operation reports through this one enum; the orchestrators
/// only ever convert these into per-identity outcomes, so the variants stay
/// coarse: enough to distinguish not-found from already-exists from plain
/// transport trouble, no more.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
	/// The named identity, credential or membership does not exist.
	#[error("not found: {0}")]
	NotFound(String),

	/// An identity with this name already exists.
	#[error("already exists: {0}")]
	AlreadyExists(String),

	/// The directory refused to delete an identity that still owns
	/// credentials or memberships.
	#[error("dependents still attached: {0}")]
	DependentsExist(String),

	/// The remote call did not complete within the configured deadline.
	#[error("operation timed out: {0}")]
	Timeout(String),

	/// Any other remote failure (network, auth, throttling, malformed
	/// response).
	#[error("directory error: {0}")]
	Transport(String),
}

impl DirectoryError {
	/// True for failures that mean "the thing was already gone", which a
	/// second teardown sweep is expected to produce rather than crash on.
	pub fn is_not_found(&self) -> bool {
		matches!(self, DirectoryError::NotFound(_))
	}
}
