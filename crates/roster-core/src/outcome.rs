// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

/// Terminal result of provisioning one identity.
///
/// `Compensated` means the identity was created and then fully rolled
/// back after a later step failed; the remote account looks as if the
/// run never happened. `Failed` means the run could not even restore
/// that state and an operator should look at the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
	/// Identity exists with credential, membership attempt and a delivered
	/// notification.
	Succeeded,

	/// A step failed and every prior step was rolled back; the identity is
	/// absent from the directory.
	Compensated { reason: String },

	/// A step failed and rollback was impossible or itself failed.
	Failed { reason: String },
}

impl ProvisionOutcome {
	pub fn is_success(&self) -> bool {
		matches!(self, ProvisionOutcome::Succeeded)
	}

	/// The failure reason, if any.
	pub fn reason(&self) -> Option<&str> {
		match self {
			ProvisionOutcome::Succeeded => None,
			ProvisionOutcome::Compensated { reason } | ProvisionOutcome::Failed { reason } => {
				Some(reason)
			}
		}
	}
}

impl std::fmt::Display for ProvisionOutcome {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ProvisionOutcome::Succeeded => write!(f, "succeeded"),
			ProvisionOutcome::Compensated { reason } => write!(f, "rolled back: {reason}"),
			ProvisionOutcome::Failed { reason } => write!(f, "failed: {reason}"),
		}
	}
}
