// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Provisioning orchestrator.
//!
//! For each identity the steps run strictly in order: create identity,
//! create credential, attach to the policy group, deliver the credential.
//! Failures compensate whatever was created so far, in reverse dependency
//! order, so a `Compensated` outcome leaves the account as if the run
//! never happened.
//!
//! One asymmetry is deliberate and load-bearing: a failed group
//! attachment is logged and the workflow continues to delivery, while a
//! failed delivery rolls the whole identity back. Revisit only together
//! with the requirements, not as a drive-by fix.

use roster_directory::{DirectoryError, IdentityDirectory};
use roster_notify::{CredentialMessage, Notifier};
use tracing::{info, instrument, warn};

use crate::outcome::ProvisionOutcome;
use crate::teardown::{teardown_identity, MembershipScope};

/// Knobs shared by provisioning and its rollback path.
///
/// The policy group is configured once here precisely so the create and
/// compensate paths cannot drift apart.
#[derive(Debug, Clone)]
pub struct ProvisionSettings {
	/// Policy group every new identity is attached to.
	pub group: String,
	/// Region label included in the credential message.
	pub region: String,
}

impl Default for ProvisionSettings {
	fn default() -> Self {
		Self {
			group: "students".to_string(),
			region: "eu-west-2".to_string(),
		}
	}
}

/// Drives the create → attach → notify workflow per identity.
pub struct Provisioner<D, N> {
	directory: D,
	notifier: N,
	settings: ProvisionSettings,
}

impl<D, N> Provisioner<D, N>
where
	D: IdentityDirectory,
	N: Notifier,
{
	pub fn new(directory: D, notifier: N, settings: ProvisionSettings) -> Self {
		Self {
			directory,
			notifier,
			settings,
		}
	}

	pub fn settings(&self) -> &ProvisionSettings {
		&self.settings
	}

	/// Provision one identity end to end.
	///
	/// Every error is absorbed into the returned outcome; callers can
	/// always continue with the next identity in the batch.
	#[instrument(skip(self), fields(identity = %name, group = %self.settings.group))]
	pub async fn provision(&self, name: &str) -> ProvisionOutcome {
		// Step 1: create the identity. Nothing exists yet, so a failure
		// here has nothing to compensate.
		let identity = match self.directory.create_identity(name).await {
			Ok(identity) => identity,
			Err(error) => {
				warn!(error = %error, "identity creation failed");
				return ProvisionOutcome::Failed {
					reason: error.to_string(),
				};
			}
		};
		info!(identity = %identity.name, "identity created");

		// Step 2: create the credential; on failure only the identity
		// needs deleting.
		let credential = match self.directory.create_credential(name).await {
			Ok(credential) => credential,
			Err(error) => {
				warn!(error = %error, "credential creation failed, rolling back identity");
				return self.rollback_identity_only(name, error).await;
			}
		};
		info!(key_id = %credential.key_id, "credential created");

		// Step 3: attach to the policy group. Attachment failure does not
		// roll back; delivery failure below does.
		match self.directory.add_membership(&self.settings.group, name).await {
			Ok(true) => info!("attached to policy group"),
			Ok(false) => warn!("policy group attachment not acknowledged, continuing"),
			Err(error) => warn!(error = %error, "policy group attachment failed, continuing"),
		}

		// Step 4: deliver the credential to the owner.
		let Some(secret) = credential.secret else {
			return self
				.rollback_full(name, "directory returned a credential without its secret".to_string())
				.await;
		};
		let message = CredentialMessage {
			identity: name.to_string(),
			access_key_id: credential.key_id,
			secret_access_key: secret,
			region: self.settings.region.clone(),
		};
		match self.notifier.send(name, &message).await {
			Ok(()) => {
				info!("owner notified");
				ProvisionOutcome::Succeeded
			}
			Err(error) => {
				warn!(error = %error, "credential delivery failed, rolling back identity");
				self.rollback_full(name, error.to_string()).await
			}
		}
	}

	/// Provision every name in order. A failure for one identity never
	/// prevents the attempt on the next; outcomes keep input order.
	pub async fn provision_batch(&self, names: &[String]) -> Vec<(String, ProvisionOutcome)> {
		let mut outcomes = Vec::with_capacity(names.len());
		for name in names {
			let outcome = self.provision(name).await;
			outcomes.push((name.clone(), outcome));
		}
		outcomes
	}

	async fn rollback_identity_only(
		&self,
		name: &str,
		cause: DirectoryError,
	) -> ProvisionOutcome {
		match self.directory.delete_identity(name).await {
			Ok(()) => {
				info!("identity rolled back");
				ProvisionOutcome::Compensated {
					reason: cause.to_string(),
				}
			}
			Err(rollback_error) => ProvisionOutcome::Failed {
				reason: format!("{cause}; rollback failed: {rollback_error}"),
			},
		}
	}

	async fn rollback_full(&self, name: &str, cause: String) -> ProvisionOutcome {
		let scope = MembershipScope::Group(&self.settings.group);
		match teardown_identity(&self.directory, name, scope).await {
			Ok(()) => {
				info!("identity rolled back");
				ProvisionOutcome::Compensated { reason: cause }
			}
			Err(rollback_error) => ProvisionOutcome::Failed {
				reason: format!("{cause}; rollback failed: {rollback_error}"),
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use roster_directory::{DirectoryOp, MemoryDirectory};
	use roster_notify::NotifyError;
	use std::collections::HashSet;
	use std::sync::Mutex;

	/// Notifier that records deliveries and fails for configured targets.
	#[derive(Debug, Default)]
	struct RecordingNotifier {
		fail_for: HashSet<String>,
		sent: Mutex<Vec<String>>,
	}

	impl RecordingNotifier {
		fn failing_for(names: &[&str]) -> Self {
			Self {
				fail_for: names.iter().map(|n| n.to_string()).collect(),
				sent: Mutex::new(Vec::new()),
			}
		}

		fn sent_to(&self) -> Vec<String> {
			self.sent.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl Notifier for &RecordingNotifier {
		async fn send(&self, to: &str, _message: &CredentialMessage) -> Result<(), NotifyError> {
			if self.fail_for.contains(to) {
				return Err(NotifyError::Send(format!("mailbox {to} rejected")));
			}
			self.sent.lock().unwrap().push(to.to_string());
			Ok(())
		}
	}

	fn provisioner<'a>(
		directory: &MemoryDirectory,
		notifier: &'a RecordingNotifier,
	) -> Provisioner<MemoryDirectory, &'a RecordingNotifier> {
		Provisioner::new(directory.clone(), notifier, ProvisionSettings::default())
	}

	fn names(list: &[&str]) -> Vec<String> {
		list.iter().map(|n| n.to_string()).collect()
	}

	#[tokio::test]
	async fn all_steps_succeed_for_every_identity() {
		// Scenario: clean directory, working notifier, two identities.
		let directory = MemoryDirectory::new();
		let notifier = RecordingNotifier::default();
		let provisioner = provisioner(&directory, &notifier);

		let outcomes = provisioner
			.provision_batch(&names(&["alice@example.com", "bob@example.com"]))
			.await;

		assert!(outcomes.iter().all(|(_, o)| o.is_success()));
		for name in ["alice@example.com", "bob@example.com"] {
			assert!(directory.identity_exists(name));
			assert_eq!(directory.credential_count(name), 1);
			assert_eq!(directory.memberships_of(name), vec!["students"]);
		}
		assert_eq!(
			notifier.sent_to(),
			vec!["alice@example.com", "bob@example.com"]
		);
	}

	#[tokio::test]
	async fn delivery_failure_rolls_back_only_that_identity() {
		// Scenario: notifier fails for bob only; alice keeps everything,
		// bob is fully absent afterwards.
		let directory = MemoryDirectory::new();
		let notifier = RecordingNotifier::failing_for(&["bob@example.com"]);
		let provisioner = provisioner(&directory, &notifier);

		let outcomes = provisioner
			.provision_batch(&names(&["alice@example.com", "bob@example.com"]))
			.await;

		assert!(outcomes[0].1.is_success());
		assert!(matches!(
			outcomes[1].1,
			ProvisionOutcome::Compensated { .. }
		));

		assert!(directory.identity_exists("alice@example.com"));
		assert_eq!(directory.credential_count("alice@example.com"), 1);

		assert!(!directory.identity_exists("bob@example.com"));
		assert_eq!(directory.credential_count("bob@example.com"), 0);
	}

	#[tokio::test]
	async fn credential_failure_rolls_back_the_identity() {
		// Scenario: credential creation fails; no identity and no
		// credential may remain.
		let directory = MemoryDirectory::new();
		directory.fail_on(DirectoryOp::CreateCredential, "alice@example.com");
		let notifier = RecordingNotifier::default();
		let provisioner = provisioner(&directory, &notifier);

		let outcome = provisioner.provision("alice@example.com").await;

		assert!(matches!(outcome, ProvisionOutcome::Compensated { .. }));
		assert!(!directory.identity_exists("alice@example.com"));
		assert_eq!(directory.credential_count("alice@example.com"), 0);
		assert!(notifier.sent_to().is_empty());
	}

	#[tokio::test]
	async fn identity_creation_failure_is_failed_without_rollback() {
		let directory = MemoryDirectory::new();
		directory.fail_on(DirectoryOp::CreateIdentity, "alice@example.com");
		let notifier = RecordingNotifier::default();
		let provisioner = provisioner(&directory, &notifier);

		let outcome = provisioner.provision("alice@example.com").await;
		assert!(matches!(outcome, ProvisionOutcome::Failed { .. }));
		assert!(!directory.identity_exists("alice@example.com"));
	}

	#[tokio::test]
	async fn duplicate_identity_is_reported_not_compensated() {
		let directory = MemoryDirectory::new();
		directory.seed_identity("alice@example.com", &[], &[]);
		let notifier = RecordingNotifier::default();
		let provisioner = provisioner(&directory, &notifier);

		let outcome = provisioner.provision("alice@example.com").await;
		let reason = outcome.reason().unwrap().to_string();
		assert!(matches!(outcome, ProvisionOutcome::Failed { .. }));
		assert!(reason.contains("already exists"));
		// The pre-existing identity is untouched.
		assert!(directory.identity_exists("alice@example.com"));
	}

	#[tokio::test]
	async fn attachment_failure_does_not_roll_back() {
		// The asymmetric policy: attachment failure is logged and the
		// workflow continues to delivery.
		let directory = MemoryDirectory::new();
		directory.fail_on(DirectoryOp::AddMembership, "alice@example.com");
		let notifier = RecordingNotifier::default();
		let provisioner = provisioner(&directory, &notifier);

		let outcome = provisioner.provision("alice@example.com").await;

		assert!(outcome.is_success());
		assert!(directory.identity_exists("alice@example.com"));
		assert_eq!(directory.credential_count("alice@example.com"), 1);
		assert!(directory.memberships_of("alice@example.com").is_empty());
		assert_eq!(notifier.sent_to(), vec!["alice@example.com"]);
	}

	#[tokio::test]
	async fn attachment_and_delivery_both_failing_is_failed() {
		// Delivery failure triggers rollback, but the rollback's membership
		// removal finds no edge to remove, so the run ends Failed and the
		// leftover state is visible to the operator.
		let directory = MemoryDirectory::new();
		directory.fail_on(DirectoryOp::AddMembership, "alice@example.com");
		let notifier = RecordingNotifier::failing_for(&["alice@example.com"]);
		let provisioner = provisioner(&directory, &notifier);

		let outcome = provisioner.provision("alice@example.com").await;
		assert!(matches!(outcome, ProvisionOutcome::Failed { .. }));
		assert!(outcome.reason().unwrap().contains("rollback failed"));
	}

	#[tokio::test]
	async fn rollback_failure_surfaces_both_causes() {
		let directory = MemoryDirectory::new();
		directory.fail_on(DirectoryOp::CreateCredential, "alice@example.com");
		directory.fail_on(DirectoryOp::DeleteIdentity, "alice@example.com");
		let notifier = RecordingNotifier::default();
		let provisioner = provisioner(&directory, &notifier);

		let outcome = provisioner.provision("alice@example.com").await;
		let reason = outcome.reason().unwrap();
		assert!(matches!(outcome, ProvisionOutcome::Failed { .. }));
		assert!(reason.contains("rollback failed"));
	}

	#[tokio::test]
	async fn batch_isolation_holds_across_mixed_failures() {
		// One outcome per input name, in input order, whatever fails.
		let directory = MemoryDirectory::new();
		directory.fail_on(DirectoryOp::CreateIdentity, "b@example.com");
		directory.fail_on(DirectoryOp::CreateCredential, "c@example.com");
		let notifier = RecordingNotifier::failing_for(&["d@example.com"]);
		let provisioner = provisioner(&directory, &notifier);

		let batch = names(&[
			"a@example.com",
			"b@example.com",
			"c@example.com",
			"d@example.com",
			"e@example.com",
		]);
		let outcomes = provisioner.provision_batch(&batch).await;

		assert_eq!(outcomes.len(), batch.len());
		let batch_names: Vec<&str> = outcomes.iter().map(|(n, _)| n.as_str()).collect();
		assert_eq!(
			batch_names,
			vec![
				"a@example.com",
				"b@example.com",
				"c@example.com",
				"d@example.com",
				"e@example.com"
			]
		);

		assert!(outcomes[0].1.is_success());
		assert!(matches!(outcomes[1].1, ProvisionOutcome::Failed { .. }));
		assert!(matches!(outcomes[2].1, ProvisionOutcome::Compensated { .. }));
		assert!(matches!(outcomes[3].1, ProvisionOutcome::Compensated { .. }));
		assert!(outcomes[4].1.is_success());

		// No orphans: compensated identities are fully absent.
		for name in ["b@example.com", "c@example.com", "d@example.com"] {
			assert!(!directory.identity_exists(name));
			assert_eq!(directory.credential_count(name), 0);
		}
	}

	#[tokio::test]
	async fn compensated_outcome_leaves_no_credentials_behind() {
		// No-orphan property over a spread of failure points.
		for op in [DirectoryOp::CreateCredential, DirectoryOp::AddMembership] {
			let directory = MemoryDirectory::new();
			directory.fail_on(op, "alice@example.com");
			let notifier = RecordingNotifier::failing_for(&["alice@example.com"]);
			let provisioner = provisioner(&directory, &notifier);

			let outcome = provisioner.provision("alice@example.com").await;
			assert!(!outcome.is_success());
			assert_eq!(directory.credential_count("alice@example.com"), 0);
		}
	}
}
