// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use tracing::info;

use crate::{CredentialMessage, Notifier, NotifyError};

/// Notifier that logs instead of sending, for dry runs.
///
/// Only the key id is logged; the secret stays inside its wrapper.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
	async fn send(&self, to: &str, message: &CredentialMessage) -> Result<(), NotifyError> {
		info!(
			to = %to,
			identity = %message.identity,
			access_key_id = %message.access_key_id,
			region = %message.region,
			"dry run: credential delivery skipped"
		);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use roster_secret::SecretString;

	#[tokio::test]
	async fn always_reports_delivered() {
		let message = CredentialMessage {
			identity: "jane@example.com".to_string(),
			access_key_id: "AKIAEXAMPLE0001".to_string(),
			secret_access_key: SecretString::new("s3cr3t"),
			region: "eu-west-2".to_string(),
		};
		assert!(LogNotifier.send("jane@example.com", &message).await.is_ok());
	}
}
