// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Credential delivery for Roster.
//!
//! A [`Notifier`] delivers a freshly minted credential to its owner.
//! Delivery failures are values, never panics; the provisioning
//! orchestrator turns them into a compensated rollback. [`SmtpNotifier`]
//! is the production implementation, [`LogNotifier`] stands in for dry
//! runs.

mod log;
mod smtp;

use async_trait::async_trait;
use roster_secret::SecretString;

pub use log::LogNotifier;
pub use smtp::{SmtpConfig, SmtpNotifier};

/// Errors that can occur while delivering a credential message.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
	/// Failed to connect to the mail server.
	#[error("connection failed: {0}")]
	Connection(String),

	/// Authentication with the mail server failed.
	#[error("authentication failed: {0}")]
	Auth(String),

	/// The message was refused or could not be sent.
	#[error("send failed: {0}")]
	Send(String),

	/// Invalid configuration (missing required fields, invalid values).
	#[error("invalid configuration: {0}")]
	Config(String),

	/// Invalid sender or recipient address.
	#[error("invalid email address: {0}")]
	Address(String),
}

/// The credential details delivered to a new identity's owner.
#[derive(Debug, Clone)]
pub struct CredentialMessage {
	pub identity: String,
	pub access_key_id: String,
	pub secret_access_key: SecretString,
	/// Region label the owner should connect to.
	pub region: String,
}

impl CredentialMessage {
	pub fn subject(&self) -> String {
		"Your cloud access credentials".to_string()
	}

	/// Plain-text body. This is the only place the secret key is
	/// deliberately written out.
	pub fn body_text(&self, sender_name: &str) -> String {
		format!(
			"Hi,\n\n\
			 Please find below the access credentials for your cloud account.\n\n\
			 Access key : {}\n\
			 Secret key : {}\n\
			 Region     : {}\n\n\
			 These credentials are personal. Keep them secret and do not share\n\
			 them with anyone.\n\n\
			 Best regards,\n\
			 {}\n",
			self.access_key_id,
			self.secret_access_key.expose(),
			self.region,
			sender_name,
		)
	}

	/// HTML body carrying the same content as [`Self::body_text`].
	pub fn body_html(&self, sender_name: &str) -> String {
		format!(
			"<p>Hi,</p>\
			 <p>Please find below the access credentials for your cloud account.</p>\
			 <pre>Access key : {}\nSecret key : {}\nRegion     : {}</pre>\
			 <p>These credentials are personal. Keep them secret and do not share \
			 them with anyone.</p>\
			 <p>Best regards,<br>{}</p>",
			self.access_key_id,
			self.secret_access_key.expose(),
			self.region,
			sender_name,
		)
	}
}

/// Delivers credential messages to their owners.
#[async_trait]
pub trait Notifier: Send + Sync {
	/// Deliver `message` to the mailbox `to`.
	async fn send(&self, to: &str, message: &CredentialMessage) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	fn message() -> CredentialMessage {
		CredentialMessage {
			identity: "jane@example.com".to_string(),
			access_key_id: "AKIAEXAMPLE0001".to_string(),
			secret_access_key: SecretString::new("wJalrXUtnFEMI"),
			region: "eu-west-2".to_string(),
		}
	}

	#[test]
	fn text_body_carries_all_credential_fields() {
		let body = message().body_text("Cloud Team");
		assert!(body.contains("AKIAEXAMPLE0001"));
		assert!(body.contains("wJalrXUtnFEMI"));
		assert!(body.contains("eu-west-2"));
		assert!(body.contains("Cloud Team"));
	}

	#[test]
	fn html_body_carries_all_credential_fields() {
		let body = message().body_html("Cloud Team");
		assert!(body.contains("AKIAEXAMPLE0001"));
		assert!(body.contains("wJalrXUtnFEMI"));
		assert!(body.contains("eu-west-2"));
	}

	#[test]
	fn message_debug_does_not_leak_secret() {
		let debug = format!("{:?}", message());
		assert!(!debug.contains("wJalrXUtnFEMI"));
		assert!(debug.contains("AKIAEXAMPLE0001"));
	}
}
