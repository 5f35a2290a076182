// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Async SMTP delivery over [`lettre`].
//!
//! Sends the credential message as a multipart email (plain text + HTML)
//! over STARTTLS. The SMTP password travels inside [`SecretString`] so it
//! never appears in logs or serialized config.

use std::env;

use async_trait::async_trait;
use lettre::{
	message::{header::ContentType, Mailbox, MultiPart, SinglePart},
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use roster_secret::SecretString;
use serde::{Deserialize, Serialize};

use crate::{CredentialMessage, Notifier, NotifyError};

/// Configuration for [`SmtpNotifier`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
	/// SMTP server hostname (e.g. "smtp.gmail.com").
	pub host: String,

	/// SMTP server port. 587 is the STARTTLS default.
	pub port: u16,

	/// Optional username for SMTP authentication.
	pub username: Option<String>,

	/// Optional password for SMTP authentication, redacted in logs.
	pub password: Option<SecretString>,

	/// Address credentials are sent from.
	pub from_address: String,

	/// Display name for the sender, also used to sign the message body.
	pub from_name: String,

	/// Whether to use STARTTLS for the connection. Defaults to `true`.
	#[serde(default = "default_use_tls")]
	pub use_tls: bool,
}

fn default_use_tls() -> bool {
	true
}

impl SmtpConfig {
	/// Load SMTP configuration from environment variables.
	///
	/// - `ROSTER_SMTP_HOST` (required)
	/// - `ROSTER_SMTP_PORT` (optional, default 587)
	/// - `ROSTER_SMTP_USERNAME` / `ROSTER_SMTP_PASSWORD` (optional)
	/// - `ROSTER_SMTP_FROM_ADDRESS` (required)
	/// - `ROSTER_SMTP_FROM_NAME` (optional, default "Roster")
	/// - `ROSTER_SMTP_USE_TLS` (optional, default true)
	pub fn from_env() -> Result<Self, NotifyError> {
		let host = env::var("ROSTER_SMTP_HOST")
			.map_err(|_| NotifyError::Config("ROSTER_SMTP_HOST is required".into()))?;

		let port = env::var("ROSTER_SMTP_PORT")
			.unwrap_or_else(|_| "587".into())
			.parse()
			.map_err(|_| NotifyError::Config("ROSTER_SMTP_PORT must be a valid port number".into()))?;

		let username = env::var("ROSTER_SMTP_USERNAME").ok();
		let password = env::var("ROSTER_SMTP_PASSWORD").ok().map(SecretString::new);

		let from_address = env::var("ROSTER_SMTP_FROM_ADDRESS")
			.map_err(|_| NotifyError::Config("ROSTER_SMTP_FROM_ADDRESS is required".into()))?;

		let from_name = env::var("ROSTER_SMTP_FROM_NAME").unwrap_or_else(|_| "Roster".into());

		let use_tls = env::var("ROSTER_SMTP_USE_TLS")
			.map(|v| v.to_lowercase() != "false" && v != "0")
			.unwrap_or(true);

		Ok(Self {
			host,
			port,
			username,
			password,
			from_address,
			from_name,
			use_tls,
		})
	}

	/// Override the sender address and password, e.g. from CLI flags.
	pub fn with_sender(mut self, address: String, password: Option<SecretString>) -> Self {
		self.username = Some(address.clone());
		self.from_address = address;
		if password.is_some() {
			self.password = password;
		}
		self
	}
}

/// SMTP-backed [`Notifier`].
pub struct SmtpNotifier {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	from_mailbox: Mailbox,
	from_name: String,
}

impl SmtpNotifier {
	/// Build the transport from `config`. The connection itself is made
	/// lazily on first send.
	#[tracing::instrument(
        name = "smtp_notifier_new",
        skip(config),
        fields(host = %config.host, port = %config.port, use_tls = %config.use_tls)
    )]
	pub fn new(config: SmtpConfig) -> Result<Self, NotifyError> {
		let from_mailbox: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
			.parse()
			.map_err(|e| NotifyError::Address(format!("{e}")))?;

		let builder = if config.use_tls {
			AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
				.map_err(|e| NotifyError::Connection(format!("{e}")))?
		} else {
			AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
		};

		let mut builder = builder.port(config.port);

		if let (Some(username), Some(password)) = (config.username, config.password) {
			let credentials = Credentials::new(username, password.into_inner());
			builder = builder.credentials(credentials);
		}

		let transport = builder.build();

		tracing::debug!("SMTP notifier initialized");

		Ok(Self {
			transport,
			from_mailbox,
			from_name: config.from_name,
		})
	}

	/// Check that the SMTP server is reachable, for startup validation.
	#[tracing::instrument(name = "smtp_check_health", skip(self))]
	pub async fn check_health(&self) -> Result<(), NotifyError> {
		self
			.transport
			.test_connection()
			.await
			.map_err(|e| NotifyError::Connection(format!("{e}")))?;
		Ok(())
	}
}

#[async_trait]
impl Notifier for SmtpNotifier {
	#[tracing::instrument(
        name = "smtp_send_credentials",
        skip(self, message),
        fields(to = %to, identity = %message.identity)
    )]
	async fn send(&self, to: &str, message: &CredentialMessage) -> Result<(), NotifyError> {
		let to_mailbox: Mailbox = to.parse().map_err(|e| NotifyError::Address(format!("{e}")))?;

		let email = Message::builder()
			.from(self.from_mailbox.clone())
			.to(to_mailbox)
			.subject(message.subject())
			.multipart(
				MultiPart::alternative()
					.singlepart(
						SinglePart::builder()
							.header(ContentType::TEXT_PLAIN)
							.body(message.body_text(&self.from_name)),
					)
					.singlepart(
						SinglePart::builder()
							.header(ContentType::TEXT_HTML)
							.body(message.body_html(&self.from_name)),
					),
			)
			.map_err(|e| NotifyError::Send(format!("failed to build message: {e}")))?;

		self
			.transport
			.send(email)
			.await
			.map_err(|e| NotifyError::Send(format!("{e}")))?;

		tracing::info!("credentials delivered");

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> SmtpConfig {
		SmtpConfig {
			host: "smtp.example.com".to_string(),
			port: 587,
			username: Some("sender@example.com".to_string()),
			password: Some(SecretString::new("super-secret-password")),
			from_address: "sender@example.com".to_string(),
			from_name: "Cloud Team".to_string(),
			use_tls: true,
		}
	}

	#[test]
	fn config_debug_does_not_leak_password() {
		let debug = format!("{:?}", config());
		assert!(!debug.contains("super-secret-password"));
		assert!(debug.contains("[REDACTED]"));
	}

	#[test]
	fn with_sender_overrides_username_and_from() {
		let config = config().with_sender(
			"teacher@example.com".to_string(),
			Some(SecretString::new("other")),
		);
		assert_eq!(config.username.as_deref(), Some("teacher@example.com"));
		assert_eq!(config.from_address, "teacher@example.com");
		assert_eq!(config.password.unwrap().expose(), "other");
	}

	#[test]
	fn with_sender_keeps_password_when_none_given() {
		let config = config().with_sender("teacher@example.com".to_string(), None);
		assert_eq!(config.password.unwrap().expose(), "super-secret-password");
	}

	#[test]
	fn notifier_builds_from_valid_config() {
		assert!(SmtpNotifier::new(config()).is_ok());
	}

	#[test]
	fn notifier_rejects_invalid_from_address() {
		let mut bad = config();
		bad.from_address = "not an address".to_string();
		assert!(matches!(SmtpNotifier::new(bad), Err(NotifyError::Address(_))));
	}

	// Env-var handling lives in one test so parallel test threads never
	// race on the process environment.
	#[test]
	fn config_from_env() {
		for key in [
			"ROSTER_SMTP_HOST",
			"ROSTER_SMTP_PORT",
			"ROSTER_SMTP_USERNAME",
			"ROSTER_SMTP_PASSWORD",
			"ROSTER_SMTP_FROM_ADDRESS",
			"ROSTER_SMTP_FROM_NAME",
			"ROSTER_SMTP_USE_TLS",
		] {
			std::env::remove_var(key);
		}

		assert!(matches!(SmtpConfig::from_env(), Err(NotifyError::Config(_))));

		std::env::set_var("ROSTER_SMTP_HOST", "smtp.example.com");
		std::env::set_var("ROSTER_SMTP_FROM_ADDRESS", "sender@example.com");
		let config = SmtpConfig::from_env().unwrap();
		assert_eq!(config.port, 587);
		assert_eq!(config.from_name, "Roster");
		assert!(config.use_tls);

		std::env::set_var("ROSTER_SMTP_USE_TLS", "false");
		std::env::set_var("ROSTER_SMTP_PORT", "2525");
		let config = SmtpConfig::from_env().unwrap();
		assert!(!config.use_tls);
		assert_eq!(config.port, 2525);

		for key in [
			"ROSTER_SMTP_HOST",
			"ROSTER_SMTP_PORT",
			"ROSTER_SMTP_FROM_ADDRESS",
			"ROSTER_SMTP_USE_TLS",
		] {
			std::env::remove_var(key);
		}
	}
}
