// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! IAM-compatible directory backend.
//!
//! Talks to AWS IAM or any IAM-compatible cloud (the endpoint URL is
//! overridable) through `aws-sdk-iam`. Service error codes are folded into
//! [`DirectoryError`]: `NoSuchEntity`, `EntityAlreadyExists` and
//! `DeleteConflict` keep their meaning, everything else is transport-level.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use roster_secret::SecretString;
use tracing::debug;

use crate::directory::{Credential, Identity, IdentityDirectory};
use crate::error::DirectoryError;

const DEFAULT_REGION: &str = "eu-west-2";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`IamDirectory`].
///
/// AWS credentials come from the standard SDK chain (environment,
/// profile, instance metadata); only the pieces that differ per
/// deployment live here.
#[derive(Debug, Clone)]
pub struct IamSettings {
	pub region: String,
	/// Endpoint override for IAM-compatible clouds. `None` targets AWS.
	pub endpoint_url: Option<String>,
	/// Deadline applied to every remote call, surfaced as
	/// [`DirectoryError::Timeout`] on expiry.
	pub operation_timeout: Duration,
}

impl Default for IamSettings {
	fn default() -> Self {
		Self {
			region: DEFAULT_REGION.to_string(),
			endpoint_url: None,
			operation_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
		}
	}
}

impl IamSettings {
	/// Load settings from `ROSTER_IAM_REGION`, `ROSTER_IAM_ENDPOINT` and
	/// `ROSTER_IAM_TIMEOUT_SECS`, all optional.
	pub fn from_env() -> Result<Self, DirectoryError> {
		let region = env::var("ROSTER_IAM_REGION").unwrap_or_else(|_| DEFAULT_REGION.to_string());
		let endpoint_url = env::var("ROSTER_IAM_ENDPOINT").ok();
		let operation_timeout = match env::var("ROSTER_IAM_TIMEOUT_SECS") {
			Ok(raw) => {
				let secs: u64 = raw.parse().map_err(|_| {
					DirectoryError::Transport(
						"ROSTER_IAM_TIMEOUT_SECS must be a whole number of seconds".to_string(),
					)
				})?;
				Duration::from_secs(secs)
			}
			Err(_) => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
		};
		Ok(Self {
			region,
			endpoint_url,
			operation_timeout,
		})
	}
}

/// Directory backend over `aws-sdk-iam`.
pub struct IamDirectory {
	client: aws_sdk_iam::Client,
}

impl IamDirectory {
	/// Build a client from the standard AWS config chain plus `settings`.
	pub async fn connect(settings: IamSettings) -> Self {
		let mut loader = aws_config::defaults(BehaviorVersion::latest())
			.region(Region::new(settings.region.clone()))
			.timeout_config(
				TimeoutConfig::builder()
					.operation_timeout(settings.operation_timeout)
					.build(),
			);
		if let Some(url) = &settings.endpoint_url {
			loader = loader.endpoint_url(url);
		}
		let config = loader.load().await;
		debug!(region = %settings.region, endpoint = ?settings.endpoint_url, "IAM directory connected");
		Self {
			client: aws_sdk_iam::Client::new(&config),
		}
	}
}

fn directory_error<E>(err: SdkError<E>) -> DirectoryError
where
	E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
	if matches!(err, SdkError::TimeoutError(_)) {
		return DirectoryError::Timeout(DisplayErrorContext(&err).to_string());
	}
	let message = || {
		err
			.message()
			.map(str::to_string)
			.unwrap_or_else(|| DisplayErrorContext(&err).to_string())
	};
	match err.code() {
		Some("NoSuchEntity") => DirectoryError::NotFound(message()),
		Some("EntityAlreadyExists") => DirectoryError::AlreadyExists(message()),
		Some("DeleteConflict") => DirectoryError::DependentsExist(message()),
		_ => DirectoryError::Transport(DisplayErrorContext(&err).to_string()),
	}
}

#[async_trait]
impl IdentityDirectory for IamDirectory {
	async fn create_identity(&self, name: &str) -> Result<Identity, DirectoryError> {
		let output = self
			.client
			.create_user()
			.user_name(name)
			.send()
			.await
			.map_err(directory_error)?;
		let name = output
			.user()
			.map(|user| user.user_name().to_string())
			.unwrap_or_else(|| name.to_string());
		Ok(Identity { name })
	}

	async fn create_credential(&self, identity: &str) -> Result<Credential, DirectoryError> {
		let output = self
			.client
			.create_access_key()
			.user_name(identity)
			.send()
			.await
			.map_err(directory_error)?;
		let key = output.access_key().ok_or_else(|| {
			DirectoryError::Transport("create_access_key response carried no key".to_string())
		})?;
		Ok(Credential {
			identity: identity.to_string(),
			key_id: key.access_key_id().to_string(),
			secret: Some(SecretString::new(key.secret_access_key())),
		})
	}

	async fn add_membership(&self, group: &str, identity: &str) -> Result<bool, DirectoryError> {
		self
			.client
			.add_user_to_group()
			.group_name(group)
			.user_name(identity)
			.send()
			.await
			.map_err(directory_error)?;
		Ok(true)
	}

	async fn remove_membership(&self, group: &str, identity: &str) -> Result<(), DirectoryError> {
		self
			.client
			.remove_user_from_group()
			.group_name(group)
			.user_name(identity)
			.send()
			.await
			.map_err(directory_error)?;
		Ok(())
	}

	async fn delete_credential(&self, key_id: &str, identity: &str) -> Result<(), DirectoryError> {
		self
			.client
			.delete_access_key()
			.access_key_id(key_id)
			.user_name(identity)
			.send()
			.await
			.map_err(directory_error)?;
		Ok(())
	}

	async fn delete_identity(&self, name: &str) -> Result<(), DirectoryError> {
		self
			.client
			.delete_user()
			.user_name(name)
			.send()
			.await
			.map_err(directory_error)?;
		Ok(())
	}

	async fn list_credentials(&self, identity: &str) -> Result<Vec<Credential>, DirectoryError> {
		let output = self
			.client
			.list_access_keys()
			.user_name(identity)
			.send()
			.await
			.map_err(directory_error)?;
		Ok(output
			.access_key_metadata()
			.iter()
			.filter_map(|metadata| metadata.access_key_id().map(str::to_string))
			.map(|key_id| Credential {
				identity: identity.to_string(),
				key_id,
				secret: None,
			})
			.collect())
	}

	async fn list_memberships(&self, identity: &str) -> Result<Vec<String>, DirectoryError> {
		let output = self
			.client
			.list_groups_for_user()
			.user_name(identity)
			.send()
			.await
			.map_err(directory_error)?;
		Ok(output
			.groups()
			.iter()
			.map(|group| group.group_name().to_string())
			.collect())
	}

	async fn list_identities(&self) -> Result<Vec<String>, DirectoryError> {
		let mut names = Vec::new();
		let mut pages = self.client.list_users().into_paginator().send();
		while let Some(page) = pages.next().await {
			let page = page.map_err(directory_error)?;
			names.extend(page.users().iter().map(|user| user.user_name().to_string()));
		}
		Ok(names)
	}
}
