// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Identity-directory capability for Roster.
//!
//! The [`IdentityDirectory`] trait is the boundary between the
//! orchestrators and the remote account: create/delete identities,
//! create/delete access keys, add/remove group memberships, plus the
//! enumerations teardown needs. Two backends ship here:
//!
//! - [`MemoryDirectory`]: deterministic in-memory account with failure
//!   injection, used by tests and `--dry-run`
//! - [`IamDirectory`]: AWS IAM or any IAM-compatible cloud via
//!   `aws-sdk-iam`

mod directory;
mod error;
mod iam;
mod memory;

pub use directory::{Credential, Identity, IdentityDirectory};
pub use error::DirectoryError;
pub use iam::{IamDirectory, IamSettings};
pub use memory::{DirectoryOp, MemoryDirectory};
