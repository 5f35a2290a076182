// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Roster's orchestration core.
//!
//! Two orchestrators live here, both generic over the injected
//! [`roster_directory::IdentityDirectory`] capability:
//!
//! - [`Provisioner`]: create identity → create credential → attach to
//!   policy group → deliver credentials, with compensating rollback so no
//!   partially provisioned identity is ever left behind
//! - teardown ([`teardown_identity`], [`teardown_batch`],
//!   [`teardown_all`]): dependency-ordered, idempotent-in-aggregate
//!   removal of an identity and everything it owns
//!
//! Identities are processed sequentially; every error is converted into a
//! per-identity outcome and the batch always runs to completion.

mod outcome;
mod provision;
mod teardown;

pub use outcome::ProvisionOutcome;
pub use provision::{ProvisionSettings, Provisioner};
pub use teardown::{teardown_all, teardown_batch, teardown_identity, MembershipScope};
