// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Domain failures surfaced by the ledger core. Command code wraps these in
/// `anyhow::Error`; callers that need to branch use `downcast_ref`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid posting: {0}")]
    InvalidPosting(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("system accounts are managed by the ledger and cannot be changed")]
    SystemAccountProtected,

    #[error("merge is only permitted between foreign accounts")]
    MergeNotPermitted,

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("an account named '{0}' of that type already exists")]
    DuplicateAccountName(String),

    #[error("reported balance equals the current balance; nothing to reconcile")]
    ReconcileNoop,
}
