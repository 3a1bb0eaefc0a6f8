// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use thiserror::Error;

/// Errors surfaced by the AP core. All of them are handled locally by the
/// event-entry methods; none are fatal to the AP instance and none may
/// cross the event boundary as a panic.
#[derive(Debug, Error)]
pub enum Error {
    /// The 1..=2007 association-id space is exhausted; a new association
    /// must be rejected.
    #[error("no association id available")]
    NoAvailableAid,
    /// An association request failed policy validation and was answered
    /// with the given status code.
    #[error("association denied with status code {}", .status.0)]
    AssocDenied { status: crate::mac::StatusCode },
    /// The EAPoL state machine for a station could not be constructed.
    #[error("failed to create eapol state machine: {0}")]
    EapolEngine(anyhow::Error),
    /// An operation referenced a station that is no longer in the
    /// collection. Indicates a dangling handle elsewhere in the system.
    #[error("station handle is stale or was already removed")]
    StaleStation,
    #[error("access point already started or start pending")]
    AlreadyStarted,
    #[error("access point not started")]
    NotStarted,
}
