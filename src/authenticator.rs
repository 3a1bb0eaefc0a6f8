// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Handshake context and the EAPoL engine boundary.
//!
//! The four-way handshake itself runs in an external engine; this module
//! defines the configuration handed to it and the lifecycle events it
//! reports back.

use std::fmt;

use bytes::Bytes;

use crate::mac::{MacAddr, ReasonCode};
use crate::Ssid;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Role {
    Authenticator,
    Supplicant,
}

/// Group temporal key material installed into a handshake context, with
/// the receive sequence counter the station must start from.
#[derive(Clone, PartialEq, Eq)]
pub struct GroupKey {
    pub key: Vec<u8>,
    pub key_index: u8,
    pub rsc: [u8; 6],
}

/// Everything the engine needs to run one station's handshake. Built by
/// the RSNA orchestrator, owned by the station record, and dropped only
/// through station destruction.
#[derive(Clone, PartialEq, Eq)]
pub struct HandshakeState {
    pub role: Role,
    pub ssid: Ssid,
    pub authenticator_ie: Vec<u8>,
    pub supplicant_ie: Bytes,
    pub pmk: [u8; 32],
    pub authenticator_addr: MacAddr,
    pub supplicant_addr: MacAddr,
    /// `Some` on the "GTK already known" fast path. When `None`, the group
    /// key is installed later by the engine's own group-key message flow.
    pub gtk: Option<GroupKey>,
}

// Key material stays out of log output.
impl fmt::Debug for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeState")
            .field("role", &self.role)
            .field("authenticator_addr", &self.authenticator_addr)
            .field("supplicant_addr", &self.supplicant_addr)
            .field("gtk", &self.gtk.as_ref().map(|g| g.key_index))
            .finish_non_exhaustive()
    }
}

/// Lifecycle events reported by the external handshake engine. Events for
/// one station arrive strictly ordered; the engine never reports
/// `Completed` after a failure.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HandshakeEvent {
    Completed,
    Failed { reason: ReasonCode },
    SettingKeysFailed,
}

/// One station's EAPoL state machine. Constructed through
/// [`crate::device::Device::new_eapol_sm`]; dropping it releases every
/// associated engine resource and unregisters it from the wire dispatch.
pub trait EapolSm: fmt::Debug {
    /// Derives the engine's retry and timeout parameters from the
    /// station's advertised listen interval.
    fn set_listen_interval(&mut self, listen_interval: u16);
    /// Registers the machine with the dispatch layer that moves EAPoL
    /// frames to and from the wire.
    fn register(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_key_material() {
        let hs = HandshakeState {
            role: Role::Authenticator,
            ssid: b"test-ssid".to_vec(),
            authenticator_ie: vec![0x30, 0x00],
            supplicant_ie: Bytes::from_static(&[0x30, 0x00]),
            pmk: [0x42; 32],
            authenticator_addr: MacAddr([2, 0, 0, 0, 0, 1]),
            supplicant_addr: MacAddr([2, 0, 0, 0, 0, 2]),
            gtk: Some(GroupKey { key: vec![0x17; 16], key_index: 1, rsc: [0; 6] }),
        };
        let rendered = format!("{:?}", hs);
        assert!(!rendered.contains("42"));
        assert!(!rendered.contains("23"));
        assert!(rendered.contains("supplicant_addr"));
    }
}
