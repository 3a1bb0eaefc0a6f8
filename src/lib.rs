// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! AP-mode station authenticator for a Wi-Fi link-layer daemon.
//!
//! This crate owns the per-interface AP state machine: admitting client
//! stations, running the authenticator side of the WPA2-PSK four-way
//! handshake through an external EAPoL engine, and tearing stations down
//! safely when a handshake fails or the interface goes away. It is
//! platform-independent and entirely event-driven: the embedder delivers
//! interface transitions, decoded management frames, handshake lifecycle
//! events and the completions of the asynchronous commands this crate
//! issues through the [`device::Device`] trait, and consumes the
//! resulting [`ap::ApEvent`] stream.

pub mod aid;
pub mod ap;
pub mod authenticator;
pub mod device;
pub mod error;
pub mod mac;
pub mod rsn;
mod sink;
pub mod station;
pub mod watcher;

#[cfg(test)]
mod test_utils;

pub use crate::ap::{Ap, ApConfig, ApEvent};
pub use crate::error::Error;
pub use crate::sink::{ApEventSink, UnboundedSink};
pub use crate::station::StationId;

/// SSIDs are byte strings; they are not guaranteed to be UTF-8.
pub type Ssid = Vec<u8>;

pub type ApEventStream = futures::channel::mpsc::UnboundedReceiver<ApEvent>;
