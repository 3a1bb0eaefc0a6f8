// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The collaborator boundary: one [`Device`] per interface, combining the
//! link-layer station operations and the generic-netlink command surface
//! the AP core drives asynchronously.
//!
//! Commands return a [`CmdId`] immediately; their results arrive later
//! through the AP's `on_*` entry points, addressed by the [`StationId`]
//! token the command was issued with. [`Device::cancel_cmd`] must
//! guarantee that a cancelled command's completion is never delivered —
//! the core's memory safety story rests on that together with the
//! generation check in the station arena.

use crate::aid::Aid;
use crate::authenticator::{EapolSm, HandshakeState};
use crate::mac::{MacAddr, ReasonCode, StatusCode};
use crate::station::StationId;

/// Identifier of one in-flight asynchronous command.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct CmdId(pub u32);

/// Identifier of one registered management-frame subscription.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FrameWatchId(pub u32);

/// Management frame classes the AP subscribes to while running.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MgmtFrameKind {
    AssocRequest,
    Disassoc,
    Deauth,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IfaceType {
    AdHoc,
    Station,
    Ap,
}

/// Interface attributes carried by lifecycle notifications.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct IfaceInfo {
    pub ifindex: u32,
    pub iftype: IfaceType,
    pub up: bool,
}

/// Parameters of the asynchronous AP start command.
#[derive(Debug)]
pub struct StartConfig<'a> {
    pub ssid: &'a [u8],
    pub channel: u8,
    pub beacon_interval: u16,
    pub rsne: &'a [u8],
}

pub trait Device {
    /// The interface's own hardware address.
    fn own_addr(&self) -> MacAddr;

    /// Removes a station at the link level. Sends a deauthentication or
    /// disassociation frame with `reason` when `disassociate` is set.
    fn del_station(&mut self, addr: &MacAddr, reason: ReasonCode, disassociate: bool);

    /// Reports a failed handshake upstream so higher layers can log and
    /// react; the kernel-side disconnect is part of this call.
    fn handshake_failed(&mut self, addr: &MacAddr, reason: ReasonCode);

    /// Transmits an association response. `sta` is `None` for rejection
    /// responses that have no station record to complete against.
    fn send_assoc_response(
        &mut self,
        sta: Option<StationId>,
        addr: &MacAddr,
        aid: Aid,
        status: StatusCode,
    ) -> CmdId;

    /// Queries the receive sequence counter of the installed group key.
    fn query_gtk_rsc(&mut self, sta: StationId, key_index: u8) -> CmdId;

    fn start_ap(&mut self, config: &StartConfig<'_>) -> CmdId;

    fn stop_ap(&mut self) -> CmdId;

    /// Subscribes to reception of a management frame class. Frames are
    /// delivered decoded through the AP's `handle_*` entry points by the
    /// embedder.
    fn watch_frames(&mut self, kind: MgmtFrameKind) -> FrameWatchId;

    fn unwatch_frames(&mut self, watch: FrameWatchId);

    /// Cancels an in-flight command. The corresponding completion must
    /// not be delivered afterwards.
    fn cancel_cmd(&mut self, cmd: CmdId);

    /// Builds the EAPoL state machine that will run `hs`. Fallible: a
    /// station whose engine cannot be constructed is torn down.
    fn new_eapol_sm(&mut self, hs: &HandshakeState) -> Result<Box<dyn EapolSm>, anyhow::Error>;
}
