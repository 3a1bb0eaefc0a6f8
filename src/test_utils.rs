// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Fakes shared by the module tests: a recording device and EAPoL
//! engine, plus fixture configuration.

use std::cell::RefCell;
use std::rc::Rc;

use futures::channel::mpsc;

use crate::aid::Aid;
use crate::ap::{Ap, ApConfig, ApEvent};
use crate::authenticator::{EapolSm, HandshakeState};
use crate::device::{CmdId, Device, FrameWatchId, MgmtFrameKind, StartConfig};
use crate::mac::{MacAddr, RateSet, ReasonCode, StatusCode};
use crate::rsn::{CipherSet, CipherSuite, RsnInfo};
use crate::sink::{ApEventSink, UnboundedSink};
use crate::station::StationId;

#[derive(Debug, PartialEq)]
pub enum DeviceCall {
    DelStation { addr: MacAddr, reason: ReasonCode, disassociate: bool },
    HandshakeFailed { addr: MacAddr, reason: ReasonCode },
    AssocResponse { cmd: CmdId, sta: Option<StationId>, addr: MacAddr, aid: Aid, status: StatusCode },
    QueryGtkRsc { cmd: CmdId, sta: StationId, key_index: u8 },
    StartAp { cmd: CmdId, ssid: Vec<u8>, channel: u8, rsne: Vec<u8> },
    StopAp { cmd: CmdId },
    Cancel { cmd: CmdId },
    WatchFrames { watch: FrameWatchId, kind: MgmtFrameKind },
    UnwatchFrames { watch: FrameWatchId },
    NewEapolSm { supplicant: MacAddr, gtk_known: bool },
    SetListenInterval { supplicant: MacAddr, listen_interval: u16 },
    Register { supplicant: MacAddr },
}

pub type CallLog = Rc<RefCell<Vec<DeviceCall>>>;

pub struct FakeDevice {
    pub calls: CallLog,
    pub fail_eapol: bool,
    next_cmd: u32,
}

impl FakeDevice {
    pub fn new() -> Self {
        FakeDevice { calls: Rc::new(RefCell::new(Vec::new())), fail_eapol: false, next_cmd: 0 }
    }

    fn next_cmd(&mut self) -> CmdId {
        self.next_cmd += 1;
        CmdId(self.next_cmd)
    }
}

impl Device for FakeDevice {
    fn own_addr(&self) -> MacAddr {
        ap_addr()
    }

    fn del_station(&mut self, addr: &MacAddr, reason: ReasonCode, disassociate: bool) {
        self.calls.borrow_mut().push(DeviceCall::DelStation { addr: *addr, reason, disassociate });
    }

    fn handshake_failed(&mut self, addr: &MacAddr, reason: ReasonCode) {
        self.calls.borrow_mut().push(DeviceCall::HandshakeFailed { addr: *addr, reason });
    }

    fn send_assoc_response(
        &mut self,
        sta: Option<StationId>,
        addr: &MacAddr,
        aid: Aid,
        status: StatusCode,
    ) -> CmdId {
        let cmd = self.next_cmd();
        self.calls
            .borrow_mut()
            .push(DeviceCall::AssocResponse { cmd, sta, addr: *addr, aid, status });
        cmd
    }

    fn query_gtk_rsc(&mut self, sta: StationId, key_index: u8) -> CmdId {
        let cmd = self.next_cmd();
        self.calls.borrow_mut().push(DeviceCall::QueryGtkRsc { cmd, sta, key_index });
        cmd
    }

    fn start_ap(&mut self, config: &StartConfig<'_>) -> CmdId {
        let cmd = self.next_cmd();
        self.calls.borrow_mut().push(DeviceCall::StartAp {
            cmd,
            ssid: config.ssid.to_vec(),
            channel: config.channel,
            rsne: config.rsne.to_vec(),
        });
        cmd
    }

    fn stop_ap(&mut self) -> CmdId {
        let cmd = self.next_cmd();
        self.calls.borrow_mut().push(DeviceCall::StopAp { cmd });
        cmd
    }

    fn cancel_cmd(&mut self, cmd: CmdId) {
        self.calls.borrow_mut().push(DeviceCall::Cancel { cmd });
    }

    fn watch_frames(&mut self, kind: MgmtFrameKind) -> FrameWatchId {
        let watch = FrameWatchId(self.next_cmd().0);
        self.calls.borrow_mut().push(DeviceCall::WatchFrames { watch, kind });
        watch
    }

    fn unwatch_frames(&mut self, watch: FrameWatchId) {
        self.calls.borrow_mut().push(DeviceCall::UnwatchFrames { watch });
    }

    fn new_eapol_sm(&mut self, hs: &HandshakeState) -> Result<Box<dyn EapolSm>, anyhow::Error> {
        if self.fail_eapol {
            return Err(anyhow::format_err!("no memory for eapol sm"));
        }
        self.calls.borrow_mut().push(DeviceCall::NewEapolSm {
            supplicant: hs.supplicant_addr,
            gtk_known: hs.gtk.is_some(),
        });
        Ok(Box::new(FakeEapolSm { supplicant: hs.supplicant_addr, calls: Rc::clone(&self.calls) }))
    }
}

#[derive(Debug)]
pub struct FakeEapolSm {
    supplicant: MacAddr,
    calls: CallLog,
}

impl EapolSm for FakeEapolSm {
    fn set_listen_interval(&mut self, listen_interval: u16) {
        self.calls
            .borrow_mut()
            .push(DeviceCall::SetListenInterval { supplicant: self.supplicant, listen_interval });
    }

    fn register(&mut self) {
        self.calls.borrow_mut().push(DeviceCall::Register { supplicant: self.supplicant });
    }
}

pub fn ap_addr() -> MacAddr {
    MacAddr([0x02, 0x5d, 0x1e, 0x40, 0x00, 0xaa])
}

pub fn sta_addr(last_octet: u8) -> MacAddr {
    MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, last_octet])
}

pub fn fixed_pmk() -> [u8; 32] {
    let bytes = hex::decode("bfca951ef43e2a1c4f8e4e3b8c59f2d0713be6a9f4f7b0a2c1d9e8571a2b3c4d")
        .expect("valid hex");
    let mut pmk = [0u8; 32];
    pmk.copy_from_slice(&bytes);
    pmk
}

pub fn sta_rates() -> RateSet {
    [2u8, 4, 11, 22].iter().copied().collect()
}

/// A well-formed WPA2-PSK/CCMP RSN element as a station would offer it.
pub fn valid_rsne() -> Vec<u8> {
    RsnInfo {
        group_cipher: CipherSuite::Ccmp128,
        pairwise_ciphers: CipherSet::of(&[CipherSuite::Ccmp128]),
    }
    .to_bytes()
}

pub fn fake_ap_config() -> ApConfig {
    ApConfig {
        ssid: b"unittest-ssid".to_vec(),
        channel: 6,
        beacon_interval: 100,
        rates: [2u8, 4, 11, 22, 12, 18, 24, 36].iter().copied().collect(),
        pairwise_ciphers: CipherSet::of(&[CipherSuite::Ccmp128]),
        group_cipher: CipherSuite::Ccmp128,
        pmk: fixed_pmk(),
        gtk: hex::decode("29578d4d2ea4fccb76fe0f3c3fa4f4c9").expect("valid hex"),
        gtk_index: 1,
    }
}

pub fn event_channel() -> (ApEventSink, mpsc::UnboundedReceiver<ApEvent>) {
    let (sender, receiver) = mpsc::unbounded();
    (UnboundedSink::new(sender), receiver)
}

pub fn fake_ap() -> (Ap<FakeDevice>, CallLog, mpsc::UnboundedReceiver<ApEvent>) {
    let device = FakeDevice::new();
    let calls = Rc::clone(&device.calls);
    let (sink, events) = event_channel();
    (Ap::new(device, fake_ap_config(), sink), calls, events)
}

/// An AP that has completed its asynchronous start, group key installed.
pub fn started_ap() -> (Ap<FakeDevice>, CallLog, mpsc::UnboundedReceiver<ApEvent>) {
    let (mut ap, calls, events) = fake_ap();
    ap.start().expect("start accepted");
    ap.on_start_complete(Ok(()));
    (ap, calls, events)
}
