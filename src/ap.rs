// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The per-interface AP instance.
//!
//! One [`Ap`] turns an AP-mode interface into a running access point:
//! it admits stations, drives the authenticator side of the WPA2-PSK
//! four-way handshake through the external EAPoL engine, and tears
//! stations down when anything goes wrong. All entry points are
//! synchronous and run to completion; long-running work lives behind the
//! async command ids tracked on the AP and on each station record.

use std::fmt;

use bytes::Bytes;
use log::{debug, error, info, warn};

use crate::aid::{Aid, AidAllocator};
use crate::authenticator::{GroupKey, HandshakeEvent, HandshakeState, Role};
use crate::device::{CmdId, Device, FrameWatchId, MgmtFrameKind, StartConfig};
use crate::error::Error;
use crate::mac::{CapabilityInfo, MacAddr, RateSet, ReasonCode, StatusCode};
use crate::rsn::{CipherSet, CipherSuite, RsnInfo, RsnOffer};
use crate::sink::ApEventSink;
use crate::station::{Station, StationId, StationMap, StationState};
use crate::Ssid;

/// AP-level configuration. Supplied fully formed by configuration
/// loading, which lives outside this crate.
#[derive(Clone, PartialEq, Eq)]
pub struct ApConfig {
    pub ssid: Ssid,
    pub channel: u8,
    pub beacon_interval: u16,
    pub rates: RateSet,
    pub pairwise_ciphers: CipherSet,
    pub group_cipher: CipherSuite,
    pub pmk: [u8; 32],
    pub gtk: Vec<u8>,
    pub gtk_index: u8,
}

// Key material stays out of log output.
impl fmt::Debug for ApConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApConfig")
            .field("ssid", &String::from_utf8_lossy(&self.ssid))
            .field("channel", &self.channel)
            .field("beacon_interval", &self.beacon_interval)
            .field("pairwise_ciphers", &self.pairwise_ciphers)
            .field("group_cipher", &self.group_cipher)
            .field("gtk_index", &self.gtk_index)
            .finish_non_exhaustive()
    }
}

/// Notifications published on the AP event stream.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ApEvent {
    Started,
    Stopped,
    StationAssociated { addr: MacAddr, aid: Aid },
    /// The station completed the four-way handshake and is authorized
    /// for protected traffic.
    StationAuthenticated { addr: MacAddr, aid: Aid },
    StationRemoved { addr: MacAddr, reason: ReasonCode },
}

pub struct Ap<D: Device> {
    device: D,
    config: ApConfig,
    event_sink: ApEventSink,
    start_stop_cmd: Option<CmdId>,
    frame_watches: Vec<FrameWatchId>,
    pending: bool,
    started: bool,
    gtk_set: bool,
    aids: AidAllocator,
    stations: StationMap,
}

impl<D: Device> Ap<D> {
    pub fn new(device: D, config: ApConfig, event_sink: ApEventSink) -> Self {
        Ap {
            device,
            config,
            event_sink,
            start_stop_cmd: None,
            frame_watches: Vec::new(),
            pending: false,
            started: false,
            gtk_set: false,
            aids: AidAllocator::new(),
            stations: StationMap::new(),
        }
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    /// Authenticator-side RSN parameters for the current configuration.
    /// Pure: equal configurations yield byte-identical encoded elements.
    pub fn rsn_info(&self) -> RsnInfo {
        RsnInfo {
            group_cipher: self.config.group_cipher,
            pairwise_ciphers: self.config.pairwise_ciphers,
        }
    }

    /// Issues the asynchronous start command that completes interface
    /// setup (channel, beacon, advertised RSN element).
    pub fn start(&mut self) -> Result<(), Error> {
        if self.started || self.pending {
            return Err(Error::AlreadyStarted);
        }
        let rsne = self.rsn_info().to_bytes();
        let config = StartConfig {
            ssid: &self.config.ssid,
            channel: self.config.channel,
            beacon_interval: self.config.beacon_interval,
            rsne: &rsne,
        };
        let cmd = self.device.start_ap(&config);
        self.start_stop_cmd = Some(cmd);
        self.pending = true;
        Ok(())
    }

    pub fn on_start_complete(&mut self, result: Result<(), anyhow::Error>) {
        if self.start_stop_cmd.take().is_none() {
            debug!("unexpected start completion");
            return;
        }
        self.pending = false;
        match result {
            Ok(()) => {
                self.started = true;
                if !self.config.gtk.is_empty() {
                    self.gtk_set = true;
                }
                for kind in
                    [MgmtFrameKind::AssocRequest, MgmtFrameKind::Disassoc, MgmtFrameKind::Deauth]
                {
                    let watch = self.device.watch_frames(kind);
                    self.frame_watches.push(watch);
                }
                info!(
                    "AP '{}' started on channel {}",
                    String::from_utf8_lossy(&self.config.ssid),
                    self.config.channel
                );
                self.event_sink.send(ApEvent::Started);
            }
            Err(e) => error!("failed to start AP: {}", e),
        }
    }

    pub fn stop(&mut self) -> Result<(), Error> {
        if self.pending {
            // Start still in flight; cancelling it is the whole stop.
            if let Some(cmd) = self.start_stop_cmd.take() {
                self.device.cancel_cmd(cmd);
            }
            self.pending = false;
            return Ok(());
        }
        if !self.started {
            return Err(Error::NotStarted);
        }
        let cmd = self.device.stop_ap();
        self.start_stop_cmd = Some(cmd);
        Ok(())
    }

    pub fn on_stop_complete(&mut self, result: Result<(), anyhow::Error>) {
        if self.start_stop_cmd.take().is_none() {
            debug!("unexpected stop completion");
            return;
        }
        if let Err(e) = result {
            warn!("failed to stop AP: {}", e);
        }
        for watch in self.frame_watches.drain(..) {
            self.device.unwatch_frames(watch);
        }
        self.started = false;
        self.gtk_set = false;
    }

    /// Destroys every station, cancels the outstanding start/stop
    /// command and leaves the instance inert. Called on interface
    /// down/delete and from the watcher's teardown.
    pub fn shutdown(&mut self) {
        for id in self.stations.ids() {
            let _ = self.destroy_station(id, ReasonCode::LEAVING_NETWORK_DEAUTH, true);
        }
        if let Some(cmd) = self.start_stop_cmd.take() {
            self.device.cancel_cmd(cmd);
        }
        for watch in self.frame_watches.drain(..) {
            self.device.unwatch_frames(watch);
        }
        self.pending = false;
        self.started = false;
        self.gtk_set = false;
        self.event_sink.send(ApEvent::Stopped);
    }

    /// Admits a station from a decoded association request. On success
    /// the association response is in flight and the returned id
    /// resolves until the station is destroyed.
    pub fn handle_assoc_request(
        &mut self,
        addr: MacAddr,
        capability: CapabilityInfo,
        listen_interval: u16,
        rates: RateSet,
        rsn_ie: &[u8],
    ) -> Result<StationId, Error> {
        if !self.started {
            warn!("association request from {} while not started", addr);
            return Err(Error::NotStarted);
        }
        if let Some(existing) = self.stations.find_by_addr(&addr) {
            // Reassociation: the old record and its handles go away first.
            debug!("STA {} reassociating, dropping previous state", addr);
            let _ = self.destroy_station(existing, ReasonCode::UNSPECIFIED_REASON, false);
        }
        if let Err(status) = self.check_assoc_policy(&rates, rsn_ie) {
            warn!("denying association from {} with status {}", addr, status.0);
            self.device.send_assoc_response(None, &addr, 0, status);
            return Err(Error::AssocDenied { status });
        }
        let aid = match self.aids.assign() {
            Some(aid) => aid,
            None => {
                warn!("no association id left for {}", addr);
                self.device.send_assoc_response(None, &addr, 0, StatusCode::DENIED_NO_MORE_STAS);
                return Err(Error::NoAvailableAid);
            }
        };
        let station = Station::new(
            addr,
            aid,
            capability,
            listen_interval,
            rates,
            Bytes::copy_from_slice(rsn_ie),
        );
        let id = self.stations.insert(station);
        let cmd = self.device.send_assoc_response(Some(id), &addr, aid, StatusCode::SUCCESS);
        if let Some(sta) = self.stations.get_mut(id) {
            sta.assoc_resp_cmd = Some(cmd);
        }
        debug!("accepted association from {}, aid {}", addr, aid);
        Ok(id)
    }

    fn check_assoc_policy(&self, rates: &RateSet, rsn_ie: &[u8]) -> Result<(), StatusCode> {
        if !rates.intersects(&self.config.rates) {
            return Err(StatusCode::DENIED_RATES);
        }
        let offer = match RsnOffer::parse(rsn_ie) {
            Ok(offer) => offer,
            Err(e) => {
                debug!("bad RSN element in association request: {}", e);
                return Err(StatusCode::INVALID_ELEMENT);
            }
        };
        if offer.group_cipher != Some(self.config.group_cipher) {
            return Err(StatusCode::INVALID_GROUP_CIPHER);
        }
        if offer.pairwise_ciphers.intersection(self.config.pairwise_ciphers).is_empty() {
            return Err(StatusCode::INVALID_PAIRWISE_CIPHER);
        }
        if !offer.akm_psk {
            return Err(StatusCode::INVALID_AKMP);
        }
        Ok(())
    }

    /// Completion of the association response transmission.
    pub fn on_assoc_response_sent(&mut self, id: StationId, result: Result<(), anyhow::Error>) {
        let sta = match self.stations.get_mut(id) {
            Some(sta) => sta,
            None => {
                debug!("association response completion for a departed station");
                return;
            }
        };
        if sta.assoc_resp_cmd.take().is_none() {
            debug!("unexpected association response completion for {}", sta.addr);
            return;
        }
        if let Err(e) = result {
            error!("failed to send association response to {}: {}", sta.addr, e);
            let _ = self.destroy_station(id, ReasonCode::UNSPECIFIED_REASON, false);
            return;
        }
        sta.state = StationState::Associated;
        info!("STA {} associated, aid {}", sta.addr, sta.aid);
        let (addr, aid) = (sta.addr, sta.aid);
        self.event_sink.send(ApEvent::StationAssociated { addr, aid });

        if self.gtk_set {
            // Fetch the group key's receive sequence counter before the
            // handshake starts so msg 3 carries a current value.
            let cmd = self.device.query_gtk_rsc(id, self.config.gtk_index);
            sta.gtk_query_cmd = Some(cmd);
        } else {
            let _ = self.start_rsna(id, None);
        }
    }

    /// Completion of the group-key sequence-counter query. A failed
    /// query is not fatal; the handshake starts without the fast path.
    pub fn on_gtk_query_complete(&mut self, id: StationId, result: Result<[u8; 6], anyhow::Error>) {
        let sta = match self.stations.get_mut(id) {
            Some(sta) => sta,
            None => {
                debug!("group key query completion for a departed station");
                return;
            }
        };
        if sta.gtk_query_cmd.take().is_none() {
            debug!("unexpected group key query completion for {}", sta.addr);
            return;
        }
        let rsc = match result {
            Ok(rsc) => Some(rsc),
            Err(e) => {
                warn!("group key sequence counter query failed for {}: {}", sta.addr, e);
                None
            }
        };
        let _ = self.start_rsna(id, rsc);
    }

    /// Builds the handshake context and the EAPoL state machine for one
    /// associated station. With `gtk_rsc` the group key goes into the
    /// context up front; without it the engine installs the group key
    /// through its own group-key message flow.
    pub fn start_rsna(&mut self, id: StationId, gtk_rsc: Option<[u8; 6]>) -> Result<(), Error> {
        let own_addr = self.device.own_addr();
        let authenticator_ie = self.rsn_info().to_bytes();
        let sta = self.stations.get_mut(id).ok_or(Error::StaleStation)?;

        // This handshake setup assumes a PSK network.
        let mut hs = HandshakeState {
            role: Role::Authenticator,
            ssid: self.config.ssid.clone(),
            authenticator_ie,
            supplicant_ie: sta.assoc_rsne.clone(),
            pmk: self.config.pmk,
            authenticator_addr: own_addr,
            supplicant_addr: sta.addr,
            gtk: None,
        };
        if let Some(rsc) = gtk_rsc {
            hs.gtk = Some(GroupKey {
                key: self.config.gtk.clone(),
                key_index: self.config.gtk_index,
                rsc,
            });
        }

        match self.device.new_eapol_sm(&hs) {
            Ok(mut sm) => {
                sm.set_listen_interval(sta.listen_interval);
                sm.register();
                sta.hs = Some(hs);
                sta.sm = Some(sm);
                sta.state = StationState::HandshakeInProgress;
                debug!("started handshake with STA {}", sta.addr);
                Ok(())
            }
            Err(e) => {
                error!("could not create eapol state machine for {}: {}", sta.addr, e);
                let _ = self.destroy_station(id, ReasonCode::UNSPECIFIED_REASON, true);
                Err(Error::EapolEngine(e))
            }
        }
    }

    /// Lifecycle events from the external handshake engine.
    pub fn on_handshake_event(&mut self, id: StationId, event: HandshakeEvent) {
        let sta = match self.stations.get_mut(id) {
            Some(sta) => sta,
            None => {
                debug!("handshake event {:?} for a departed station", event);
                return;
            }
        };
        match event {
            HandshakeEvent::Completed => {
                if sta.state == StationState::Authenticated {
                    debug!("ignoring replayed handshake completion for {}", sta.addr);
                    return;
                }
                sta.state = StationState::Authenticated;
                debug!("STA {} authenticated", sta.addr);
                let (addr, aid) = (sta.addr, sta.aid);
                self.event_sink.send(ApEvent::StationAuthenticated { addr, aid });
            }
            HandshakeEvent::Failed { reason } => {
                let addr = sta.addr;
                // Cleared here so the destroy path's engine teardown is a
                // no-op rather than a second teardown.
                sta.sm = None;
                self.device.handshake_failed(&addr, reason);
                let _ = self.destroy_station(id, reason, false);
            }
            HandshakeEvent::SettingKeysFailed => {
                warn!("failed to install keys for STA {}", sta.addr);
                sta.sm = None;
                let _ = self.destroy_station(id, ReasonCode::UNSPECIFIED_REASON, false);
            }
        }
    }

    /// A deauthentication frame from the station itself.
    pub fn handle_deauth(&mut self, addr: &MacAddr, reason: ReasonCode) {
        match self.stations.find_by_addr(addr) {
            Some(id) => {
                debug!("STA {} deauthenticated (reason {})", addr, reason);
                let _ = self.destroy_station(id, reason, false);
            }
            None => debug!("deauthentication from unknown STA {}", addr),
        }
    }

    /// A disassociation frame from the station itself.
    pub fn handle_disassoc(&mut self, addr: &MacAddr, reason: ReasonCode) {
        match self.stations.find_by_addr(addr) {
            Some(id) => {
                debug!("STA {} disassociated (reason {})", addr, reason);
                let _ = self.destroy_station(id, reason, false);
            }
            None => debug!("disassociation from unknown STA {}", addr),
        }
    }

    /// Tears one station down. Ordering invariant: link-level removal,
    /// then command cancellation, then engine/handshake teardown, then
    /// record removal — a completion that already fired cannot run
    /// against the freed record because its id goes stale here.
    pub fn destroy_station(
        &mut self,
        id: StationId,
        reason: ReasonCode,
        send_disassociate: bool,
    ) -> Result<(), Error> {
        let sta = match self.stations.get_mut(id) {
            Some(sta) => sta,
            None => {
                error!("tried to remove station that doesn't exist");
                return Err(Error::StaleStation);
            }
        };
        let addr = sta.addr;
        self.device.del_station(&addr, reason, send_disassociate);
        if let Some(cmd) = sta.gtk_query_cmd.take() {
            self.device.cancel_cmd(cmd);
        }
        sta.sm = None;
        sta.hs = None;
        let sta = self.stations.remove(id).ok_or(Error::StaleStation)?;
        if let Some(cmd) = sta.assoc_resp_cmd {
            self.device.cancel_cmd(cmd);
        }
        self.aids.release(sta.aid);
        debug!("removed STA {} (reason {})", addr, reason);
        self.event_sink.send(ApEvent::StationRemoved { addr, reason });
        Ok(())
    }
}
