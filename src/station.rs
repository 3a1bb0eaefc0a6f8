// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Per-station records and the arena that owns them.
//!
//! Stations are addressed by [`StationId`], a slot index paired with a
//! generation counter. Every asynchronous operation carries the id of the
//! station it was issued for; when the completion finally runs, the arena
//! lookup fails for any station destroyed in the meantime, which turns the
//! completion into a no-op instead of a use-after-free.

use bytes::Bytes;

use crate::aid::Aid;
use crate::authenticator::{EapolSm, HandshakeState};
use crate::device::CmdId;
use crate::mac::{CapabilityInfo, MacAddr, RateSet};

/// Stable handle to a station record. Stale after the record is
/// destroyed; a recycled slot carries a new generation so old handles
/// never resolve again.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct StationId {
    index: u32,
    generation: u32,
}

/// Association progress of one station.
///
/// A record is created while the association response is still in flight
/// (`Unassociated`), becomes `Associated` once the response went out,
/// `HandshakeInProgress` when its EAPoL machine starts, and
/// `Authenticated` when the handshake completes. Removal is not a state:
/// a removed record ceases to exist.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StationState {
    Unassociated,
    Associated,
    HandshakeInProgress,
    Authenticated,
}

#[derive(Debug)]
pub struct Station {
    pub addr: MacAddr,
    pub aid: Aid,
    pub state: StationState,
    pub capability: CapabilityInfo,
    pub listen_interval: u16,
    pub rates: RateSet,
    /// The RSN element offered at association time, verbatim. The
    /// handshake needs these exact bytes as the supplicant IE.
    pub assoc_rsne: Bytes,
    pub assoc_resp_cmd: Option<CmdId>,
    pub gtk_query_cmd: Option<CmdId>,
    pub hs: Option<HandshakeState>,
    pub sm: Option<Box<dyn EapolSm>>,
}

impl Station {
    pub fn new(
        addr: MacAddr,
        aid: Aid,
        capability: CapabilityInfo,
        listen_interval: u16,
        rates: RateSet,
        assoc_rsne: Bytes,
    ) -> Self {
        Station {
            addr,
            aid,
            state: StationState::Unassociated,
            capability,
            listen_interval,
            rates,
            assoc_rsne,
            assoc_resp_cmd: None,
            gtk_query_cmd: None,
            hs: None,
            sm: None,
        }
    }

    pub fn associated(&self) -> bool {
        !matches!(self.state, StationState::Unassociated)
    }

    pub fn rsna_established(&self) -> bool {
        matches!(self.state, StationState::Authenticated)
    }
}

struct Slot {
    generation: u32,
    station: Option<Station>,
}

/// Generation-checked arena of station records.
#[derive(Default)]
pub struct StationMap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl StationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, station: Station) -> StationId {
        self.len += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.station = Some(station);
                StationId { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, station: Some(station) });
                StationId { index, generation: 0 }
            }
        }
    }

    pub fn get(&self, id: StationId) -> Option<&Station> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.station.as_ref()
    }

    pub fn get_mut(&mut self, id: StationId) -> Option<&mut Station> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.station.as_mut()
    }

    /// Removes and returns the record. The slot's generation is bumped so
    /// any handle still referring to this station goes stale now.
    pub fn remove(&mut self, id: StationId) -> Option<Station> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let station = slot.station.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(station)
    }

    pub fn contains(&self, id: StationId) -> bool {
        self.get(id).is_some()
    }

    pub fn find_by_addr(&self, addr: &MacAddr) -> Option<StationId> {
        self.iter().find(|(_, sta)| sta.addr == *addr).map(|(id, _)| id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StationId, &Station)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.station.as_ref().map(|sta| {
                (StationId { index: index as u32, generation: slot.generation }, sta)
            })
        })
    }

    pub fn ids(&self) -> Vec<StationId> {
        self.iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
