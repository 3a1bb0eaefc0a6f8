// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Interface lifecycle watching.
//!
//! The platform's link watcher reports interface transitions; this
//! module turns them into AP instance creation and teardown. An
//! interface gets an instance while it is AP-type and administratively
//! up, and loses it (stations destroyed first) when it goes down or
//! disappears.

use std::collections::HashMap;

use log::{debug, info};

use crate::ap::{Ap, ApConfig};
use crate::device::{Device, IfaceInfo, IfaceType};
use crate::sink::ApEventSink;

/// Interface state transitions delivered by the platform watcher.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NetdevEvent {
    New,
    Up,
    Down,
    Deleted,
}

/// Produces the device handle and AP configuration for an interface that
/// just became eligible to run an AP.
pub trait DeviceBinder {
    type Device: Device;
    fn bind(&mut self, iface: &IfaceInfo) -> (Self::Device, ApConfig);
}

/// Owns the AP instance of every AP-mode interface. Registration with
/// the platform watcher is paired with this object's lifetime; dropping
/// the manager tears every instance down.
pub struct ApManager<B: DeviceBinder> {
    binder: B,
    aps: HashMap<u32, Ap<B::Device>>,
    event_sink: ApEventSink,
}

impl<B: DeviceBinder> ApManager<B> {
    pub fn new(binder: B, event_sink: ApEventSink) -> Self {
        ApManager { binder, aps: HashMap::new(), event_sink }
    }

    pub fn on_netdev_event(&mut self, iface: &IfaceInfo, event: NetdevEvent) {
        match event {
            NetdevEvent::New | NetdevEvent::Up => {
                if iface.iftype != IfaceType::Ap || !iface.up {
                    return;
                }
                if self.aps.contains_key(&iface.ifindex) {
                    debug!("interface {} already has an AP instance", iface.ifindex);
                    return;
                }
                let (device, config) = self.binder.bind(iface);
                info!("creating AP instance on interface {}", iface.ifindex);
                self.aps.insert(iface.ifindex, Ap::new(device, config, self.event_sink.clone()));
            }
            NetdevEvent::Down | NetdevEvent::Deleted => {
                if let Some(mut ap) = self.aps.remove(&iface.ifindex) {
                    info!("destroying AP instance on interface {}", iface.ifindex);
                    ap.shutdown();
                }
            }
        }
    }

    pub fn get_mut(&mut self, ifindex: u32) -> Option<&mut Ap<B::Device>> {
        self.aps.get_mut(&ifindex)
    }

    pub fn len(&self) -> usize {
        self.aps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aps.is_empty()
    }
}

impl<B: DeviceBinder> Drop for ApManager<B> {
    fn drop(&mut self) {
        for (_, mut ap) in self.aps.drain() {
            ap.shutdown();
        }
    }
}
