// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! RSN cipher suites and a fixed-shape RSN element codec.
//!
//! The AP advertises exactly one element shape: version 1, one group data
//! cipher, a short pairwise cipher list, the PSK AKM, and zeroed RSN
//! capabilities (IEEE Std 802.11-2016, 9.4.2.25). The reader below walks
//! the same shape in offered elements far enough to validate suite
//! selection against AP policy; the offered bytes themselves are kept
//! verbatim for the handshake.

use thiserror::Error;

pub const RSNE_ID: u8 = 0x30;
pub const RSNE_VERSION: u16 = 1;

/// IEEE 802.11 OUI used by all standard RSN suite selectors.
pub const OUI: [u8; 3] = [0x00, 0x0f, 0xac];

const AKM_PSK: u8 = 2;

/// The data-confidentiality ciphers this AP core can negotiate.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CipherSuite {
    Tkip,
    Ccmp128,
}

impl CipherSuite {
    const ALL: [CipherSuite; 2] = [CipherSuite::Tkip, CipherSuite::Ccmp128];

    pub fn suite_type(self) -> u8 {
        match self {
            CipherSuite::Tkip => 2,
            CipherSuite::Ccmp128 => 4,
        }
    }

    fn from_suite_type(suite_type: u8) -> Option<Self> {
        match suite_type {
            2 => Some(CipherSuite::Tkip),
            4 => Some(CipherSuite::Ccmp128),
            _ => None,
        }
    }
}

/// A small set of ciphers, used for the AP's negotiated pairwise mask and
/// for the intersection checks during association.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct CipherSet(u8);

impl CipherSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(suites: &[CipherSuite]) -> Self {
        let mut set = Self::empty();
        for suite in suites {
            set.insert(*suite);
        }
        set
    }

    pub fn insert(&mut self, suite: CipherSuite) {
        self.0 |= 1 << suite.suite_type();
    }

    pub fn contains(&self, suite: CipherSuite) -> bool {
        self.0 & (1 << suite.suite_type()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn intersection(&self, other: CipherSet) -> CipherSet {
        CipherSet(self.0 & other.0)
    }

    /// Iterates in fixed suite order so element encoding is deterministic.
    pub fn iter(&self) -> impl Iterator<Item = CipherSuite> + '_ {
        CipherSuite::ALL.iter().copied().filter(move |s| self.contains(*s))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RsnError {
    #[error("element is not an RSN element")]
    NotRsn,
    #[error("RSN element truncated")]
    Truncated,
    #[error("unsupported RSN version {0}")]
    UnsupportedVersion(u16),
}

/// Authenticator-side RSN parameters: a pure function of AP configuration.
/// The AKM is fixed to PSK for this core.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RsnInfo {
    pub group_cipher: CipherSuite,
    pub pairwise_ciphers: CipherSet,
}

impl RsnInfo {
    /// Encodes the wire-format element, element id and length included.
    /// Deterministic: equal `RsnInfo` values produce identical bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let pairwise: Vec<CipherSuite> = self.pairwise_ciphers.iter().collect();
        let body_len = 2 + 4 + 2 + 4 * pairwise.len() + 2 + 4 + 2;
        let mut buf = Vec::with_capacity(2 + body_len);
        buf.push(RSNE_ID);
        buf.push(body_len as u8);
        buf.extend_from_slice(&RSNE_VERSION.to_le_bytes());
        push_suite(&mut buf, self.group_cipher.suite_type());
        buf.extend_from_slice(&(pairwise.len() as u16).to_le_bytes());
        for suite in &pairwise {
            push_suite(&mut buf, suite.suite_type());
        }
        buf.extend_from_slice(&1u16.to_le_bytes());
        push_suite(&mut buf, AKM_PSK);
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf
    }
}

fn push_suite(buf: &mut Vec<u8>, suite_type: u8) {
    buf.extend_from_slice(&OUI);
    buf.push(suite_type);
}

/// Suites offered by a station in its association request. Selectors with
/// an unknown OUI or suite type are skipped rather than rejected here;
/// policy decides what to make of what remains.
#[derive(Debug, PartialEq, Eq)]
pub struct RsnOffer {
    pub group_cipher: Option<CipherSuite>,
    pub pairwise_ciphers: CipherSet,
    pub akm_psk: bool,
}

impl RsnOffer {
    pub fn parse(element: &[u8]) -> Result<RsnOffer, RsnError> {
        if element.len() < 2 || element[0] != RSNE_ID {
            return Err(RsnError::NotRsn);
        }
        let body_len = element[1] as usize;
        if element.len() < 2 + body_len {
            return Err(RsnError::Truncated);
        }
        let mut r = Reader { buf: &element[2..2 + body_len] };

        let version = r.read_u16()?;
        if version != RSNE_VERSION {
            return Err(RsnError::UnsupportedVersion(version));
        }

        let group_cipher = r.read_suite()?.and_then(|t| CipherSuite::from_suite_type(t));

        let mut pairwise_ciphers = CipherSet::empty();
        let pairwise_count = r.read_u16()?;
        for _ in 0..pairwise_count {
            if let Some(t) = r.read_suite()? {
                if let Some(suite) = CipherSuite::from_suite_type(t) {
                    pairwise_ciphers.insert(suite);
                }
            }
        }

        let mut akm_psk = false;
        let akm_count = r.read_u16()?;
        for _ in 0..akm_count {
            if r.read_suite()? == Some(AKM_PSK) {
                akm_psk = true;
            }
        }

        // RSN capabilities and anything beyond (PMKIDs, group management
        // cipher) do not participate in suite selection for this core.
        Ok(RsnOffer { group_cipher, pairwise_ciphers, akm_psk })
    }
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn read_u16(&mut self) -> Result<u16, RsnError> {
        if self.buf.len() < 2 {
            return Err(RsnError::Truncated);
        }
        let v = u16::from_le_bytes([self.buf[0], self.buf[1]]);
        self.buf = &self.buf[2..];
        Ok(v)
    }

    /// Reads one suite selector. Returns the suite type for the standard
    /// OUI, `None` for a vendor OUI.
    fn read_suite(&mut self) -> Result<Option<u8>, RsnError> {
        if self.buf.len() < 4 {
            return Err(RsnError::Truncated);
        }
        let selector = &self.buf[..4];
        self.buf = &self.buf[4..];
        if selector[..3] == OUI {
            Ok(Some(selector[3]))
        } else {
            Ok(None)
        }
    }
}
