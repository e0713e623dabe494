// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Clamp catalog and configuration-word decoding.
//!
//! The coupler describes each installed I/O module ("clamp") with one 16-bit
//! configuration word:
//!
//! - Bit 15 set: digital clamp. Bits 14:8 carry the channel count, bits 1:0
//!   select the module type (1 = input, 2 = output).
//! - Bit 15 clear: analog clamp. The whole word is a product id resolved by
//!   catalog lookup.
//!
//! Every clamp contributes channels of exactly one register kind.

use std::fmt;

use wisp_modbus::RegisterKind;

use crate::error::{CouplerError, CouplerResult};

// =============================================================================
// ClampKind
// =============================================================================

/// The module family a clamp belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClampKind {
    /// Digital input clamp.
    DigitalInput,
    /// Digital output clamp.
    DigitalOutput,
    /// Analog input clamp.
    AnalogInput,
    /// Analog output clamp.
    AnalogOutput,
}

impl ClampKind {
    /// The register kind this clamp family contributes channels to.
    pub const fn register_kind(self) -> RegisterKind {
        match self {
            Self::DigitalInput => RegisterKind::Di,
            Self::DigitalOutput => RegisterKind::Do,
            Self::AnalogInput => RegisterKind::Ai,
            Self::AnalogOutput => RegisterKind::Ao,
        }
    }
}

// =============================================================================
// Clamp
// =============================================================================

/// One installed I/O module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamp {
    kind: ClampKind,
    channels: u16,
    config_word: u16,
}

impl Clamp {
    /// Decodes a non-zero configuration word into a clamp.
    ///
    /// The zero word is the end-of-roster sentinel and must be handled by
    /// the caller; it never reaches this function.
    pub fn from_config_word(word: u16) -> CouplerResult<Self> {
        if word & 0x8000 != 0 {
            let channels = (word >> 8) & 0x7F;
            let kind = match word & 0x03 {
                0x01 => ClampKind::DigitalInput,
                0x02 => ClampKind::DigitalOutput,
                _ => return Err(CouplerError::UnknownDigitalType { word }),
            };
            Ok(Self {
                kind,
                channels,
                config_word: word,
            })
        } else {
            // Analog clamps are identified by product id.
            let (kind, channels) = match word {
                453 => (ClampKind::AnalogInput, 4),
                553 => (ClampKind::AnalogOutput, 4),
                _ => return Err(CouplerError::UnknownAnalogId { id: word }),
            };
            Ok(Self {
                kind,
                channels,
                config_word: word,
            })
        }
    }

    /// The module family.
    pub fn kind(&self) -> ClampKind {
        self.kind
    }

    /// Total channel count of this clamp.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// The raw configuration word the coupler reported.
    pub fn config_word(&self) -> u16 {
        self.config_word
    }

    /// Channels this clamp contributes to the given register kind.
    ///
    /// Exactly one kind is non-zero for every clamp.
    pub fn channels_of(&self, kind: RegisterKind) -> u16 {
        if self.kind.register_kind() == kind {
            self.channels
        } else {
            0
        }
    }
}

impl fmt::Display for Clamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            ClampKind::DigitalInput => "Digital Input ",
            ClampKind::DigitalOutput => "Digital Output",
            ClampKind::AnalogInput => "Analog  Input ",
            ClampKind::AnalogOutput => "Analog  Output",
        };
        write!(
            f,
            "{label} with {:>2} channels: 0x{:04x}",
            self.channels, self.config_word
        )
    }
}

// =============================================================================
// ChannelCounts
// =============================================================================

/// Total channel counts per register kind, indexed canonically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelCounts([usize; 4]);

impl ChannelCounts {
    /// Builds counts from explicit per-kind totals (DI, DO, AI, AO).
    pub fn new(di: usize, do_: usize, ai: usize, ao: usize) -> Self {
        Self([di, do_, ai, ao])
    }

    /// Channel count of one kind.
    pub fn get(&self, kind: RegisterKind) -> usize {
        self.0[kind.index()]
    }

    /// Total channels across all kinds.
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

// =============================================================================
// ClampRoster
// =============================================================================

/// The ordered list of clamps, in physical slot order.
#[derive(Debug, Clone, Default)]
pub struct ClampRoster {
    clamps: Vec<Clamp>,
}

impl ClampRoster {
    /// Creates a roster from decoded clamps.
    pub fn new(clamps: Vec<Clamp>) -> Self {
        Self { clamps }
    }

    /// Number of clamps.
    pub fn len(&self) -> usize {
        self.clamps.len()
    }

    /// Returns `true` if no clamps were discovered.
    pub fn is_empty(&self) -> bool {
        self.clamps.is_empty()
    }

    /// Iterates the clamps in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Clamp> {
        self.clamps.iter()
    }

    /// Sums channel counts per register kind.
    pub fn channel_counts(&self) -> ChannelCounts {
        let mut counts = [0usize; 4];
        for clamp in &self.clamps {
            for kind in RegisterKind::ALL {
                counts[kind.index()] += clamp.channels_of(kind) as usize;
            }
        }
        ChannelCounts(counts)
    }
}

// =============================================================================
// Tests
// =============================================================================
