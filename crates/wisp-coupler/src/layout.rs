// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Process-image layout across the coupler's dual address windows.
//!
//! For every register kind the coupler aliases its process data across two
//! disjoint Modbus address windows. Channels fill window 1 first; the
//! overflow continues in window 2. Each resulting segment fits a single PDU
//! by construction, so the cycle engine issues exactly one transaction per
//! segment.

use wisp_modbus::RegisterKind;

use crate::clamp::ChannelCounts;
use crate::error::{CouplerError, CouplerResult};

// =============================================================================
// Windows
// =============================================================================

/// One coupler address window: start address and capacity in channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// First Modbus address of the window.
    pub address: u16,
    /// Number of channels the window can hold.
    pub capacity: usize,
}

/// The two process-data windows of a register kind.
pub const fn windows(kind: RegisterKind) -> (Window, Window) {
    match kind {
        RegisterKind::Di => (
            Window { address: 0x0000, capacity: 512 },
            Window { address: 0x8000, capacity: 1527 },
        ),
        RegisterKind::Do => (
            Window { address: 0x0200, capacity: 512 },
            Window { address: 0x9000, capacity: 1527 },
        ),
        RegisterKind::Ai => (
            Window { address: 0x0000, capacity: 256 },
            Window { address: 0x6000, capacity: 764 },
        ),
        RegisterKind::Ao => (
            Window { address: 0x0200, capacity: 256 },
            Window { address: 0x7000, capacity: 764 },
        ),
    }
}

// =============================================================================
// ImageSegment
// =============================================================================

/// One contiguous run of channels: Modbus address, length, and the offset of
/// the run inside the host-side image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSegment {
    /// First Modbus address of the segment.
    pub address: u16,
    /// Number of channels.
    pub length: usize,
    /// Offset of the first channel in the process image.
    pub offset: usize,
}

// =============================================================================
// ImageLayout
// =============================================================================

/// Per-kind segment lists computed from channel counts.
#[derive(Debug, Clone, Default)]
pub struct ImageLayout {
    segments: [Vec<ImageSegment>; 4],
    counts: ChannelCounts,
}

impl ImageLayout {
    /// Computes the layout for the given channel counts.
    ///
    /// Pure function of its input; fails only when a kind's channel count
    /// exceeds the combined capacity of its two windows.
    pub fn for_counts(counts: ChannelCounts) -> CouplerResult<Self> {
        let mut segments: [Vec<ImageSegment>; 4] = Default::default();

        for kind in RegisterKind::ALL {
            let total = counts.get(kind);
            if total == 0 {
                continue;
            }

            let (first, second) = windows(kind);
            if total > first.capacity + second.capacity {
                return Err(CouplerError::TooManyChannels {
                    kind,
                    count: total,
                    capacity: first.capacity + second.capacity,
                });
            }

            let list = &mut segments[kind.index()];
            list.push(ImageSegment {
                address: first.address,
                length: total.min(first.capacity),
                offset: 0,
            });

            if total > first.capacity {
                list.push(ImageSegment {
                    address: second.address,
                    length: total - first.capacity,
                    offset: first.capacity,
                });
            }
        }

        Ok(Self { segments, counts })
    }

    /// Segments of one register kind, in image order.
    pub fn segments(&self, kind: RegisterKind) -> &[ImageSegment] {
        &self.segments[kind.index()]
    }

    /// The channel counts this layout was computed for.
    pub fn counts(&self) -> ChannelCounts {
        self.counts
    }
}

// =============================================================================
// Tests
// =============================================================================
