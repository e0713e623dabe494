// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The four-region process image.
//!
//! One region per register kind, named `{prefix}DI` / `{prefix}DO` /
//! `{prefix}AI` / `{prefix}AO`. Bit regions hold one byte per channel (0 or
//! 1); word regions hold one native-endian 16-bit word per channel. An
//! external reader therefore sees individual channels atomically, but a
//! snapshot across several channels is not atomic.

use wisp_coupler::ChannelCounts;
use wisp_modbus::RegisterKind;

use crate::error::{ImageError, ImageResult};
use crate::region::{CreateMode, SharedRegion, SharedRegionFactory};

// =============================================================================
// ProcessImage
// =============================================================================

/// The host-side snapshot of all coupler channels.
pub struct ProcessImage {
    regions: [Box<dyn SharedRegion>; 4],
    counts: ChannelCounts,
}

impl ProcessImage {
    /// Creates the four shared regions sized from the channel counts.
    ///
    /// Region sizes in bytes are `di`, `do`, `2·ai`, `2·ao`. All four are
    /// created even when empty, so readers can always open the full set.
    pub fn create(
        factory: &dyn SharedRegionFactory,
        prefix: &str,
        counts: ChannelCounts,
        mode: CreateMode,
    ) -> ImageResult<Self> {
        let mut regions = Vec::with_capacity(4);
        for kind in RegisterKind::ALL {
            let name = format!("{prefix}{kind}");
            let bytes = counts.get(kind) * element_size(kind);
            regions.push(factory.create(&name, bytes, mode)?);
        }

        let regions: [Box<dyn SharedRegion>; 4] = match regions.try_into() {
            Ok(regions) => regions,
            Err(_) => unreachable!("RegisterKind::ALL has four elements"),
        };

        tracing::info!(
            prefix,
            di_count = counts.get(RegisterKind::Di),
            do_count = counts.get(RegisterKind::Do),
            ai_count = counts.get(RegisterKind::Ai),
            ao_count = counts.get(RegisterKind::Ao),
            "process image created"
        );

        Ok(Self { regions, counts })
    }

    /// Channel count of one kind.
    pub fn count(&self, kind: RegisterKind) -> usize {
        self.counts.get(kind)
    }

    /// The counts the image was sized from.
    pub fn counts(&self) -> ChannelCounts {
        self.counts
    }

    /// Object name of one region.
    pub fn region_name(&self, kind: RegisterKind) -> &str {
        self.regions[kind.index()].name()
    }

    // =========================================================================
    // Single-channel accessors
    // =========================================================================

    /// Reads one digital channel. Any non-zero byte reads as `true`.
    pub fn read_bit(&self, kind: RegisterKind, index: usize) -> ImageResult<bool> {
        if !kind.is_bit() {
            return Err(ImageError::KindMismatch { kind, access: "bit" });
        }
        self.check_index(kind, index)?;
        Ok(self.regions[kind.index()].as_slice()[index] != 0)
    }

    /// Writes one digital output channel.
    pub fn write_bit(&mut self, index: usize, value: bool) -> ImageResult<()> {
        let kind = RegisterKind::Do;
        self.check_index(kind, index)?;
        self.regions[kind.index()].as_mut_slice()[index] = u8::from(value);
        Ok(())
    }

    /// Reads one analog channel.
    pub fn read_word(&self, kind: RegisterKind, index: usize) -> ImageResult<u16> {
        if !kind.is_word() {
            return Err(ImageError::KindMismatch { kind, access: "word" });
        }
        self.check_index(kind, index)?;
        let bytes = self.regions[kind.index()].as_slice();
        Ok(u16::from_ne_bytes([bytes[index * 2], bytes[index * 2 + 1]]))
    }

    /// Writes one analog output channel.
    pub fn write_word(&mut self, index: usize, value: u16) -> ImageResult<()> {
        let kind = RegisterKind::Ao;
        self.check_index(kind, index)?;
        let bytes = self.regions[kind.index()].as_mut_slice();
        bytes[index * 2..index * 2 + 2].copy_from_slice(&value.to_ne_bytes());
        Ok(())
    }

    // =========================================================================
    // Segment transfer
    // =========================================================================

    /// Stores fetched digital channels at `offset`.
    pub fn store_bits(&mut self, kind: RegisterKind, offset: usize, bits: &[bool]) -> ImageResult<()> {
        if !kind.is_bit() {
            return Err(ImageError::KindMismatch { kind, access: "bit" });
        }
        self.check_span(kind, offset, bits.len())?;
        let slice = &mut self.regions[kind.index()].as_mut_slice()[offset..offset + bits.len()];
        for (byte, bit) in slice.iter_mut().zip(bits) {
            *byte = u8::from(*bit);
        }
        Ok(())
    }

    /// Loads digital channels starting at `offset`.
    pub fn load_bits(&self, kind: RegisterKind, offset: usize, len: usize) -> ImageResult<Vec<bool>> {
        if !kind.is_bit() {
            return Err(ImageError::KindMismatch { kind, access: "bit" });
        }
        self.check_span(kind, offset, len)?;
        Ok(self.regions[kind.index()].as_slice()[offset..offset + len]
            .iter()
            .map(|byte| *byte != 0)
            .collect())
    }

    /// Stores fetched analog channels at `offset` (in words).
    pub fn store_words(&mut self, kind: RegisterKind, offset: usize, words: &[u16]) -> ImageResult<()> {
        if !kind.is_word() {
            return Err(ImageError::KindMismatch { kind, access: "word" });
        }
        self.check_span(kind, offset, words.len())?;
        let bytes = self.regions[kind.index()].as_mut_slice();
        for (i, word) in words.iter().enumerate() {
            let at = (offset + i) * 2;
            bytes[at..at + 2].copy_from_slice(&word.to_ne_bytes());
        }
        Ok(())
    }

    /// Loads analog channels starting at `offset` (in words).
    pub fn load_words(&self, kind: RegisterKind, offset: usize, len: usize) -> ImageResult<Vec<u16>> {
        if !kind.is_word() {
            return Err(ImageError::KindMismatch { kind, access: "word" });
        }
        self.check_span(kind, offset, len)?;
        let bytes = self.regions[kind.index()].as_slice();
        Ok((offset..offset + len)
            .map(|i| u16::from_ne_bytes([bytes[i * 2], bytes[i * 2 + 1]]))
            .collect())
    }

    // =========================================================================
    // Bounds
    // =========================================================================

    fn check_index(&self, kind: RegisterKind, index: usize) -> ImageResult<()> {
        let size = self.counts.get(kind);
        if index >= size {
            return Err(ImageError::IndexOutOfRange { kind, index, size });
        }
        Ok(())
    }

    fn check_span(&self, kind: RegisterKind, offset: usize, len: usize) -> ImageResult<()> {
        let size = self.counts.get(kind);
        if offset + len > size {
            return Err(ImageError::IndexOutOfRange {
                kind,
                index: offset + len,
                size,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for ProcessImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessImage")
            .field("di", &self.counts.get(RegisterKind::Di))
            .field("do", &self.counts.get(RegisterKind::Do))
            .field("ai", &self.counts.get(RegisterKind::Ai))
            .field("ao", &self.counts.get(RegisterKind::Ao))
            .finish()
    }
}

/// Bytes per channel of a kind.
const fn element_size(kind: RegisterKind) -> usize {
    if kind.is_bit() {
        1
    } else {
        2
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::MemFactory;

    fn image(di: usize, do_: usize, ai: usize, ao: usize) -> ProcessImage {
        ProcessImage::create(
            &MemFactory,
            "test_",
            ChannelCounts::new(di, do_, ai, ao),
            CreateMode::Exclusive,
        )
        .unwrap()
    }

    #[test]
    fn regions_are_named_and_sized_per_kind() {
        let image = image(4, 2, 3, 1);
        assert_eq!(image.region_name(RegisterKind::Di), "test_DI");
        assert_eq!(image.region_name(RegisterKind::Ao), "test_AO");
        assert_eq!(image.count(RegisterKind::Di), 4);
        assert_eq!(image.count(RegisterKind::Ao), 1);
    }

    #[test]
    fn bit_round_trip() {
        let mut image = image(0, 4, 0, 0);
        image.write_bit(0, true).unwrap();
        image.write_bit(3, true).unwrap();
        image.write_bit(3, false).unwrap();

        assert!(image.read_bit(RegisterKind::Do, 0).unwrap());
        assert!(!image.read_bit(RegisterKind::Do, 1).unwrap());
        assert!(!image.read_bit(RegisterKind::Do, 3).unwrap());
    }

    #[test]
    fn word_round_trip() {
        let mut image = image(0, 0, 0, 2);
        image.write_word(1, 0xBEEF).unwrap();
        assert_eq!(image.read_word(RegisterKind::Ao, 1).unwrap(), 0xBEEF);
        assert_eq!(image.read_word(RegisterKind::Ao, 0).unwrap(), 0);
    }

    #[test]
    fn index_bounds_are_enforced() {
        let mut image = image(2, 2, 2, 2);

        assert!(matches!(
            image.read_bit(RegisterKind::Di, 2),
            Err(ImageError::IndexOutOfRange { index: 2, size: 2, .. })
        ));
        assert!(image.write_bit(2, true).is_err());
        assert!(image.write_word(2, 0).is_err());
        assert!(image.read_word(RegisterKind::Ai, 5).is_err());
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let image = image(1, 1, 1, 1);
        assert!(matches!(
            image.read_bit(RegisterKind::Ai, 0),
            Err(ImageError::KindMismatch { access: "bit", .. })
        ));
        assert!(matches!(
            image.read_word(RegisterKind::Di, 0),
            Err(ImageError::KindMismatch { access: "word", .. })
        ));
    }

    #[test]
    fn segment_transfer_round_trip() {
        let mut image = image(6, 0, 0, 4);

        image
            .store_bits(RegisterKind::Di, 2, &[true, false, true])
            .unwrap();
        assert_eq!(
            image.load_bits(RegisterKind::Di, 0, 6).unwrap(),
            [false, false, true, false, true, false]
        );

        image.store_words(RegisterKind::Ao, 1, &[7, 8]).unwrap();
        assert_eq!(image.load_words(RegisterKind::Ao, 0, 4).unwrap(), [0, 7, 8, 0]);
    }

    #[test]
    fn span_past_end_is_rejected() {
        let mut image = image(4, 0, 0, 0);
        assert!(image
            .store_bits(RegisterKind::Di, 3, &[true, true])
            .is_err());
        assert!(image.load_bits(RegisterKind::Di, 4, 1).is_err());
    }

    #[test]
    fn words_are_native_endian_in_memory() {
        let mut image = image(0, 0, 0, 1);
        image.write_word(0, 0x1234).unwrap();
        let via_load = image.load_words(RegisterKind::Ao, 0, 1).unwrap();
        assert_eq!(via_load, [0x1234]);
    }
}
