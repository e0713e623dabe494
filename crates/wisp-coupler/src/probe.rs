// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Coupler identity probe and clamp-configuration discovery.
//!
//! The WAGO coupler publishes a block of constant input registers that act
//! as a device signature, and a block of holding registers describing the
//! installed clamps. Both blocks carry their 16-bit payloads in the
//! coupler's documented little-endian-of-host encoding, while Modbus itself
//! is big-endian on the wire; [`coupler_word`] is the single normalization
//! point between the two.
//!
//! Registers touched here (all read-only for this crate):
//!
//! | Purpose | Kind | Start | Length |
//! |---|---|---|---|
//! | Constant signature | AI | `0x2000` | 9 |
//! | Clamp config block | AO | `0x2030` | 65 (slot 0 = coupler head) |
//! | Process-image channel counts | AI | `0x1022` | 4 × 1 |
//! | MAC, TOS, firmware, description | AI | `0x1031`.. | see `INFO_RANGES` |
//!
//! The watchdog (`0x1000`..`0x100B`), LED error (`0x1020`..), KBUS reset
//! (`0x102B`), software reset (`0x2040`) and factory settings (`0x2043`)
//! registers are documented for completeness but never written: coupler
//! configuration is out of scope.

use wisp_modbus::{ModbusClient, RegisterRange};

use crate::clamp::{Clamp, ClampRoster};
use crate::error::{CouplerError, CouplerResult};

/// Start of the constant signature block (input registers).
pub const IDENTITY_ADDR: u16 = 0x2000;

/// The constant signature of a WAGO Modbus TCP fieldbus coupler.
pub const IDENTITY_CONSTANTS: [u16; 9] = [
    0x0000, 0xFFFF, 0x1234, 0xAAAA, 0x5555, 0x7FFF, 0x8000, 0x3FFF, 0x4000,
];

/// Start of the clamp configuration block (holding registers).
pub const CLAMP_CONFIG_ADDR: u16 = 0x2030;

/// Length of the clamp configuration block. Slot 0 describes the coupler
/// head itself, leaving up to 64 clamp slots.
pub const CLAMP_CONFIG_LEN: u16 = 65;

/// Normalizes one coupler meta register from its documented encoding to a
/// host-order value. Applied exactly once per word, here at the probe
/// boundary; everything downstream works on host-order words.
#[inline]
pub fn coupler_word(raw: u16) -> u16 {
    u16::from_le(raw)
}

// =============================================================================
// Identity check
// =============================================================================

/// Compares an identity block against the WAGO signature.
///
/// The error names the first mismatching register address together with the
/// expected and observed words.
pub fn check_constants(words: &[u16]) -> CouplerResult<()> {
    if words.len() != IDENTITY_CONSTANTS.len() {
        return Err(CouplerError::ShortIdentityBlock {
            expected: IDENTITY_CONSTANTS.len(),
            got: words.len(),
        });
    }

    for (i, (&raw, &expected)) in words.iter().zip(IDENTITY_CONSTANTS.iter()).enumerate() {
        let observed = coupler_word(raw);
        if observed != expected {
            return Err(CouplerError::NotAWagoCoupler {
                address: IDENTITY_ADDR + i as u16,
                expected,
                observed,
            });
        }
    }
    Ok(())
}

/// Reads the signature block and verifies the remote is a WAGO coupler.
pub async fn verify_identity(client: &mut ModbusClient) -> CouplerResult<()> {
    let words = client
        .read_input_registers(IDENTITY_ADDR, IDENTITY_CONSTANTS.len() as u16)
        .await?;
    check_constants(&words)?;
    tracing::debug!("coupler identity constants verified");
    Ok(())
}

// =============================================================================
// Clamp roster
// =============================================================================

/// Decodes the clamp configuration block into a roster.
///
/// Slot 0 (the coupler head) is skipped. Scanning stops at the first zero
/// word. An empty roster is fatal.
pub fn decode_roster(words: &[u16]) -> CouplerResult<ClampRoster> {
    let mut clamps = Vec::new();

    for &raw in words.iter().skip(1) {
        let word = coupler_word(raw);
        if word == 0x0000 {
            break;
        }
        clamps.push(Clamp::from_config_word(word)?);
    }

    if clamps.is_empty() {
        return Err(CouplerError::NoModulesDetected);
    }
    Ok(ClampRoster::new(clamps))
}

/// Reads the clamp configuration block and decodes the roster.
pub async fn read_roster(client: &mut ModbusClient) -> CouplerResult<ClampRoster> {
    let words = client
        .read_holding_registers(CLAMP_CONFIG_ADDR, CLAMP_CONFIG_LEN)
        .await?;
    let roster = decode_roster(&words)?;
    tracing::info!(clamps = roster.len(), "decoded clamp configuration");
    Ok(roster)
}

// =============================================================================
// Coupler info
// =============================================================================

/// Info registers read once at startup, for display only.
const INFO_RANGES: [(RegisterRange, &str); 14] = [
    ((0x1022, 1), "Analog outputs in process image"),
    ((0x1023, 1), "Analog inputs in process image"),
    ((0x1024, 1), "Digital outputs in process image"),
    ((0x1025, 1), "Digital inputs in process image"),
    ((0x1031, 3), "Coupler MAC Address"),
    ((0x1038, 1), "Modbus TOS"),
    ((0x2010, 1), "Firmware Version"),
    ((0x2011, 1), "Series Code"),
    ((0x2012, 1), "Coupler Code"),
    ((0x2013, 1), "Firmware Major"),
    ((0x2014, 1), "Firmware Minor"),
    ((0x2020, 1), "Short description Controller/Coupler"),
    ((0x2021, 1), "Firmware compile time"),
    ((0x2022, 1), "Firmware compile date"),
];

/// Reads the coupler information registers and renders one display line per
/// range: hex words first, decimal in parentheses.
pub async fn read_coupler_info(client: &mut ModbusClient) -> CouplerResult<Vec<String>> {
    let ranges: Vec<RegisterRange> = INFO_RANGES.iter().map(|(range, _)| *range).collect();
    let blocks = client.read_input_registers_bulk(&ranges).await?;

    let mut lines = Vec::with_capacity(INFO_RANGES.len());
    for ((_, label), words) in INFO_RANGES.iter().zip(&blocks) {
        let mut line = format!("{label:<40} -> ");
        for word in words {
            line.push_str(&format!("0x{word:04x} "));
        }
        line.push('(');
        for word in words {
            line.push_str(&format!("{word} "));
        }
        line.push(')');
        lines.push(line);
    }
    Ok(lines)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clamp::ClampKind;
    use wisp_modbus::RegisterKind;

    fn identity_block() -> Vec<u16> {
        IDENTITY_CONSTANTS.iter().map(|w| w.to_le()).collect()
    }

    #[test]
    fn matching_constants_pass() {
        assert!(check_constants(&identity_block()).is_ok());
    }

    #[test]
    fn mismatch_names_offending_address() {
        let mut words = identity_block();
        words[2] = 0x4321u16.to_le();

        let err = check_constants(&words).unwrap_err();
        match err {
            CouplerError::NotAWagoCoupler {
                address,
                expected,
                observed,
            } => {
                assert_eq!(address, 0x2002);
                assert_eq!(expected, 0x1234);
                assert_eq!(observed, 0x4321);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn short_block_is_rejected() {
        assert!(matches!(
            check_constants(&identity_block()[..8]),
            Err(CouplerError::ShortIdentityBlock { expected: 9, got: 8 })
        ));
    }

    #[test]
    fn roster_skips_slot_zero_and_stops_at_sentinel() {
        let mut words = vec![0u16; 65];
        words[0] = 0x0123; // coupler head, ignored
        words[1] = 0x8401u16.to_le(); // DI x4
        words[2] = 453u16.to_le(); // AI x4
        words[3] = 0; // sentinel
        words[4] = 0x8202u16.to_le(); // unreachable

        let roster = decode_roster(&words).unwrap();
        assert_eq!(roster.len(), 2);

        let kinds: Vec<_> = roster.iter().map(|c| c.kind()).collect();
        assert_eq!(kinds, [ClampKind::DigitalInput, ClampKind::AnalogInput]);

        let counts = roster.channel_counts();
        assert_eq!(counts.get(RegisterKind::Di), 4);
        assert_eq!(counts.get(RegisterKind::Ai), 4);
        assert_eq!(counts.get(RegisterKind::Do), 0);
    }

    #[test]
    fn empty_block_means_no_modules() {
        let words = vec![0u16; 65];
        assert!(matches!(
            decode_roster(&words),
            Err(CouplerError::NoModulesDetected)
        ));
    }

    #[test]
    fn bad_clamp_word_propagates() {
        let mut words = vec![0u16; 65];
        words[1] = 0x8400u16.to_le(); // digital with type bits 00
        assert!(matches!(
            decode_roster(&words),
            Err(CouplerError::UnknownDigitalType { .. })
        ));
    }
}
