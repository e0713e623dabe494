// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! MBAP framing and PDU codecs.
//!
//! Everything on the wire is big-endian. The header is seven bytes:
//! transaction id (2), protocol id (2, always zero), length (2, unit id +
//! PDU), unit id (1). The PDU follows immediately.

use crate::error::{ModbusError, ModbusResult};

/// Largest legal Modbus TCP frame (MBAP header + 253-byte PDU).
pub const MAX_FRAME_LEN: usize = 260;

/// Largest legal PDU.
pub const MAX_PDU_LEN: usize = 253;

// =============================================================================
// MbapHeader
// =============================================================================

/// Modbus TCP Application Protocol header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbapHeader {
    /// Transaction identifier, echoed by the server.
    pub transaction_id: u16,
    /// Protocol identifier, zero for Modbus.
    pub protocol_id: u16,
    /// Number of following bytes (unit id + PDU).
    pub length: u16,
    /// Unit identifier.
    pub unit_id: u8,
}

impl MbapHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 7;

    /// Creates a header for a request PDU of `pdu_len` bytes.
    pub fn new(transaction_id: u16, pdu_len: usize, unit_id: u8) -> Self {
        Self {
            transaction_id,
            protocol_id: 0,
            length: pdu_len as u16 + 1,
            unit_id,
        }
    }

    /// Serializes the header.
    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&self.transaction_id.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.protocol_id.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.length.to_be_bytes());
        bytes[6] = self.unit_id;
        bytes
    }

    /// Parses a header from the first seven bytes of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> ModbusResult<Self> {
        if bytes.len() < Self::SIZE {
            return Err(ModbusError::protocol(format!(
                "MBAP header too short: {} bytes",
                bytes.len()
            )));
        }

        Ok(Self {
            transaction_id: u16::from_be_bytes([bytes[0], bytes[1]]),
            protocol_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: u16::from_be_bytes([bytes[4], bytes[5]]),
            unit_id: bytes[6],
        })
    }

    /// Length of the PDU announced by this header.
    ///
    /// Fails when the announced length cannot hold a function code or would
    /// exceed the maximum frame size.
    pub fn pdu_len(&self) -> ModbusResult<usize> {
        let length = self.length as usize;
        if length < 2 || length > MAX_PDU_LEN + 1 {
            return Err(ModbusError::protocol(format!(
                "MBAP length field out of range: {length}"
            )));
        }
        Ok(length - 1)
    }
}

// =============================================================================
// Request PDUs
// =============================================================================

/// Builds a read request PDU (FC 0x01, 0x02, 0x03, 0x04).
pub fn read_request(function: u8, address: u16, count: u16) -> Vec<u8> {
    let mut pdu = Vec::with_capacity(5);
    pdu.push(function);
    pdu.extend_from_slice(&address.to_be_bytes());
    pdu.extend_from_slice(&count.to_be_bytes());
    pdu
}

/// Builds a write-single-coil PDU (FC 0x05). `true` encodes as 0xFF00.
pub fn write_single_coil(address: u16, value: bool) -> Vec<u8> {
    let mut pdu = Vec::with_capacity(5);
    pdu.push(0x05);
    pdu.extend_from_slice(&address.to_be_bytes());
    pdu.extend_from_slice(&(if value { 0xFF00u16 } else { 0x0000 }).to_be_bytes());
    pdu
}

/// Builds a write-single-register PDU (FC 0x06).
pub fn write_single_register(address: u16, value: u16) -> Vec<u8> {
    let mut pdu = Vec::with_capacity(5);
    pdu.push(0x06);
    pdu.extend_from_slice(&address.to_be_bytes());
    pdu.extend_from_slice(&value.to_be_bytes());
    pdu
}

/// Builds a write-multiple-coils PDU (FC 0x0F).
pub fn write_multiple_coils(address: u16, values: &[bool]) -> Vec<u8> {
    let packed = pack_bits(values);
    let mut pdu = Vec::with_capacity(6 + packed.len());
    pdu.push(0x0F);
    pdu.extend_from_slice(&address.to_be_bytes());
    pdu.extend_from_slice(&(values.len() as u16).to_be_bytes());
    pdu.push(packed.len() as u8);
    pdu.extend_from_slice(&packed);
    pdu
}

/// Builds a write-multiple-registers PDU (FC 0x10).
pub fn write_multiple_registers(address: u16, values: &[u16]) -> Vec<u8> {
    let mut pdu = Vec::with_capacity(6 + values.len() * 2);
    pdu.push(0x10);
    pdu.extend_from_slice(&address.to_be_bytes());
    pdu.extend_from_slice(&(values.len() as u16).to_be_bytes());
    pdu.push((values.len() * 2) as u8);
    for value in values {
        pdu.extend_from_slice(&value.to_be_bytes());
    }
    pdu
}

/// Builds a read/write-multiple-registers PDU (FC 0x17).
pub fn read_write_registers(
    read_address: u16,
    read_count: u16,
    write_address: u16,
    write_values: &[u16],
) -> Vec<u8> {
    let mut pdu = Vec::with_capacity(10 + write_values.len() * 2);
    pdu.push(0x17);
    pdu.extend_from_slice(&read_address.to_be_bytes());
    pdu.extend_from_slice(&read_count.to_be_bytes());
    pdu.extend_from_slice(&write_address.to_be_bytes());
    pdu.extend_from_slice(&(write_values.len() as u16).to_be_bytes());
    pdu.push((write_values.len() * 2) as u8);
    for value in write_values {
        pdu.extend_from_slice(&value.to_be_bytes());
    }
    pdu
}

// =============================================================================
// Response PDUs
// =============================================================================

/// Checks a response PDU for the exception marker and the expected function
/// echo. Returns the PDU payload past the function byte.
fn check_response<'a>(pdu: &'a [u8], function: u8) -> ModbusResult<&'a [u8]> {
    if pdu.is_empty() {
        return Err(ModbusError::protocol("empty response PDU"));
    }

    if pdu[0] == function | 0x80 {
        let code = pdu.get(1).copied().unwrap_or(0);
        return Err(ModbusError::exception(function, code));
    }

    if pdu[0] != function {
        return Err(ModbusError::protocol(format!(
            "function code mismatch: sent {function:#04x}, got {:#04x}",
            pdu[0]
        )));
    }

    Ok(&pdu[1..])
}

/// Parses a bit-read response (FC 0x01/0x02) into `count` booleans.
pub fn parse_bits(pdu: &[u8], function: u8, count: u16) -> ModbusResult<Vec<bool>> {
    let body = check_response(pdu, function)?;
    if body.is_empty() {
        return Err(ModbusError::protocol("bit response missing byte count"));
    }

    let byte_count = body[0] as usize;
    let expected = (count as usize).div_ceil(8);
    if byte_count < expected || body.len() < 1 + byte_count {
        return Err(ModbusError::protocol(format!(
            "bit response truncated: {} data bytes for {count} bits",
            body.len().saturating_sub(1)
        )));
    }

    Ok(unpack_bits(&body[1..1 + byte_count], count as usize))
}

/// Parses a register-read response (FC 0x03/0x04, or the 0x17 reply).
pub fn parse_registers(pdu: &[u8], function: u8) -> ModbusResult<Vec<u16>> {
    let body = check_response(pdu, function)?;
    if body.is_empty() {
        return Err(ModbusError::protocol("register response missing byte count"));
    }

    let byte_count = body[0] as usize;
    if byte_count % 2 != 0 || body.len() < 1 + byte_count {
        return Err(ModbusError::protocol(format!(
            "register response truncated: announced {byte_count} bytes, got {}",
            body.len().saturating_sub(1)
        )));
    }

    let mut registers = Vec::with_capacity(byte_count / 2);
    for chunk in body[1..1 + byte_count].chunks_exact(2) {
        registers.push(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    Ok(registers)
}

/// Validates a write-echo response (FC 0x05/0x06/0x0F/0x10): the server
/// echoes address and value/count.
pub fn check_write_echo(pdu: &[u8], function: u8, address: u16, word: u16) -> ModbusResult<()> {
    let body = check_response(pdu, function)?;
    if body.len() < 4 {
        return Err(ModbusError::protocol("write echo truncated"));
    }

    let echo_address = u16::from_be_bytes([body[0], body[1]]);
    let echo_word = u16::from_be_bytes([body[2], body[3]]);
    if echo_address != address || echo_word != word {
        return Err(ModbusError::protocol(format!(
            "write echo mismatch: sent ({address:#06x}, {word:#06x}), got ({echo_address:#06x}, {echo_word:#06x})"
        )));
    }
    Ok(())
}

// =============================================================================
// Bit packing
// =============================================================================

/// Packs booleans LSB-first into bytes.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// Unpacks `count` LSB-first booleans from bytes.
pub fn unpack_bits(bytes: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| (bytes[i / 8] >> (i % 8)) & 1 != 0)
        .collect()
}

/// Renders a frame as a spaced hex string for the `-d` wire trace.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Tests
// =============================================================================
