// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the Modbus client.
//!
//! The taxonomy separates failures the supervisor should react to from
//! programming errors:
//!
//! - **Connect / Transport / Timeout / Protocol**: the remote side or the
//!   network misbehaved; the owning process restarts or exits.
//! - **AddressOutOfRange / TooManyItems / ShapeMismatch**: caller-supplied
//!   arguments violated a precondition; these are raised before any wire I/O
//!   and indicate a bug in the caller.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// A `Result` specialized to [`ModbusError`].
pub type ModbusResult<T> = Result<T, ModbusError>;

// =============================================================================
// ModbusError
// =============================================================================

/// Errors produced by the Modbus TCP client.
#[derive(Debug, Error)]
pub enum ModbusError {
    /// Establishing the TCP connection failed.
    #[error("failed to connect to {endpoint}: {message}")]
    Connect {
        /// `host:service` of the remote end.
        endpoint: String,
        /// Description of the failure.
        message: String,
        /// Underlying I/O error, if any.
        #[source]
        source: Option<io::Error>,
    },

    /// The service string is not a numeric port or the configuration is
    /// otherwise unusable.
    #[error("invalid modbus endpoint configuration: {0}")]
    InvalidService(String),

    /// An operation was attempted without an established connection.
    #[error("not connected to modbus server")]
    NotConnected,

    /// `connect` was called on an already connected session.
    #[error("already connected to modbus server")]
    AlreadyConnected,

    /// A requested range does not fit the 16-bit register address space.
    #[error("register range {address:#06x}+{length} exceeds the 16-bit address space")]
    AddressOutOfRange {
        /// Start address of the offending range.
        address: u16,
        /// Requested item count.
        length: usize,
    },

    /// A request exceeds the per-PDU item limit (or is empty).
    #[error("item count {count} outside valid range 1..={max}")]
    TooManyItems {
        /// Requested item count.
        count: usize,
        /// Maximum count for this function.
        max: u16,
    },

    /// Bulk-write value buffers do not match the supplied ranges.
    #[error("value buffers do not match register ranges: {0}")]
    ShapeMismatch(String),

    /// Socket I/O failed mid-transaction.
    #[error("modbus transport error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
        /// Underlying I/O error, if any.
        #[source]
        source: Option<io::Error>,
    },

    /// The remote answered with a Modbus exception PDU.
    #[error("modbus exception for function {function:#04x}: {name} ({code})")]
    Exception {
        /// The function code the exception refers to.
        function: u8,
        /// The exception code.
        code: u8,
        /// Human-readable exception name.
        name: &'static str,
    },

    /// The response violated the MBAP/PDU framing rules.
    #[error("modbus protocol violation: {0}")]
    Protocol(String),

    /// A transaction did not complete within the configured timeout.
    #[error("modbus {operation} timed out after {timeout:?}")]
    Timeout {
        /// Name of the operation that timed out.
        operation: &'static str,
        /// The configured timeout.
        timeout: Duration,
    },
}

impl ModbusError {
    /// Creates a connect error.
    pub fn connect(endpoint: impl Into<String>, source: io::Error) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a connect error without an underlying I/O error.
    pub fn connect_msg(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates an invalid-service configuration error.
    pub fn invalid_service(message: impl Into<String>) -> Self {
        Self::InvalidService(message.into())
    }

    /// Creates a transport error from an I/O error.
    pub fn transport(source: io::Error) -> Self {
        Self::Transport {
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Creates a transport error from a message only.
    pub fn transport_msg(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an exception error from the raw exception PDU fields.
    pub fn exception(function: u8, code: u8) -> Self {
        Self::Exception {
            function,
            code,
            name: exception_name(code),
        }
    }

    /// Creates a protocol violation error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Creates a shape mismatch error.
    pub fn shape_mismatch(message: impl Into<String>) -> Self {
        Self::ShapeMismatch(message.into())
    }

    /// Returns `true` if this error indicates a caller-side precondition
    /// violation rather than a communication failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::AddressOutOfRange { .. } | Self::TooManyItems { .. } | Self::ShapeMismatch(_)
        )
    }

    /// Returns `true` if the error happened while talking to the remote.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Exception { .. } | Self::Protocol(_) | Self::Timeout { .. }
        )
    }
}

/// Returns the standard name for a Modbus exception code.
pub fn exception_name(code: u8) -> &'static str {
    match code {
        0x01 => "Illegal Function",
        0x02 => "Illegal Data Address",
        0x03 => "Illegal Data Value",
        0x04 => "Server Device Failure",
        0x05 => "Acknowledge",
        0x06 => "Server Device Busy",
        0x08 => "Memory Parity Error",
        0x0A => "Gateway Path Unavailable",
        0x0B => "Gateway Target Device Failed to Respond",
        _ => "Unknown Exception",
    }
}

// =============================================================================
// Tests
// =============================================================================
