// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Register-kind metadata and client configuration.
//!
//! The WAGO coupler exposes four process-data register kinds. [`RegisterKind`]
//! carries everything the client and the image layers need to know about each
//! of them: Modbus function codes, per-PDU item limits, and the canonical
//! index used for four-slot arrays throughout the workspace.

use std::fmt;
use std::time::Duration;

use crate::error::{ModbusError, ModbusResult};

// =============================================================================
// RegisterKind
// =============================================================================

/// One of the four Modbus process-data register kinds.
///
/// The ordering `Di`, `Do`, `Ai`, `Ao` is canonical: it is the index order of
/// every four-slot array in the workspace (channel counts, image layouts,
/// shared regions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterKind {
    /// Discrete input (read-only, 1 bit).
    Di,
    /// Coil / digital output (read-write, 1 bit).
    Do,
    /// Input register / analog input (read-only, 16 bits).
    Ai,
    /// Holding register / analog output (read-write, 16 bits).
    Ao,
}

impl RegisterKind {
    /// All kinds in canonical order.
    pub const ALL: [RegisterKind; 4] = [Self::Di, Self::Do, Self::Ai, Self::Ao];

    /// Canonical index into four-slot arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Di => 0,
            Self::Do => 1,
            Self::Ai => 2,
            Self::Ao => 3,
        }
    }

    /// Returns `true` for the 1-bit kinds.
    #[inline]
    pub const fn is_bit(self) -> bool {
        matches!(self, Self::Di | Self::Do)
    }

    /// Returns `true` for the 16-bit kinds.
    #[inline]
    pub const fn is_word(self) -> bool {
        matches!(self, Self::Ai | Self::Ao)
    }

    /// Returns `true` if this kind accepts writes.
    #[inline]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::Do | Self::Ao)
    }

    /// Function code used to read this kind.
    #[inline]
    pub const fn read_function_code(self) -> u8 {
        match self {
            Self::Di => 0x02,
            Self::Do => 0x01,
            Self::Ai => 0x04,
            Self::Ao => 0x03,
        }
    }

    /// Function code for a single-item write, `None` for read-only kinds.
    #[inline]
    pub const fn write_single_function_code(self) -> Option<u8> {
        match self {
            Self::Do => Some(0x05),
            Self::Ao => Some(0x06),
            Self::Di | Self::Ai => None,
        }
    }

    /// Function code for a multi-item write, `None` for read-only kinds.
    #[inline]
    pub const fn write_multiple_function_code(self) -> Option<u8> {
        match self {
            Self::Do => Some(0x0F),
            Self::Ao => Some(0x10),
            Self::Di | Self::Ai => None,
        }
    }

    /// Maximum number of items one read PDU may carry.
    #[inline]
    pub const fn max_read_count(self) -> u16 {
        match self {
            Self::Di | Self::Do => 2000,
            Self::Ai | Self::Ao => 125,
        }
    }

    /// Maximum number of items one write PDU may carry, `None` for read-only
    /// kinds.
    #[inline]
    pub const fn max_write_count(self) -> Option<u16> {
        match self {
            Self::Do => Some(1968),
            Self::Ao => Some(123),
            Self::Di | Self::Ai => None,
        }
    }

    /// Short display name.
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Di => "DI",
            Self::Do => "DO",
            Self::Ai => "AI",
            Self::Ao => "AO",
        }
    }
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

// =============================================================================
// ModbusTcpConfig
// =============================================================================

/// Configuration for a Modbus TCP session with one remote endpoint.
#[derive(Debug, Clone)]
pub struct ModbusTcpConfig {
    /// Remote host name or address.
    pub host: String,
    /// Remote service. Must be a numeric port; the default is `"502"`.
    pub service: String,
    /// Unit identifier carried in every MBAP header.
    pub unit_id: u8,
    /// Timeout for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Timeout for one complete request/response transaction.
    pub operation_timeout: Duration,
    /// Enable TCP_NODELAY on the socket.
    pub tcp_nodelay: bool,
    /// Emit a hex trace of every frame on the wire.
    pub debug: bool,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_operation_timeout() -> Duration {
    Duration::from_secs(3)
}

impl ModbusTcpConfig {
    /// Creates a configuration with host and service, defaults elsewhere.
    pub fn new(host: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            service: service.into(),
            unit_id: 1,
            connect_timeout: default_connect_timeout(),
            operation_timeout: default_operation_timeout(),
            tcp_nodelay: true,
            debug: false,
        }
    }

    /// Creates a new builder.
    pub fn builder() -> ModbusTcpConfigBuilder {
        ModbusTcpConfigBuilder::default()
    }

    /// Parses the service field as a numeric port.
    pub fn port(&self) -> ModbusResult<u16> {
        self.service
            .parse::<u16>()
            .map_err(|_| ModbusError::invalid_service(&self.service))
    }

    /// Returns the `host:service` endpoint string for display.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.service)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ModbusResult<()> {
        if self.host.is_empty() {
            return Err(ModbusError::invalid_service("host must not be empty"));
        }
        self.port()?;
        if self.connect_timeout.is_zero() || self.operation_timeout.is_zero() {
            return Err(ModbusError::invalid_service("timeouts must be non-zero"));
        }
        Ok(())
    }
}

/// Builder for [`ModbusTcpConfig`].
#[derive(Debug, Default)]
pub struct ModbusTcpConfigBuilder {
    host: Option<String>,
    service: Option<String>,
    unit_id: Option<u8>,
    connect_timeout: Option<Duration>,
    operation_timeout: Option<Duration>,
    tcp_nodelay: Option<bool>,
    debug: Option<bool>,
}

impl ModbusTcpConfigBuilder {
    /// Sets the remote host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the remote service (numeric port).
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the unit identifier.
    pub fn unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = Some(unit_id);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the per-transaction timeout.
    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Sets TCP_NODELAY.
    pub fn tcp_nodelay(mut self, nodelay: bool) -> Self {
        self.tcp_nodelay = Some(nodelay);
        self
    }

    /// Enables the wire-level hex trace.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ModbusResult<ModbusTcpConfig> {
        let host = self
            .host
            .ok_or_else(|| ModbusError::invalid_service("host is required"))?;

        let config = ModbusTcpConfig {
            host,
            service: self.service.unwrap_or_else(|| "502".to_string()),
            unit_id: self.unit_id.unwrap_or(1),
            connect_timeout: self.connect_timeout.unwrap_or_else(default_connect_timeout),
            operation_timeout: self
                .operation_timeout
                .unwrap_or_else(default_operation_timeout),
            tcp_nodelay: self.tcp_nodelay.unwrap_or(true),
            debug: self.debug.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Tests
// =============================================================================
