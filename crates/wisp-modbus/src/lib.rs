// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # wisp-modbus
//!
//! Typed Modbus TCP client for the WISP coupler bridge.
//!
//! This crate speaks the Modbus application protocol to a single remote
//! server over TCP:
//!
//! - **MBAP framing**: transaction ids, protocol id, length validation
//! - **All four register kinds**: coils, discrete inputs, holding and input
//!   registers, with their per-PDU item limits (125 register reads, 123
//!   register writes, 2000 bit reads, 1968 bit writes)
//! - **Bulk operations**: lists of `(address, length)` ranges with parallel
//!   value buffers, validated before any wire I/O
//! - **Combined read/write**: FC 0x17 with deterministic pairing of read and
//!   write range lists
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use wisp_modbus::{ModbusClient, ModbusTcpConfig};
//!
//! let config = ModbusTcpConfig::builder()
//!     .host("192.168.1.17")
//!     .service("502")
//!     .build()?;
//!
//! let mut client = ModbusClient::new(config)?;
//! client.connect().await?;
//!
//! let constants = client.read_input_registers(0x2000, 9).await?;
//! client.disconnect().await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod frame;
pub mod types;

pub use client::{ModbusClient, RegisterRange, SessionState};
pub use error::{ModbusError, ModbusResult};
pub use types::{ModbusTcpConfig, ModbusTcpConfigBuilder, RegisterKind};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
