// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # wisp-coupler
//!
//! WAGO fieldbus coupler domain logic for WISP:
//!
//! - **Clamp catalog** ([`clamp`]): decoding of the 16-bit clamp
//!   configuration words into typed modules and per-kind channel totals.
//! - **Coupler probe** ([`probe`]): identity verification against the
//!   constant-register signature, roster discovery, info registers.
//! - **Image layout** ([`layout`]): pure computation of the per-kind
//!   `(address, length, offset)` segments across the coupler's dual
//!   process-data windows.
//!
//! All three are independent of the shared-memory layer; the cycle engine in
//! `wisp-bin` ties them together.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod clamp;
pub mod error;
pub mod layout;
pub mod probe;

pub use clamp::{ChannelCounts, Clamp, ClampKind, ClampRoster};
pub use error::{CouplerError, CouplerResult};
pub use layout::{windows, ImageLayout, ImageSegment, Window};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
