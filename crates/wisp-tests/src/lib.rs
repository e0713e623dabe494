// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # wisp-tests
//!
//! Shared fixtures for the WISP integration tests. The heart of the crate
//! is [`common::FakeCoupler`], an in-process Modbus TCP server that imitates
//! a WAGO fieldbus coupler closely enough to drive the whole bridge end to
//! end without hardware.

#![warn(missing_docs)]

pub mod common;
