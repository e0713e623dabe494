// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # wisp-image
//!
//! Shared-memory process image for WISP.
//!
//! A downstream process reads coupler inputs and writes coupler outputs by
//! touching bytes in four named shared-memory regions; the cycle engine in
//! `wisp-bin` moves the data between these regions and the coupler.
//!
//! The storage backend is abstracted behind [`SharedRegionFactory`]:
//! [`ShmFactory`] maps files under `/dev/shm` with `memmap2`, and
//! [`MemFactory`] provides plain heap buffers so every consumer of
//! [`ProcessImage`] is testable in-process.

#![warn(missing_docs)]

pub mod error;
pub mod image;
pub mod region;

pub use error::{ImageError, ImageResult};
pub use image::ProcessImage;
pub use region::{CreateMode, MemFactory, MemRegion, SharedRegion, SharedRegionFactory, ShmFactory, ShmRegion};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
