// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the process image.

use std::io;

use thiserror::Error;

use wisp_modbus::RegisterKind;

/// A `Result` specialized to [`ImageError`].
pub type ImageResult<T> = Result<T, ImageError>;

/// Errors raised by shared regions and the process image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// A shared-memory object with this name already exists.
    ///
    /// Either another instance is running, or an improperly terminated
    /// instance left an orphan behind; `--force` adopts the orphan.
    #[error("shared memory object '{name}' already exists (use --force to adopt an orphan)")]
    AlreadyExists {
        /// Name of the existing object.
        name: String,
    },

    /// A shared-memory system call failed.
    #[error("shared memory operation failed for '{name}': {source}")]
    Os {
        /// Name of the object being operated on.
        name: String,
        /// The failing system call's error.
        #[source]
        source: io::Error,
    },

    /// An accessor index is outside the region.
    #[error("index {index} out of range for {kind} image of size {size}")]
    IndexOutOfRange {
        /// The region's kind.
        kind: RegisterKind,
        /// The offending index.
        index: usize,
        /// The region's element count.
        size: usize,
    },

    /// A bit accessor was used on a word region or vice versa.
    #[error("{kind} image does not support {access} access")]
    KindMismatch {
        /// The region's kind.
        kind: RegisterKind,
        /// The attempted access ("bit" or "word").
        access: &'static str,
    },
}

impl ImageError {
    /// Creates an OS error for a named object.
    pub fn os(name: impl Into<String>, source: io::Error) -> Self {
        Self::Os {
            name: name.into(),
            source,
        }
    }
}
