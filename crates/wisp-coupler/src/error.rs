// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for coupler discovery and layout.

use thiserror::Error;

use wisp_modbus::{ModbusError, RegisterKind};

/// A `Result` specialized to [`CouplerError`].
pub type CouplerResult<T> = Result<T, CouplerError>;

/// Errors raised while probing the coupler or laying out its process image.
#[derive(Debug, Error)]
pub enum CouplerError {
    /// A constant register did not match the WAGO signature.
    #[error(
        "remote is not a WAGO Modbus TCP fieldbus coupler: constant at {address:#06x} \
         should be {expected:#06x} but is {observed:#06x}"
    )]
    NotAWagoCoupler {
        /// Address of the offending register.
        address: u16,
        /// The documented constant.
        expected: u16,
        /// The value the remote returned.
        observed: u16,
    },

    /// The identity block had an unexpected register count.
    #[error("identity block has {got} registers, expected {expected}")]
    ShortIdentityBlock {
        /// Expected register count.
        expected: usize,
        /// Received register count.
        got: usize,
    },

    /// A digital clamp word carried an unknown module type in its low bits.
    #[error("unknown digital module type in clamp config word {word:#06x}")]
    UnknownDigitalType {
        /// The offending configuration word.
        word: u16,
    },

    /// An analog clamp word carried a product id missing from the catalog.
    #[error("unknown product id for analog clamp: {id}")]
    UnknownAnalogId {
        /// The offending product id.
        id: u16,
    },

    /// The clamp configuration block contained no modules.
    #[error("no modules detected")]
    NoModulesDetected,

    /// A channel count does not fit the coupler's two address windows.
    #[error("{count} {kind} channels exceed the coupler capacity of {capacity}")]
    TooManyChannels {
        /// Register kind that overflowed.
        kind: RegisterKind,
        /// Requested channel count.
        count: usize,
        /// Combined capacity of both windows.
        capacity: usize,
    },

    /// A Modbus operation against the coupler failed.
    #[error(transparent)]
    Modbus(#[from] ModbusError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_error_names_the_address() {
        let err = CouplerError::NotAWagoCoupler {
            address: 0x2002,
            expected: 0x1234,
            observed: 0x4321,
        };
        let text = err.to_string();
        assert!(text.contains("0x2002"));
        assert!(text.contains("0x1234"));
        assert!(text.contains("0x4321"));
    }
}
