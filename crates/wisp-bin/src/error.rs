// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Binary-level error type with sysexits exit codes.
//!
//! Every failure the binary can hit maps onto one of five exit codes so a
//! supervisor can tell configuration mistakes from a dead coupler from a
//! machine that cannot keep the cycle time.

use thiserror::Error;

/// Clean exit.
pub const EX_OK: i32 = 0;
/// Command line could not be parsed.
pub const EX_USAGE: i32 = 64;
/// The coupler is unreachable or is not a WAGO coupler.
pub const EX_UNAVAILABLE: i32 = 69;
/// A software error occurred during the exchange cycle.
pub const EX_SOFTWARE: i32 = 70;
/// An operating-system call failed during setup.
pub const EX_OSERR: i32 = 71;
/// The cycle time was repeatedly exceeded.
pub const EX_TEMPFAIL: i32 = 75;

/// Boxed source error.
pub type Source = Box<dyn std::error::Error + Send + Sync>;

/// A `Result` specialized to [`AppError`].
pub type AppResult<T> = Result<T, AppError>;

// =============================================================================
// AppError
// =============================================================================

/// Errors that terminate the WISP binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad command line.
    #[error("{0}")]
    Usage(String),

    /// The coupler could not be reached, identified, or enumerated at init.
    #[error("failed to connect to WAGO fieldbus coupler: {0}")]
    Unavailable(#[source] Source),

    /// A failure inside the running exchange cycle.
    #[error("{context}: {source}")]
    Cycle {
        /// What the engine was doing.
        context: &'static str,
        /// The underlying failure.
        #[source]
        source: Source,
    },

    /// An OS-level setup call failed (signal handlers, shared memory).
    #[error("{context}: {source}")]
    Os {
        /// What was being set up.
        context: &'static str,
        /// The underlying failure.
        #[source]
        source: Source,
    },

    /// The configured cycle time was exceeded too often in a row.
    #[error("cycle time repeatedly exceeded")]
    CycleOverrun,
}

impl AppError {
    /// Creates a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Creates an init-time unavailability error.
    pub fn unavailable(source: impl Into<Source>) -> Self {
        Self::Unavailable(source.into())
    }

    /// Creates a cycle error.
    pub fn cycle(context: &'static str, source: impl Into<Source>) -> Self {
        Self::Cycle {
            context,
            source: source.into(),
        }
    }

    /// Creates an OS setup error.
    pub fn os(context: &'static str, source: impl Into<Source>) -> Self {
        Self::Os {
            context,
            source: source.into(),
        }
    }

    /// The sysexits code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => EX_USAGE,
            Self::Unavailable(_) => EX_UNAVAILABLE,
            Self::Cycle { .. } => EX_SOFTWARE,
            Self::Os { .. } => EX_OSERR,
            Self::CycleOverrun => EX_TEMPFAIL,
        }
    }
}

// =============================================================================
// Error reporting
// =============================================================================

/// Prints the error and its cause chain to stderr.
pub fn report_error(error: &AppError) {
    eprintln!("Error: {error}");

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {cause}");
        source = cause.source();
    }
}

/// Prints the error and exits with its sysexits code.
pub fn report_error_and_exit(error: AppError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_sysexits() {
        assert_eq!(AppError::usage("bad flag").exit_code(), 64);
        assert_eq!(
            AppError::unavailable(wisp_modbus::ModbusError::NotConnected).exit_code(),
            69
        );
        assert_eq!(
            AppError::cycle("fetch", wisp_modbus::ModbusError::NotConnected).exit_code(),
            70
        );
        assert_eq!(
            AppError::os("signals", std::io::Error::other("nope")).exit_code(),
            71
        );
        assert_eq!(AppError::CycleOverrun.exit_code(), 75);
    }

    #[test]
    fn cycle_error_carries_context() {
        let err = AppError::cycle(
            "failed to fetch input image",
            wisp_modbus::ModbusError::NotConnected,
        );
        assert!(err.to_string().contains("failed to fetch input image"));
    }
}
