// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! WISP - WAGO I/O Shared-memory Proxy.
//!
//! Binary entry point: argument parsing, logging setup, and the
//! current-thread runtime that drives the cycle engine.

use clap::error::ErrorKind;
use clap::Parser;

use wisp_bin::cli::Cli;
use wisp_bin::error::{report_error_and_exit, AppError, EX_USAGE};
use wisp_bin::license::print_licenses;
use wisp_bin::logging::init_logging;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{e}");
            return;
        }
        Err(e) => {
            eprintln!("Error: failed to parse arguments: {e}");
            eprintln!("Use 'wisp --help' for more information.");
            std::process::exit(EX_USAGE);
        }
    };

    if cli.license {
        let _ = print_licenses(&mut std::io::stdout());
        return;
    }

    init_logging(cli.effective_log_level(), cli.log_format, cli.modbus_debug());

    // One cooperative control thread drives init, the cycle loop, and
    // shutdown.
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => report_error_and_exit(AppError::os("failed to start runtime", e)),
    };

    if let Err(error) = runtime.block_on(wisp_bin::run(cli)) {
        report_error_and_exit(error);
    }
}
