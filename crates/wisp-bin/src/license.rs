// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! License notices for `--license`.

use std::io::Write;

const PROJECT_NOTICE: &str = "\
WISP - WAGO I/O Shared-memory Proxy
Copyright (c) 2025 Sylvex. All rights reserved.

Licensed under the PolyForm Noncommercial License 1.0.0.
https://polyformproject.org/licenses/noncommercial/1.0.0/
";

const THIRD_PARTY: &[(&str, &str)] = &[
    ("tokio", "MIT"),
    ("clap", "MIT OR Apache-2.0"),
    ("thiserror", "MIT OR Apache-2.0"),
    ("tracing", "MIT"),
    ("tracing-subscriber", "MIT"),
    ("memmap2", "MIT OR Apache-2.0"),
    ("libc", "MIT OR Apache-2.0"),
];

/// Writes the project notice and the third-party crate list.
pub fn print_licenses(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{PROJECT_NOTICE}")?;
    writeln!(out, "Third-party crates:")?;
    for (name, license) in THIRD_PARTY {
        writeln!(out, "    {name:<20} {license}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_lists_all_crates() {
        let mut buffer = Vec::new();
        print_licenses(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("PolyForm Noncommercial"));
        for (name, _) in THIRD_PARTY {
            assert!(text.contains(name), "missing {name}");
        }
    }
}
