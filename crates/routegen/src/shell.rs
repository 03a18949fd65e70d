// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Shell invocation for configured external commands.

use std::path::Path;
use tokio::process::Command;

/// Builds a command that runs `script` through the platform shell in `cwd`.
///
/// Standard I/O is inherited, so the external tool reports directly to the
/// terminal.
pub fn command(script: &str, cwd: &Path) -> Command {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", script]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", script]);
        cmd
    };
    cmd.current_dir(cwd);
    cmd
}
