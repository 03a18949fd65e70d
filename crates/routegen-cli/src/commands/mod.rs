// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! CLI command implementations.
//!
//! - `build`: typegen for every feature package of an application
//! - `dev`: watch every feature package until Ctrl+C
//! - `typegen`: typegen for one feature package
//! - `typegen-watch`: batched per-project typegen for an application
//! - `manifest`: print the merged route manifest
//! - `features`: list feature packages

/// Build-start hook.
pub mod build;
/// Dev-server-start hook.
pub mod dev;
/// Feature package listing.
pub mod features;
/// Merged route manifest output.
pub mod manifest;
/// One-shot typegen task.
pub mod typegen;
/// Long-running batched typegen task.
pub mod watch;
