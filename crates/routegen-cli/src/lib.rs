// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

// Warn on missing documentation for public items
#![warn(missing_docs)]

//! routegen CLI library.
//!
//! Build-tool and task-runner hooks around the `routegen` library.
//!
//! # Usage
//!
//! This crate is primarily used through the `routegen` binary:
//!
//! ```bash
//! routegen build                          # typegen for every feature package
//! routegen dev                            # keep route types in sync
//! routegen typegen --project feature-x    # typegen for one package
//! routegen typegen-watch                  # batched typegen for an app
//! routegen manifest --normalize           # print the merged route manifest
//! routegen features                       # list feature packages
//! ```
//!
//! # Configuration
//!
//! Workspaces are configured via `routegen.toml` at the workspace root.

/// Batched per-project command runs.
pub mod batch;
/// CLI commands.
pub mod commands;
/// Workspace context shared by commands.
pub mod context;
