// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Error types for routegen.
//!
//! Each concern owns an error enum with a matching `*Result` alias. The
//! top-level [`Error`] wraps all of them for callers that drive the whole
//! pipeline.
//!
//! # Error Categories
//!
//! - **Configuration errors**: the start directory maps to no project, or no
//!   workspace graph could be obtained ([`ResolveError`], [`GraphError`])
//! - **External-process failures**: the typegen command exited non-zero or a
//!   scaffold file could not be written ([`TypegenError`])
//! - **Watch failures**: subscription or snapshot errors ([`WatchError`])
//! - **Invalid manifests**: duplicate ids or dangling parents ([`ManifestError`])

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or rebuilding the workspace graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// No graph was found at the cached location.
    #[error("No cached project graph at {0}")]
    CacheMiss(PathBuf),

    /// The graph JSON could not be parsed.
    #[error("Invalid project graph {path}: {source}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The rebuild command exited unsuccessfully.
    #[error("Graph rebuild command `{command}` failed with exit code {code:?}")]
    RebuildFailed {
        /// Command line that was run.
        command: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
    },

    /// Both the cached read and the rebuild failed.
    #[error("Project graph unavailable: feature discovery cannot run")]
    Unavailable,

    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Errors raised while resolving feature packages.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The start directory is not inside any project root.
    #[error("Project not found for path: {0}. Check the project configuration.")]
    ProjectNotFound(PathBuf),

    /// A package id is missing from the graph.
    #[error("Package `{0}` is not part of the workspace graph")]
    UnknownPackage(String),

    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for feature resolution.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Errors raised by route discovery and manifest merging.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Two entries share the same id.
    #[error("Duplicate route id `{0}`")]
    DuplicateId(String),

    /// An entry names a parent that is not in the manifest.
    #[error("Route `{id}` references missing parent `{parent_id}`")]
    MissingParent {
        /// Offending entry.
        id: String,
        /// Parent id that did not resolve.
        parent_id: String,
    },

    /// Following parent links from an entry loops back on itself.
    #[error("Route `{0}` is part of a parent cycle")]
    ParentCycle(String),

    /// Route directory could not be scanned.
    #[error("Route discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for manifest operations.
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Errors raised by a typegen run.
#[derive(Debug, Error)]
pub enum TypegenError {
    /// The package is not in the graph.
    #[error("Package `{0}` is not part of the workspace graph")]
    UnknownPackage(String),

    /// The typegen command exited non-zero.
    #[error("Typegen for `{package}` exited with code {code:?}")]
    CommandFailed {
        /// Package the command ran for.
        package: String,
        /// Exit code, if the process was not killed by a signal.
        code: Option<i32>,
    },

    /// Writing, running or cleaning up failed.
    #[error("IO error during typegen for `{package}`: {source}")]
    Io {
        /// Package the run belonged to.
        package: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type for typegen runs.
pub type TypegenResult<T> = std::result::Result<T, TypegenError>;

/// Errors raised by the watch subsystem.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The underlying watcher reported an error.
    #[error("Watch error: {0}")]
    Notify(#[from] notify::Error),

    /// A snapshot file could not be parsed.
    #[error("Corrupt snapshot {path}: line {line}")]
    CorruptSnapshot {
        /// Snapshot file.
        path: PathBuf,
        /// 1-indexed offending line.
        line: usize,
    },

    /// A blocking filesystem task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for watch operations.
pub type WatchResult<T> = std::result::Result<T, WatchError>;

/// Errors raised while loading `routegen.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but is not valid TOML for this schema.
    #[error("Invalid configuration {path}: {source}")]
    Parse {
        /// Configuration file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Filesystem I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Any routegen error.
#[derive(Debug, Error)]
pub enum Error {
    /// Graph error.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Feature resolution error.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// Manifest error.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// Typegen error.
    #[error(transparent)]
    Typegen(#[from] TypegenError),
    /// Watch error.
    #[error(transparent)]
    Watch(#[from] WatchError),
    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for routegen.
pub type Result<T> = std::result::Result<T, Error>;
