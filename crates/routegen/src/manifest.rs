// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Route manifest merging.
//!
//! The application's own routes and every feature package's routes are
//! discovered independently and concatenated into one manifest. Two passes
//! then fix it up for the routing framework:
//!
//! 1. **Repair**: discovery records file names starting at the route
//!    directory (`routes/...`), which drops the package prefix for routes
//!    living outside the application. Those files are rebuilt from the id.
//! 2. **Normalize** (optional): everything before the last `/routes/` is
//!    stripped from keys, ids and parent ids, so manifests built from
//!    different absolute roots share one canonical `routes/...` namespace.
//!
//! The result is validated: ids are unique and every parent id resolves.

use crate::error::{ManifestError, ManifestResult};
use crate::routes::discover_flat_routes;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

lazy_static! {
    static ref ROUTES_PREFIX: Regex = Regex::new(r"^.*/routes/").unwrap();
}

/// Extension assumed when a truncated file name carries none.
pub const DEFAULT_ROUTE_EXTENSION: &str = "tsx";

/// A route as handed to the routing framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteManifestEntry {
    /// Routing path pattern relative to the parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Marks an index route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<bool>,
    /// Case-sensitive path matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    /// Unique route id.
    pub id: String,
    /// Id of the parent route; top-level routes have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Route module, relative to the application directory.
    pub file: String,
}

/// Route entries keyed by route id.
pub type RouteManifest = BTreeMap<String, RouteManifestEntry>;

/// Options for [`merge_routes`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    /// Apply [`normalize_route_manifest_paths`] after repairing.
    pub normalize: bool,
}

/// Builds the merged manifest for an application.
///
/// `app_dir` is the application directory, `app_routes_dir` its local route
/// directory and `feature_route_dirs` the route directories of its feature
/// packages. A missing application route directory contributes no routes.
///
/// # Errors
///
/// Fails on discovery errors, on duplicate ids and on dangling parents.
pub fn merge_routes(
    app_dir: &Path,
    app_routes_dir: &Path,
    feature_route_dirs: &[PathBuf],
    options: MergeOptions,
) -> ManifestResult<RouteManifest> {
    let mut manifests = vec![discover_flat_routes(app_dir, app_routes_dir)?];
    for dir in feature_route_dirs {
        manifests.push(discover_flat_routes(app_dir, dir)?);
    }

    let mut merged = concat_manifests(manifests)?;
    repair_source_files(&mut merged);

    if options.normalize {
        merged = normalize_route_manifest_paths(&merged)?;
    }

    validate(&merged)?;
    Ok(merged)
}

/// Concatenates manifests, rejecting keys that appear twice.
pub fn concat_manifests(
    manifests: impl IntoIterator<Item = RouteManifest>,
) -> ManifestResult<RouteManifest> {
    let mut merged = RouteManifest::new();
    for manifest in manifests {
        for (key, entry) in manifest {
            if merged.contains_key(&key) {
                return Err(ManifestError::DuplicateId(key));
            }
            merged.insert(key, entry);
        }
    }
    Ok(merged)
}

/// Rebuilds truncated file names from route ids.
///
/// An entry is truncated when its file is not its id plus the file's own
/// extension. The repaired file is the id followed by that extension, or
/// by [`DEFAULT_ROUTE_EXTENSION`] when the truncated name has none. Entries
/// that are already consistent are left alone, so the pass is idempotent.
pub fn repair_source_files(manifest: &mut RouteManifest) {
    for entry in manifest.values_mut() {
        let ext = Path::new(&entry.file)
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| DEFAULT_ROUTE_EXTENSION.to_string());
        let expected = format!("{}.{}", entry.id, ext);

        if entry.file != expected {
            tracing::debug!("Repairing route file {} -> {}", entry.file, expected);
            entry.file = expected;
        }
    }
}

/// Strips everything before the last `/routes/` boundary.
///
/// Strings without such a boundary, including those already in
/// `routes/...` form, are returned unchanged.
pub fn strip_routes_prefix(s: &str) -> String {
    ROUTES_PREFIX.replace(s, "routes/").into_owned()
}

/// Rewrites keys, ids and parent ids into canonical `routes/...` form.
///
/// Applying it to an already canonical manifest changes nothing.
///
/// # Errors
///
/// Returns [`ManifestError::DuplicateId`] when two keys collapse onto the
/// same canonical key.
pub fn normalize_route_manifest_paths(manifest: &RouteManifest) -> ManifestResult<RouteManifest> {
    let mut normalized = RouteManifest::new();

    for (key, entry) in manifest {
        let new_key = strip_routes_prefix(key);
        let new_entry = RouteManifestEntry {
            id: strip_routes_prefix(&entry.id),
            parent_id: entry.parent_id.as_deref().map(strip_routes_prefix),
            ..entry.clone()
        };

        if normalized.insert(new_key.clone(), new_entry).is_some() {
            return Err(ManifestError::DuplicateId(new_key));
        }
    }

    Ok(normalized)
}

/// Checks id uniqueness and that parent ids form a tree.
pub fn validate(manifest: &RouteManifest) -> ManifestResult<()> {
    let mut parents: HashMap<&str, Option<&str>> = HashMap::new();
    for entry in manifest.values() {
        if parents
            .insert(entry.id.as_str(), entry.parent_id.as_deref())
            .is_some()
        {
            return Err(ManifestError::DuplicateId(entry.id.clone()));
        }
    }

    for entry in manifest.values() {
        if let Some(parent_id) = entry.parent_id.as_deref() {
            if !parents.contains_key(parent_id) {
                return Err(ManifestError::MissingParent {
                    id: entry.id.clone(),
                    parent_id: parent_id.to_string(),
                });
            }
        }

        let mut visited = HashSet::new();
        let mut current = Some(entry.id.as_str());
        while let Some(id) = current {
            if !visited.insert(id) {
                return Err(ManifestError::ParentCycle(entry.id.clone()));
            }
            current = parents.get(id).copied().flatten();
        }
    }

    Ok(())
}
