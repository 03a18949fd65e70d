// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Feature package discovery.
//!
//! A feature package is a workspace dependency whose id contains the feature
//! marker and which has a route directory on disk. Packages that match the
//! naming convention but have no route directory yet are skipped silently.

use crate::config::WorkspaceConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::graph::WorkspaceGraph;
use crate::routes::normalize_path;
use std::path::{Path, PathBuf};

/// Naming and layout conventions for feature packages.
#[derive(Debug, Clone)]
pub struct FeatureConvention {
    /// Substring that marks a package id as a feature package.
    pub marker: String,
    /// Route directory relative to the package root.
    pub routes_dir: String,
}

impl Default for FeatureConvention {
    fn default() -> Self {
        Self {
            marker: "feature-".to_string(),
            routes_dir: "src/routes".to_string(),
        }
    }
}

impl From<&WorkspaceConfig> for FeatureConvention {
    fn from(config: &WorkspaceConfig) -> Self {
        Self {
            marker: config.feature_marker.clone(),
            routes_dir: config.routes_dir.clone(),
        }
    }
}

impl FeatureConvention {
    /// Returns true when `package_id` follows the feature naming convention.
    pub fn is_feature(&self, package_id: &str) -> bool {
        package_id.contains(&self.marker)
    }

    /// Route directory of a package rooted at `package_root`.
    pub fn route_directory(&self, package_root: &Path) -> PathBuf {
        package_root.join(&self.routes_dir)
    }
}

/// A feature package that contributes routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturePackage {
    /// Package id in the workspace graph.
    pub package_id: String,
    /// Absolute route directory.
    pub route_directory: PathBuf,
}

/// Finds the package id owning `dir`.
///
/// `.` and `..` components are resolved lexically first.
///
/// # Errors
///
/// Returns [`ResolveError::ProjectNotFound`] when `dir` lies outside every
/// project root.
pub fn find_package_for_dir(
    graph: &WorkspaceGraph,
    workspace_root: &Path,
    dir: &Path,
) -> ResolveResult<String> {
    let absolute = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()?.join(dir)
    };

    normalize_path(&absolute)
        .strip_prefix(normalize_path(workspace_root))
        .ok()
        .and_then(|relative| graph.find_project_for_path(relative))
        .map(str::to_string)
        .ok_or_else(|| ResolveError::ProjectNotFound(dir.to_path_buf()))
}

/// Resolves the feature packages the package at `start_dir` depends on.
///
/// `start_dir` defaults to the current working directory. The result follows
/// graph traversal order; sort it when a stable order matters.
///
/// # Errors
///
/// Fails when `start_dir` cannot be mapped to a package. Feature packages
/// without a route directory are not an error.
pub fn resolve_feature_packages(
    graph: &WorkspaceGraph,
    workspace_root: &Path,
    start_dir: Option<&Path>,
    convention: &FeatureConvention,
) -> ResolveResult<Vec<FeaturePackage>> {
    let start_dir = match start_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let package_id = find_package_for_dir(graph, workspace_root, &start_dir)?;

    let mut features = Vec::new();
    for dep in graph.closure_of(&package_id) {
        if !convention.is_feature(&dep) {
            continue;
        }
        let Some(root) = graph.resolve_root(workspace_root, &dep) else {
            continue;
        };
        let route_directory = convention.route_directory(&root);
        if route_directory.is_dir() {
            features.push(FeaturePackage {
                package_id: dep,
                route_directory,
            });
        } else {
            tracing::debug!("Skipping {}: no route directory at {}", dep, route_directory.display());
        }
    }

    Ok(features)
}

/// Looks up a single feature package by id.
///
/// Returns `Ok(None)` when the id does not follow the convention or the
/// route directory does not exist.
pub fn feature_package(
    graph: &WorkspaceGraph,
    workspace_root: &Path,
    package_id: &str,
    convention: &FeatureConvention,
) -> ResolveResult<Option<FeaturePackage>> {
    let root = graph
        .resolve_root(workspace_root, package_id)
        .ok_or_else(|| ResolveError::UnknownPackage(package_id.to_string()))?;

    let route_directory = convention.route_directory(&root);
    if !convention.is_feature(package_id) || !route_directory.is_dir() {
        return Ok(None);
    }

    Ok(Some(FeaturePackage {
        package_id: package_id.to_string(),
        route_directory,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn setup_workspace(root: &Path) -> WorkspaceGraph {
        for dir in [
            "apps/app-a/app/routes",
            "packages/feature-accounts/src/routes",
            "packages/feature-transfers/src/routes",
            "packages/feature-drafts/src",
            "packages/lib-shared/src/routes",
        ] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }

        let mut graph = WorkspaceGraph::new();
        graph
            .add_project("app-a", "apps/app-a")
            .add_project("feature-accounts", "packages/feature-accounts")
            .add_project("feature-transfers", "packages/feature-transfers")
            .add_project("feature-drafts", "packages/feature-drafts")
            .add_project("lib-shared", "packages/lib-shared")
            .add_dependency("app-a", "feature-accounts")
            .add_dependency("app-a", "feature-transfers")
            .add_dependency("app-a", "feature-drafts")
            .add_dependency("feature-accounts", "lib-shared");
        graph
    }

    #[test]
    fn test_resolves_features_with_routes() {
        let dir = tempdir().unwrap();
        let graph = setup_workspace(dir.path());

        let features = resolve_feature_packages(
            &graph,
            dir.path(),
            Some(&dir.path().join("apps/app-a")),
            &FeatureConvention::default(),
        )
        .unwrap();

        assert_eq!(
            features,
            vec![
                FeaturePackage {
                    package_id: "feature-accounts".to_string(),
                    route_directory: dir.path().join("packages/feature-accounts/src/routes"),
                },
                FeaturePackage {
                    package_id: "feature-transfers".to_string(),
                    route_directory: dir.path().join("packages/feature-transfers/src/routes"),
                },
            ]
        );
    }

    #[test]
    fn test_nested_start_dir_maps_to_package() {
        let dir = tempdir().unwrap();
        let graph = setup_workspace(dir.path());

        let features = resolve_feature_packages(
            &graph,
            dir.path(),
            Some(&dir.path().join("apps/app-a/app/routes")),
            &FeatureConvention::default(),
        )
        .unwrap();
        assert_eq!(features.len(), 2);
    }

    #[test]
    fn test_start_dir_with_parent_components() {
        let dir = tempdir().unwrap();
        let graph = setup_workspace(dir.path());

        let id = find_package_for_dir(&graph, dir.path(), &dir.path().join("apps/app-a/../app-a/app"))
            .unwrap();
        assert_eq!(id, "app-a");

        let features = resolve_feature_packages(
            &graph,
            &dir.path().join("apps/.."),
            Some(&dir.path().join("packages/../apps/app-a")),
            &FeatureConvention::default(),
        )
        .unwrap();
        assert_eq!(features.len(), 2);
    }

    #[test]
    fn test_unknown_start_dir_is_an_error() {
        let dir = tempdir().unwrap();
        let graph = setup_workspace(dir.path());

        let err = resolve_feature_packages(
            &graph,
            dir.path(),
            Some(&dir.path().join("tools")),
            &FeatureConvention::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::ProjectNotFound(_)));
    }

    #[test]
    fn test_custom_convention() {
        let dir = tempdir().unwrap();
        let graph = setup_workspace(dir.path());
        let convention = FeatureConvention {
            marker: "lib-".to_string(),
            routes_dir: "src/routes".to_string(),
        };

        let features =
            resolve_feature_packages(&graph, dir.path(), Some(&dir.path().join("apps/app-a")), &convention)
                .unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].package_id, "lib-shared");
    }

    #[test]
    fn test_feature_package_lookup() {
        let dir = tempdir().unwrap();
        let graph = setup_workspace(dir.path());
        let convention = FeatureConvention::default();

        assert!(feature_package(&graph, dir.path(), "feature-accounts", &convention)
            .unwrap()
            .is_some());
        assert!(feature_package(&graph, dir.path(), "feature-drafts", &convention)
            .unwrap()
            .is_none());
        assert!(feature_package(&graph, dir.path(), "lib-shared", &convention)
            .unwrap()
            .is_none());
        assert!(matches!(
            feature_package(&graph, dir.path(), "nope", &convention),
            Err(ResolveError::UnknownPackage(_))
        ));
    }
}
