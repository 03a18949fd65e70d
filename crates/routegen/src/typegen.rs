// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Route type generation for feature packages.
//!
//! The typegen command expects a full application. A feature package is only
//! a route directory, so each run:
//!
//! 1. writes a throwaway scaffold into the package root (root component,
//!    config declaring the package root as the app directory, routes module
//!    pointing at the package's route directory),
//! 2. runs the typegen command with the package root as working directory,
//! 3. drops a stub root type into the generated types directory,
//! 4. removes the scaffold, whatever happened before.
//!
//! A non-zero exit is logged and reported to the caller as
//! [`TypegenError::CommandFailed`]; it never panics or aborts other packages.
//! Runs for different packages may overlap. Runs for the same package must be
//! serialized by the caller.

use crate::config::TypegenConfig;
use crate::error::{TypegenError, TypegenResult};
use crate::features::FeaturePackage;
use crate::graph::WorkspaceGraph;
use crate::shell;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Scaffold root component file name.
pub const ROOT_COMPONENT_FILE: &str = "root.tsx";
/// Scaffold config file name.
pub const CONFIG_FILE: &str = "react-router.config.ts";
/// Scaffold routes file name.
pub const ROUTES_FILE: &str = "routes.ts";

const ROOT_COMPONENT_STUB: &str = "export default {}";
const CONFIG_STUB: &str = r#"export default { appDirectory: "." };"#;

fn routes_stub(routes_dir: &str) -> String {
    format!(
        "import {{ flatRoutes }} from '@react-router/fs-routes';\n\
         export default flatRoutes({{ rootDirectory: \"{}\" }});",
        routes_dir
    )
}

/// Scaffold files in a package root, removed when dropped.
///
/// Removal is best effort: missing files are fine, other failures are logged.
struct Scaffold {
    files: [PathBuf; 3],
}

impl Scaffold {
    fn new(package_root: &Path) -> Self {
        Self {
            files: [
                package_root.join(ROOT_COMPONENT_FILE),
                package_root.join(CONFIG_FILE),
                package_root.join(ROUTES_FILE),
            ],
        }
    }

    /// Writes all three files. Every write settles before an error is
    /// returned, so cleanup never races a write still in flight.
    async fn write(&self, routes_dir: &str) -> std::io::Result<()> {
        let [root, config, routes] = &self.files;
        let (root, config, routes) = tokio::join!(
            tokio::fs::write(root, ROOT_COMPONENT_STUB),
            tokio::fs::write(config, CONFIG_STUB),
            tokio::fs::write(routes, routes_stub(routes_dir)),
        );
        root.and(config).and(routes)
    }
}

impl Drop for Scaffold {
    fn drop(&mut self) {
        for file in &self.files {
            match std::fs::remove_file(file) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", file.display(), e),
            }
        }
    }
}

/// Runs the typegen command for feature packages.
#[derive(Debug, Clone)]
pub struct TypegenRunner {
    workspace_root: PathBuf,
    command: String,
    types_dir: String,
    routes_dir: String,
}

impl TypegenRunner {
    /// Creates a runner for the workspace at `workspace_root`.
    ///
    /// `routes_dir` is the route directory relative to a package root.
    pub fn new(workspace_root: PathBuf, config: &TypegenConfig, routes_dir: &str) -> Self {
        Self {
            workspace_root,
            command: config.command.clone(),
            types_dir: config.types_dir.clone(),
            routes_dir: routes_dir.to_string(),
        }
    }

    /// Runs typegen once for `package_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the package is unknown, a file operation fails or
    /// the command exits non-zero. The scaffold is removed in every case.
    pub async fn run(&self, package_id: &str, graph: &WorkspaceGraph) -> TypegenResult<()> {
        let root = graph
            .resolve_root(&self.workspace_root, package_id)
            .ok_or_else(|| TypegenError::UnknownPackage(package_id.to_string()))?;

        let start = Instant::now();
        let result = self.generate(package_id, &root).await;

        match &result {
            Ok(()) => tracing::debug!("Typegen for {} completed in {:?}", package_id, start.elapsed()),
            Err(e) => tracing::warn!("Typegen failed for {}: {}", package_id, e),
        }
        result
    }

    async fn generate(&self, package_id: &str, root: &Path) -> TypegenResult<()> {
        let io_err = |source| TypegenError::Io {
            package: package_id.to_string(),
            source,
        };

        let scaffold = Scaffold::new(root);
        scaffold.write(&self.routes_dir).await.map_err(io_err)?;

        tracing::info!("Running typegen for package: {}", package_id);
        let status = shell::command(&self.command, root)
            .status()
            .await
            .map_err(io_err)?;

        if !status.success() {
            return Err(TypegenError::CommandFailed {
                package: package_id.to_string(),
                code: status.code(),
            });
        }

        // Generated route types import the app root; give them one
        let types_dir = root.join(&self.types_dir);
        tokio::fs::create_dir_all(&types_dir).await.map_err(io_err)?;
        tokio::fs::write(types_dir.join(ROOT_COMPONENT_FILE), ROOT_COMPONENT_STUB)
            .await
            .map_err(io_err)?;

        Ok(())
    }

    /// Runs typegen for every package concurrently.
    ///
    /// One package failing does not stop the others.
    pub async fn run_all(&self, packages: &[FeaturePackage], graph: &WorkspaceGraph) -> BatchReport {
        let results = join_all(
            packages
                .iter()
                .map(|pkg| async move { (pkg.package_id.clone(), self.run(&pkg.package_id, graph).await) }),
        )
        .await;

        let mut report = BatchReport::default();
        for (package_id, result) in results {
            match result {
                Ok(()) => report.succeeded.push(package_id),
                Err(e) => report.failed.push((package_id, e)),
            }
        }
        report
    }
}

/// Outcome of [`TypegenRunner::run_all`].
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Packages whose run succeeded.
    pub succeeded: Vec<String>,
    /// Packages whose run failed, with the reason.
    pub failed: Vec<(String, TypegenError)>,
}

impl BatchReport {
    /// True when no package failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
