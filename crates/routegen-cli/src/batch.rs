// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Batched per-project command runs for `typegen-watch`.
//!
//! Changes are accumulated per project. After a quiet period the pending
//! batch is taken and the configured command runs once per changed project,
//! concurrently within the batch. Batches never overlap: changes recorded
//! while a batch runs go into the next one.

use console::style;
use futures_util::future::join_all;
use routegen::scheduler::{make_trigger, DebouncedScheduler, Trigger};
use routegen::shell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Changed files grouped by owning project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    projects: BTreeMap<String, BTreeSet<String>>,
}

impl ChangeBatch {
    /// Records a changed file for `project`.
    pub fn record(&mut self, project: &str, file: &str) {
        self.projects
            .entry(project.to_string())
            .or_default()
            .insert(file.to_string());
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Changed projects in id order.
    pub fn projects(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    /// Space-joined changed files of `project`.
    pub fn files_of(&self, project: &str) -> String {
        self.projects
            .get(project)
            .map(|files| files.iter().cloned().collect::<Vec<_>>().join(" "))
            .unwrap_or_default()
    }
}

/// Outcome of one project's command in a batch.
#[derive(Debug)]
pub struct ProjectRun {
    /// Project id.
    pub project: String,
    /// Whether the command exited successfully.
    pub success: bool,
}

/// Runs the configured command for every project of a batch.
#[derive(Debug, Clone)]
pub struct BatchCommandRunner {
    workspace_root: PathBuf,
    command: String,
    project_env: String,
    files_env: String,
    quiet: bool,
}

impl BatchCommandRunner {
    /// Creates a runner from `[watch]` settings for the application `app`.
    pub fn new(
        workspace_root: PathBuf,
        config: &routegen::config::WatchConfig,
        app: &str,
        quiet: bool,
    ) -> Self {
        Self {
            workspace_root,
            command: config.command.replace("{app}", app),
            project_env: config.project_env.clone(),
            files_env: config.files_env.clone(),
            quiet,
        }
    }

    /// Runs one batch, all projects concurrently.
    pub async fn run_batch(&self, batch: &ChangeBatch) -> Vec<ProjectRun> {
        let runs = batch.projects().map(|project| async move {
            let files = batch.files_of(project);
            tracing::info!("Running typegen for {} ({})", project, files);

            let status = shell::command(&self.command, &self.workspace_root)
                .env(&self.project_env, project)
                .env(&self.files_env, &files)
                .status()
                .await;

            let success = match status {
                Ok(status) if status.success() => true,
                Ok(status) => {
                    tracing::warn!("Command for {} exited with {:?}", project, status.code());
                    false
                }
                Err(e) => {
                    tracing::warn!("Command for {} could not start: {}", project, e);
                    false
                }
            };

            if !self.quiet {
                let marker = if success {
                    style("✓").green()
                } else {
                    style("✗").red()
                };
                println!("  {} {}", marker, project);
            }

            ProjectRun {
                project: project.to_string(),
                success,
            }
        });

        join_all(runs).await
    }
}

/// Pending batch plus the scheduler that drains it.
pub struct BatchQueue {
    pending: Arc<Mutex<ChangeBatch>>,
    scheduler: DebouncedScheduler,
}

impl BatchQueue {
    /// Starts a queue draining into `runner` after `delay` of quiet.
    pub fn new(runner: BatchCommandRunner, delay: Duration) -> Self {
        let pending = Arc::new(Mutex::new(ChangeBatch::default()));
        let runner = Arc::new(runner);

        let scheduler = {
            let pending = pending.clone();
            make_trigger(
                move || {
                    let batch = std::mem::take(
                        &mut *pending.lock().unwrap_or_else(PoisonError::into_inner),
                    );
                    let runner = runner.clone();
                    async move {
                        if !batch.is_empty() {
                            runner.run_batch(&batch).await;
                        }
                    }
                },
                delay,
            )
        };

        Self { pending, scheduler }
    }

    /// A handle that records changes from any thread.
    pub fn recorder(&self) -> BatchRecorder {
        BatchRecorder {
            pending: self.pending.clone(),
            trigger: self.scheduler.trigger(),
        }
    }

    /// Stops accepting batches and waits for the running one.
    pub async fn shutdown(self) {
        self.scheduler.shutdown().await;
    }
}

/// Records changes into a [`BatchQueue`].
#[derive(Clone)]
pub struct BatchRecorder {
    pending: Arc<Mutex<ChangeBatch>>,
    trigger: Trigger,
}

impl BatchRecorder {
    /// Adds `file` to the pending batch of `project` and restarts the delay.
    pub fn record(&self, project: &str, file: &str) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(project, file);
        self.trigger.trigger();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_batch_groups_and_dedups() {
        let mut batch = ChangeBatch::default();
        batch.record("feature-b", "b/routes/x.tsx");
        batch.record("feature-a", "a/routes/y.tsx");
        batch.record("feature-a", "a/routes/x.tsx");
        batch.record("feature-a", "a/routes/x.tsx");

        assert_eq!(batch.projects().collect::<Vec<_>>(), vec!["feature-a", "feature-b"]);
        assert_eq!(batch.files_of("feature-a"), "a/routes/x.tsx a/routes/y.tsx");
        assert_eq!(batch.files_of("missing"), "");
    }

    #[test]
    fn test_default_command_excludes_app() {
        let runner = BatchCommandRunner::new(
            PathBuf::from("/ws"),
            &routegen::config::WatchConfig::default(),
            "my-app",
            true,
        );
        assert_eq!(
            runner.command,
            "npx nx run $NX_PROJECT_NAME:typegen --exclude=my-app"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_batch_passes_project_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let config = routegen::config::WatchConfig {
            command: format!(
                "echo \"$NX_PROJECT_NAME:$NX_FILE_CHANGES:{{app}}\" >> {}",
                log.display()
            ),
            ..Default::default()
        };
        let runner = BatchCommandRunner::new(dir.path().to_path_buf(), &config, "my-app", true);

        let mut batch = ChangeBatch::default();
        batch.record("feature-a", "x.tsx");
        batch.record("feature-a", "y.tsx");
        batch.record("feature-b", "z.tsx");

        let runs = runner.run_batch(&batch).await;
        assert!(runs.iter().all(|r| r.success));

        let content = std::fs::read_to_string(&log).unwrap();
        let mut lines: Vec<&str> = content.lines().collect();
        lines.sort();
        assert_eq!(
            lines,
            vec!["feature-a:x.tsx y.tsx:my-app", "feature-b:z.tsx:my-app"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_queue_coalesces_changes_into_one_batch() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("calls.log");
        let config = routegen::config::WatchConfig {
            command: format!("echo \"$NX_PROJECT_NAME\" >> {}", log.display()),
            ..Default::default()
        };
        let runner = BatchCommandRunner::new(dir.path().to_path_buf(), &config, "my-app", true);
        let queue = BatchQueue::new(runner, Duration::from_millis(50));
        let recorder = queue.recorder();

        recorder.record("feature-a", "x.tsx");
        recorder.record("feature-a", "y.tsx");
        recorder.record("feature-b", "z.tsx");

        for _ in 0..100 {
            if std::fs::read_to_string(&log).map(|s| s.lines().count()).unwrap_or(0) >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        queue.shutdown().await;

        let content = std::fs::read_to_string(&log).unwrap();
        let mut lines: Vec<&str> = content.lines().collect();
        lines.sort();
        assert_eq!(lines, vec!["feature-a", "feature-b"]);
    }
}
