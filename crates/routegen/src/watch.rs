// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Live typegen for feature packages.
//!
//! For every watched package the coordinator:
//!
//! - replays changes made while nobody was watching, using the package's
//!   snapshot (or runs typegen right away when there is no snapshot yet),
//! - subscribes to the package's route directory,
//! - feeds route file creations and deletions into a per-package
//!   [`DebouncedScheduler`], whose run regenerates types and then refreshes
//!   the snapshot.
//!
//! Shutdown unsubscribes every watcher, stops the schedulers and writes a
//! final snapshot per package.

use crate::error::{WatchError, WatchResult};
use crate::features::FeaturePackage;
use crate::graph::WorkspaceGraph;
use crate::scheduler::{make_trigger, DebouncedScheduler};
use crate::snapshot::{self, FsEvent, FsEventKind};
use crate::typegen::TypegenRunner;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Name of the snapshot file inside a package's cache directory.
pub const SNAPSHOT_FILE: &str = "snapshot.txt";

/// Receives batches of events, or errors, from a subscription.
pub type EventCallback = Box<dyn Fn(WatchResult<Vec<FsEvent>>) + Send + 'static>;

/// A live subscription.
pub trait Subscription: Send {
    /// Stops event delivery.
    fn unsubscribe(self: Box<Self>);
}

/// Filesystem watch primitive.
pub trait WatchBackend: Send + Sync + 'static {
    /// Subscribes to changes below `dir`.
    fn subscribe(&self, dir: &Path, callback: EventCallback) -> WatchResult<Box<dyn Subscription>>;

    /// Events on `dir` since the snapshot at `snapshot_path`.
    fn events_since(
        &self,
        dir: &Path,
        snapshot_path: &Path,
    ) -> impl Future<Output = WatchResult<Vec<FsEvent>>> + Send {
        let dir = dir.to_path_buf();
        let snapshot_path = snapshot_path.to_path_buf();
        async move {
            tokio::task::spawn_blocking(move || snapshot::events_since(&dir, &snapshot_path)).await?
        }
    }

    /// Stores a snapshot of `dir` at `snapshot_path`.
    fn write_snapshot(
        &self,
        dir: &Path,
        snapshot_path: &Path,
    ) -> impl Future<Output = WatchResult<()>> + Send {
        let dir = dir.to_path_buf();
        let snapshot_path = snapshot_path.to_path_buf();
        async move {
            tokio::task::spawn_blocking(move || snapshot::write_snapshot(&dir, &snapshot_path)).await?
        }
    }
}

/// Watch backend built on `notify` with a short debounce window.
#[derive(Debug, Clone)]
pub struct NotifyBackend {
    batch_window: Duration,
}

impl NotifyBackend {
    /// Creates a backend that groups raw events over `batch_window`.
    pub fn new(batch_window: Duration) -> Self {
        Self { batch_window }
    }
}

impl Default for NotifyBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

struct NotifySubscription {
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl Subscription for NotifySubscription {
    fn unsubscribe(self: Box<Self>) {
        self.debouncer.stop();
    }
}

impl WatchBackend for NotifyBackend {
    fn subscribe(&self, dir: &Path, callback: EventCallback) -> WatchResult<Box<dyn Subscription>> {
        let mut debouncer = new_debouncer(self.batch_window, None, move |result: DebounceEventResult| {
            match result {
                Ok(events) => {
                    let mapped: Vec<FsEvent> = events.iter().flat_map(|e| map_event(&e.event)).collect();
                    if !mapped.is_empty() {
                        callback(Ok(mapped));
                    }
                }
                Err(errors) => {
                    for error in errors {
                        callback(Err(WatchError::Notify(error)));
                    }
                }
            }
        })?;

        debouncer.watch(dir, RecursiveMode::Recursive)?;
        Ok(Box::new(NotifySubscription { debouncer }))
    }
}

/// Maps a `notify` event to create/update/delete events.
///
/// A rename is a delete of the old path plus a create of the new one.
pub fn map_event(event: &notify::Event) -> Vec<FsEvent> {
    let each = |kind: FsEventKind| -> Vec<FsEvent> {
        event.paths.iter().map(|p| FsEvent::new(kind, p.clone())).collect()
    };

    match event.kind {
        EventKind::Create(_) => each(FsEventKind::Create),
        EventKind::Remove(_) => each(FsEventKind::Delete),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(FsEventKind::Delete),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(FsEventKind::Create),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => vec![
                FsEvent::new(FsEventKind::Delete, from.clone()),
                FsEvent::new(FsEventKind::Create, to.clone()),
            ],
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let kind = if p.exists() {
                    FsEventKind::Create
                } else {
                    FsEventKind::Delete
                };
                FsEvent::new(kind, p.clone())
            })
            .collect(),
        EventKind::Modify(_) => each(FsEventKind::Update),
        _ => Vec::new(),
    }
}

/// Snapshot location for a package below `cache_root`.
///
/// Scoped ids like `@acme/feature-x` become `acme__feature-x`.
pub fn snapshot_path(cache_root: &Path, package_id: &str) -> PathBuf {
    let sanitized = package_id
        .replace('@', "")
        .replace(['/', '\\', ':'], "__");
    cache_root.join(sanitized).join(SNAPSHOT_FILE)
}

/// True for creations and deletions of files with one of `extensions`.
///
/// Edits to existing files do not change the route set and are ignored.
pub fn is_relevant(event: &FsEvent, extensions: &[String]) -> bool {
    if event.kind == FsEventKind::Update {
        return false;
    }
    event
        .path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed == ext))
}

/// Everything a watch session needs, shared by all packages.
pub struct WatchContext<B> {
    /// Filesystem watch primitive.
    pub backend: Arc<B>,
    /// Typegen runner.
    pub runner: Arc<TypegenRunner>,
    /// Workspace graph.
    pub graph: Arc<WorkspaceGraph>,
    /// Directory holding per-package snapshots.
    pub cache_root: PathBuf,
    /// Debounce delay for live changes.
    pub debounce: Duration,
    /// Source extensions that trigger a run.
    pub extensions: Vec<String>,
}

impl<B> Clone for WatchContext<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            runner: self.runner.clone(),
            graph: self.graph.clone(),
            cache_root: self.cache_root.clone(),
            debounce: self.debounce,
            extensions: self.extensions.clone(),
        }
    }
}

/// A watched package.
///
/// Dropping it stops delivery but writes no final snapshot; use
/// [`close`](Self::close) for that.
pub struct WatchHandle {
    package_id: String,
    route_directory: PathBuf,
    snapshot_path: PathBuf,
    subscription: Option<Box<dyn Subscription>>,
    scheduler: DebouncedScheduler,
}

impl WatchHandle {
    /// Package being watched.
    pub fn package_id(&self) -> &str {
        &self.package_id
    }

    /// Snapshot file of this package.
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Stops event delivery. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            tracing::debug!("Unsubscribed from {}", self.route_directory.display());
        }
    }

    /// Unsubscribes, stops the scheduler and writes a final snapshot.
    pub async fn close<B: WatchBackend>(mut self, backend: &B) -> WatchResult<()> {
        self.unsubscribe();
        self.scheduler.shutdown().await;
        backend
            .write_snapshot(&self.route_directory, &self.snapshot_path)
            .await
    }
}

/// Starts watching one feature package.
///
/// # Errors
///
/// Fails when the snapshot directory cannot be created or the subscription
/// cannot be established. A failing first typegen run is logged only.
pub async fn watch_package<B: WatchBackend>(
    ctx: &WatchContext<B>,
    package: &FeaturePackage,
) -> WatchResult<WatchHandle> {
    let package_id = package.package_id.clone();
    let route_directory = package.route_directory.clone();
    let snapshot_path = snapshot_path(&ctx.cache_root, &package_id);

    if let Some(parent) = snapshot_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let debounce = ctx.debounce;
    let scheduler = {
        let ctx = ctx.clone();
        let package_id = package_id.clone();
        let route_directory = route_directory.clone();
        let snapshot_path = snapshot_path.clone();
        make_trigger(
            move || {
                let ctx = ctx.clone();
                let package_id = package_id.clone();
                let route_directory = route_directory.clone();
                let snapshot_path = snapshot_path.clone();
                async move {
                    if ctx.runner.run(&package_id, &ctx.graph).await.is_err() {
                        return;
                    }
                    if let Err(e) = ctx.backend.write_snapshot(&route_directory, &snapshot_path).await {
                        tracing::warn!("Failed to write snapshot for {}: {}", package_id, e);
                    }
                }
            },
            debounce,
        )
    };
    let trigger = scheduler.trigger();

    let replayed = if snapshot_path.exists() {
        match ctx.backend.events_since(&route_directory, &snapshot_path).await {
            Ok(events) => Some(events),
            Err(e) => {
                tracing::warn!("Ignoring unreadable snapshot for {}: {}", package_id, e);
                None
            }
        }
    } else {
        None
    };

    match replayed {
        Some(events) => {
            let relevant = events.iter().filter(|e| is_relevant(e, &ctx.extensions)).count();
            if relevant > 0 {
                tracing::info!("{} route change(s) in {} since last session", relevant, package_id);
                trigger.trigger();
            }
        }
        None => trigger.run_now(),
    }

    let subscription = {
        let extensions = ctx.extensions.clone();
        let package_id = package_id.clone();
        let trigger = trigger.clone();
        ctx.backend.subscribe(
            &route_directory,
            Box::new(move |result| match result {
                Ok(events) => {
                    if events.iter().any(|e| is_relevant(e, &extensions)) {
                        trigger.trigger();
                    } else {
                        tracing::debug!("Ignoring {} event(s) in {}", events.len(), package_id);
                    }
                }
                Err(e) => tracing::error!("Watch error for {}: {}", package_id, e),
            }),
        )?
    };

    tracing::info!("Watching {} for route changes", route_directory.display());

    Ok(WatchHandle {
        package_id,
        route_directory,
        snapshot_path,
        subscription: Some(subscription),
        scheduler,
    })
}

/// Owns the watch sessions of a dev session.
pub struct WatchCoordinator<B> {
    ctx: WatchContext<B>,
    handles: Vec<WatchHandle>,
}

impl<B: WatchBackend> WatchCoordinator<B> {
    /// Creates a coordinator with no watched package.
    pub fn new(ctx: WatchContext<B>) -> Self {
        Self {
            ctx,
            handles: Vec::new(),
        }
    }

    /// Starts watching `package`.
    pub async fn watch(&mut self, package: &FeaturePackage) -> WatchResult<()> {
        let handle = watch_package(&self.ctx, package).await?;
        self.handles.push(handle);
        Ok(())
    }

    /// Starts watching every package; failures are logged and skipped.
    ///
    /// Returns the number of packages being watched afterwards.
    pub async fn watch_all(&mut self, packages: &[FeaturePackage]) -> usize {
        for package in packages {
            if let Err(e) = self.watch(package).await {
                tracing::error!("Cannot watch {}: {}", package.package_id, e);
            }
        }
        self.handles.len()
    }

    /// Ids of the watched packages.
    pub fn watched(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(WatchHandle::package_id)
    }

    /// Unsubscribes every watcher, then closes each session.
    ///
    /// Snapshot failures are logged, not returned.
    pub async fn shutdown(mut self) {
        for handle in &mut self.handles {
            handle.unsubscribe();
        }
        for handle in self.handles {
            let package_id = handle.package_id.clone();
            if let Err(e) = handle.close(self.ctx.backend.as_ref()).await {
                tracing::warn!("Failed to write final snapshot for {}: {}", package_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TypegenConfig;
    use std::fs;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tempfile::tempdir;

    #[derive(Default)]
    struct FakeBackend {
        callbacks: Mutex<Vec<(PathBuf, EventCallback)>>,
        unsubscribed: Arc<AtomicBool>,
    }

    impl FakeBackend {
        fn emit(&self, result: WatchResult<Vec<FsEvent>>) {
            let callbacks = self.callbacks.lock().unwrap();
            let (_, callback) = callbacks.last().unwrap();
            callback(result);
        }
    }

    struct FakeSubscription(Arc<AtomicBool>);

    impl Subscription for FakeSubscription {
        fn unsubscribe(self: Box<Self>) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl WatchBackend for FakeBackend {
        fn subscribe(&self, dir: &Path, callback: EventCallback) -> WatchResult<Box<dyn Subscription>> {
            self.callbacks.lock().unwrap().push((dir.to_path_buf(), callback));
            Ok(Box::new(FakeSubscription(self.unsubscribed.clone())))
        }
    }

    fn exts() -> Vec<String> {
        vec!["ts".to_string(), "tsx".to_string()]
    }

    #[test]
    fn test_snapshot_path_sanitizes_scoped_ids() {
        let root = Path::new("/cache");
        assert_eq!(
            snapshot_path(root, "@acme/feature-accounts"),
            PathBuf::from("/cache/acme__feature-accounts/snapshot.txt")
        );
        assert_eq!(
            snapshot_path(root, "feature-accounts"),
            PathBuf::from("/cache/feature-accounts/snapshot.txt")
        );
    }

    #[test]
    fn test_relevance_filter() {
        let extensions = exts();
        assert!(is_relevant(&FsEvent::new(FsEventKind::Create, "/r/a.tsx"), &extensions));
        assert!(is_relevant(&FsEvent::new(FsEventKind::Delete, "/r/a.ts"), &extensions));
        assert!(!is_relevant(&FsEvent::new(FsEventKind::Update, "/r/a.tsx"), &extensions));
        assert!(!is_relevant(&FsEvent::new(FsEventKind::Create, "/r/a.css"), &extensions));
        assert!(!is_relevant(&FsEvent::new(FsEventKind::Create, "/r/README"), &extensions));
    }

    #[test]
    fn test_rename_maps_to_delete_and_create() {
        let event = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(PathBuf::from("/r/old.tsx"))
            .add_path(PathBuf::from("/r/new.tsx"));

        assert_eq!(
            map_event(&event),
            vec![
                FsEvent::new(FsEventKind::Delete, "/r/old.tsx"),
                FsEvent::new(FsEventKind::Create, "/r/new.tsx"),
            ]
        );
    }

    #[test]
    fn test_content_change_maps_to_update() {
        let event = notify::Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from("/r/a.tsx"));
        assert_eq!(map_event(&event), vec![FsEvent::new(FsEventKind::Update, "/r/a.tsx")]);

        let access = notify::Event::new(EventKind::Access(notify::event::AccessKind::Any));
        assert!(map_event(&access).is_empty());
    }

    #[cfg(unix)]
    mod sessions {
        use super::*;

        /// Package whose typegen appends a line to `runs.log` per run.
        fn setup(root: &Path) -> (WatchContext<FakeBackend>, FeaturePackage) {
            let routes = root.join("packages/feature-accounts/src/routes");
            fs::create_dir_all(&routes).unwrap();
            fs::write(routes.join("accounts.tsx"), "").unwrap();

            let mut graph = WorkspaceGraph::new();
            graph.add_project("feature-accounts", "packages/feature-accounts");

            let config = TypegenConfig {
                command: "mkdir -p .react-router && echo run >> runs.log".to_string(),
                ..TypegenConfig::default()
            };
            let ctx = WatchContext {
                backend: Arc::new(FakeBackend::default()),
                runner: Arc::new(TypegenRunner::new(root.to_path_buf(), &config, "src/routes")),
                graph: Arc::new(graph),
                cache_root: root.join("cache"),
                debounce: Duration::from_millis(50),
                extensions: exts(),
            };
            let package = FeaturePackage {
                package_id: "feature-accounts".to_string(),
                route_directory: routes,
            };
            (ctx, package)
        }

        fn run_count(root: &Path) -> usize {
            fs::read_to_string(root.join("packages/feature-accounts/runs.log"))
                .map(|s| s.lines().count())
                .unwrap_or(0)
        }

        async fn wait_for_runs(root: &Path, expected: usize) {
            for _ in 0..200 {
                if run_count(root) >= expected {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            panic!("expected {} run(s), saw {}", expected, run_count(root));
        }

        #[tokio::test]
        async fn test_first_session_runs_immediately_and_writes_snapshot() {
            let dir = tempdir().unwrap();
            let (ctx, package) = setup(dir.path());

            let handle = watch_package(&ctx, &package).await.unwrap();
            wait_for_runs(dir.path(), 1).await;

            let snapshot = handle.snapshot_path().to_path_buf();
            for _ in 0..100 {
                if snapshot.exists() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            assert!(snapshot.exists());
            handle.close(ctx.backend.as_ref()).await.unwrap();
            assert_eq!(run_count(dir.path()), 1);
        }

        #[tokio::test]
        async fn test_replays_changes_since_snapshot() {
            let dir = tempdir().unwrap();
            let (ctx, package) = setup(dir.path());
            let snapshot = snapshot_path(&ctx.cache_root, &package.package_id);
            snapshot::write_snapshot(&package.route_directory, &snapshot).unwrap();
            fs::write(package.route_directory.join("transfers.tsx"), "").unwrap();

            let handle = watch_package(&ctx, &package).await.unwrap();
            wait_for_runs(dir.path(), 1).await;
            handle.close(ctx.backend.as_ref()).await.unwrap();

            assert_eq!(run_count(dir.path()), 1);
            assert!(snapshot::events_since(&package.route_directory, &snapshot)
                .unwrap()
                .is_empty());
        }

        #[tokio::test]
        async fn test_unchanged_snapshot_skips_run() {
            let dir = tempdir().unwrap();
            let (ctx, package) = setup(dir.path());
            let snapshot = snapshot_path(&ctx.cache_root, &package.package_id);
            snapshot::write_snapshot(&package.route_directory, &snapshot).unwrap();

            let handle = watch_package(&ctx, &package).await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            handle.close(ctx.backend.as_ref()).await.unwrap();

            assert_eq!(run_count(dir.path()), 0);
        }

        #[tokio::test]
        async fn test_live_events_are_filtered_and_debounced() {
            let dir = tempdir().unwrap();
            let (ctx, package) = setup(dir.path());
            let snapshot = snapshot_path(&ctx.cache_root, &package.package_id);
            snapshot::write_snapshot(&package.route_directory, &snapshot).unwrap();

            let mut coordinator = WatchCoordinator::new(ctx.clone());
            coordinator.watch(&package).await.unwrap();

            let routes = &package.route_directory;
            ctx.backend.emit(Ok(vec![FsEvent::new(FsEventKind::Update, routes.join("accounts.tsx"))]));
            ctx.backend.emit(Ok(vec![FsEvent::new(FsEventKind::Create, routes.join("styles.css"))]));
            tokio::time::sleep(Duration::from_millis(300)).await;
            assert_eq!(run_count(dir.path()), 0);

            ctx.backend.emit(Ok(vec![FsEvent::new(FsEventKind::Create, routes.join("a.tsx"))]));
            ctx.backend.emit(Ok(vec![FsEvent::new(FsEventKind::Delete, routes.join("b.tsx"))]));
            wait_for_runs(dir.path(), 1).await;
            tokio::time::sleep(Duration::from_millis(300)).await;
            assert_eq!(run_count(dir.path()), 1);

            coordinator.shutdown().await;
        }

        #[tokio::test]
        async fn test_subscription_errors_are_not_fatal() {
            let dir = tempdir().unwrap();
            let (ctx, package) = setup(dir.path());
            let snapshot = snapshot_path(&ctx.cache_root, &package.package_id);
            snapshot::write_snapshot(&package.route_directory, &snapshot).unwrap();

            let mut coordinator = WatchCoordinator::new(ctx.clone());
            coordinator.watch(&package).await.unwrap();

            ctx.backend.emit(Err(WatchError::Notify(notify::Error::generic("boom"))));
            ctx.backend.emit(Ok(vec![FsEvent::new(
                FsEventKind::Create,
                package.route_directory.join("a.tsx"),
            )]));
            wait_for_runs(dir.path(), 1).await;

            coordinator.shutdown().await;
        }

        #[tokio::test]
        async fn test_shutdown_unsubscribes_and_writes_snapshots() {
            let dir = tempdir().unwrap();
            let (ctx, package) = setup(dir.path());
            let snapshot = snapshot_path(&ctx.cache_root, &package.package_id);
            snapshot::write_snapshot(&package.route_directory, &snapshot).unwrap();

            let mut coordinator = WatchCoordinator::new(ctx.clone());
            assert_eq!(coordinator.watch_all(std::slice::from_ref(&package)).await, 1);
            assert_eq!(coordinator.watched().collect::<Vec<_>>(), vec!["feature-accounts"]);

            // Change made after the last run, picked up by the final snapshot
            fs::write(package.route_directory.join("late.tsx"), "").unwrap();
            coordinator.shutdown().await;

            assert!(ctx.backend.unsubscribed.load(Ordering::SeqCst));
            assert!(snapshot::events_since(&package.route_directory, &snapshot)
                .unwrap()
                .is_empty());
        }
    }
}
