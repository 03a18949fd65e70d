// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Flat-file route discovery.
//!
//! Route modules live directly inside a route directory:
//!
//! - `_index.tsx` → index route of its parent
//! - `accounts.tsx` → `/accounts`
//! - `accounts.$id.tsx` → `/accounts/:id`, nested under `accounts` when it exists
//! - `docs.$.tsx` → `/docs/*` (splat)
//! - `($lang).about.tsx` → `/:lang?/about`
//! - `_auth.tsx` → pathless layout; `_auth.login.tsx` → `/login` inside it
//! - `concerts_.mine.tsx` → `/concerts/mine`, not nested under `concerts`
//! - `[sitemap.xml].tsx` → `/sitemap.xml` (brackets escape dots)
//! - `settings/route.tsx` → `/settings` (folder routes)
//!
//! Ids are the route directory relative to the application directory followed
//! by the module name. File names are recorded relative to the route
//! directory's parent, so they always begin at the route directory name.

use crate::error::{ManifestError, ManifestResult};
use crate::manifest::{RouteManifest, RouteManifestEntry};
use glob::{glob, Pattern};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Extensions recognised as route modules.
pub const ROUTE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "md", "mdx"];

/// One dot-separated segment of a flat route name.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Static segment (e.g., "accounts")
    Static(String),

    /// Dynamic parameter (e.g., "$id" -> ":id")
    Dynamic(String),

    /// Optional static segment (e.g., "(en)" -> "en?")
    OptionalStatic(String),

    /// Optional parameter (e.g., "($lang)" -> ":lang?")
    OptionalDynamic(String),

    /// Splat (e.g., "$" -> "*")
    Splat,

    /// Index marker ("_index")
    Index,

    /// Pathless layout segment (e.g., "_auth")
    Pathless,
}

impl Segment {
    /// Parse a raw segment into a Segment
    pub fn parse(raw: &str) -> Self {
        if raw == "_index" {
            return Segment::Index;
        }
        if raw.starts_with('_') && !raw.starts_with("_[") {
            return Segment::Pathless;
        }

        // A trailing underscore only opts out of nesting
        let raw = match raw.strip_suffix('_') {
            Some(stripped) if !stripped.is_empty() => stripped,
            _ => raw,
        };

        if raw == "$" {
            Segment::Splat
        } else if raw.starts_with("($") && raw.ends_with(')') {
            Segment::OptionalDynamic(raw[2..raw.len() - 1].to_string())
        } else if raw.starts_with('(') && raw.ends_with(')') {
            Segment::OptionalStatic(unescape(&raw[1..raw.len() - 1]))
        } else if let Some(name) = raw.strip_prefix('$') {
            Segment::Dynamic(name.to_string())
        } else {
            Segment::Static(unescape(raw))
        }
    }

    /// Convert to a routing path piece, `None` for segments without a path
    pub fn to_path(&self) -> Option<String> {
        match self {
            Segment::Static(s) => Some(s.clone()),
            Segment::Dynamic(name) => Some(format!(":{}", name)),
            Segment::OptionalStatic(s) => Some(format!("{}?", s)),
            Segment::OptionalDynamic(name) => Some(format!(":{}?", name)),
            Segment::Splat => Some("*".to_string()),
            Segment::Index | Segment::Pathless => None,
        }
    }
}

fn unescape(raw: &str) -> String {
    raw.replace(['[', ']'], "")
}

/// Splits a flat route name on dots that are not inside `[...]`.
pub fn split_route_name(name: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in name.chars() {
        match c {
            '[' => {
                depth += 1;
                current.push(c);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '.' if depth == 0 => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// A route module found on disk, before nesting is resolved.
struct RouteModule {
    /// Flat route name (file stem or folder name)
    name: String,
    id: String,
    file: String,
}

/// Discovers the flat routes in `routes_dir` and builds their manifest.
///
/// `app_dir` anchors the ids; it does not have to contain `routes_dir`.
pub fn discover_flat_routes(app_dir: &Path, routes_dir: &Path) -> ManifestResult<RouteManifest> {
    let prefix = path_to_slash(&relative_path(app_dir, routes_dir));
    let dir_name = routes_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let escaped = Pattern::escape(&routes_dir.to_string_lossy());

    let mut modules: Vec<RouteModule> = Vec::new();

    for ext in ROUTE_EXTENSIONS {
        // First pass: modules directly in the route directory
        let file_pattern = format!("{}/*.{}", escaped, ext);
        for path in glob(&file_pattern)
            .map_err(|e| ManifestError::DiscoveryFailed(e.to_string()))?
            .flatten()
        {
            if !path.is_file() {
                continue;
            }
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            let file_name = format!("{}.{}", stem, ext);
            modules.push(RouteModule {
                id: join_id(&prefix, &stem),
                file: format!("{}/{}", dir_name, file_name),
                name: stem,
            });
        }

        // Second pass: folder routes carrying a route module
        let folder_pattern = format!("{}/*/route.{}", escaped, ext);
        for path in glob(&folder_pattern)
            .map_err(|e| ManifestError::DiscoveryFailed(e.to_string()))?
            .flatten()
        {
            let Some(folder) = path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
            else {
                continue;
            };
            modules.push(RouteModule {
                id: join_id(&prefix, &format!("{}/route", folder)),
                file: format!("{}/{}/route.{}", dir_name, folder, ext),
                name: folder,
            });
        }
    }

    modules.sort_by(|a, b| a.id.cmp(&b.id));

    let ids_by_name: HashMap<&str, &str> = modules
        .iter()
        .map(|m| (m.name.as_str(), m.id.as_str()))
        .collect();

    let mut manifest = RouteManifest::new();
    for module in &modules {
        let segments = split_route_name(&module.name);

        // Parent is the longest other route whose name prefixes this one
        let mut parent_id = None;
        let mut nested_from = 0;
        for k in (1..segments.len()).rev() {
            if let Some(id) = ids_by_name.get(segments[..k].join(".").as_str()) {
                parent_id = Some(id.to_string());
                nested_from = k;
                break;
            }
        }

        let parsed: Vec<Segment> = segments[nested_from..]
            .iter()
            .map(|s| Segment::parse(s))
            .collect();
        let is_index = parsed.last() == Some(&Segment::Index);
        let pieces: Vec<String> = parsed.iter().filter_map(Segment::to_path).collect();
        let path = if pieces.is_empty() {
            None
        } else {
            Some(pieces.join("/"))
        };

        let entry = RouteManifestEntry {
            path,
            index: is_index.then_some(true),
            case_sensitive: None,
            id: module.id.clone(),
            parent_id,
            file: module.file.clone(),
        };

        if manifest.insert(module.id.clone(), entry).is_some() {
            return Err(ManifestError::DuplicateId(module.id.clone()));
        }
    }

    Ok(manifest)
}

fn join_id(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Computes `to` relative to `from`, walking up with `..` where needed.
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();
    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component.as_os_str());
    }
    relative
}

/// Resolves `.` and `..` components without touching the filesystem.
///
/// A `..` at the root or at the start of a relative path is kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Renders a path with `/` separators.
pub fn path_to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}
