//! Retention pass over a generated site tree: prune old HTML pages by age or count.

use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use metrics::counter;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Directory names whose contents are never considered for pruning.
pub const IGNORE_DIRS: [&str; 6] = ["assets", "css", "js", "img", "images", "static"];
/// File names that are never pruned.
pub const KEEP_ALWAYS: [&str; 4] = ["index.html", "404.html", "sitemap.xml", "robots.txt"];

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrunePolicy {
    /// Keep the newest N pages.
    pub max_keep: Option<usize>,
    /// Keep pages modified within the last N days.
    pub days_keep: Option<u64>,
    pub dry_run: bool,
}

impl PrunePolicy {
    fn max_keep(&self) -> Option<usize> {
        self.max_keep.filter(|max| *max > 0)
    }

    fn days_keep(&self) -> Option<u64> {
        self.days_keep.filter(|days| *days > 0)
    }

    pub fn is_empty(&self) -> bool {
        self.max_keep().is_none() && self.days_keep().is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneStatus {
    Completed,
    RootMissing,
    NoPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Result of a retention pass. Paths are relative to the pruned root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneReport {
    pub status: PruneStatus,
    pub dry_run: bool,
    pub pages: usize,
    pub kept: Vec<PathBuf>,
    /// Deleted pages, or the pages a dry run would delete.
    pub deleted: Vec<PathBuf>,
    pub errors: Vec<PruneFailure>,
}

impl PruneReport {
    fn skipped(status: PruneStatus, policy: &PrunePolicy) -> Self {
        Self {
            status,
            dry_run: policy.dry_run,
            pages: 0,
            kept: Vec::new(),
            deleted: Vec::new(),
            errors: Vec::new(),
        }
    }
}

pub fn prune(root: &Path, policy: &PrunePolicy) -> PruneReport {
    prune_at(root, policy, SystemTime::now())
}

/// Run a retention pass as if the current time were `now`.
pub fn prune_at(root: &Path, policy: &PrunePolicy, now: SystemTime) -> PruneReport {
    if !root.is_dir() {
        warn!(
            target = "gazette::retention",
            root = %root.display(),
            "retention root not found; nothing to do"
        );
        return PruneReport::skipped(PruneStatus::RootMissing, policy);
    }

    if policy.is_empty() {
        warn!(
            target = "gazette::retention",
            "no retention policy specified; nothing to do"
        );
        return PruneReport::skipped(PruneStatus::NoPolicy, policy);
    }

    let pages = collect_pages(root);
    prune_pages(root, &pages, policy, now)
}

/// Apply `policy` to `pages`, which must be sorted newest first.
fn prune_pages(root: &Path, pages: &[Page], policy: &PrunePolicy, now: SystemTime) -> PruneReport {
    let keep = keep_set(pages, policy, now);

    let mut report = PruneReport {
        status: PruneStatus::Completed,
        dry_run: policy.dry_run,
        pages: pages.len(),
        kept: Vec::with_capacity(keep.len()),
        deleted: Vec::new(),
        errors: Vec::new(),
    };

    for page in pages {
        let relative = relative_to(root, &page.path);
        if keep.contains(page.path.as_path()) {
            report.kept.push(relative);
            continue;
        }

        if policy.dry_run {
            info!(
                target = "gazette::retention",
                path = %relative.display(),
                "dry run: would delete"
            );
            report.deleted.push(relative);
            continue;
        }

        match fs::remove_file(&page.path) {
            Ok(()) => {
                info!(
                    target = "gazette::retention",
                    path = %relative.display(),
                    "deleted"
                );
                if let Err(failure) = remove_empty_parents(root, &page.path) {
                    report.errors.push(failure);
                }
                report.deleted.push(relative);
            }
            Err(err) => {
                warn!(
                    target = "gazette::retention",
                    path = %relative.display(),
                    error = %err,
                    "failed to delete page"
                );
                report.errors.push(PruneFailure {
                    path: relative,
                    error: err.to_string(),
                });
            }
        }
    }

    if !policy.dry_run {
        counter!("gazette_retention_deleted_total").increment(report.deleted.len() as u64);
    }

    info!(
        target = "gazette::retention",
        pages = report.pages,
        keep = report.kept.len(),
        delete = report.deleted.len(),
        dry_run = policy.dry_run,
        "retention pass finished"
    );

    report
}

struct Page {
    path: PathBuf,
    modified: SystemTime,
}

/// Candidate pages under `root`, newest first.
fn collect_pages(root: &Path) -> Vec<Page> {
    let mut pages: Vec<Page> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored_dir(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(
                    target = "gazette::retention",
                    error = %err,
                    "skipping unreadable entry"
                );
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_candidate(entry.path()))
        .map(|entry| Page {
            modified: entry
                .metadata()
                .ok()
                .and_then(|meta| meta.modified().ok())
                .unwrap_or(SystemTime::UNIX_EPOCH),
            path: entry.into_path(),
        })
        .collect();

    pages.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.path.cmp(&b.path)));
    pages
}

fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORE_DIRS.contains(&name))
}

fn is_candidate(path: &Path) -> bool {
    let is_html = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
    let keep_always = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| KEEP_ALWAYS.contains(&name));
    is_html && !keep_always
}

fn keep_set<'a>(pages: &'a [Page], policy: &PrunePolicy, now: SystemTime) -> HashSet<&'a Path> {
    let mut keep = HashSet::new();

    if let Some(days) = policy.days_keep() {
        let cutoff = days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|secs| now.checked_sub(Duration::from_secs(secs)))
            .unwrap_or(SystemTime::UNIX_EPOCH);
        keep.extend(
            pages
                .iter()
                .filter(|page| page.modified >= cutoff)
                .map(|page| page.path.as_path()),
        );
    }

    if let Some(max) = policy.max_keep() {
        keep.extend(pages.iter().take(max).map(|page| page.path.as_path()));
    }

    keep
}

fn remove_empty_parents(root: &Path, file: &Path) -> Result<(), PruneFailure> {
    let mut current = file.parent();
    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }
        let empty = is_empty_dir(dir).map_err(|err| failure(root, dir, err))?;
        if !empty {
            break;
        }
        fs::remove_dir(dir).map_err(|err| failure(root, dir, err))?;
        current = dir.parent();
    }
    Ok(())
}

fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}

fn failure(root: &Path, path: &Path, err: io::Error) -> PruneFailure {
    warn!(
        target = "gazette::retention",
        path = %path.display(),
        error = %err,
        "failed to remove empty directory"
    );
    PruneFailure {
        path: relative_to(root, path),
        error: err.to_string(),
    }
}

fn relative_to(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}
