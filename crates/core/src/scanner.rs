//! Depth-bounded walk over a [`FileGateway`] that discovers comic folders.
//!
//! The walk runs on a background task and feeds a bounded channel; the
//! returned [`ComicScan`] is the consuming end. Dropping it stops the walk.

use crate::title;
use futures::Stream;
use globset::{Glob, GlobSet, GlobSetBuilder};
use providers::models::base_name;
use providers::{Entry, FileGateway, Metadata};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_depth: usize,
    /// Lower-case archive extensions without the dot.
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: 5,
            extensions: vec!["zip".to_string(), "cbz".to_string()],
            exclude: Vec::new(),
        }
    }
}

impl From<&crate::config::ScanConfig> for ScanOptions {
    fn from(cfg: &crate::config::ScanConfig) -> Self {
        Self {
            max_depth: cfg.max_depth,
            extensions: cfg.extensions.iter().map(|e| e.to_lowercase()).collect(),
            exclude: cfg.exclude.clone(),
        }
    }
}

/// Lazy sequence of discovered comic folders, in traversal order.
///
/// Not restartable: every call to [`scan`] walks the tree again.
pub struct ComicScan {
    rx: mpsc::Receiver<Entry>,
    worker: JoinHandle<()>,
}

impl ComicScan {
    pub async fn next_entry(&mut self) -> Option<Entry> {
        self.rx.recv().await
    }
}

impl Stream for ComicScan {
    type Item = Entry;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Entry>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for ComicScan {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

/// Starts a walk from `root`. `root` itself is depth 0; directories deeper
/// than `options.max_depth` are never listed.
pub fn scan(
    gateway: Arc<dyn FileGateway>,
    root: &str,
    options: &ScanOptions,
) -> anyhow::Result<ComicScan> {
    let matcher = FolderMatcher::new(options)?;
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let root = root.to_string();
    let max_depth = options.max_depth;
    let worker = tokio::spawn(async move {
        walk(gateway, root, max_depth, matcher, tx).await;
    });
    Ok(ComicScan { rx, worker })
}

async fn walk(
    gateway: Arc<dyn FileGateway>,
    root: String,
    max_depth: usize,
    matcher: FolderMatcher,
    tx: mpsc::Sender<Entry>,
) {
    info!(root = %root, max_depth, "comic scan started");
    let mut found = 0usize;
    let mut stack = vec![(root.clone(), 0usize)];
    while let Some((dir, depth)) = stack.pop() {
        if tx.is_closed() {
            debug!(root = %root, "scan consumer gone, stopping");
            return;
        }
        // Listing failures come back empty, which ends this branch only.
        let children = gateway.list(&dir).await;

        if children
            .iter()
            .any(|c| !c.is_directory && matcher.is_archive(&c.name))
        {
            let name = base_name(&dir).to_string();
            let display = title::clean(&name);
            let mut entry = Entry::directory(name, dir.clone());
            entry.metadata = Some(Metadata {
                title: Some(display),
                ..Metadata::default()
            });
            if tx.send(entry).await.is_err() {
                debug!(root = %root, "scan consumer gone, stopping");
                return;
            }
            found += 1;
        }

        if depth < max_depth {
            // Reversed so the first child is visited first.
            for child in children.into_iter().rev() {
                if child.is_directory && !matcher.is_excluded(&child.name) {
                    stack.push((child.path, depth + 1));
                }
            }
        }
    }
    info!(root = %root, found, "comic scan complete");
}

struct FolderMatcher {
    suffixes: Vec<String>,
    excludes: GlobSet,
}

impl FolderMatcher {
    fn new(options: &ScanOptions) -> anyhow::Result<Self> {
        Ok(Self {
            suffixes: options
                .extensions
                .iter()
                .map(|e| format!(".{}", e.trim_start_matches('.').to_lowercase()))
                .collect(),
            excludes: build_globset(&options.exclude)?,
        })
    }

    fn is_archive(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.suffixes.iter().any(|s| lower.ends_with(s.as_str()))
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.excludes.is_match(name)
    }
}

fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat)?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
