//! Pages over a scan that may still be running.
//!
//! A [`ScanSession`] drains a [`ComicScan`] into an append-only list.
//! Reading page `n` waits until the list reaches the end of that page or the
//! walk finishes, so a settled page never changes and `total` never shrinks.

use crate::scanner::ComicScan;
use futures::StreamExt;
use providers::{Entry, ScanPage};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub discovered: usize,
    pub complete: bool,
}

#[derive(Default)]
struct Discovered {
    entries: Vec<Entry>,
    paths: HashSet<String>,
}

pub struct ScanSession {
    root: String,
    discovered: Arc<Mutex<Discovered>>,
    progress: watch::Receiver<Progress>,
    worker: JoinHandle<()>,
}

impl ScanSession {
    pub fn start(root: impl Into<String>, mut scan: ComicScan) -> Self {
        let root = root.into();
        let discovered = Arc::new(Mutex::new(Discovered::default()));
        let (tx, progress) = watch::channel(Progress::default());

        let sink = discovered.clone();
        let worker = tokio::spawn(async move {
            while let Some(entry) = scan.next().await {
                let count = match sink.lock() {
                    Ok(mut d) => {
                        if d.paths.insert(entry.path.clone()) {
                            d.entries.push(entry);
                        }
                        d.entries.len()
                    }
                    Err(_) => break,
                };
                tx.send_modify(|p| p.discovered = count);
            }
            tx.send_modify(|p| p.complete = true);
        });

        Self {
            root,
            discovered,
            progress,
            worker,
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn progress(&self) -> Progress {
        let mut p = *self.progress.borrow();
        // A vanished sender means the worker is gone for good.
        if self.progress.has_changed().is_err() {
            p.complete = true;
        }
        p
    }

    /// Page `page` (0-based). Waits for the frontier to pass the end of the
    /// page or for the walk to finish, whichever comes first.
    pub async fn page(&self, page: usize, page_size: usize) -> ScanPage {
        let end = page.saturating_add(1).saturating_mul(page_size);
        let mut rx = self.progress.clone();
        if rx
            .wait_for(|p| p.complete || p.discovered >= end)
            .await
            .is_err()
        {
            debug!(root = %self.root, "scan worker ended without completing");
        }
        self.snapshot(page, page_size)
    }

    /// Whatever is known for `page` right now, without waiting.
    pub fn snapshot(&self, page: usize, page_size: usize) -> ScanPage {
        let start = page.saturating_mul(page_size);
        let (total, items) = match self.discovered.lock() {
            Ok(d) => {
                let items = d
                    .entries
                    .iter()
                    .skip(start)
                    .take(page_size)
                    .cloned()
                    .collect();
                (d.entries.len(), items)
            }
            Err(_) => (0, Vec::new()),
        };
        ScanPage {
            total,
            page,
            page_size,
            items,
        }
    }

    /// Everything discovered so far, in discovery order.
    pub fn entries(&self) -> Vec<Entry> {
        self.discovered
            .lock()
            .map(|d| d.entries.clone())
            .unwrap_or_default()
    }

    /// Waits for the walk to finish and returns the final count.
    pub async fn finish(&self) -> usize {
        let mut rx = self.progress.clone();
        let _ = rx.wait_for(|p| p.complete).await;
        self.discovered.lock().map(|d| d.entries.len()).unwrap_or(0)
    }
}

impl Drop for ScanSession {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
