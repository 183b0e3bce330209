//! Plain-text rendering of entries and pages.

use providers::{Entry, ScanPage};

/// One line per entry: a `/` suffix marks directories, and the display title
/// and poster follow when known.
pub fn entry_line(entry: &Entry) -> String {
    let mut line = entry.path.clone();
    if entry.is_directory && !line.ends_with('/') {
        line.push('/');
    }
    if let Some(meta) = &entry.metadata {
        if let Some(title) = meta.title.as_deref().filter(|t| *t != entry.name) {
            line.push_str(&format!("  \"{title}\""));
        }
        if let Some(url) = &meta.poster_url {
            line.push_str(&format!("  {url}"));
        }
    }
    line
}

pub fn page_header(page: &ScanPage) -> String {
    let start = page.page.saturating_mul(page.page_size);
    if page.items.is_empty() {
        format!("page {} (no entries, {} total)", page.page, page.total)
    } else {
        format!(
            "page {}: {}-{} of {}",
            page.page,
            start.saturating_add(1),
            start.saturating_add(page.items.len()),
            page.total
        )
    }
}

/// Writes `bytes` to `out`, creating parent directories.
pub fn write_image(out: &std::path::Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, bytes)?;
    Ok(())
}
