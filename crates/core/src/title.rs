//! Turns raw folder and archive names into search-ready titles.
//!
//! The pipeline is applied until it stops changing its input, which makes
//! [`clean`] idempotent. Every step only removes characters or turns them into
//! whitespace, so the loop always settles.

use regex::Regex;
use std::sync::LazyLock;

const BIBLIO_KEYWORDS: &str = "scan|digital|webtoon|completed|complete|end|fin|raw|eng";

static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:zip|cbz|cbr|rar|7z|pdf|epub)\s*$").unwrap());

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)|\{[^}]*\}").unwrap());

/// Keywords glued to the name with `_` or `.`, as in `Saga_Digital`.
/// Hyphens belong to the title (`Dead-End Kids`).
static TAGGED_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)[._]+(?:{BIBLIO_KEYWORDS})\b")).unwrap()
});

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[_.]").unwrap());

/// Volume and chapter markers plus any keywords trailing them.
static VOLUME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(?:vol(?:ume)?\s*\d+|ch(?:apter)?\s*\d+|v\d+)\b(?:\s+(?:{BIBLIO_KEYWORDS})\b)*"
    ))
    .unwrap()
});

static LOCALE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+\s*(?:권|화)|\b(?:완결|미완|연재|단편|ebook)\b").unwrap()
});

static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}\s!?'\-]").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

fn pass(input: &str) -> String {
    let s = EXTENSION.replace(input, "");
    let s = BRACKETED.replace_all(&s, " ");
    let s = TAGGED_KEYWORD.replace_all(&s, " ");
    let s = SEPARATORS.replace_all(&s, " ");
    let s = VOLUME.replace_all(&s, " ");
    let s = LOCALE_SUFFIX.replace_all(&s, " ");
    let s = DISALLOWED.replace_all(&s, " ");
    WHITESPACE.replace_all(&s, " ").trim().to_string()
}

/// Search-ready title for `raw`. Returns `raw` unchanged when nothing
/// would be left.
pub fn clean(raw: &str) -> String {
    let mut current = pass(raw);
    loop {
        let next = pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    if current.is_empty() {
        raw.to_string()
    } else {
        current
    }
}
