//! Terminal display-width metrics.
//!
//! Widths are measured per extended grapheme cluster, never per byte or per
//! `char`, and ANSI escape sequences contribute nothing to layout. Every
//! column of a live table is sized, truncated and padded with these
//! functions, so a single miscounted cluster shifts every cell to its right.

use std::num::NonZeroUsize;
use std::sync::{LazyLock, Mutex};

use lru::LruCache;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use crate::error::{Result, TableError};
use crate::sync::lock_recover;

/// Default ellipsis marker.
pub const ELLIPSIS: &str = "\u{2026}";

/// Minimum string length to cache (shorter strings have minimal overhead).
const CACHE_MIN_LEN: usize = 8;

/// Variation selector 16 requests emoji presentation for the cluster.
const EMOJI_PRESENTATION: char = '\u{FE0F}';

/// CSI introducer (`ESC [` or the 8-bit `0x9b`), parameters, final letter.
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\x1b\[|\x{9b})[0-9;:?]*[A-Za-z]").expect("valid escape pattern")
});

static WIDTH_CACHE: LazyLock<Mutex<LruCache<String, usize>>> =
    LazyLock::new(|| Mutex::new(LruCache::new(NonZeroUsize::new(1024).expect("non-zero"))));

/// Horizontal alignment of a cell within its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Right,
    Center,
}

impl std::str::FromStr for Align {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "center" => Ok(Self::Center),
            other => Err(TableError::invalid(format!(
                "alignment must be left, right or center, got '{other}'"
            ))),
        }
    }
}

/// One unit of a scanned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// An ANSI escape sequence (zero width).
    Escape(&'a str),
    /// A grapheme cluster and its display width.
    Cluster(&'a str, usize),
}

impl Token<'_> {
    fn len(&self) -> usize {
        match self {
            Self::Escape(s) | Self::Cluster(s, _) => s.len(),
        }
    }
}

/// Split `text` into escape sequences and grapheme clusters, in order.
///
/// Concatenating the token texts reproduces `text` exactly.
#[must_use]
pub fn tokens(text: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in ANSI_ESCAPE.find_iter(text) {
        push_clusters(&text[last..m.start()], &mut out);
        out.push(Token::Escape(m.as_str()));
        last = m.end();
    }
    push_clusters(&text[last..], &mut out);
    out
}

fn push_clusters<'a>(text: &'a str, out: &mut Vec<Token<'a>>) {
    out.extend(
        text.graphemes(true)
            .map(|cluster| Token::Cluster(cluster, cluster_width(cluster))),
    );
}

/// Display width of a single grapheme cluster: 2 for emoji presentation and
/// East Asian wide characters, 1 for everything else.
#[must_use]
pub fn cluster_width(cluster: &str) -> usize {
    if cluster.is_ascii() {
        // CRLF is the one two-byte ASCII cluster; it still takes one cell.
        return usize::from(!cluster.is_empty());
    }
    if cluster.contains(EMOJI_PRESENTATION) {
        return 2;
    }
    if cluster.chars().filter(|c| is_regional_indicator(*c)).count() >= 2 {
        return 2;
    }
    if cluster.chars().any(|c| c.width() == Some(2)) {
        2
    } else {
        1
    }
}

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

fn compute_width(text: &str) -> usize {
    if text.is_ascii() && !text.contains(['\x1b', '\r']) {
        return text.len();
    }
    tokens(text)
        .iter()
        .map(|token| match token {
            Token::Escape(_) => 0,
            Token::Cluster(_, w) => *w,
        })
        .sum()
}

/// Display width of `text` in terminal cells (cached for longer strings).
#[must_use]
pub fn width(text: &str) -> usize {
    if text.len() < CACHE_MIN_LEN {
        return compute_width(text);
    }

    if let Some(&cached) = lock_recover(&WIDTH_CACHE).get(text) {
        return cached;
    }

    let measured = compute_width(text);
    lock_recover(&WIDTH_CACHE).put(text.to_string(), measured);
    measured
}

/// Display width without touching the cache.
#[must_use]
pub fn width_uncached(text: &str) -> usize {
    compute_width(text)
}

/// Cut `text` down to at most `max_width` cells.
///
/// Escape sequences that precede the cut point are kept; a wide cluster that
/// would straddle the limit is dropped entirely.
#[must_use]
pub fn truncate(text: &str, max_width: usize) -> String {
    if width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }

    let mut used = 0;
    let mut end = 0;
    for token in tokens(text) {
        if let Token::Cluster(_, w) = token {
            if used + w > max_width {
                break;
            }
            used += w;
        }
        end += token.len();
    }
    text[..end].to_string()
}

/// Shorten `text` to `max_width` cells, ending it with [`ELLIPSIS`] when cut.
pub fn ellipsis(text: &str, max_width: usize) -> Result<String> {
    ellipsis_with(text, max_width, ELLIPSIS)
}

/// Shorten `text` to `max_width` cells, ending it with `marker` when cut.
///
/// Fails when the marker alone does not fit in `max_width`.
pub fn ellipsis_with(text: &str, max_width: usize, marker: &str) -> Result<String> {
    let marker_width = width(marker);
    if marker_width > max_width {
        return Err(TableError::invalid(format!(
            "ellipsis marker '{marker}' is {marker_width} cells wide, budget is {max_width}"
        )));
    }
    if width(text) <= max_width {
        return Ok(text.to_string());
    }
    let mut out = truncate(text, max_width - marker_width);
    out.push_str(marker);
    Ok(out)
}

/// Pad `text` with spaces to `target` cells. Never truncates.
#[must_use]
pub fn align(text: &str, target: usize, mode: Align) -> String {
    let current = width(text);
    if current >= target {
        return text.to_string();
    }
    let padding = target - current;
    match mode {
        Align::Left => format!("{text}{}", " ".repeat(padding)),
        Align::Right => format!("{}{text}", " ".repeat(padding)),
        Align::Center => {
            let left = padding / 2;
            format!("{}{text}{}", " ".repeat(left), " ".repeat(padding - left))
        }
    }
}
