//! URL extraction, recombination and canonicalization for raw content cells.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());

/// Which URL tokens get removed from the content text. The `url` field
/// always receives the first match only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripPolicy {
    /// Remove every URL token from the content.
    #[default]
    AllMatches,
    /// Remove only the extracted `url` token (and verbatim repeats of it).
    FirstMatch,
}

/// A content cell split into text and its first embedded URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub content: String,
    /// First URL found, or empty.
    pub url: String,
}

/// `content + "\n" + url`, or just `content` when there is no URL.
pub fn recombine(content: &str, url: &str) -> String {
    if url.is_empty() {
        content.to_string()
    } else {
        format!("{content}\n{url}")
    }
}

pub fn extract(raw: &str, policy: StripPolicy) -> ContentRecord {
    let Some(first) = URL_RE.find(raw) else {
        return ContentRecord {
            content: raw.trim().to_string(),
            url: String::new(),
        };
    };

    let mut content = String::new();
    let mut last = 0;
    let matches: Vec<_> = match policy {
        StripPolicy::AllMatches => URL_RE.find_iter(raw).collect(),
        StripPolicy::FirstMatch => URL_RE
            .find_iter(raw)
            .filter(|m| m.as_str() == first.as_str())
            .collect(),
    };
    for m in matches {
        splice(&mut content, &raw[last..m.start()]);
        last = m.end();
    }
    splice(&mut content, &raw[last..]);

    ContentRecord {
        content: content.trim().to_string(),
        url: first.as_str().to_string(),
    }
}

/// Splits every raw cell; the two outputs stay aligned with the input.
pub fn extract_all<'a, I>(raws: I, policy: StripPolicy) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = &'a str>,
{
    raws.into_iter()
        .map(|raw| {
            let rec = extract(raw, policy);
            (rec.content, rec.url)
        })
        .unzip()
}

/// Appends `piece` to `out` where a URL was cut out between them. Horizontal
/// whitespace around the cut collapses to one space; line breaks survive.
fn splice(out: &mut String, piece: &str) {
    let is_blank = |c: char| c == ' ' || c == '\t';
    if out.is_empty() {
        out.push_str(piece);
        return;
    }
    let head = out.trim_end_matches(is_blank).len();
    out.truncate(head);
    let piece = piece.trim_start_matches(is_blank);
    if piece.is_empty() {
        return;
    }
    if !out.is_empty() && !out.ends_with('\n') && !piece.starts_with(['\n', '\r']) {
        out.push(' ');
    }
    out.push_str(piece);
}

/// The part of `url` before the first `?`.
pub fn canonicalize_url(url: &str) -> &str {
    match url.find('?') {
        Some(idx) => &url[..idx],
        None => url,
    }
}
