use std::sync::OnceLock;

use regex::Regex;

/// ASCII case-insensitive `find`. Lowercasing ASCII keeps byte offsets intact.
pub(crate) fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

pub(crate) fn rfind_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .rfind(&needle.to_ascii_lowercase())
}

pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    find_ci(haystack, needle).is_some()
}

pub(crate) fn insert_at(text: &str, index: usize, insertion: &str) -> String {
    let mut out = String::with_capacity(text.len() + insertion.len());
    out.push_str(&text[..index]);
    out.push_str(insertion);
    out.push_str(&text[index..]);
    out
}

/// Byte offsets of every `<tag` opening that is followed by `>`, `/` or
/// whitespace, so `<head` does not match `<header>`.
pub(crate) fn open_tag_positions(html: &str, tag: &str) -> Vec<usize> {
    let lower = html.to_ascii_lowercase();
    let needle = format!("<{}", tag.to_ascii_lowercase());
    let mut positions = Vec::new();
    let mut offset = 0usize;
    while let Some(found) = lower[offset..].find(&needle) {
        let start = offset + found;
        let end = start + needle.len();
        let next = lower[end..].chars().next();
        if matches!(next, Some(ch) if ch == '>' || ch == '/' || ch.is_ascii_whitespace()) {
            positions.push(start);
        }
        offset = end;
    }
    positions
}

pub(crate) fn has_open_tag(html: &str, tag: &str) -> bool {
    !open_tag_positions(html, tag).is_empty()
}

/// Offset just past the `>` of the first `<tag ...>` opening.
pub(crate) fn open_tag_end(html: &str, tag: &str) -> Option<usize> {
    let start = *open_tag_positions(html, tag).first()?;
    html[start..].find('>').map(|index| start + index + 1)
}

/// Whether a `<script ...>` opening tag holds classic inline JavaScript that
/// may be moved, merged or wrapped.
pub(crate) fn is_classic_inline_script(open_tag: &str) -> bool {
    let lower = open_tag.to_ascii_lowercase();
    if src_attribute_regex().is_match(&lower) || lower.contains("data-gamebox") {
        return false;
    }
    match type_attribute_regex().captures(&lower) {
        Some(caps) => {
            let value = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim())
                .unwrap_or_default();
            value.is_empty() || value == "text/javascript" || value == "application/javascript"
        }
        None => true,
    }
}

pub(crate) fn has_classic_inline_script(html: &str) -> bool {
    script_block_regex()
        .captures_iter(html)
        .any(|caps| is_classic_inline_script(&caps[1]))
}

pub(crate) fn script_block_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)(<script\b[^>]*>)(.*?)(</script\s*>)").expect("script block regex")
    })
}

pub(crate) fn style_block_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)<style\b[^>]*>(.*?)</style\s*>").expect("style block regex")
    })
}

fn src_attribute_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\ssrc\s*=").expect("src attribute regex"))
}

fn type_attribute_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"\stype\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).expect("type regex")
    })
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
