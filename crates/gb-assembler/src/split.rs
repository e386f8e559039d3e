use gb_core::{ContentParts, SourceFormat};
use serde_json::Value as JsonValue;

use crate::html_utils::{contains_ci, is_classic_inline_script, script_block_regex, style_block_regex};

pub const STYLE_MARKER: &str = "css ";
pub const SCRIPT_MARKER: &str = "js ";

const FENCE: &str = "```";

/// Text carried by a model response envelope
/// (`{"candidates":[{"content":{"parts":[{"text":..}]}}]}`), with the text
/// parts of the first candidate joined in order.
pub fn unwrap_response_envelope(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let value: JsonValue = serde_json::from_str(trimmed).ok()?;
    let parts = value
        .get("candidates")?
        .as_array()?
        .first()?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(JsonValue::as_str))
        .collect();
    if texts.is_empty() {
        return None;
    }
    Some(texts.concat())
}

/// Format of `content`, looking through a response envelope when present.
pub fn detect_format(content: &str) -> SourceFormat {
    match unwrap_response_envelope(content) {
        Some(inner) => detect_bare_format(&inner),
        None => detect_bare_format(content),
    }
}

fn detect_bare_format(content: &str) -> SourceFormat {
    if parse_json_parts(content).is_some() {
        SourceFormat::Json
    } else if parse_fenced_blocks(content).is_some() {
        SourceFormat::FencedBlocks
    } else if contains_ci(content, "<!doctype") || contains_ci(content, "<html") {
        SourceFormat::FullDocument
    } else if content.contains(STYLE_MARKER) || content.contains(SCRIPT_MARKER) {
        SourceFormat::Markers
    } else {
        SourceFormat::Markup
    }
}

pub fn split(content: &str) -> ContentParts {
    match unwrap_response_envelope(content) {
        Some(inner) => split_as(&inner, detect_bare_format(&inner)),
        None => split_as(content, detect_bare_format(content)),
    }
}

/// Splits `content` with the convention of `format`. A format whose structure
/// is not actually present falls through to the marker policy.
pub fn split_as(content: &str, format: SourceFormat) -> ContentParts {
    match format {
        SourceFormat::Json => {
            parse_json_parts(content).unwrap_or_else(|| split_markers(content))
        }
        SourceFormat::FencedBlocks => {
            parse_fenced_blocks(content).unwrap_or_else(|| split_markers(content))
        }
        SourceFormat::FullDocument => split_full_document(content),
        SourceFormat::Markers | SourceFormat::Markup => split_markers(content),
    }
}

/// Marker policy: markup before the first marker, then the style and script
/// sections. Markers are found by first-occurrence search, so a marker token
/// inside markup text splits there too.
pub fn split_markers(content: &str) -> ContentParts {
    let style_at = content.find(STYLE_MARKER);
    let script_at = content.find(SCRIPT_MARKER);

    let (markup, style, script) = match (style_at, script_at) {
        (Some(style_at), Some(script_at)) if style_at < script_at => (
            &content[..style_at],
            &content[style_at + STYLE_MARKER.len()..script_at],
            &content[script_at + SCRIPT_MARKER.len()..],
        ),
        (Some(style_at), Some(script_at)) => (
            &content[..script_at],
            &content[style_at + STYLE_MARKER.len()..],
            &content[script_at + SCRIPT_MARKER.len()..style_at],
        ),
        (Some(style_at), None) => (
            &content[..style_at],
            &content[style_at + STYLE_MARKER.len()..],
            "",
        ),
        (None, Some(script_at)) => (
            &content[..script_at],
            "",
            &content[script_at + SCRIPT_MARKER.len()..],
        ),
        (None, None) => (content, "", ""),
    };

    ContentParts::new(markup.trim(), style.trim(), script.trim())
}

fn parse_json_parts(content: &str) -> Option<ContentParts> {
    let trimmed = content.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let value: JsonValue = serde_json::from_str(trimmed).ok()?;
    let object = value.as_object()?;
    let markup = object.get("html")?.as_str()?;
    let style = object.get("css").and_then(JsonValue::as_str);
    let script = object
        .get("javascript")
        .or_else(|| object.get("js"))
        .and_then(JsonValue::as_str);
    if style.is_none() && script.is_none() {
        return None;
    }
    Some(ContentParts::new(
        markup.trim(),
        style.unwrap_or_default().trim(),
        script.unwrap_or_default().trim(),
    ))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FenceLanguage {
    Markup,
    Style,
    Script,
    Other,
}

fn fence_language(label: &str) -> FenceLanguage {
    match label.trim().to_ascii_lowercase().as_str() {
        "html" => FenceLanguage::Markup,
        "css" => FenceLanguage::Style,
        "js" | "javascript" => FenceLanguage::Script,
        _ => FenceLanguage::Other,
    }
}

/// Collects labelled fenced blocks. Repeated languages are appended in order;
/// text outside fences is dropped. `None` when no recognised block exists.
fn parse_fenced_blocks(content: &str) -> Option<ContentParts> {
    let mut parts = ContentParts::default();
    let mut current: Option<(FenceLanguage, Vec<&str>)> = None;
    let mut found = false;

    for line in content.lines() {
        let fence = line.trim_start().strip_prefix(FENCE);
        if current.is_none() {
            if let Some(label) = fence {
                current = Some((fence_language(label), Vec::new()));
            }
            continue;
        }
        if fence.is_some_and(|rest| rest.trim().is_empty()) {
            if let Some((language, lines)) = current.take() {
                found |= push_block(&mut parts, language, &lines.join("\n"));
            }
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }
    // An unterminated final block still counts.
    if let Some((language, lines)) = current.take() {
        found |= push_block(&mut parts, language, &lines.join("\n"));
    }

    found.then_some(parts)
}

fn push_block(parts: &mut ContentParts, language: FenceLanguage, block: &str) -> bool {
    let target = match language {
        FenceLanguage::Markup => &mut parts.markup,
        FenceLanguage::Style => &mut parts.style,
        FenceLanguage::Script => &mut parts.script,
        FenceLanguage::Other => return false,
    };
    let block = block.trim();
    if !target.is_empty() && !block.is_empty() {
        target.push_str("\n\n");
    }
    target.push_str(block);
    true
}

/// Lifts inline styles and classic inline scripts out of a complete document.
/// External, module and injected scripts stay in the markup.
fn split_full_document(content: &str) -> ContentParts {
    let mut styles = Vec::new();
    let without_styles = style_block_regex().replace_all(content, |caps: &regex::Captures| {
        let body = caps[1].trim();
        if !body.is_empty() {
            styles.push(body.to_string());
        }
        String::new()
    });

    let mut scripts = Vec::new();
    let markup = script_block_regex().replace_all(&without_styles, |caps: &regex::Captures| {
        if !is_classic_inline_script(&caps[1]) {
            return caps[0].to_string();
        }
        let body = caps[2].trim();
        if !body.is_empty() {
            scripts.push(body.to_string());
        }
        String::new()
    });

    ContentParts::new(markup.trim(), styles.join("\n\n"), scripts.join("\n\n"))
}
