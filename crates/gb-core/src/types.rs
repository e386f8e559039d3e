use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::GameBoxError;

pub const DEFAULT_GAME_TITLE: &str = "Interactive Game";

/// Markup, style and script of one mini-game, any of which may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentParts {
    pub markup: String,
    pub style: String,
    pub script: String,
}

impl ContentParts {
    pub fn new(
        markup: impl Into<String>,
        style: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            markup: markup.into(),
            style: style.into(),
            script: script.into(),
        }
    }

    pub fn markup_only(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.markup.trim().is_empty() && self.style.trim().is_empty() && self.script.trim().is_empty()
    }
}

/// Input convention recognised in raw generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    Json,
    FencedBlocks,
    FullDocument,
    Markers,
    Markup,
}

impl SourceFormat {
    pub fn name(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::FencedBlocks => "fenced-blocks",
            Self::FullDocument => "full-document",
            Self::Markers => "markers",
            Self::Markup => "markup",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A complete, self-contained mini-game document.
///
/// Values built through [`AssembledDocument::new`] carry exactly one doctype,
/// head, title and body plus the charset and viewport meta tags. The fallback
/// shell used when those checks fail is marked as degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    html: String,
    degraded: bool,
}

impl AssembledDocument {
    pub fn new(html: impl Into<String>) -> Result<Self, GameBoxError> {
        let html = html.into();
        validate_document(&html)?;
        Ok(Self {
            html,
            degraded: false,
        })
    }

    pub fn degraded(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            degraded: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.html
    }

    pub fn into_string(self) -> String {
        self.html
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Rebuilds the document around new text. A valid document whose rewrite
    /// no longer validates comes back degraded.
    pub fn map_html(self, rewrite: impl FnOnce(String) -> String) -> Self {
        let html = rewrite(self.html);
        let degraded = self.degraded || validate_document(&html).is_err();
        Self { html, degraded }
    }
}

impl fmt::Display for AssembledDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.html)
    }
}

pub fn validate_document(html: &str) -> Result<(), GameBoxError> {
    expect_single(html, doctype_regex(), "ASSEMBLY_DOCTYPE_COUNT", "<!DOCTYPE html>")?;
    expect_single(html, head_open_regex(), "ASSEMBLY_HEAD_COUNT", "<head>")?;
    expect_single(html, title_open_regex(), "ASSEMBLY_TITLE_COUNT", "<title>")?;
    expect_single(html, body_open_regex(), "ASSEMBLY_BODY_COUNT", "<body>")?;

    if !charset_meta_regex().is_match(html) {
        return Err(GameBoxError::new(
            "ASSEMBLY_CHARSET_MISSING",
            "Document head has no charset meta tag.",
        ));
    }
    if !viewport_meta_regex().is_match(html) {
        return Err(GameBoxError::new(
            "ASSEMBLY_VIEWPORT_MISSING",
            "Document head has no viewport meta tag.",
        ));
    }
    Ok(())
}

fn expect_single(
    html: &str,
    regex: &Regex,
    code: &'static str,
    label: &str,
) -> Result<(), GameBoxError> {
    let count = regex.find_iter(html).count();
    if count != 1 {
        return Err(GameBoxError::new(
            code,
            format!("Expected exactly one {}, found {}.", label, count),
        ));
    }
    Ok(())
}

fn doctype_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)<!doctype\s+html\s*>").expect("doctype regex"))
}

fn head_open_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)<head[\s>]").expect("head regex"))
}

fn title_open_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)<title[\s>]").expect("title regex"))
}

fn body_open_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)<body[\s>]").expect("body regex"))
}

fn charset_meta_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)<meta[^>]*charset").expect("charset regex"))
}

fn viewport_meta_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]*name\s*=\s*["']?viewport"#).expect("viewport regex")
    })
}
