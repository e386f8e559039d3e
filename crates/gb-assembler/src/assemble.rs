use std::sync::OnceLock;

use gb_core::{AssembledDocument, ContentParts, DEFAULT_GAME_TITLE};
use regex::{Captures, Regex};

use crate::html_utils::{
    contains_ci, escape_html, find_ci, has_classic_inline_script, has_open_tag, insert_at,
    open_tag_end, open_tag_positions, rfind_ci,
};

pub const VIEWPORT_CONTENT: &str =
    "width=device-width, initial-scale=1.0, maximum-scale=1.0, user-scalable=no";
pub const BASE_STYLE_ID: &str = "gamebox-base";

const DOCTYPE_LINE: &str = "<!DOCTYPE html>\n";

const BASE_STYLES: &str = r#"
html, body {
  margin: 0;
  padding: 0;
  width: 100%;
  height: 100%;
  overflow: auto;
  scrollbar-width: none;
  -ms-overflow-style: none;
}
html::-webkit-scrollbar, body::-webkit-scrollbar {
  display: none;
}
*, *::before, *::after {
  box-sizing: border-box;
}
body {
  font-family: system-ui, -apple-system, BlinkMacSystemFont, sans-serif;
  line-height: 1.5;
  color: #333;
  display: flex;
  flex-direction: column;
  -webkit-tap-highlight-color: transparent;
}
img, canvas, video, svg {
  max-width: 100%;
  height: auto;
  display: block;
}
button, [role="button"], a, input, select, label {
  min-height: 44px;
  min-width: 44px;
  touch-action: manipulation;
}
.container, .game-container, #game, .game, main {
  width: 100%;
  margin: 0 auto;
  padding: 0;
}
"#;

/// Combines content parts into one canonical document.
///
/// Markup that already looks like a document (doctype, `<html>`, `<head>` or
/// `<body>`) is completed in place; anything else is wrapped into a fresh
/// template with the baseline stylesheet. When the result breaks a document
/// invariant the raw parts are wrapped verbatim in a degraded shell instead.
pub fn assemble(parts: &ContentParts, title: Option<&str>) -> AssembledDocument {
    let full_document = is_full_document(&parts.markup);
    tracing::debug!(full_document, "assembling document");
    let html = if full_document {
        assemble_full_document(parts, title)
    } else {
        assemble_fragment(parts, title)
    };

    match AssembledDocument::new(html) {
        Ok(document) => document,
        Err(error) => {
            tracing::warn!(
                code = %error.code,
                message = %error.message,
                "assembled document failed validation; using fallback shell"
            );
            fallback_shell(parts, title)
        }
    }
}

pub fn is_full_document(markup: &str) -> bool {
    contains_ci(markup, "<!doctype")
        || has_open_tag(markup, "html")
        || has_open_tag(markup, "head")
        || has_open_tag(markup, "body")
}

fn assemble_full_document(parts: &ContentParts, title: Option<&str>) -> String {
    let html = normalize_doctype(&parts.markup);
    let html = ensure_html_element(html);
    let html = ensure_head(html);
    let html = ensure_head_meta(html);
    let html = apply_title(html, title);
    let html = inject_style(html, &parts.style);
    let html = ensure_body(html);
    inject_script(html, &parts.script)
}

fn assemble_fragment(parts: &ContentParts, title: Option<&str>) -> String {
    let title = escape_html(title.unwrap_or(DEFAULT_GAME_TITLE));
    let mut head = format!(
        "<meta charset=\"UTF-8\">\n<meta name=\"viewport\" content=\"{}\">\n<title>{}</title>\n",
        VIEWPORT_CONTENT, title
    );
    if !parts.markup.contains(BASE_STYLE_ID) {
        head.push_str(&base_style_block());
    }
    if !parts.style.trim().is_empty() {
        head.push_str(&style_block(&parts.style));
    }

    let mut body = format!("{}\n", parts.markup.trim());
    if !parts.script.trim().is_empty() {
        body.push_str(&script_block(&parts.script));
    }

    format!(
        "{}<html>\n<head>\n{}</head>\n<body>\n{}</body>\n</html>\n",
        DOCTYPE_LINE, head, body
    )
}

fn fallback_shell(parts: &ContentParts, title: Option<&str>) -> AssembledDocument {
    let title = escape_html(title.unwrap_or(DEFAULT_GAME_TITLE));
    let mut body = format!("{}\n", parts.markup);
    if !parts.style.trim().is_empty() {
        body.push_str(&style_block(&parts.style));
    }
    if !parts.script.trim().is_empty() {
        body.push_str(&script_block(&parts.script));
    }
    AssembledDocument::degraded(format!(
        "{}<html>\n<head>\n<meta charset=\"UTF-8\">\n<meta name=\"viewport\" content=\"{}\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        DOCTYPE_LINE, VIEWPORT_CONTENT, title, body
    ))
}

pub fn base_style_block() -> String {
    format!("<style id=\"{}\">{}</style>\n", BASE_STYLE_ID, BASE_STYLES)
}

fn style_block(style: &str) -> String {
    format!("<style>\n{}\n</style>\n", style.trim())
}

fn script_block(script: &str) -> String {
    format!("<script>\n{}\n</script>\n", script.trim())
}

fn normalize_doctype(markup: &str) -> String {
    let rest = doctype_regex().replace_all(markup, "");
    format!("{}{}", DOCTYPE_LINE, rest.trim())
}

fn ensure_html_element(html: String) -> String {
    if !has_open_tag(&html, "html") {
        let rest = html.strip_prefix(DOCTYPE_LINE).unwrap_or(&html);
        return format!("{}<html>\n{}\n</html>", DOCTYPE_LINE, rest);
    }
    if !contains_ci(&html, "</html>") {
        return format!("{}\n</html>", html);
    }
    html
}

fn ensure_head(html: String) -> String {
    if !has_open_tag(&html, "head") {
        let at = open_tag_end(&html, "html").unwrap_or(DOCTYPE_LINE.len());
        return insert_at(&html, at, "\n<head>\n</head>");
    }
    if !contains_ci(&html, "</head>") {
        let at = open_tag_positions(&html, "body")
            .first()
            .copied()
            .or_else(|| open_tag_end(&html, "head"))
            .unwrap_or(html.len());
        return insert_at(&html, at, "</head>\n");
    }
    html
}

fn ensure_head_meta(html: String) -> String {
    let Some(at) = open_tag_end(&html, "head") else {
        return html;
    };
    let mut meta = String::new();
    if !charset_meta_regex().is_match(&html) {
        meta.push_str("\n<meta charset=\"UTF-8\">");
    }
    if !viewport_meta_regex().is_match(&html) {
        meta.push_str(&format!(
            "\n<meta name=\"viewport\" content=\"{}\">",
            VIEWPORT_CONTENT
        ));
    }
    if meta.is_empty() {
        html
    } else {
        insert_at(&html, at, &meta)
    }
}

/// Keeps a single `<title>`: the first one is rewritten when a title is
/// given, the rest are dropped, and a missing one becomes the first child of
/// `<head>`.
fn apply_title(html: String, title: Option<&str>) -> String {
    let replacement = title.map(|title| format!("<title>{}</title>", escape_html(title)));
    let mut seen = false;
    let rewritten = title_element_regex()
        .replace_all(&html, |caps: &Captures| {
            if seen {
                return String::new();
            }
            seen = true;
            replacement
                .clone()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned();
    if seen {
        return rewritten;
    }

    let Some(at) = open_tag_end(&rewritten, "head") else {
        return rewritten;
    };
    let text = escape_html(title.unwrap_or(DEFAULT_GAME_TITLE));
    insert_at(&rewritten, at, &format!("\n<title>{}</title>", text))
}

fn inject_style(html: String, style: &str) -> String {
    if style.trim().is_empty() || has_open_tag(&html, "style") {
        return html;
    }
    match find_ci(&html, "</head>") {
        Some(at) => insert_at(&html, at, &style_block(style)),
        None => html,
    }
}

fn ensure_body(html: String) -> String {
    if has_open_tag(&html, "body") {
        if contains_ci(&html, "</body>") {
            return html;
        }
        return match rfind_ci(&html, "</html>") {
            Some(at) => insert_at(&html, at, "</body>\n"),
            None => format!("{}\n</body>", html),
        };
    }

    let open_at = find_ci(&html, "</head>")
        .map(|at| at + "</head>".len())
        .unwrap_or(DOCTYPE_LINE.len());
    let html = insert_at(&html, open_at, "\n<body>");
    match rfind_ci(&html, "</html>") {
        Some(at) => insert_at(&html, at, "</body>\n"),
        None => format!("{}\n</body>", html),
    }
}

fn inject_script(html: String, script: &str) -> String {
    if script.trim().is_empty() || has_classic_inline_script(&html) {
        return html;
    }
    let block = script_block(script);
    if let Some(at) = rfind_ci(&html, "</body>") {
        return insert_at(&html, at, &block);
    }
    if let Some(at) = rfind_ci(&html, "</html>") {
        return insert_at(&html, at, &block);
    }
    html + &block
}

fn doctype_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)<!doctype[^>]*>").expect("doctype regex"))
}

fn title_element_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)<title\b[^>]*>.*?</title\s*>").expect("title element regex")
    })
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
