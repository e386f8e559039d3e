//! Best-effort rewrite of known defects in generated markup and script.
//!
//! Each rule is a pure text transform that leaves already repaired text
//! untouched, so the full pass is idempotent. Rules run in list order.

use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::html_utils::{find_ci, insert_at, is_classic_inline_script, script_block_regex};

pub const ERROR_HANDLER_ATTRIBUTE: &str = "data-gamebox=\"error-handler\"";

#[derive(Clone, Copy)]
pub struct RepairRule {
    pub name: &'static str,
    pub apply: fn(&str) -> Cow<'_, str>,
}

impl std::fmt::Debug for RepairRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairRule").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub output: String,
    pub applied: Vec<&'static str>,
}

pub const DOCUMENT_RULES: &[RepairRule] = &[
    RepairRule {
        name: "strip-markdown",
        apply: strip_markdown,
    },
    RepairRule {
        name: "escaped-newlines",
        apply: normalize_escaped_newlines,
    },
    RepairRule {
        name: "function-signatures",
        apply: repair_function_signatures,
    },
    RepairRule {
        name: "template-literals",
        apply: repair_template_literals,
    },
    RepairRule {
        name: "escaped-backticks",
        apply: unescape_backticks,
    },
    RepairRule {
        name: "close-script-tags",
        apply: close_script_tags,
    },
    RepairRule {
        name: "canvas-context-guard",
        apply: guard_canvas_contexts,
    },
    RepairRule {
        name: "wrap-script-blocks",
        apply: wrap_script_blocks,
    },
    RepairRule {
        name: "element-lookup-guard",
        apply: guard_element_lookups,
    },
    RepairRule {
        name: "global-error-handler",
        apply: install_error_handler,
    },
];

pub const FRAGMENT_RULES: &[RepairRule] = &[
    RepairRule {
        name: "strip-markdown",
        apply: strip_markdown,
    },
    RepairRule {
        name: "escaped-newlines",
        apply: normalize_escaped_newlines,
    },
];

/// Rules for a bare script body with no surrounding `<script>` tag.
pub const SCRIPT_RULES: &[RepairRule] = &[
    RepairRule {
        name: "strip-fences",
        apply: strip_fences,
    },
    RepairRule {
        name: "function-signatures",
        apply: repair_function_signatures,
    },
    RepairRule {
        name: "template-literals",
        apply: repair_template_literals,
    },
    RepairRule {
        name: "escaped-backticks",
        apply: unescape_backticks,
    },
    RepairRule {
        name: "canvas-context-guard",
        apply: guard_canvas_contexts,
    },
    RepairRule {
        name: "wrap-script-body",
        apply: wrap_script_body,
    },
    RepairRule {
        name: "element-lookup-guard",
        apply: guard_element_lookups,
    },
];

/// Repairs a raw document or mixed blob. Never fails: on an internal fault the
/// input comes back unchanged.
pub fn repair(raw: &str) -> String {
    repair_with_rules(raw, DOCUMENT_RULES).output
}

pub fn repair_with_report(raw: &str) -> RepairReport {
    repair_with_rules(raw, DOCUMENT_RULES)
}

pub fn repair_fragment(raw: &str) -> String {
    repair_with_rules(raw, FRAGMENT_RULES).output
}

pub fn repair_script(raw: &str) -> String {
    repair_with_rules(raw, SCRIPT_RULES).output
}

pub fn repair_with_rules(raw: &str, rules: &[RepairRule]) -> RepairReport {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| apply_rules(raw, rules)));
    match outcome {
        Ok(report) if report.output.trim().is_empty() && !raw.trim().is_empty() => {
            tracing::warn!("repair produced empty output; keeping original content");
            unchanged(raw)
        }
        Ok(report) => report,
        Err(_) => {
            tracing::warn!("repair rule panicked; keeping original content");
            unchanged(raw)
        }
    }
}

fn unchanged(raw: &str) -> RepairReport {
    RepairReport {
        output: raw.to_string(),
        applied: Vec::new(),
    }
}

fn apply_rules(raw: &str, rules: &[RepairRule]) -> RepairReport {
    let mut current = raw.to_string();
    let mut applied = Vec::new();
    for rule in rules {
        let next = match (rule.apply)(&current) {
            Cow::Borrowed(_) => continue,
            Cow::Owned(next) => next,
        };
        if next != current {
            tracing::debug!(rule = rule.name, "repair rule applied");
            applied.push(rule.name);
            current = next;
        }
    }
    RepairReport {
        output: current,
        applied,
    }
}

fn strip_markdown(text: &str) -> Cow<'_, str> {
    let text = strip_fences(text);
    Cow::Owned(replace_outside_scripts(&text, |gap| {
        bold_regex().replace_all(gap, "${1}${2}")
    }))
}

/// Fence and quote removal only; `**` is the exponent operator in script.
fn strip_fences(text: &str) -> Cow<'_, str> {
    let text = quote_prefix_regex().replace_all(text, "");
    let text = fence_regex().replace_all(&text, "").into_owned();
    let text = backtick_run_regex().replace_all(&text, "${1}").into_owned();
    Cow::Owned(text)
}

fn replace_outside_scripts<F>(text: &str, mut replace: F) -> String
where
    F: for<'a> FnMut(&'a str) -> Cow<'a, str>,
{
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in script_block_regex().find_iter(text) {
        out.push_str(&replace(&text[last..found.start()]));
        out.push_str(found.as_str());
        last = found.end();
    }
    out.push_str(&replace(&text[last..]));
    out
}

fn normalize_escaped_newlines(text: &str) -> Cow<'_, str> {
    let escaped = text.matches("\\n").count();
    let real = text.matches('\n').count();
    if escaped == 0 || escaped <= real {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.replace("\\r\\n", "\n")
            .replace("\\n", "\n")
            .replace("\\t", "\t"),
    )
}

fn repair_function_signatures(text: &str) -> Cow<'_, str> {
    placeholder_signature_regex().replace_all(text, |caps: &Captures| {
        match known_parameter_list(&caps[1]) {
            Some(params) => format!("function {}({})", &caps[1], params),
            None => caps[0].to_string(),
        }
    })
}

/// Parameter lists for function names that generation commonly emits with a
/// `($2)` placeholder instead of real parameters.
fn known_parameter_list(name: &str) -> Option<&'static str> {
    match name {
        "drawSegment" => Some("index, color, text"),
        "getWinningSegment" => Some("finalAngle"),
        "spinWheel" | "drawWheel" => Some(""),
        _ if name.contains("ease") || name.contains("animate") => Some("t, b, c, d"),
        _ => None,
    }
}

fn repair_template_literals(text: &str) -> Cow<'_, str> {
    let rotated = rotate_interpolation_regex().replace_all(text, |caps: &Captures| {
        format!("{}`rotate(${{{}}}{})`", &caps[1], &caps[2], &caps[3])
    });
    let repaired = text_content_interpolation_regex()
        .replace_all(&rotated, |caps: &Captures| {
            format!("{}`{}${{{}}}{}`;", &caps[1], &caps[2], &caps[3], &caps[4])
        })
        .into_owned();
    if repaired == text {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(repaired)
    }
}

fn unescape_backticks(text: &str) -> Cow<'_, str> {
    if text.contains("\\`") {
        Cow::Owned(text.replace("\\`", "`"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Closes a script block left open at the end of the text. Inside a script,
/// a nested `<script` is plain text, so at most one close is ever missing.
fn close_script_tags(text: &str) -> Cow<'_, str> {
    let mut tags: Vec<(usize, bool)> = script_open_regex()
        .find_iter(text)
        .map(|found| (found.start(), true))
        .chain(
            script_close_regex()
                .find_iter(text)
                .map(|found| (found.start(), false)),
        )
        .collect();
    tags.sort_unstable();

    let ends_inside = tags.last().is_some_and(|&(_, is_open)| is_open);
    if !ends_inside {
        return Cow::Borrowed(text);
    }
    Cow::Owned(format!("{}\n</script>", text))
}

fn guard_canvas_contexts(text: &str) -> Cow<'_, str> {
    insert_guards(text, canvas_context_regex(), |caps| {
        format!(
            "\nif (!{}) {{ console.error('Canvas context not available'); return; }}",
            &caps[1]
        )
    })
}

fn guard_element_lookups(text: &str) -> Cow<'_, str> {
    insert_guards(text, element_lookup_regex(), |caps| {
        format!(
            "\nif (!{}) {{ console.error('Element #{} not found'); return; }}",
            &caps[1], &caps[2]
        )
    })
}

/// Appends a null guard after every binding matched by `regex` whose name is
/// capture 1, unless a guard already follows or an early `return` would land
/// at the top level of a script that is not going to be wrapped.
fn insert_guards<'t>(
    text: &'t str,
    regex: &Regex,
    make_guard: impl Fn(&Captures) -> String,
) -> Cow<'t, str> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0usize;
    let mut changed = false;

    for caps in regex.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = &caps[1];
        if guard_follows(&text[whole.end()..], name) || !can_return_at(text, whole.start()) {
            continue;
        }
        out.push_str(&text[last..whole.end()]);
        if !whole.as_str().ends_with(';') {
            out.push(';');
        }
        out.push_str(&make_guard(&caps));
        last = whole.end();
        changed = true;
    }

    if !changed {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[last..]);
    Cow::Owned(out)
}

fn guard_follows(rest: &str, name: &str) -> bool {
    let expected = format!("if(!{})", name);
    let compact: String = rest
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .take(expected.len())
        .collect();
    compact == expected
}

/// Whether an early `return` at `pos` would sit inside a function once the
/// repair pass is done.
fn can_return_at(text: &str, pos: usize) -> bool {
    let lower = text.to_ascii_lowercase();
    let before = &lower[..pos];
    let (block_start, block_end, wrappable_tag) = match before.rfind("<script") {
        Some(open) if before.rfind("</script").map_or(true, |close| close < open) => {
            let Some(tag_len) = lower[open..].find('>') else {
                return false;
            };
            let body_start = open + tag_len + 1;
            if body_start > pos {
                return false;
            }
            let body_end = lower[pos..]
                .find("</script")
                .map_or(text.len(), |index| pos + index);
            let tag = &text[open..body_start];
            (body_start, body_end, is_classic_inline_script(tag))
        }
        Some(_) => return false,
        None if lower.contains("<script") => return false,
        None => (0, text.len(), true),
    };

    if brace_depth(&text[block_start..pos]) > 0 {
        return true;
    }
    wrappable_tag && !has_deferral_idiom(&text[block_start..block_end])
}

fn brace_depth(code: &str) -> i64 {
    code.chars().fold(0i64, |depth, ch| match ch {
        '{' => depth + 1,
        '}' => depth - 1,
        _ => depth,
    })
}

fn has_deferral_idiom(body: &str) -> bool {
    let trimmed = body.trim_start();
    body.contains("window.onload")
        || body.contains("DOMContentLoaded")
        || trimmed.starts_with("(function")
        || trimmed.starts_with("(() =>")
        || trimmed.starts_with("(async function")
}

fn wrap_in_closure(body: &str) -> String {
    format!("\n(function() {{\n{}\n}})();\n", body.trim())
}

fn wrap_script_blocks(text: &str) -> Cow<'_, str> {
    script_block_regex().replace_all(text, |caps: &Captures| {
        let body = &caps[2];
        if !is_classic_inline_script(&caps[1]) || body.trim().is_empty() || has_deferral_idiom(body)
        {
            return caps[0].to_string();
        }
        format!("{}{}{}", &caps[1], wrap_in_closure(body), &caps[3])
    })
}

fn wrap_script_body(text: &str) -> Cow<'_, str> {
    if text.trim().is_empty() || has_deferral_idiom(text) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(wrap_in_closure(text).trim().to_string())
}

fn install_error_handler(text: &str) -> Cow<'_, str> {
    if text.contains("window.onerror") {
        return Cow::Borrowed(text);
    }
    let handler = error_handler_script();
    if let Some(index) = body_close_outside_scripts(text) {
        return Cow::Owned(insert_at(text, index, &handler));
    }
    if find_ci(text, "<script").is_some() {
        return Cow::Owned(format!("{}\n{}", text, handler));
    }
    Cow::Borrowed(text)
}

/// First `</body>` that is markup rather than text inside a script block.
fn body_close_outside_scripts(text: &str) -> Option<usize> {
    let scripts: Vec<_> = script_block_regex()
        .find_iter(text)
        .map(|found| found.range())
        .collect();
    let lower = text.to_ascii_lowercase();
    lower
        .match_indices("</body>")
        .map(|(index, _)| index)
        .find(|index| !scripts.iter().any(|range| range.contains(index)))
}

fn error_handler_script() -> String {
    format!(
        r#"<script {}>
window.onerror = function (message, source, lineno, colno, error) {{
  console.error('Game error:', {{ message: message, source: source, lineno: lineno, colno: colno, stack: error && error.stack }});
  return true;
}};
</script>
"#,
        ERROR_HANDLER_ATTRIBUTE
    )
}

fn quote_prefix_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?m)^> ").expect("quote prefix regex"))
}

fn fence_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"`{3,}[A-Za-z]*").expect("fence regex"))
}

fn backtick_run_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?m)^([ \t]*)`{2,}").expect("backtick run regex"))
}

fn bold_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(^|[^\w$)\]*])\*\*([^*\s\d](?:[^*\n]*?[^*\s])?)\*\*")
            .expect("bold regex")
    })
}

fn placeholder_signature_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"function\s+([A-Za-z_$][\w$]*)\s*\(\s*\$\d+\s*\)")
            .expect("placeholder signature regex")
    })
}

fn rotate_interpolation_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(\w+\.style\.transform\s*=\s*)rotate\(\$\{([^}]+)\}([^)]*)\)")
            .expect("rotate interpolation regex")
    })
}

fn text_content_interpolation_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r#"(\w+\.textContent\s*=\s*)([^;"`'\n]*)\$\{([^}]+)\}([^;"`'\n]*);"#)
            .expect("textContent interpolation regex")
    })
}

fn script_open_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)<script[\s>]").expect("script open regex"))
}

fn script_close_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?i)</script\s*>").expect("script close regex"))
}

fn canvas_context_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r#"(?m)(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*[\w$]+(?:\.[\w$]+|\(\s*['"][^'"]*['"]\s*\))*\.getContext\(\s*['"]2d['"]\s*\)[ \t]*(?:;|$)"#,
        )
        .expect("canvas context regex")
    })
}

fn element_lookup_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r#"(?m)const\s+([A-Za-z_$][\w$]*)\s*=\s*document\.getElementById\(\s*['"]([^'"]+)['"]\s*\)[ \t]*(?:;|$)"#,
        )
        .expect("element lookup regex")
    })
}
