use gb_core::{AssembledDocument, ContentParts, SourceFormat};

use crate::assemble::assemble;
use crate::bridge::inject_bridge;
use crate::repair::{repair_fragment, repair_script, repair_with_report};
use crate::split::{detect_format, split_as, unwrap_response_envelope};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub title: Option<String>,
}

impl BuildOptions {
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub document: AssembledDocument,
    pub format: SourceFormat,
    pub repairs: Vec<&'static str>,
}

/// Raw generated text to a bridged, sandbox-ready document.
///
/// Structured inputs (JSON, fenced blocks) are split before repair so the
/// fences survive long enough to be read; everything else is repaired as one
/// blob first. A response envelope is unwrapped before any of that.
pub fn build_document(raw: &str, options: &BuildOptions) -> BuildOutput {
    let unwrapped = unwrap_response_envelope(raw);
    if unwrapped.is_some() {
        tracing::debug!("unwrapped response envelope");
    }
    let raw = unwrapped.as_deref().unwrap_or(raw);
    let format = detect_format(raw);
    let (parts, repairs) = match format {
        SourceFormat::Json | SourceFormat::FencedBlocks => {
            let parts = split_as(raw, format);
            let report = repair_with_report(&parts.markup);
            let parts = ContentParts {
                markup: report.output,
                style: repair_fragment(&parts.style),
                script: repair_script(&parts.script),
            };
            (parts, report.applied)
        }
        SourceFormat::FullDocument | SourceFormat::Markers | SourceFormat::Markup => {
            let report = repair_with_report(raw);
            // Repair can turn a fragment into a document, so detect again.
            let mut parts = split_as(&report.output, detect_format(&report.output));
            if !parts.script.trim().is_empty() {
                parts.script = repair_script(&parts.script);
            }
            (parts, report.applied)
        }
    };

    tracing::debug!(
        format = %format,
        repairs = repairs.len(),
        "content split and repaired"
    );
    let document = inject_bridge(assemble(&parts, options.title.as_deref()));
    if document.is_degraded() {
        tracing::warn!(format = %format, "built a degraded document");
    }

    BuildOutput {
        document,
        format,
        repairs,
    }
}
