mod html_utils;

pub mod assemble;
pub mod bridge;
pub mod pipeline;
pub mod repair;
pub mod split;

pub use assemble::{assemble, is_full_document, BASE_STYLE_ID, VIEWPORT_CONTENT};
pub use bridge::{bridge_script, has_bridge, inject_bridge, BRIDGE_SENTINEL};
pub use pipeline::{build_document, BuildOptions, BuildOutput};
pub use repair::{
    repair, repair_fragment, repair_script, repair_with_report, RepairReport, RepairRule,
    DOCUMENT_RULES,
};
pub use split::{
    detect_format, split, split_as, split_markers, unwrap_response_envelope, SCRIPT_MARKER,
    STYLE_MARKER,
};
