use serde::Serialize;

/// One built document, as listed in `build-dir`'s manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BuiltGame {
    pub(crate) source: String,
    pub(crate) out: String,
    pub(crate) format: String,
    pub(crate) degraded: bool,
    pub(crate) repairs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BuildManifest {
    pub(crate) schema_version: String,
    pub(crate) games: Vec<BuiltGame>,
}

pub(crate) const MANIFEST_SCHEMA: &str = "gamebox-manifest.v1";
pub(crate) const MANIFEST_FILE: &str = "manifest.json";
