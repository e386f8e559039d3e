use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use gb_core::GameBoxError;
use walkdir::WalkDir;

use crate::{map_cli_source_path, map_cli_source_read, map_cli_source_scan};

const RAW_SOURCE_EXTENSIONS: &[&str] = &["txt", "html", "md"];

pub(crate) fn resolve_path(raw: &str) -> Result<PathBuf, GameBoxError> {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        return Ok(path);
    }
    Ok(std::env::current_dir().map_err(map_cli_source_path)?.join(path))
}

pub(crate) fn resolve_input_file(input: &str) -> Result<PathBuf, GameBoxError> {
    let absolute = resolve_path(input)?;
    if !absolute.exists() {
        return Err(GameBoxError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("input does not exist: {}", absolute.display()),
        ));
    }
    if !absolute.is_file() {
        return Err(GameBoxError::new(
            "CLI_SOURCE_NOT_FILE",
            format!("input is not a file: {}", absolute.display()),
        ));
    }
    Ok(absolute)
}

pub(crate) fn resolve_input_dir(input_dir: &str) -> Result<PathBuf, GameBoxError> {
    let absolute = resolve_path(input_dir)?;
    if !absolute.exists() {
        return Err(GameBoxError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("input-dir does not exist: {}", absolute.display()),
        ));
    }
    if !absolute.is_dir() {
        return Err(GameBoxError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("input-dir is not a directory: {}", absolute.display()),
        ));
    }
    Ok(absolute)
}

pub(crate) fn read_raw_source(path: &Path) -> Result<String, GameBoxError> {
    fs::read_to_string(path).map_err(map_cli_source_read)
}

pub(crate) fn is_raw_source(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            RAW_SOURCE_EXTENSIONS
                .iter()
                .any(|known| extension.eq_ignore_ascii_case(known))
        })
}

/// Raw sources under `input_dir`, keyed by `/`-separated relative path.
pub(crate) fn read_raw_sources_from_dir(
    input_dir: &Path,
) -> Result<BTreeMap<String, String>, GameBoxError> {
    let mut sources = BTreeMap::new();

    for entry in WalkDir::new(input_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() || !is_raw_source(entry.path()) {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(input_dir)
            .map_err(map_cli_source_scan)?
            .to_string_lossy()
            .replace('\\', "/");
        sources.insert(relative, read_raw_source(entry.path())?);
    }

    if sources.is_empty() {
        return Err(GameBoxError::new(
            "CLI_SOURCE_EMPTY",
            format!("No .txt/.html/.md files under {}", input_dir.display()),
        ));
    }

    Ok(sources)
}
