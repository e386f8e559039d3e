use super::*;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!("gamebox-rs-{}-{}", name, nanos))
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("raw")
        .join(name)
        .to_string_lossy()
        .to_string()
}

#[test]
fn resolve_input_file_validates_existence_and_kind() {
    let missing = temp_path("missing-file");
    let error = resolve_input_file(missing.to_string_lossy().as_ref())
        .expect_err("missing path should fail");
    assert_eq!(error.code, "CLI_SOURCE_NOT_FOUND");

    let dir = temp_path("a-dir");
    fs::create_dir_all(&dir).expect("dir");
    let error = resolve_input_file(dir.to_string_lossy().as_ref()).expect_err("dir should fail");
    assert_eq!(error.code, "CLI_SOURCE_NOT_FILE");

    let error = resolve_input_dir(missing.to_string_lossy().as_ref())
        .expect_err("missing dir should fail");
    assert_eq!(error.code, "CLI_SOURCE_NOT_FOUND");
    let file = temp_path("plain-file");
    write_file(&file, "x");
    let error = resolve_input_dir(file.to_string_lossy().as_ref()).expect_err("file should fail");
    assert_eq!(error.code, "CLI_SOURCE_NOT_DIR");
}

#[test]
fn read_raw_sources_filters_extensions_and_uses_relative_keys() {
    let root = temp_path("sources");
    write_file(&root.join("a.txt"), "<p>a</p>");
    write_file(&root.join("nested").join("b.MD"), "<p>b</p>");
    write_file(&root.join("nested").join("c.html"), "<p>c</p>");
    write_file(&root.join("skip.json"), "{}");

    let sources = read_raw_sources_from_dir(&root).expect("sources");
    assert_eq!(
        sources.keys().cloned().collect::<Vec<_>>(),
        vec!["a.txt", "nested/b.MD", "nested/c.html"]
    );
    assert!(is_raw_source(Path::new("x.Txt")));
    assert!(!is_raw_source(Path::new("x.json")));
    assert!(!is_raw_source(Path::new("README")));

    let empty = temp_path("empty-sources");
    fs::create_dir_all(&empty).expect("empty dir");
    let error = read_raw_sources_from_dir(&empty).expect_err("empty dir should fail");
    assert_eq!(error.code, "CLI_SOURCE_EMPTY");
}

#[test]
fn output_name_swaps_extension() {
    assert_eq!(
        commands::output_name("nested/game.txt"),
        PathBuf::from("nested/game.html")
    );
    assert_eq!(commands::output_name("page.html"), PathBuf::from("page.html"));
}

#[test]
fn build_writes_document_to_out() {
    let out = temp_path("build-out").join("game.html");
    let input = fixture("markers-memory.txt");
    let out_arg = out.to_string_lossy().to_string();
    let code = run_cli_from_args([
        "gamebox",
        "build",
        "--input",
        input.as_str(),
        "--title",
        "Memory",
        "--out",
        out_arg.as_str(),
    ]);
    assert_eq!(code, 0);

    let html = fs::read_to_string(&out).expect("output written");
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Memory</title>"));
    assert!(html.contains("__gameboxBridge"));
}

#[test]
fn build_dir_writes_every_document_and_manifest() {
    let out_dir = temp_path("build-dir-out");
    let input_dir = fixture("");
    let out_arg = out_dir.to_string_lossy().to_string();
    let code = run_cli_from_args([
        "gamebox",
        "build-dir",
        "--input-dir",
        input_dir.as_str(),
        "--out-dir",
        out_arg.as_str(),
    ]);
    assert_eq!(code, 0);

    for name in ["fenced-quiz.html", "markers-memory.html", "broken-wheel.html", "json-flashcards.html"] {
        let html = fs::read_to_string(out_dir.join(name)).expect("document written");
        assert_eq!(html.matches("data-gamebox=\"bridge\"").count(), 1, "{}", name);
    }
    let manifest: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(out_dir.join(MANIFEST_FILE)).expect("manifest written"),
    )
    .expect("manifest json");
    assert_eq!(manifest["schemaVersion"], MANIFEST_SCHEMA);
    assert_eq!(manifest["games"].as_array().map(Vec::len), Some(4));
}

#[test]
fn commands_report_errors_with_exit_code_one() {
    assert_eq!(
        run_cli_from_args(["gamebox", "build", "--input", "/definitely/missing.txt"]),
        1
    );
    assert_eq!(
        run_cli_from_args(["gamebox", "wheel", "--segments", "a,b"]),
        1
    );
    assert_eq!(
        run_cli_from_args(["gamebox", "wheel", "--angle", "1.0", "--segments", ","]),
        1
    );

    let config = temp_path("bad-config.json");
    write_file(&config, "{ not json");
    let config_arg = config.to_string_lossy().to_string();
    assert_eq!(
        run_cli_from_args(["gamebox", "score", "--score-config", config_arg.as_str()]),
        1
    );
}

#[test]
fn wheel_and_score_succeed() {
    assert_eq!(
        run_cli_from_args([
            "gamebox",
            "wheel",
            "--degrees",
            "-30",
            "--segments",
            "a,b,c",
            "--land-on",
            "2",
        ]),
        0
    );
    assert_eq!(
        run_cli_from_args([
            "gamebox",
            "score",
            "--game-type",
            "memory",
            "--correct",
            "3",
            "--no-negative-marking",
        ]),
        0
    );
}

#[test]
fn parse_errors_use_clap_exit_code() {
    assert_eq!(run_cli_from_args(["gamebox", "unknown"]), 2);
}
