use std::fs;
use std::path::{Path, PathBuf};

use gb_api::{build_game_document, score_play, BuildOutput};
use gb_core::{GameBoxError, SegmentSet};
use gb_rules::{landing_angle, resolve_index, AdvancedScoreSettings, PlayStats, ScoreConfigTable};

use crate::{
    map_cli_config_read, map_cli_output_write, read_raw_source, read_raw_sources_from_dir,
    resolve_input_dir, resolve_input_file, resolve_path, BuildArgs, BuildDirArgs, BuildManifest,
    BuiltGame, ScoreArgs, WheelArgs, MANIFEST_FILE, MANIFEST_SCHEMA,
};

fn json_line(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

pub(crate) fn run_build(args: BuildArgs) -> Result<i32, GameBoxError> {
    let input = resolve_input_file(&args.input)?;
    let raw = read_raw_source(&input)?;
    let output = build_game_document(&raw, args.title.as_deref());

    println!("RESULT:OK");
    println!("FORMAT:{}", output.format.name());
    println!("DEGRADED:{}", output.document.is_degraded());
    println!("REPAIRS_JSON:{}", json_line(&output.repairs));
    match args.out {
        Some(out) => {
            let out = resolve_path(&out)?;
            write_output(&out, output.document.as_str())?;
            println!("OUT:{}", out.display());
        }
        None => println!("HTML_JSON:{}", json_line(&output.document.as_str())),
    }
    Ok(0)
}

pub(crate) fn run_build_dir(args: BuildDirArgs) -> Result<i32, GameBoxError> {
    let input_dir = resolve_input_dir(&args.input_dir)?;
    let out_dir = resolve_path(&args.out_dir)?;
    let sources = read_raw_sources_from_dir(&input_dir)?;

    let mut games = Vec::with_capacity(sources.len());
    for (relative, raw) in &sources {
        let output = build_game_document(raw, args.title.as_deref());
        let out = out_dir.join(output_name(relative));
        write_output(&out, output.document.as_str())?;
        games.push(built_game(relative, &out, &output));
    }

    let manifest = BuildManifest {
        schema_version: MANIFEST_SCHEMA.to_string(),
        games,
    };
    let payload = serde_json::to_string_pretty(&manifest)
        .map_err(|error| GameBoxError::new("CLI_OUTPUT_WRITE", error.to_string()))?;
    write_output(&out_dir.join(MANIFEST_FILE), &payload)?;

    println!("RESULT:OK");
    for game in &manifest.games {
        println!("BUILT_JSON:{}", json_line(game));
    }
    println!("COUNT:{}", manifest.games.len());
    Ok(0)
}

pub(crate) fn run_wheel(args: WheelArgs) -> Result<i32, GameBoxError> {
    let segments = SegmentSet::from_labels(
        args.segments
            .iter()
            .map(|label| label.trim())
            .filter(|label| !label.is_empty()),
    )?;
    let angle = match (args.angle, args.degrees) {
        (Some(angle), _) => angle,
        (None, Some(degrees)) => degrees.to_radians(),
        (None, None) => {
            return Err(GameBoxError::new(
                "CLI_WHEEL_ANGLE_MISSING",
                "Pass --angle <radians> or --degrees <degrees>.",
            ))
        }
    };

    let index = resolve_index(angle, segments.len());
    let label = segments
        .get(index)
        .map(|segment| segment.label.as_str())
        .unwrap_or_default();

    println!("RESULT:OK");
    println!("INDEX:{}", index);
    println!("SEGMENT_JSON:{}", json_line(&label));
    if let Some(target) = args.land_on {
        println!("LANDING_ANGLE:{}", landing_angle(&segments, target, args.turns)?);
    }
    Ok(0)
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<i32, GameBoxError> {
    let table = match &args.score_config {
        Some(path) => {
            let text = fs::read_to_string(resolve_path(path)?).map_err(map_cli_config_read)?;
            ScoreConfigTable::from_json(&text)?
        }
        None => ScoreConfigTable::default(),
    };
    let play = PlayStats {
        correct: args.correct,
        wrong: args.wrong,
        hints: args.hints,
        time_left: args.time_left,
        total_time: args.total_time,
    };
    let settings = (args.no_time_bonus || args.no_negative_marking).then(|| AdvancedScoreSettings {
        time_bonus: !args.no_time_bonus,
        negative_marking: !args.no_negative_marking,
        ..AdvancedScoreSettings::default()
    });
    if !table.contains(&args.game_type) {
        tracing::warn!(game_type = %args.game_type, "unknown game type; scoring as quiz");
    }

    let score = score_play(&table, &args.game_type, &play, settings.as_ref());
    println!("RESULT:OK");
    println!("GAME_TYPE:{}", args.game_type);
    println!("SCORE:{}", score);
    Ok(0)
}

/// `nested/game.txt` becomes `nested/game.html`.
pub(crate) fn output_name(relative: &str) -> PathBuf {
    Path::new(relative).with_extension("html")
}

fn built_game(relative: &str, out: &Path, output: &BuildOutput) -> BuiltGame {
    BuiltGame {
        source: relative.to_string(),
        out: out.display().to_string(),
        format: output.format.name().to_string(),
        degraded: output.document.is_degraded(),
        repairs: output.repairs.iter().map(|name| name.to_string()).collect(),
    }
}

fn write_output(path: &Path, content: &str) -> Result<(), GameBoxError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(map_cli_output_write)?;
    fs::write(path, content).map_err(map_cli_output_write)
}
