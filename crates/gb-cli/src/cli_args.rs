use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "gamebox")]
#[command(about = "Assemble generated game content into sandbox-ready documents")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    Build(BuildArgs),
    BuildDir(BuildDirArgs),
    Wheel(WheelArgs),
    Score(ScoreArgs),
}

#[derive(Debug, Args)]
pub(crate) struct BuildArgs {
    #[arg(long = "input")]
    pub(crate) input: String,
    #[arg(long = "title")]
    pub(crate) title: Option<String>,
    #[arg(long = "out")]
    pub(crate) out: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct BuildDirArgs {
    #[arg(long = "input-dir")]
    pub(crate) input_dir: String,
    #[arg(long = "out-dir")]
    pub(crate) out_dir: String,
    #[arg(long = "title")]
    pub(crate) title: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct WheelArgs {
    #[arg(long = "angle", allow_hyphen_values = true, conflicts_with = "degrees")]
    pub(crate) angle: Option<f64>,
    #[arg(long = "degrees", allow_hyphen_values = true)]
    pub(crate) degrees: Option<f64>,
    #[arg(long = "segments", value_delimiter = ',', required = true)]
    pub(crate) segments: Vec<String>,
    #[arg(long = "land-on")]
    pub(crate) land_on: Option<usize>,
    #[arg(long = "turns", default_value_t = 5)]
    pub(crate) turns: u32,
}

#[derive(Debug, Args)]
pub(crate) struct ScoreArgs {
    #[arg(long = "game-type", default_value = "quiz")]
    pub(crate) game_type: String,
    #[arg(long = "correct", default_value_t = 0)]
    pub(crate) correct: u32,
    #[arg(long = "wrong", default_value_t = 0)]
    pub(crate) wrong: u32,
    #[arg(long = "hints", default_value_t = 0)]
    pub(crate) hints: u32,
    #[arg(long = "time-left", default_value_t = 0.0)]
    pub(crate) time_left: f64,
    #[arg(long = "total-time", default_value_t = 1.0)]
    pub(crate) total_time: f64,
    #[arg(long = "score-config")]
    pub(crate) score_config: Option<String>,
    #[arg(long = "no-time-bonus")]
    pub(crate) no_time_bonus: bool,
    #[arg(long = "no-negative-marking")]
    pub(crate) no_negative_marking: bool,
}
