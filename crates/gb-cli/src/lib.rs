use std::ffi::OsString;

use clap::Parser;
use gb_core::GameBoxError;

mod cli_args;
mod commands;
mod error_map;
mod logging;
mod models;
mod source_loader;

pub(crate) use cli_args::{BuildArgs, BuildDirArgs, Cli, Command, ScoreArgs, WheelArgs};
pub(crate) use error_map::{
    emit_error, map_cli_config_read, map_cli_output_write, map_cli_source_path,
    map_cli_source_read, map_cli_source_scan,
};
pub use logging::init_tracing;
pub(crate) use models::{BuildManifest, BuiltGame, MANIFEST_FILE, MANIFEST_SCHEMA};
pub(crate) use source_loader::{
    read_raw_source, read_raw_sources_from_dir, resolve_input_dir, resolve_input_file,
    resolve_path,
};
#[cfg(test)]
pub(crate) use source_loader::is_raw_source;

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            // Also reached for --help and --version.
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, GameBoxError> {
    match cli.command {
        Command::Build(args) => commands::run_build(args),
        Command::BuildDir(args) => commands::run_build_dir(args),
        Command::Wheel(args) => commands::run_wheel(args),
        Command::Score(args) => commands::run_score(args),
    }
}

#[cfg(test)]
mod tests;
