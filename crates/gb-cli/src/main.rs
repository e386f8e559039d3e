fn main() {
    gb_cli::init_tracing();
    std::process::exit(gb_cli::run_cli_from_args(std::env::args_os()));
}
