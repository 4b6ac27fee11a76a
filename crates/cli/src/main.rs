use std::process::ExitCode;

fn main() -> ExitCode {
    aquabill_cli::run()
}
