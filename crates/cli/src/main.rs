use std::process::ExitCode;

fn main() -> ExitCode {
    staffbot_cli::run()
}
