use std::process::ExitCode;
use walk_compiler::{Settings, run, setup_logging};

fn main() -> ExitCode {
    let settings = Settings::from_cli();
    setup_logging();

    match run(&settings) {
        Ok(report) => report.exit_code(),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
