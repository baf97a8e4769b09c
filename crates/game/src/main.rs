mod app;

use std::process::ExitCode;

use tracing::error;

fn main() -> ExitCode {
    match app::bootstrap::build_app() {
        Ok(wiring) => app::loop_runner::run(wiring),
        Err(err) => {
            error!(error = %err, "map_load_failed");
            ExitCode::FAILURE
        }
    }
}
