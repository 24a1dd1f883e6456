mod commands;
mod terminal;

use std::process::ExitCode;

use tracing::{error, info};

use commands::{CommandLine, resolve};
use terminal::logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let commands = match CommandLine::parse_args() {
        Ok(commands) => commands,
        Err(e) => {
            let _ = e.print();
            // Help and version output go to stdout and are not failures.
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    logging::init_logging(commands.log_level());

    match resolve::resolve(&commands).await {
        Ok(summary) => {
            info!("done, {} addresses reported", summary.completed + summary.failed_submissions);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
