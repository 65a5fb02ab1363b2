//! Server entry point.

use estate_server::{serve, ServerConfig};
use log::error;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("estate_server: invalid configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    let log_dir = config.log_dir.to_string_lossy().into_owned();
    if let Err(err) = estate_core::init_logging(&config.log_level, &log_dir, config.log_stderr) {
        eprintln!("estate_server: logging init failed: {err}");
        return ExitCode::FAILURE;
    }

    match serve(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=server_exit module=server status=error error={}", err);
            eprintln!("estate_server: {err}");
            ExitCode::FAILURE
        }
    }
}
