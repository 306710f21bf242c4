use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use uesp_logger_mock::settings::Settings;
use uesp_logger_mock::{default_log_filter, run};

#[tokio::main]
async fn main() -> ExitCode {
    let settings = Arc::new(Settings::new().expect("Failed to load settings."));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter(&settings)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(&settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Mock InfluxDB stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}
