use esp_idf_svc::sys::EspError;

#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error("WiFi error: {0}")]
    Wifi(String),

    #[error("Configuration error: {0}")]
    Config(#[from] uesp_logger_embedded::Error),

    #[error("System error: {0}")]
    System(String),
}

impl From<EspError> for LoggerError {
    fn from(err: EspError) -> Self {
        LoggerError::System(format!("ESP error: {}", err))
    }
}

pub type Result<T> = core::result::Result<T, LoggerError>;
