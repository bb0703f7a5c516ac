use sitewarden_scanner::ScanError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Unknown report '{0}'")]
    UnknownReport(String),

    #[error("No site URLs to report on")]
    NoUrls,

    #[error("Report '{report}' requires {parameter}")]
    MissingParameter {
        report: &'static str,
        parameter: &'static str,
    },

    #[error("Report '{0}' has no remediation action")]
    NoAction(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for ReportError {
    fn from(e: figment::Error) -> Self {
        ReportError::Config(Box::new(e))
    }
}
