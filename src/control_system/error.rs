use thiserror::Error;

/// Fatal problems found before the scheduler is allowed to start.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("could not read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending field, when the error is a validation failure.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ConfigError::Invalid { field, .. } => Some(field),
            _ => None,
        }
    }
}
