use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },
    #[error("failed to parse {target}: {reason}")]
    ParseFailure { target: String, reason: String },
    #[error("i/o failure on {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("notification delivery failed: {0}")]
    NetworkFailure(String),
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
}

impl ReconError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::E001NotFound,
            Self::ParseFailure { .. } => ErrorCode::E002ParseFailure,
            Self::IoFailure { .. } => ErrorCode::E003IoFailure,
            Self::NetworkFailure(_) => ErrorCode::E004NetworkFailure,
            Self::InvalidConfig(_) => ErrorCode::E005ConfigInvalid,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoFailure {
            path: path.into(),
            source,
        }
    }

    pub fn parse(target: impl Into<String>, reason: impl ToString) -> Self {
        Self::ParseFailure {
            target: target.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    E001NotFound,
    E002ParseFailure,
    E003IoFailure,
    E004NetworkFailure,
    E005ConfigInvalid,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001NotFound => "E001_NOT_FOUND",
            Self::E002ParseFailure => "E002_PARSE_FAILURE",
            Self::E003IoFailure => "E003_IO_FAILURE",
            Self::E004NetworkFailure => "E004_NETWORK_FAILURE",
            Self::E005ConfigInvalid => "E005_CONFIG_INVALID",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_variants() {
        let err = ReconError::NotFound {
            what: "registry",
            path: PathBuf::from("/tmp/registry.csv"),
        };
        assert_eq!(err.code().as_str(), "E001_NOT_FOUND");
        assert_eq!(err.to_string(), "registry not found: /tmp/registry.csv");

        let err = ReconError::parse("PC01.json", "missing device/user segments");
        assert_eq!(err.code(), ErrorCode::E002ParseFailure);
    }
}
