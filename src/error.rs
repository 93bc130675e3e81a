use rst_reader::RstError;
use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum CodemlpError {
    String(String),
    Io(std::io::Error),
    Serde(serde_json::Error),
    Csv(csv::Error),
    Parse { path: String, source: RstError },
    ReplicateMismatch(String),
}

impl Error for CodemlpError {}

impl fmt::Display for CodemlpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Io(e) => write!(f, "{e}"),
            Self::Serde(e) => write!(f, "{e}"),
            Self::Csv(e) => write!(f, "{e}"),
            Self::Parse { path, source } => write!(f, "{path}: {source}"),
            Self::ReplicateMismatch(s) => write!(f, "Replicates disagree: {s}"),
        }
    }
}

impl From<String> for CodemlpError {
    fn from(err: String) -> Self {
        CodemlpError::String(err)
    }
}

impl From<std::io::Error> for CodemlpError {
    fn from(err: std::io::Error) -> Self {
        CodemlpError::Io(err)
    }
}

impl From<serde_json::Error> for CodemlpError {
    fn from(err: serde_json::Error) -> Self {
        CodemlpError::Serde(err)
    }
}

impl From<csv::Error> for CodemlpError {
    fn from(err: csv::Error) -> Self {
        CodemlpError::Csv(err)
    }
}

pub type Result<T> = std::result::Result<T, CodemlpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_keeps_context() {
        let err = CodemlpError::Parse {
            path: "run7/rst".to_string(),
            source: RstError::DuplicateModel { model: 2, line: 40 },
        };
        assert_eq!(err.to_string(), "run7/rst: model 2 already parsed");

        let err: CodemlpError = "plain message".to_string().into();
        assert_eq!(err.to_string(), "plain message");
    }
}
