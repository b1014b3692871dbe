use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("network error: {0}")]
    Net(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("decode error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("invalid version {input:?}: {reason}")]
    Version { input: String, reason: String },

    #[error("response is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Configuration(String),

    #[error("failed to launch {}: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("background task failed: {0}")]
    Task(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<UpdateError>,
    },
}

impl UpdateError {
    /// Stable category name reported alongside failure statuses.
    pub fn category(&self) -> &'static str {
        match self {
            UpdateError::Net(_) | UpdateError::HttpStatus { .. } => "network",
            UpdateError::Serde(_) | UpdateError::Utf8(_) | UpdateError::Version { .. } => "decode",
            UpdateError::Zip(_) => "archive",
            UpdateError::Io(_) => "io",
            UpdateError::Configuration(_) => "configuration",
            UpdateError::Launch { .. } => "launch",
            UpdateError::Task(_) => "task",
            UpdateError::Context { source, .. } => source.category(),
        }
    }

    /// Only transport failures are worth retrying; the caller owns the retry.
    pub fn is_transient(&self) -> bool {
        self.category() == "network"
    }

    /// The innermost error, skipping any context layers.
    pub fn root_cause(&self) -> &UpdateError {
        match self {
            UpdateError::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, UpdateError>;

/// Attach a context line to an error while keeping the original cause.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<UpdateError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| UpdateError::Context {
            context: context.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| UpdateError::Context {
            context: f().into(),
            source: Box::new(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn context_keeps_category_and_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Err::<(), _>(io).context("opening archive").unwrap_err();

        assert_eq!(err.category(), "io");
        assert!(err.to_string().starts_with("opening archive: "));
        assert!(matches!(err.root_cause(), UpdateError::Io(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn only_network_errors_are_transient() {
        let http = UpdateError::HttpStatus {
            url: "https://example.invalid".into(),
            status: 503,
        };
        assert!(http.is_transient());
        assert!(!UpdateError::Configuration("no updater".into()).is_transient());

        let nested = Err::<(), _>(http).context("GET manifest").unwrap_err();
        assert!(nested.is_transient());
    }

    #[test]
    fn version_errors_are_decode_errors() {
        let err = UpdateError::Version {
            input: "abc".into(),
            reason: "not a number".into(),
        };
        assert_eq!(err.category(), "decode");
    }
}
