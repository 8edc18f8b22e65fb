use reqwest::StatusCode;
use thiserror::Error;

pub type Maybe<T> = Result<T, Error>;

/// Everything a user-triggered action can end in besides success.
///
/// The `Display` text is what ends up in the status line, so keep it
/// short and readable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Required client-side input was missing or blank. No request was sent.
    #[error("{message}")]
    Validation { field: &'static str, message: String },
    /// The page address had no `token` value. No request was sent.
    #[error("{message}")]
    MissingToken { message: String },
    /// The backend answered, but with a failure status or a rejecting payload.
    #[error("{message}")]
    Remote { status: Option<u16>, message: String },
    /// The backend could not be reached or its reply could not be decoded.
    #[error("{message}")]
    Transport { kind: &'static str, message: String },
}

impl Error {
    pub fn validation<S: Into<String>>(field: &'static str, msg: S) -> Error {
        Error::Validation {
            field,
            message: msg.into(),
        }
    }

    pub fn missing_token<S: Into<String>>(msg: S) -> Error {
        Error::MissingToken {
            message: msg.into(),
        }
    }

    pub fn remote<S: Into<String>>(msg: S) -> Error {
        Error::Remote {
            status: None,
            message: msg.into(),
        }
    }

    /// A non-2xx answer. The message is the one shown to the teacher.
    pub fn status(code: StatusCode, msg: &str) -> Error {
        Error::Remote {
            status: Some(code.as_u16()),
            message: format!("{}: {}", msg, code.as_u16()),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_decode() {
            "DecodeError"
        } else if err.is_builder() {
            "RequestError"
        } else {
            "ConnectionError"
        };
        Self::Transport {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Transport {
            kind: "DecodeError",
            message: err.to_string(),
        }
    }
}
