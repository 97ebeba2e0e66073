use std::{error, fmt};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A label matcher the OpenTSDB query API can't express.
    UnsupportedMatcher,
    /// A read or write operation this storage doesn't implement.
    UnsupportedOperation,
    /// Network failure or a non-2xx reply from OpenTSDB.
    Transport,
    /// Malformed OpenTSDB response body.
    Decode,
    Canceled,
    Timeout,
    /// Bad selector, time range or configuration value.
    InvalidArgument,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ErrorKind::UnsupportedMatcher => "unsupported matcher",
            ErrorKind::UnsupportedOperation => "unsupported operation",
            ErrorKind::Transport => "transport error",
            ErrorKind::Decode => "decode error",
            ErrorKind::Canceled => "canceled",
            ErrorKind::Timeout => "timeout",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Io => "i/o error",
        };
        f.write_str(s)
    }
}

pub struct Error {
    kind: ErrorKind,
    message: String,
    source: Option<Box<dyn error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source<E>(kind: ErrorKind, message: &str, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn unsupported_matcher(message: &str) -> Self {
        Self::new(ErrorKind::UnsupportedMatcher, message)
    }

    pub fn unsupported_operation(message: &str) -> Self {
        Self::new(ErrorKind::UnsupportedOperation, message)
    }

    pub fn transport(message: &str) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    pub fn canceled() -> Self {
        Self::new(ErrorKind::Canceled, "query canceled")
    }

    pub fn timeout() -> Self {
        Self::new(ErrorKind::Timeout, "query timed out")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error({}): {}", self.kind, self)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.source {
            Some(err) => write!(f, "{}: {}", self.message, err),
            None => write!(f, "{}", self.message),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.source {
            Some(ref err) => Some(&**err),
            None => None,
        }
    }
}

// Bare messages are argument errors unless stated otherwise.
impl From<String> for Error {
    fn from(message: String) -> Self {
        Self {
            kind: ErrorKind::InvalidArgument,
            message,
            source: None,
        }
    }
}

impl From<&str> for Error {
    fn from(message: &str) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Io, "i/o failed", err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorKind::Decode, "malformed JSON", err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else {
            ErrorKind::Transport
        };
        Self::with_source(kind, "OpenTSDB request failed", err)
    }
}

impl<E: error::Error + Send + Sync + 'static> From<(&str, E)> for Error {
    fn from((message, err): (&str, E)) -> Self {
        Self::with_source(ErrorKind::InvalidArgument, message, err)
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        format!("{}", err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
