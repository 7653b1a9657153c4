use reqwest::header::HeaderMap;
use serde_json::Value;
use std::fmt;

/// Enum listing possible errors.
pub enum Error {
    /// server answered with non-2xx status, `body` is the raw error payload
    Http {
        status: u16,
        headers: HeaderMap,
        body: Value,
    },
    /// request could not be sent or response could not be read
    Transport(Box<dyn std::error::Error + Send + Sync>),
    /// body of successful response is not JSON, or request body can not be encoded
    Json(serde_json::Error),
    /// some invariant was broken
    LogicError(String),
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(err) => Some(err.as_ref()),
            Error::Json(err) => Some(err),
            Error::Http { .. } | Error::LogicError(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status of failed request, if server answered at all
    #[inline]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
    /// Headers of failed response, if server answered at all
    #[inline]
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Error::Http { headers, .. } => Some(headers),
            _ => None,
        }
    }
    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
    #[inline]
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Http { status, body, .. } => write!(fmt, "http error {}: {}", status, body),
            Error::Transport(err) => write!(fmt, "transport error: {}", err),
            Error::Json(err) => write!(fmt, "json error: {}", err),
            Error::LogicError(msg) => write!(fmt, "logic error: {}", msg),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Http {
                status,
                headers,
                body,
            } => write!(
                fmt,
                "Http {{ status {}, headers {:?}, body {} }}",
                status, headers, body
            ),
            Error::Transport(err) => write!(fmt, "Transport: {:?}", err),
            Error::Json(err) => write!(fmt, "Json: {:?}", err),
            Error::LogicError(msg) => write!(fmt, "LogicError: {}", msg),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
