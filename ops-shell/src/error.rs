use std::fmt;

/// failure of one stage of a job
#[derive(Debug)]
pub enum Error {
    Config(String),
    Fetch(market_data::Error),
    Normalize(String),
    Write(String),
    Registry(String),
    Io(std::io::Error),
}

impl Error {
    /// stage the error belongs to, used in logs and reports
    pub fn stage(&self) -> &'static str {
        match *self {
            Error::Config(..) => "config",
            Error::Fetch(..) => "fetch",
            Error::Normalize(..) => "normalize",
            Error::Write(..) => "write",
            Error::Registry(..) => "registry",
            Error::Io(..) => "io",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Config(ref s) => write!(f, "config error: {}", s),
            Error::Fetch(ref err) => write!(f, "fetch error: {}", err),
            Error::Normalize(ref s) => write!(f, "normalize error: {}", s),
            Error::Write(ref s) => write!(f, "write error: {}", s),
            Error::Registry(ref s) => write!(f, "registry error: {}", s),
            Error::Io(ref err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Fetch(ref err) => Some(err),
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<market_data::Error> for Error {
    fn from(err: market_data::Error) -> Error {
        match err {
            market_data::Error::Normalize(s) => Error::Normalize(s),
            other => Error::Fetch(other),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Error {
        Error::Write(format!("{}", err))
    }
}

#[cfg(feature = "postgres")]
impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Error {
        Error::Write(format!("{}", err))
    }
}

#[cfg(feature = "postgres")]
impl From<diesel::ConnectionError> for Error {
    fn from(err: diesel::ConnectionError) -> Error {
        Error::Write(format!("{}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Registry(format!("{}", err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
