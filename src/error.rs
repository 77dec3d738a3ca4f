use std::fmt;

#[derive(Debug)]
pub enum Error {
    InvalidInput(String),
    Zip(zip::result::ZipError),
    Pdf(String),
    Font(String),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(reason) => write!(f, "invalid input: {reason}"),
            Error::Zip(e) => write!(f, "ZIP error: {e}"),
            Error::Pdf(e) => write!(f, "PDF error: {e}"),
            Error::Font(e) => write!(f, "font error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Zip(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::Zip(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}
