use std::fmt;
use std::io;

use snafu::prelude::*;

use super::ErrorKind;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("plist error: {source}"))]
    Plist { source: super::Error },
    #[snafu(display("plist io error: {source}"))]
    Io { source: io::Error },
}

impl From<super::Error> for Error {
    fn from(source: super::Error) -> Self {
        Self::Plist { source }
    }
}

impl serde::de::Error for Error {
    fn custom<T>(message: T) -> Self
    where
        T: fmt::Display,
    {
        Error::Plist {
            source: <super::Error as serde::de::Error>::custom(message),
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T>(message: T) -> Self
    where
        T: fmt::Display,
    {
        Error::Plist {
            source: <super::Error as serde::ser::Error>::custom(message),
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Plist { source } => source.kind(),
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    pub fn to_plist(&self) -> Option<&super::Error> {
        match self {
            Self::Plist { source } => Some(source),
            Self::Io { .. } => None,
        }
    }
}
