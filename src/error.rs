use std::result;
use std::sync::PoisonError;

use thiserror::Error as ThisError;
use serenity::prelude::SerenityError;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, Clone, Eq, PartialEq, ThisError)]
pub enum Error {
    #[error("{0}")]
    SerenityError(String),
    #[error("{0}")]
    Storage(String),
    #[error("{0}")]
    Giveaway(String),
    #[error("{0}")]
    Ineligible(String),
    #[error("{0}")]
    InvalidDuration(String),
    #[error("{0}")]
    Settings(String),
}

impl From<SerenityError> for Error {
    fn from(err: SerenityError) -> Error {
        let description = err.to_string();
        Error::SerenityError(description)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Error {
        Error::Storage(format!("SQLite error: {}", err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Storage(format!("Malformed giveaway record: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Error {
        Error::Settings(err.to_string())
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Error {
        Error::Storage(format!("The storage lock was poisoned: {}", err))
    }
}
