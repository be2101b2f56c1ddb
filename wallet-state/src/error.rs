use std::fmt;

/// A boxed, type-erased cause, attached to [`Error::Database`] when the
/// underlying fault came from `sled` or from a malformed on-disk value
/// (spec §9 "Dynamic error wrapping": "model as a tagged error variant
/// `{kind, message, cause}`").
pub type BoxCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error taxonomy of spec §7, one caller-observable kind per
/// variant.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A malformed argument from the caller: an unknown balance mode, an
    /// out-of-range index, a non-P2SH script where one was required.
    #[error("invalid input: {0}")]
    Input(String),

    /// A precondition the call required was missing: an unknown
    /// outpoint, a missing script, a missing block record mid-rollback.
    #[error("required record does not exist: {0}")]
    NoExists(String),

    /// `Create` was called on an already-initialized namespace.
    #[error("store already exists")]
    AlreadyExists,

    /// A KV backend fault or on-disk corruption: iteration error,
    /// missing value expected to exist, deserialization failure.
    #[error("database error: {message}")]
    Database {
        message: String,
        #[source]
        cause: Option<BoxCause>,
    },

    /// Any call made after [`crate::Store::close`].
    #[error("store is closed")]
    IsClosed,

    /// Internal: `SpendMultisigOut` was called with a spender that
    /// doesn't match the output's existing spender.
    #[error("multisig output already spent by a different transaction")]
    DoubleSpend,
}

impl Error {
    pub(crate) fn database(message: impl fmt::Display) -> Error {
        Error::Database {
            message: message.to_string(),
            cause: None,
        }
    }

    pub(crate) fn database_with(
        message: impl fmt::Display,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Error {
        Error::Database {
            message: message.to_string(),
            cause: Some(Box::new(cause)),
        }
    }

    pub(crate) fn no_exists(message: impl fmt::Display) -> Error {
        Error::NoExists(message.to_string())
    }

    pub(crate) fn input(message: impl fmt::Display) -> Error {
        Error::Input(message.to_string())
    }
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Error {
        Error::database_with("sled operation failed", e)
    }
}
