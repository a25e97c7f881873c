use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("not found")]
    NotFound,

    #[error("file not found")]
    FileNotFound,

    #[error("file limit reached")]
    FileLimit,

    #[error("file too large")]
    FileTooLarge,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("flag required: {0}")]
    FlagRequired(String),

    #[error("unable to parse flag: {0}")]
    FlagParse(String),

    #[error("unable to sign public file")]
    UnableToSignPublicFile,

    #[error("operation on non-owned file")]
    NotOwned,

    #[error("operation not allowed on binary file")]
    BinaryNotAllowed,

    #[error("idle timeout exceeded")]
    IdleTimeout,

    #[error("max session duration exceeded")]
    SessionExpired,

    #[error("public key is not authorized")]
    Unauthorized,

    #[error("content codec error: {0}")]
    Codec(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("ssh error: {0}")]
    Ssh(#[from] russh::Error),

    #[error("key error: {0}")]
    Key(#[from] russh::keys::Error),

    #[error("id generation failed")]
    IdGeneration,
}

impl Error {
    /// Whether the error came from something the user typed or sent, as opposed
    /// to a failure in the service itself.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Error::FileNotFound
                | Error::FileLimit
                | Error::FileTooLarge
                | Error::UnknownCommand(_)
                | Error::FlagRequired(_)
                | Error::FlagParse(_)
                | Error::UnableToSignPublicFile
                | Error::NotOwned
                | Error::BinaryNotAllowed
                | Error::IdleTimeout
                | Error::SessionExpired
                | Error::Unauthorized
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
