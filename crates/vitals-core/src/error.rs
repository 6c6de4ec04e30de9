use thiserror::Error;

#[derive(Error, Debug)]
pub enum VitalsError {
    /// The remote service answered with a non-success status.
    #[error("{message}")]
    Remote { status: u16, message: String },

    /// The request never produced a response (connection refused, timeout, …).
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl VitalsError {
    /// Message suitable for showing to the user.
    ///
    /// Remote rejections already carry a normalized message (server detail or
    /// the operation's generic default). Anything else falls back to
    /// `default` so the UI never renders raw transport internals.
    pub fn user_message(&self, default: &str) -> String {
        match self {
            VitalsError::Remote { message, .. } if !message.is_empty() => message.clone(),
            VitalsError::NotAuthenticated => self.to_string(),
            _ => default.to_string(),
        }
    }

    /// HTTP status of a remote rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            VitalsError::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, VitalsError>;
