use thiserror::Error;

/// Error types that can occur while driving a chat exchange.
#[derive(Error, Debug)]
pub enum ChatError {
    /// A wrapper for a generic, user-created error message.
    #[error("Generic Error: {0}")]
    Generic(String),

    /// Transport-level HTTP failures (connect errors, non-2xx statuses).
    #[error("HTTP Error: {0}")]
    Http(String),

    /// The response byte stream could not be decoded into text frames.
    #[error("Stream Decode Error: {0}")]
    StreamDecode(String),

    /// Errors related to malformed response bodies.
    #[error("Response Format Error: {message}. Raw response: '{raw_response}'")]
    ResponseFormat {
        message: String,
        raw_response: String,
    },

    /// Handles errors from parsing URLs.
    #[error("Invalid URL")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Http(err.to_string())
    }
}
