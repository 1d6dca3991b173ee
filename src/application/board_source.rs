// Board source trait for fetching raw records
use crate::domain::normalizer::BoardColumn;
use crate::domain::order::RawRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Why a fetch from the board failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error talking to the board API: {0}")]
    Network(String),

    #[error("board API rejected the credentials (HTTP {status})")]
    Auth { status: u16 },

    #[error("board API request failed with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("board API returned errors: {0}")]
    Api(String),

    #[error("could not decode board API response: {0}")]
    Decode(String),

    #[error("board {0} was not found")]
    BoardNotFound(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[async_trait]
pub trait BoardSource: Send + Sync {
    /// Fetch every record on the board, following pagination
    async fn fetch_records(&self, board_id: &str) -> Result<Vec<RawRecord>, FetchError>;

    /// The board's column declarations, used to resolve columns configured by title
    async fn fetch_columns(&self, _board_id: &str) -> Result<Vec<BoardColumn>, FetchError> {
        Ok(Vec::new())
    }

    /// Stable, non-reversible identifier of the credentials in use
    fn credential_fingerprint(&self) -> String;
}
