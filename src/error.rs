use crate::locator::DatasetLocator;
use thiserror::Error;

/// Transport-level failure while fetching a resource.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error! status: {0}")]
    Status(u16),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid resource path: {0}")]
    InvalidPath(String),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Status(404) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// A dataset could not be loaded. The column shows a diagnostic and an empty table.
#[derive(Debug, Error)]
#[error("failed to load {locator} from {path}")]
pub struct LoadError {
    pub locator: DatasetLocator,
    pub path: String,
    #[source]
    pub cause: FetchError,
}

/// A permalink fragment could not be decoded. Nothing from it is applied.
#[derive(Debug, Error)]
pub enum PermalinkError {
    #[error("permalink is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("permalink is not a valid board state: {0}")]
    Json(#[from] serde_json::Error),
    #[error("permalink column {index} has an incomplete dataset locator")]
    IncompleteColumn { index: usize },
    #[error("highlight {token:?} uses color {color}, but the palette has {palette_size} colors")]
    ColorOutOfRange {
        token: String,
        color: usize,
        palette_size: usize,
    },
}
