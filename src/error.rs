//! Error types with fix suggestions
//!
//! Every variant can be flattened into a [`Grid`] with [`UpError::to_grid`],
//! which is how formula entry points report failures without raising.

use thiserror::Error;

use crate::envelope::ApiErrorObject;
use crate::grid::{Cell, Grid};

pub type Result<T> = std::result::Result<T, UpError>;

/// First cell of every transport/parse error grid
pub const ERROR_MARKER: &str = "ERROR";

/// Header of the grid returned when the API reports errors
pub const API_ERROR_MARKER: &str = "API Error";

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum UpError {
    #[error("Token not provided")]
    MissingToken,

    #[error("Up API returned {} error(s)", errors.len())]
    Api { errors: Vec<ApiErrorObject> },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unexpected response shape: {details}")]
    MalformedResponse { details: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Token cache error: {reason}")]
    Cache { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UpError {
    pub fn malformed(details: impl Into<String>) -> Self {
        UpError::MalformedResponse {
            details: details.into(),
        }
    }

    /// Flatten the error into the small grid a formula returns.
    ///
    /// - missing token: one directive row
    /// - API errors: `["API Error"]` then one `(status, title, detail)` row each
    /// - anything else: `["ERROR", message]`
    pub fn to_grid(&self) -> Grid {
        match self {
            UpError::MissingToken => Grid::from_rows(vec![vec![
                Cell::text(ERROR_MARKER),
                Cell::text("Token not provided"),
                Cell::text("Run `upgrid login` to set up your token"),
            ]]),
            UpError::Api { errors } => {
                let mut grid = Grid::with_header(&[API_ERROR_MARKER]);
                for error in errors {
                    grid.push(vec![
                        Cell::text(error.status.as_str()),
                        Cell::text(error.title.as_str()),
                        Cell::text(error.detail.as_str()),
                    ]);
                }
                grid
            }
            other => Grid::from_rows(vec![vec![
                Cell::text(ERROR_MARKER),
                Cell::text(other.to_string()),
            ]]),
        }
    }
}

impl FixSuggestion for UpError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            UpError::MissingToken => Some("Run `upgrid login <token>` or set UP_API_TOKEN"),
            UpError::Api { .. } => Some("Check the token is valid with `upgrid ping`"),
            UpError::Http(_) => Some("Check network connectivity and api.base_url"),
            UpError::Json(_) => Some("Check api.base_url points at the Up API"),
            UpError::Url(_) => Some("api.base_url must be an absolute URL ending in '/'"),
            UpError::MalformedResponse { .. } => None,
            UpError::InvalidArgument { .. } => Some("Run with --help to see accepted values"),
            UpError::Config { .. } => Some("Check config.toml syntax (see `upgrid config`)"),
            UpError::Cache { .. } => Some("Delete the token cache file and log in again"),
            UpError::Io(_) => Some("Check file path and permissions"),
        }
    }
}
