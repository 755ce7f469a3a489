//! Error types for formset synchronization.
//!
//! Transport failures are recoverable: the controller logs them and leaves the
//! tree untouched. Structural errors mean the rendered markup does not honour
//! the row contract and are reported rather than patched over.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while mounting, reloading or configuring a formset.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    /// Configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`crate::SyncConfig`].
    #[error("failed to parse config file {path}: {source}")]
    Config {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// Markup could not be tokenized.
    #[error("invalid HTML: {0}")]
    Html(#[from] quick_xml::Error),

    /// A response fragment contained no element.
    #[error("fragment contains no element")]
    EmptyFragment,

    /// The page has no element carrying the formset id.
    #[error("formset element #{id} not found")]
    MissingFormset {
        /// Expected element id.
        id: String,
    },

    /// The fragment root is not the formset element.
    #[error("fragment root must be #{expected}, found {found}")]
    UnexpectedFragmentRoot {
        /// Expected element id.
        expected: String,
        /// Description of the element that was found.
        found: String,
    },

    /// A row lacks an element the row contract requires.
    #[error("row {position} has no {element} element")]
    MissingStructure {
        /// Row position within the formset.
        position: usize,
        /// Name of the missing element.
        element: &'static str,
    },

    /// A row carries neither the logic-group nor the filter-rule class.
    #[error("row {position} is neither a logic group nor a filter rule")]
    UnknownRowKind {
        /// Row position within the formset.
        position: usize,
    },

    /// A UI event targeted an element that does not exist.
    #[error("no element matches {selector}")]
    UnknownElement {
        /// Selector-like description of the target.
        selector: String,
    },

    /// A UI event targeted a row position that does not exist.
    #[error("row {position} does not exist (formset has {count} rows)")]
    RowOutOfRange {
        /// Requested position.
        position: usize,
        /// Number of rendered rows.
        count: usize,
    },

    /// The form carries no `*TOTAL_FORMS` management input.
    #[error("form has no TOTAL_FORMS management input")]
    MissingManagementForm,

    /// A UI event string could not be parsed.
    #[error("invalid event '{input}': {reason}")]
    InvalidEvent {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A row identity string could not be parsed.
    #[error("invalid row id '{0}'")]
    InvalidRowId(String),

    /// The formset carries no `data-url` render endpoint.
    #[error("formset has no render endpoint (data-url)")]
    MissingEndpoint,

    /// The render endpoint URL could not be built.
    #[error("invalid render URL: {0}")]
    InvalidUrl(String),

    /// Network request failed.
    #[error("network error: {0}")]
    Network(String),

    /// The render endpoint answered with a non-success status.
    #[error("render endpoint returned HTTP {status}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
    },

    /// A recorded response could not be loaded.
    #[error("no response available for reload {sequence}")]
    MissingResponse {
        /// Sequence number of the reload.
        sequence: u64,
    },
}

impl SyncError {
    /// Returns a user-friendly error message suitable for an operator console.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Network(_) | Self::HttpStatus { .. } | Self::MissingResponse { .. } => {
                "The filter form could not be refreshed. Repeat the last action to try again."
            }
            Self::Io { .. } | Self::Config { .. } => "The configuration file could not be loaded.",
            Self::MissingEndpoint | Self::InvalidUrl(_) => {
                "The filter form is not connected to a render endpoint."
            }
            Self::InvalidEvent { .. } | Self::UnknownElement { .. } | Self::RowOutOfRange { .. } => {
                "The requested interaction does not match the rendered form."
            }
            Self::InvalidRowId(_) => "The stored row state is malformed.",
            Self::Html(_)
            | Self::EmptyFragment
            | Self::MissingFormset { .. }
            | Self::UnexpectedFragmentRoot { .. }
            | Self::MissingStructure { .. }
            | Self::UnknownRowKind { .. }
            | Self::MissingManagementForm => "The server rendered an unexpected filter form.",
        }
    }

    /// Returns whether repeating the triggering action may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::HttpStatus { status } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::HttpStatus {
                status: status.as_u16(),
            },
            None => Self::Network(err.to_string()),
        }
    }
}

/// Result type alias for synchronization operations.
pub type Result<T> = std::result::Result<T, SyncError>;
