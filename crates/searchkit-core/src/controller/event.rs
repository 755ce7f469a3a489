//! Events flowing into and out of the reload controller.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Result, SyncError};
use crate::row::RowIdentity;
use crate::snapshot::FormSnapshot;

/// A user interaction with the rendered form.
///
/// Parses from `click:<id>`, `change:<name>=<value>`, `focusout:<name>` and
/// `toggle:<position>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// An element with the given id was clicked.
    Click { id: String },
    /// A control received a new value.
    Change { name: String, value: String },
    /// A control lost focus.
    FocusOut { name: String },
    /// The disclosure of the row at `position` was opened or closed.
    Toggle { position: usize },
}

impl FromStr for UiEvent {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason| SyncError::InvalidEvent {
            input: s.to_string(),
            reason,
        };
        let (kind, target) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected <kind>:<target>"))?;
        if target.is_empty() {
            return Err(invalid("missing target"));
        }
        match kind.trim().to_ascii_lowercase().as_str() {
            "click" => Ok(Self::Click {
                id: target.to_string(),
            }),
            "change" => {
                let (name, value) = target
                    .split_once('=')
                    .ok_or_else(|| invalid("expected change:<name>=<value>"))?;
                if name.is_empty() {
                    return Err(invalid("missing control name"));
                }
                Ok(Self::Change {
                    name: name.to_string(),
                    value: value.to_string(),
                })
            }
            "focusout" => Ok(Self::FocusOut {
                name: target.to_string(),
            }),
            "toggle" => target
                .trim()
                .parse()
                .map(|position| Self::Toggle { position })
                .map_err(|_| invalid("row position must be a number")),
            _ => Err(invalid("unknown event kind")),
        }
    }
}

impl fmt::Display for UiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click { id } => write!(f, "click:{id}"),
            Self::Change { name, value } => write!(f, "change:{name}={value}"),
            Self::FocusOut { name } => write!(f, "focusout:{name}"),
            Self::Toggle { position } => write!(f, "toggle:{position}"),
        }
    }
}

/// What caused a reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReloadReason {
    /// A `click` trigger with the given id.
    Click { id: String },
    /// A `change` trigger with the given control name.
    Change { name: String },
    /// Requested directly by the caller.
    Manual,
}

/// A render request handed to a [`crate::RenderClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadRequest {
    /// Sequence number; only the latest issued request is applied.
    pub sequence: u64,
    /// Render endpoint declared by the formset, if any.
    pub endpoint: Option<String>,
    /// Form payload at trigger time.
    pub snapshot: FormSnapshot,
    /// What caused the reload.
    pub reason: ReloadReason,
}

/// Emitted after every successful swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadedEvent {
    /// Sequence number of the applied request.
    pub sequence: u64,
    /// Number of rows in the new render.
    pub row_count: usize,
    /// Rows rendered open.
    pub open_rows: Vec<RowIdentity>,
}

/// Result of completing a request.
#[derive(Debug)]
pub enum ReloadOutcome {
    /// The response replaced the formset.
    Applied(ReloadedEvent),
    /// The request or the response failed; the tree is unchanged.
    Failed(SyncError),
    /// A newer request was issued after this one; the response was ignored.
    Discarded { sequence: u64, latest: u64 },
}

impl ReloadOutcome {
    /// Whether the response was swapped in.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReloadState {
    /// No request outstanding.
    #[default]
    Idle,
    /// At least one request outstanding; `latest` is the one that will apply.
    Fetching { latest: u64 },
}
