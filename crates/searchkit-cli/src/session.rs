//! Event sessions against a saved page.
//!
//! A session mounts a page, applies UI events in order and records what each
//! one did. Reloads are served by any [`RenderClient`]: recorded fragments for
//! offline replay or the HTTP client for a live endpoint.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use searchkit_core::{
    ReloadController, ReloadOutcome, ReloadRequest, RenderClient, RowKind, SyncConfig, SyncError,
    UiEvent,
};

/// Serves reload responses from `<dir>/<sequence>.html`.
///
/// Without a directory every reload fails with
/// [`SyncError::MissingResponse`].
#[derive(Debug, Clone, Default)]
pub struct FragmentDirClient {
    dir: Option<PathBuf>,
}

impl FragmentDirClient {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// File holding the response to `sequence`.
    pub fn fragment_path(&self, sequence: u64) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{sequence}.html")))
    }
}

impl RenderClient for FragmentDirClient {
    fn fetch(&self, request: &ReloadRequest) -> searchkit_core::Result<String> {
        let missing = SyncError::MissingResponse {
            sequence: request.sequence,
        };
        let Some(path) = self.fragment_path(request.sequence) else {
            return Err(missing);
        };
        debug!(path = %path.display(), "reading recorded fragment");
        fs::read_to_string(&path).map_err(|error| match error.kind() {
            ErrorKind::NotFound => missing,
            _ => SyncError::Network(format!("{}: {error}", path.display())),
        })
    }
}

/// Load the sync configuration, falling back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    match path {
        Some(path) => SyncConfig::load(path)
            .with_context(|| format!("load config {}", path.display())),
        None => Ok(SyncConfig::default()),
    }
}

/// Read and mount a saved page.
pub fn mount_page(path: &Path, config: SyncConfig) -> Result<ReloadController> {
    let html =
        fs::read_to_string(path).with_context(|| format!("read page {}", path.display()))?;
    let controller = ReloadController::from_html(&html, config)
        .with_context(|| format!("mount formset in {}", path.display()))?;
    info!(page = %path.display(), "mounted page");
    Ok(controller)
}

/// One row as reported by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowReport {
    pub id: String,
    pub kind: RowKind,
    pub collapsible: bool,
    pub open: bool,
    pub heading: String,
}

/// Rows of the mounted formset with their rendered headings.
pub fn row_reports(controller: &ReloadController) -> Result<Vec<RowReport>> {
    let rows = controller.rows().context("read rows")?;
    let headings = controller.headings().context("read headings")?;
    Ok(rows
        .into_iter()
        .zip(headings)
        .map(|(row, (_, heading))| RowReport {
            id: row.id.to_string(),
            kind: row.kind(),
            collapsible: row.collapsible,
            open: row.open,
            heading,
        })
        .collect())
}

/// What one event did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Handled without a reload.
    Local,
    /// Reload applied.
    Applied { sequence: u64, row_count: usize },
    /// Reload failed; the page is unchanged.
    Failed { message: String, retryable: bool },
    /// Response superseded by a newer request.
    Discarded { sequence: u64, latest: u64 },
}

impl StepOutcome {
    fn from_outcome(outcome: Option<ReloadOutcome>) -> Self {
        match outcome {
            None => Self::Local,
            Some(ReloadOutcome::Applied(event)) => Self::Applied {
                sequence: event.sequence,
                row_count: event.row_count,
            },
            Some(ReloadOutcome::Failed(error)) => Self::Failed {
                message: error.to_string(),
                retryable: error.is_retryable(),
            },
            Some(ReloadOutcome::Discarded { sequence, latest }) => {
                Self::Discarded { sequence, latest }
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One applied event and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub event: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Result of a whole session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionResult {
    pub steps: Vec<StepReport>,
    pub rows: Vec<RowReport>,
}

impl SessionResult {
    /// Whether any reload failed.
    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|step| step.outcome.is_failure())
    }
}

/// Apply `events` in order, fetching reloads through `client`.
///
/// Events that do not match the page abort the session; failed reloads are
/// recorded and the session continues on the unchanged page.
pub fn run_events(
    controller: &mut ReloadController,
    events: &[UiEvent],
    client: &dyn RenderClient,
) -> Result<SessionResult> {
    let mut steps = Vec::with_capacity(events.len());
    for event in events {
        let outcome = controller
            .handle(event.clone(), client)
            .with_context(|| format!("apply event {event}"))?;
        steps.push(StepReport {
            event: event.to_string(),
            outcome: StepOutcome::from_outcome(outcome),
        });
    }
    Ok(SessionResult {
        steps,
        rows: row_reports(controller)?,
    })
}

/// Write the current page to `path`.
pub fn write_page(controller: &ReloadController, path: &Path) -> Result<()> {
    fs::write(path, controller.page().to_html())
        .with_context(|| format!("write page {}", path.display()))?;
    info!(path = %path.display(), "wrote page");
    Ok(())
}
