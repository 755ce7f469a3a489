//! Reload controller: event wiring, partial reloads and re-mounting.
//!
//! The controller owns the page tree. A reload happens in two halves so the
//! caller decides how the fetch is performed:
//!
//! 1. [`ReloadController::dispatch`] (or [`ReloadController::trigger`])
//!    serializes the form and returns a [`ReloadRequest`].
//! 2. [`ReloadController::complete`] takes the response for that request and
//!    swaps it in, or leaves the tree untouched on failure.
//!
//! Every request carries a sequence number. Only the most recently issued
//! request is applied; earlier responses are dropped when they arrive, in
//! whatever order that is.

mod event;

use std::fmt;

pub use event::{ReloadOutcome, ReloadReason, ReloadRequest, ReloadState, ReloadedEvent, UiEvent};

use crate::client::RenderClient;
use crate::config::SyncConfig;
use crate::dom::{self, Element, ElementPath};
use crate::error::{Result, SyncError};
use crate::heading::HeadingSynthesizer;
use crate::registry::RowRegistry;
use crate::row::{self, HEADING_TAG, LOGICAL_OPERATOR_FIELD, Row, RowIdentity};
use crate::snapshot::FormSnapshot;

/// Suffix of the formset management input holding the row count.
const TOTAL_FORMS_SUFFIX: &str = "TOTAL_FORMS";

type Listener = Box<dyn FnMut(&ReloadedEvent)>;

/// Drives one searchkit formset embedded in a page.
pub struct ReloadController {
    base_config: SyncConfig,
    config: SyncConfig,
    page: Element,
    registry: RowRegistry,
    synthesizer: HeadingSynthesizer,
    state: ReloadState,
    sequence: u64,
    /// `TOTAL_FORMS` value from before the outstanding requests changed it.
    total_forms_restore: Option<String>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for ReloadController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadController")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("state", &self.state)
            .field("sequence", &self.sequence)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl ReloadController {
    /// Mount a page containing the formset.
    ///
    /// Removes the operator control of the root logic group, restores open
    /// rows from the persisted field if one is configured and writes every
    /// heading.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingFormset`] if the page has no formset and a
    /// structural error if a row violates the row contract.
    pub fn new(page: Element, config: SyncConfig) -> Result<Self> {
        let mut controller = Self {
            synthesizer: HeadingSynthesizer::new(&config),
            base_config: config.clone(),
            config,
            page,
            registry: RowRegistry::new(),
            state: ReloadState::Idle,
            sequence: 0,
            total_forms_restore: None,
            listeners: Vec::new(),
        };
        controller.seed_persisted_state();
        let rows = controller.mount()?;
        tracing::debug!(rows = rows.len(), "mounted formset");
        Ok(controller)
    }

    /// Parse an HTML page and mount it.
    ///
    /// # Errors
    ///
    /// See [`ReloadController::new`]; also fails on unparsable markup.
    pub fn from_html(html: &str, config: SyncConfig) -> Result<Self> {
        Self::new(dom::parse_fragment(html)?, config)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The current page tree.
    #[must_use]
    pub fn page(&self) -> &Element {
        &self.page
    }

    /// Consume the controller and return the page tree.
    #[must_use]
    pub fn into_page(self) -> Element {
        self.page
    }

    /// Effective configuration, including attributes of the rendered formset.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Open-state table.
    #[must_use]
    pub fn registry(&self) -> &RowRegistry {
        &self.registry
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> ReloadState {
        self.state
    }

    /// The formset element.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingFormset`] if the page lost its formset.
    pub fn formset(&self) -> Result<&Element> {
        self.page
            .find_by_id(&self.config.formset_id)
            .ok_or_else(|| self.missing_formset())
    }

    /// Rows of the current render with their live values.
    ///
    /// # Errors
    ///
    /// Fails if the formset is missing or a row violates the row contract.
    pub fn rows(&self) -> Result<Vec<Row>> {
        row::read_rows(self.formset()?, &self.config)
    }

    /// Heading text currently rendered for each row.
    ///
    /// # Errors
    ///
    /// Fails if the formset is missing or a row violates the row contract.
    pub fn headings(&self) -> Result<Vec<(RowIdentity, String)>> {
        let formset = self.formset()?;
        let elements = formset.find_all(|e| row::is_row(e, &self.config));
        Ok(self
            .rows()?
            .into_iter()
            .zip(elements)
            .map(|(row, element)| {
                let text = element
                    .find(|e| e.name() == HEADING_TAG)
                    .map(Element::text_content)
                    .unwrap_or_default();
                (row.id, text)
            })
            .collect())
    }

    /// Subscribe to the reloaded signal. Subscriptions survive every swap.
    pub fn on_reloaded(&mut self, listener: impl FnMut(&ReloadedEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // =========================================================================
    // UI events
    // =========================================================================

    /// Apply a user interaction.
    ///
    /// Returns a request when the interaction hit a reload trigger; the caller
    /// fetches it and hands the response to [`ReloadController::complete`].
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownElement`] or [`SyncError::RowOutOfRange`]
    /// when the event does not match the rendered form.
    pub fn dispatch(&mut self, event: UiEvent) -> Result<Option<ReloadRequest>> {
        tracing::debug!(%event, "dispatching UI event");
        match event {
            UiEvent::Change { name, value } => {
                let path = self.control_path(&name)?;
                if let Some(control) = self.page.at_mut(&path) {
                    dom::set_control_value(control, &value);
                }
                self.refresh_owning_heading(&path)?;
                self.reload_if_trigger(&path, "change", ReloadReason::Change { name })
            }
            UiEvent::FocusOut { name } => {
                let path = self.control_path(&name)?;
                self.refresh_owning_heading(&path)?;
                Ok(None)
            }
            UiEvent::Click { id } => {
                let form_path = self.form_path()?;
                let relative = self
                    .page
                    .at(&form_path)
                    .and_then(|form| form.find_path(|e| e.id() == Some(id.as_str())))
                    .ok_or_else(|| SyncError::UnknownElement {
                        selector: format!("#{id}"),
                    })?;
                let path = join(&form_path, &relative);
                self.reload_if_trigger(&path, "click", ReloadReason::Click { id })
            }
            UiEvent::Toggle { position } => {
                self.toggle(position)?;
                Ok(None)
            }
        }
    }

    /// Open or close the row at `position` and return its new state.
    ///
    /// Rows without a disclosure element are left alone and report `false`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::RowOutOfRange`] for positions past the last row.
    pub fn toggle(&mut self, position: usize) -> Result<bool> {
        let row_paths = self.row_paths()?;
        let path = row_paths
            .get(position)
            .ok_or(SyncError::RowOutOfRange {
                position,
                count: row_paths.len(),
            })?
            .clone();
        let element = self.page.at(&path).ok_or_else(|| self.missing_formset())?;
        let row = Row::read(element, position, &self.config)?;
        if !row.collapsible {
            tracing::debug!(row = %row.id, "row has no disclosure element");
            return Ok(false);
        }
        let open = self.registry.toggle(row.id);
        if let Some(details) = self
            .page
            .at_mut(&path)
            .and_then(|e| e.find_mut(|d| d.name() == "details"))
        {
            details.set_flag("open", open);
        }
        self.write_persisted_state();
        Ok(open)
    }

    // =========================================================================
    // Reload cycle
    // =========================================================================

    /// Start a reload.
    ///
    /// Sets the `*TOTAL_FORMS` management input to `total_forms` when given,
    /// serializes the form and issues a new sequence number. A request that is
    /// still outstanding is not cancelled but will be discarded on completion.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingManagementForm`] if `total_forms` is given
    /// but the form has no management input.
    pub fn trigger(
        &mut self,
        reason: ReloadReason,
        total_forms: Option<u32>,
    ) -> Result<ReloadRequest> {
        let form_path = self.form_path()?;
        if let Some(total) = total_forms {
            let relative = self
                .page
                .at(&form_path)
                .and_then(|form| form.find_path(is_total_forms_input))
                .ok_or(SyncError::MissingManagementForm)?;
            let input = self
                .page
                .at_mut(&join(&form_path, &relative))
                .ok_or(SyncError::MissingManagementForm)?;
            let previous = input.attr("value").unwrap_or_default().to_string();
            input.set_attr("value", &total.to_string());
            self.total_forms_restore.get_or_insert(previous);
        }
        let form = self.page.at(&form_path).ok_or_else(|| self.missing_formset())?;
        let snapshot = FormSnapshot::capture(form);

        self.sequence += 1;
        self.state = ReloadState::Fetching {
            latest: self.sequence,
        };
        tracing::debug!(
            sequence = self.sequence,
            ?reason,
            pairs = snapshot.len(),
            "triggering formset reload"
        );
        Ok(ReloadRequest {
            sequence: self.sequence,
            endpoint: self.config.render_url.clone(),
            snapshot,
            reason,
        })
    }

    /// Finish the request with the given sequence number.
    ///
    /// Responses to superseded requests are discarded. For the latest request,
    /// a fragment that parses and honours the row contract replaces the
    /// formset; anything else is logged and leaves the tree as it was.
    pub fn complete(&mut self, sequence: u64, response: Result<String>) -> ReloadOutcome {
        let latest = match self.state {
            ReloadState::Fetching { latest } if latest == sequence => latest,
            ReloadState::Fetching { latest } => return self.discard(sequence, latest),
            ReloadState::Idle => return self.discard(sequence, self.sequence),
        };
        self.state = ReloadState::Idle;
        match response.and_then(|html| self.on_success(latest, &html)) {
            Ok(event) => ReloadOutcome::Applied(event),
            Err(error) => self.on_failure(latest, error),
        }
    }

    /// Dispatch an event and, if it triggers a reload, fetch and apply it.
    ///
    /// # Errors
    ///
    /// Only dispatch errors are returned; reload failures are reported in the
    /// outcome.
    pub fn handle(
        &mut self,
        event: UiEvent,
        client: &dyn RenderClient,
    ) -> Result<Option<ReloadOutcome>> {
        let Some(request) = self.dispatch(event)? else {
            return Ok(None);
        };
        let response = client.fetch(&request);
        Ok(Some(self.complete(request.sequence, response)))
    }

    fn discard(&self, sequence: u64, latest: u64) -> ReloadOutcome {
        tracing::warn!(sequence, latest, "discarding response to superseded reload");
        ReloadOutcome::Discarded { sequence, latest }
    }

    fn on_success(&mut self, sequence: u64, html: &str) -> Result<ReloadedEvent> {
        let mut fragment = dom::parse_fragment(html)?;
        let formset_id = self.config.formset_id.clone();
        if fragment.id() != Some(formset_id.as_str()) {
            return Err(SyncError::UnexpectedFragmentRoot {
                expected: formset_id,
                found: describe(&fragment),
            });
        }
        let error_class = self.config.error_class.clone();
        let stripped = fragment.remove_where(&|e: &Element| e.has_class(&error_class));
        // Validate before touching the live tree.
        let config = self.base_config.clone().with_formset_attrs(&fragment);
        row::read_rows(&fragment, &config)?;

        if self.page.id() == Some(formset_id.as_str()) {
            self.page = fragment;
        } else if self.page.replace_by_id(&formset_id, fragment).is_none() {
            return Err(self.missing_formset());
        }
        self.total_forms_restore = None;
        tracing::debug!(sequence, stripped, "swapped formset");

        let rows = self.mount()?;
        let event = ReloadedEvent {
            sequence,
            row_count: rows.len(),
            open_rows: self.registry.open_rows(),
        };
        for listener in &mut self.listeners {
            listener(&event);
        }
        Ok(event)
    }

    fn on_failure(&mut self, sequence: u64, error: SyncError) -> ReloadOutcome {
        tracing::error!(sequence, %error, "formset reload failed");
        if let Some(previous) = self.total_forms_restore.take() {
            let input = self
                .form_path()
                .ok()
                .and_then(|form_path| {
                    let relative = self.page.at(&form_path)?.find_path(is_total_forms_input)?;
                    Some(join(&form_path, &relative))
                })
                .and_then(|path| self.page.at_mut(&path));
            if let Some(input) = input {
                input.set_attr("value", &previous);
            }
        }
        ReloadOutcome::Failed(error)
    }

    // =========================================================================
    // Mounting
    // =========================================================================

    /// Attach to the current formset: strip the root operator, reconcile
    /// open-state, write headings and the persisted field.
    fn mount(&mut self) -> Result<Vec<Row>> {
        let config = self.base_config.clone().with_formset_attrs(self.formset()?);
        self.config = config;
        let row_paths = self.row_paths()?;

        if let Some(root) = row_paths.first().and_then(|path| self.page.at_mut(path))
            && root.has_class(&self.config.logic_class)
        {
            root.remove_where(&|e: &Element| e.has_class(LOGICAL_OPERATOR_FIELD));
        }

        let rows = self.rows()?;
        // On first mount the rendered disclosure state counts as last known.
        if self.registry.previous_row_count().is_none() {
            self.registry
                .seed_open(rows.iter().filter(|r| r.collapsible && r.open).map(|r| r.id));
        }
        let slots: Vec<_> = rows.iter().map(Row::slot).collect();
        let states = self.registry.reconcile(&slots);

        for (row, path) in rows.iter().zip(&row_paths) {
            let heading = self.synthesizer.summarize(row);
            let open = states.iter().find(|s| s.id == row.id).map(|s| s.open);
            let Some(element) = self.page.at_mut(path) else {
                continue;
            };
            if let Some(h2) = element.find_mut(|e| e.name() == HEADING_TAG) {
                h2.set_text(&heading);
            }
            if let Some(open) = open
                && let Some(details) = element.find_mut(|e| e.name() == "details")
            {
                details.set_flag("open", open);
            }
        }
        self.write_persisted_state();
        Ok(rows)
    }

    fn refresh_owning_heading(&mut self, control: &[usize]) -> Result<()> {
        let row_paths = self.row_paths()?;
        let Some(position) = row_paths.iter().rposition(|p| control.starts_with(p)) else {
            return Ok(());
        };
        let path = &row_paths[position];
        let element = self.page.at(path).ok_or_else(|| self.missing_formset())?;
        let heading = self
            .synthesizer
            .summarize(&Row::read(element, position, &self.config)?);
        if let Some(h2) = self
            .page
            .at_mut(path)
            .and_then(|e| e.find_mut(|h| h.name() == HEADING_TAG))
        {
            h2.set_text(&heading);
        }
        Ok(())
    }

    fn reload_if_trigger(
        &mut self,
        path: &[usize],
        handler: &str,
        reason: ReloadReason,
    ) -> Result<Option<ReloadRequest>> {
        let Some(element) = self.page.at(path) else {
            return Ok(None);
        };
        if !element.has_class(&self.config.reload_class) {
            return Ok(None);
        }
        let wanted = element
            .attr("data-reload-handler")
            .unwrap_or(&self.config.default_reload_handler);
        if !wanted.eq_ignore_ascii_case(handler) {
            return Ok(None);
        }
        let total_forms = match element.attr("data-total-forms") {
            Some(raw) => {
                let parsed = raw.trim().parse().ok();
                if parsed.is_none() {
                    tracing::warn!(value = raw, "ignoring non-numeric data-total-forms");
                }
                parsed
            }
            None => None,
        };
        self.trigger(reason, total_forms).map(Some)
    }

    // =========================================================================
    // Persisted open-state field
    // =========================================================================

    fn persisted_field_path(&self) -> Option<ElementPath> {
        let name = self.config.open_state_field.as_deref()?;
        let form_path = self.form_path().ok()?;
        let relative = self.page.at(&form_path)?.find_path(|e| {
            dom::is_form_control(e) && e.attr("name") == Some(name)
        });
        if relative.is_none() {
            tracing::debug!(field = name, "open-state field not rendered");
        }
        Some(join(&form_path, &relative?))
    }

    fn seed_persisted_state(&mut self) {
        let Some(path) = self.persisted_field_path() else {
            return;
        };
        let value = self
            .page
            .at(&path)
            .and_then(|e| e.attr("value"))
            .unwrap_or_default()
            .to_string();
        if let Err(error) = self.registry.seed_from_field(&value) {
            tracing::warn!(%error, "ignoring malformed open-state field");
        }
    }

    fn write_persisted_state(&mut self) {
        let value = self.registry.open_field_value();
        if let Some(field) = self
            .persisted_field_path()
            .and_then(|path| self.page.at_mut(&path))
        {
            field.set_attr("value", &value);
        }
    }

    // =========================================================================
    // Paths
    // =========================================================================

    fn missing_formset(&self) -> SyncError {
        SyncError::MissingFormset {
            id: self.config.formset_id.clone(),
        }
    }

    fn formset_path(&self) -> Result<ElementPath> {
        self.page
            .find_path(|e| e.id() == Some(self.config.formset_id.as_str()))
            .ok_or_else(|| self.missing_formset())
    }

    /// Path of the form enclosing the formset, or the page root if there is
    /// none.
    fn form_path(&self) -> Result<ElementPath> {
        let formset = self.formset_path()?;
        let form = (0..=formset.len())
            .rev()
            .map(|len| &formset[..len])
            .find(|path| self.page.at(path).is_some_and(|e| e.name() == "form"))
            .unwrap_or_default();
        Ok(form.to_vec())
    }

    fn row_paths(&self) -> Result<Vec<ElementPath>> {
        let formset_path = self.formset_path()?;
        let formset = self
            .page
            .at(&formset_path)
            .ok_or_else(|| self.missing_formset())?;
        Ok(formset
            .find_all_paths(|e| row::is_row(e, &self.config))
            .into_iter()
            .map(|relative| join(&formset_path, &relative))
            .collect())
    }

    fn control_path(&self, name: &str) -> Result<ElementPath> {
        let form_path = self.form_path()?;
        self.page
            .at(&form_path)
            .and_then(|form| {
                form.find_path(|e| dom::is_form_control(e) && e.attr("name") == Some(name))
            })
            .map(|relative| join(&form_path, &relative))
            .ok_or_else(|| SyncError::UnknownElement {
                selector: format!("[name=\"{name}\"]"),
            })
    }
}

fn is_total_forms_input(element: &Element) -> bool {
    element.name() == "input"
        && element
            .attr("name")
            .is_some_and(|name| name.ends_with(TOTAL_FORMS_SUFFIX))
}

fn join(base: &[usize], relative: &[usize]) -> ElementPath {
    base.iter().chain(relative).copied().collect()
}

fn describe(element: &Element) -> String {
    match element.id() {
        Some(id) => format!("<{} id=\"{id}\">", element.name()),
        None => format!("<{}>", element.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body><form id="changelist">
<input type="hidden" name="form-TOTAL_FORMS" value="2">
<div id="searchkit_formset" data-url="/searchkit/formset/" data-reload-css-class="reload">
<fieldset class="searchkit filter-logic"><details><summary><h2>Logic</h2></summary>
<div class="field-logical_operator"><select name="form-0-logical_operator"><option value="and">AND</option></select></div>
<div class="field-negation"><select name="form-0-negation"><option value="False">no</option><option value="True">yes</option></select></div>
</details></fieldset>
<fieldset class="searchkit filter-rule"><details><summary><h2>Rule</h2></summary>
<div class="field-field"><select name="form-1-field" class="reload"><option value="age">Age</option></select></div>
<div class="field-operator"><select name="form-1-operator"><option value="exact">is</option></select></div>
<div class="field-value"><input name="form-1-value"></div>
</details></fieldset>
</div>
<button id="add" class="reload" data-reload-handler="click" data-total-forms="3">add</button>
</form></body></html>"#;

    fn controller() -> ReloadController {
        ReloadController::from_html(PAGE, SyncConfig::default()).unwrap()
    }

    #[test]
    fn test_mount_writes_headings_and_strips_root_operator() {
        let controller = controller();
        let headings: Vec<String> = controller
            .headings()
            .unwrap()
            .into_iter()
            .map(|(_, text)| text)
            .collect();
        assert_eq!(headings, vec!["WHERE ...", "Age | is | ???"]);
        assert!(
            controller
                .page()
                .find_by_name("form-0-logical_operator")
                .is_none()
        );
        assert_eq!(controller.config().reload_class, "reload");
        assert_eq!(
            controller.config().render_url.as_deref(),
            Some("/searchkit/formset/")
        );
    }

    #[test]
    fn test_change_refreshes_heading_without_reload() {
        let mut controller = controller();
        let request = controller
            .dispatch(UiEvent::Change {
                name: "form-1-value".to_string(),
                value: "42".to_string(),
            })
            .unwrap();
        assert!(request.is_none());
        assert_eq!(controller.headings().unwrap()[1].1, "Age | is | 42");
        assert_eq!(controller.state(), ReloadState::Idle);
    }

    #[test]
    fn test_click_trigger_sets_total_forms() {
        let mut controller = controller();
        let request = controller
            .dispatch(UiEvent::Click {
                id: "add".to_string(),
            })
            .unwrap()
            .unwrap();
        assert_eq!(request.sequence, 1);
        assert_eq!(request.snapshot.get("form-TOTAL_FORMS"), Some("3"));
        assert_eq!(request.endpoint.as_deref(), Some("/searchkit/formset/"));
        assert_eq!(controller.state(), ReloadState::Fetching { latest: 1 });

        let outcome = controller.complete(1, Err(SyncError::Network("down".to_string())));
        assert!(matches!(outcome, ReloadOutcome::Failed(_)));
        assert_eq!(controller.state(), ReloadState::Idle);
        assert_eq!(
            controller
                .page()
                .find_by_name("form-TOTAL_FORMS")
                .and_then(|e| e.attr("value")),
            Some("2")
        );
    }

    #[test]
    fn test_change_trigger_reloads() {
        let mut controller = controller();
        let request = controller
            .dispatch(UiEvent::Change {
                name: "form-1-field".to_string(),
                value: "age".to_string(),
            })
            .unwrap();
        let request = request.unwrap();
        assert_eq!(
            request.reason,
            ReloadReason::Change {
                name: "form-1-field".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_targets() {
        let mut controller = controller();
        assert!(matches!(
            controller.dispatch(UiEvent::Click {
                id: "nope".to_string()
            }),
            Err(SyncError::UnknownElement { .. })
        ));
        assert!(matches!(
            controller.dispatch(UiEvent::Toggle { position: 9 }),
            Err(SyncError::RowOutOfRange {
                position: 9,
                count: 2
            })
        ));
    }

    #[test]
    fn test_toggle_flips_details() {
        let mut controller = controller();
        assert!(controller.toggle(1).unwrap());
        assert!(controller.rows().unwrap()[1].open);
        assert!(!controller.toggle(1).unwrap());
        assert!(!controller.rows().unwrap()[1].open);
    }

    #[test]
    fn test_first_mount_keeps_rendered_open_rows() {
        let html = PAGE.replacen(
            r#"filter-rule"><details>"#,
            r#"filter-rule"><details open>"#,
            1,
        );
        let controller = ReloadController::from_html(&html, SyncConfig::default()).unwrap();
        assert!(controller.rows().unwrap()[1].open);
        assert!(!controller.rows().unwrap()[0].open);
    }

    #[test]
    fn test_missing_formset() {
        let err = ReloadController::from_html("<form></form>", SyncConfig::default()).unwrap_err();
        assert!(matches!(err, SyncError::MissingFormset { .. }));
    }
}
