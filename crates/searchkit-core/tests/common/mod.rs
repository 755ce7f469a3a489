//! Markup builders and an in-memory render client shared by the integration
//! tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use searchkit_core::{ReloadRequest, RenderClient, Result, SyncError};

pub const FORMSET_URL: &str = "/searchkit/formset/";

/// Root logic group at position 0.
pub fn root_logic() -> String {
    logic_row(0, "and", false)
}

pub fn logic_row(position: usize, operator: &str, negated: bool) -> String {
    let and = if operator == "and" { " selected" } else { "" };
    let or = if operator == "or" { " selected" } else { "" };
    let (no, yes) = if negated { ("", " selected") } else { (" selected", "") };
    format!(
        r#"<fieldset class="searchkit filter-logic"><details><summary><h2>Logic</h2></summary>
<div class="field-logical_operator"><select name="form-{position}-logical_operator"><option value="and"{and}>AND</option><option value="or"{or}>OR</option></select></div>
<div class="field-negation"><select name="form-{position}-negation"><option value="False"{no}>no</option><option value="True"{yes}>yes</option></select></div>
</details></fieldset>"#
    )
}

/// Filter rule on `Age` with the `exact` operator and a single value.
pub fn rule_row(position: usize, value: &str) -> String {
    format!(
        r#"<fieldset class="searchkit filter-rule"><details><summary><h2>Rule</h2></summary>
<div class="field-field"><select name="form-{position}-field" class="searchkit-reload"><option value="age" selected>Age</option><option value="name">Name</option></select></div>
<div class="field-operator"><select name="form-{position}-operator" class="searchkit-reload"><option value="exact" selected>is</option><option value="range">is between</option></select></div>
<div class="field-value"><input type="number" name="form-{position}-value" value="{value}"></div>
</details></fieldset>"#
    )
}

/// Filter rule on `Age` with the range operator and two values.
pub fn range_row(position: usize, start: &str, end: &str) -> String {
    format!(
        r#"<fieldset class="searchkit filter-rule"><details><summary><h2>Rule</h2></summary>
<div class="field-field"><select name="form-{position}-field"><option value="age" selected>Age</option></select></div>
<div class="field-operator"><select name="form-{position}-operator"><option value="range" selected>between</option></select></div>
<div class="field-value"><input name="form-{position}-value_0" value="{start}"><input name="form-{position}-value_1" value="{end}"></div>
</details></fieldset>"#
    )
}

/// Formset with a root logic group followed by `rows - 1` filter rules.
pub fn formset(rows: usize) -> String {
    formset_from(&default_rows(rows))
}

pub fn default_rows(rows: usize) -> Vec<String> {
    (0..rows)
        .map(|position| {
            if position == 0 {
                root_logic()
            } else {
                rule_row(position, &(position * 10).to_string())
            }
        })
        .collect()
}

pub fn formset_from(rows: &[String]) -> String {
    let count = rows.len();
    format!(
        r#"<div id="searchkit_formset" data-url="{FORMSET_URL}" data-reload-css-class="searchkit-reload">
<input type="hidden" name="form-TOTAL_FORMS" value="{count}">
<input type="hidden" name="form-INITIAL_FORMS" value="0">
{rows}
<button type="button" id="add_rule" class="searchkit-reload" data-reload-handler="click" data-total-forms="{add}">Add rule</button>
<button type="button" id="remove_rule" class="searchkit-reload" data-reload-handler="click" data-total-forms="{remove}">Remove rule</button>
</div>"#,
        rows = rows.concat(),
        add = count + 1,
        remove = count.saturating_sub(1),
    )
}

/// Admin change list page embedding `formset`.
pub fn page(formset: &str) -> String {
    format!(
        r#"<html><head><title>Search</title></head><body>
<form id="searchkit_form" method="post">
<input type="hidden" name="csrfmiddlewaretoken" value="token">
<input type="hidden" name="open_rows" value="">
{formset}
<input type="submit" name="apply" value="Apply">
</form></body></html>"#
    )
}

/// Same as [`page`] with a preset persisted open-state value.
pub fn page_with_open_rows(formset: &str, open_rows: &str) -> String {
    page(formset).replace(
        r#"name="open_rows" value="""#,
        &format!(r#"name="open_rows" value="{open_rows}""#),
    )
}

/// Render client answering from a fixed table keyed by sequence number.
#[derive(Debug, Default)]
pub struct StaticClient {
    responses: BTreeMap<u64, String>,
}

impl StaticClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, sequence: u64, html: impl Into<String>) -> Self {
        self.responses.insert(sequence, html.into());
        self
    }
}

impl RenderClient for StaticClient {
    fn fetch(&self, request: &ReloadRequest) -> Result<String> {
        self.responses
            .get(&request.sequence)
            .cloned()
            .ok_or(SyncError::MissingResponse {
                sequence: request.sequence,
            })
    }
}
