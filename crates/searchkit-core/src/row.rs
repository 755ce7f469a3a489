//! Row model: logic groups and filter rules read from rendered fieldsets.
//!
//! Every row of the formset is a `fieldset` carrying the shared row class and
//! exactly one kind class. Rows are re-read from the tree whenever a value
//! changes and after every reload; nothing is cached between renders.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::SyncConfig;
use crate::dom::{self, Choice, Element};
use crate::error::{Result, SyncError};

/// Tag of the heading element inside a row.
pub const HEADING_TAG: &str = "h2";

/// Admin field containers (`.field-<name>`) inside row fieldsets.
pub const LOGICAL_OPERATOR_FIELD: &str = "field-logical_operator";
pub const NEGATION_FIELD: &str = "field-negation";
pub const LOOKUP_FIELD: &str = "field-field";
pub const OPERATOR_FIELD: &str = "field-operator";
pub const VALUE_FIELD: &str = "field-value";

/// Kind of a formset row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    /// AND/OR/NOT grouping node.
    LogicGroup,
    /// `field operator value(s)` predicate.
    FilterRule,
}

impl RowKind {
    /// Prefix used in rendered row ids.
    #[must_use]
    pub const fn slug(&self) -> &'static str {
        match self {
            Self::LogicGroup => "logic",
            Self::FilterRule => "rule",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::LogicGroup => "Logic group",
            Self::FilterRule => "Filter rule",
        }
    }
}

/// Identity of a row within one render: its kind and formset position.
///
/// Renders as `logic-<n>` or `rule-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RowIdentity {
    /// Row kind.
    pub kind: RowKind,
    /// Zero-based position among all rows of the formset.
    pub position: usize,
}

impl RowIdentity {
    /// Create an identity.
    #[must_use]
    pub const fn new(kind: RowKind, position: usize) -> Self {
        Self { kind, position }
    }
}

impl fmt::Display for RowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.kind.slug(), self.position)
    }
}

impl FromStr for RowIdentity {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SyncError::InvalidRowId(s.to_string());
        let (slug, position) = s.rsplit_once('-').ok_or_else(invalid)?;
        let kind = match slug {
            "logic" => RowKind::LogicGroup,
            "rule" => RowKind::FilterRule,
            _ => return Err(invalid()),
        };
        let position = position.parse().map_err(|_| invalid())?;
        Ok(Self { kind, position })
    }
}

/// Field values of a logic-group row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicGroup {
    /// Logical operator value (`and`/`or`). Always `None` for the root row.
    pub operator: Option<String>,
    /// Whether the group is negated.
    pub negated: bool,
}

/// One value control of a filter rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Text input or single select.
    Value(String),
    /// Multi-select: the selected option values.
    Selection(Vec<String>),
}

/// Field values of a filter-rule row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRule {
    /// Selected model field.
    pub field: Choice,
    /// Selected lookup operator.
    pub operator: Choice,
    /// Value controls in document order (1, 2 or 4 of them).
    pub operands: Vec<Operand>,
}

/// Kind-specific row fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFields {
    LogicGroup(LogicGroup),
    FilterRule(FilterRule),
}

/// Minimal view of a row for open-state tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSlot {
    /// Row identity.
    pub id: RowIdentity,
    /// Whether the row has a disclosure element to open and close.
    pub collapsible: bool,
}

/// A rendered row with its current field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Identity within the current render.
    pub id: RowIdentity,
    /// Whether the row has a `details`/`summary` pair.
    pub collapsible: bool,
    /// Whether the rendered `details` element is open.
    pub open: bool,
    /// Kind-specific values.
    pub fields: RowFields,
}

impl Row {
    /// Read a row from its fieldset element.
    ///
    /// Missing value controls degrade to empty values. A missing heading is a
    /// contract violation.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingStructure`] if the row has no heading and
    /// [`SyncError::UnknownRowKind`] if it carries no kind class.
    pub fn read(element: &Element, position: usize, config: &SyncConfig) -> Result<Self> {
        let kind = if element.has_class(&config.logic_class) {
            RowKind::LogicGroup
        } else if element.has_class(&config.rule_class) {
            RowKind::FilterRule
        } else {
            return Err(SyncError::UnknownRowKind { position });
        };
        if element.find(|e| e.name() == HEADING_TAG).is_none() {
            return Err(SyncError::MissingStructure {
                position,
                element: "heading",
            });
        }
        let details = element.find(|e| e.name() == "details");
        let summary = element.find(|e| e.name() == "summary");
        let fields = match kind {
            RowKind::LogicGroup => RowFields::LogicGroup(read_logic_group(element, position)),
            RowKind::FilterRule => RowFields::FilterRule(read_filter_rule(element)),
        };
        Ok(Self {
            id: RowIdentity::new(kind, position),
            collapsible: details.is_some() && summary.is_some(),
            open: details.is_some_and(|d| d.has_attr("open")),
            fields,
        })
    }

    /// Row kind.
    #[must_use]
    pub fn kind(&self) -> RowKind {
        self.id.kind
    }

    /// Position within the formset.
    #[must_use]
    pub fn position(&self) -> usize {
        self.id.position
    }

    /// Open-state tracking view of this row.
    #[must_use]
    pub fn slot(&self) -> RowSlot {
        RowSlot {
            id: self.id,
            collapsible: self.collapsible,
        }
    }
}

/// Whether the element is a row fieldset.
pub fn is_row(element: &Element, config: &SyncConfig) -> bool {
    element.name() == "fieldset" && element.has_class(&config.row_class)
}

/// Read every row of a formset in document order.
///
/// # Errors
///
/// Fails on the first row violating the row contract.
pub fn read_rows(formset: &Element, config: &SyncConfig) -> Result<Vec<Row>> {
    formset
        .find_all(|e| is_row(e, config))
        .into_iter()
        .enumerate()
        .map(|(position, element)| Row::read(element, position, config))
        .collect()
}

fn field_control<'a>(row: &'a Element, container: &str, tag: &str) -> Option<&'a Element> {
    row.find(|e| e.has_class(container))
        .and_then(|field| field.find(|e| e.name() == tag))
}

fn read_logic_group(row: &Element, position: usize) -> LogicGroup {
    // The root row is the implicit WHERE clause and has no operator.
    let operator = if position == 0 {
        None
    } else {
        field_control(row, LOGICAL_OPERATOR_FIELD, "select")
            .and_then(dom::selected_choice)
            .map(|choice| choice.value)
    };
    LogicGroup {
        operator,
        negated: read_negation(row),
    }
}

fn read_negation(row: &Element) -> bool {
    let Some(field) = row.find(|e| e.has_class(NEGATION_FIELD)) else {
        return false;
    };
    if let Some(select) = field.find(|e| e.name() == "select") {
        return dom::selected_choice(select)
            .is_some_and(|choice| choice.value.eq_ignore_ascii_case("true"));
    }
    field
        .find(|e| e.name() == "input" && e.attr("type") == Some("checkbox"))
        .is_some_and(|checkbox| checkbox.has_attr("checked"))
}

fn read_filter_rule(row: &Element) -> FilterRule {
    let choice = |container: &str| {
        field_control(row, container, "select")
            .and_then(dom::selected_choice)
            .unwrap_or_default()
    };
    let operands = row
        .find(|e| e.has_class(VALUE_FIELD))
        .map(|field| {
            field
                .find_all(is_value_control)
                .into_iter()
                .map(read_operand)
                .collect()
        })
        .unwrap_or_default();
    FilterRule {
        field: choice(LOOKUP_FIELD),
        operator: choice(OPERATOR_FIELD),
        operands,
    }
}

fn is_value_control(element: &Element) -> bool {
    match element.name() {
        "input" => !matches!(
            element.attr("type").map(str::to_ascii_lowercase).as_deref(),
            Some("hidden" | "submit" | "button")
        ),
        "select" | "textarea" => true,
        _ => false,
    }
}

fn read_operand(control: &Element) -> Operand {
    if dom::is_multi_select(control) {
        return Operand::Selection(
            control
                .find_all(|e| e.name() == "option" && e.has_attr("selected"))
                .into_iter()
                .map(dom::option_value)
                .collect(),
        );
    }
    let value = match control.name() {
        "select" => dom::selected_choice(control)
            .map(|choice| choice.value)
            .unwrap_or_default(),
        "textarea" => control.text_content(),
        _ => control.attr("value").unwrap_or_default().to_string(),
    };
    Operand::Value(value)
}
