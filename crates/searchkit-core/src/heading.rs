//! Heading synthesis for collapsed rows.
//!
//! Every row header shows a one-line summary of the row's current values so a
//! collapsed row still reads as part of the query:
//!
//! ```text
//! WHERE ...
//! ... OR NOT ...
//! Age | is between | 18 -> ???
//! ```
//!
//! Synthesis never fails. Unset values render as the placeholder token.

use crate::config::SyncConfig;
use crate::row::{FilterRule, LogicGroup, Operand, Row, RowFields};

/// Separator between the two halves of a range.
const RANGE_SEPARATOR: &str = " -> ";

/// Separator between heading segments of a filter rule.
const SEGMENT_SEPARATOR: &str = " | ";

/// Builds row headings from field values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingSynthesizer {
    placeholder: String,
    quote_operands: bool,
    range_operator: String,
}

impl Default for HeadingSynthesizer {
    fn default() -> Self {
        Self::new(&SyncConfig::default())
    }
}

impl HeadingSynthesizer {
    /// Create a synthesizer using the heading options of `config`.
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            placeholder: config.placeholder.clone(),
            quote_operands: config.quote_operands,
            range_operator: config.range_operator.clone(),
        }
    }

    /// Placeholder token for unset values.
    #[must_use]
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// Summarize a row.
    #[must_use]
    pub fn summarize(&self, row: &Row) -> String {
        match &row.fields {
            RowFields::LogicGroup(group) => self.logic_heading(row.position(), group),
            RowFields::FilterRule(rule) => self.rule_heading(rule),
        }
    }

    fn logic_heading(&self, position: usize, group: &LogicGroup) -> String {
        let mut heading = if position == 0 {
            "WHERE".to_string()
        } else {
            let operator = group
                .operator
                .as_deref()
                .filter(|op| !op.is_empty())
                .map_or_else(|| self.placeholder.clone(), str::to_uppercase);
            format!("... {operator}")
        };
        heading.push_str(if group.negated { " NOT ..." } else { " ..." });
        heading
    }

    fn rule_heading(&self, rule: &FilterRule) -> String {
        [
            self.or_placeholder(&rule.field.label),
            self.or_placeholder(&rule.operator.label),
            self.render_operands(&rule.operator.value, &rule.operands),
        ]
        .join(SEGMENT_SEPARATOR)
    }

    /// Render the operand segment of a filter-rule heading.
    ///
    /// One operand renders as-is, two as a pair (a range for the range
    /// operator) and four as two date/time pairs forming a range.
    #[must_use]
    pub fn render_operands(&self, operator: &str, operands: &[Operand]) -> String {
        let parts: Vec<String> = operands.iter().map(|o| self.operand_text(o)).collect();
        match parts.as_slice() {
            [] => self.placeholder.clone(),
            [single] => match &operands[0] {
                Operand::Value(value) if self.quote_operands && !value.is_empty() => {
                    format!("\"{single}\"")
                }
                _ => single.clone(),
            },
            [start, end] => {
                let separator = if operator == self.range_operator {
                    RANGE_SEPARATOR
                } else {
                    " "
                };
                format!("{start}{separator}{end}")
            }
            [start_date, start_time, end_date, end_time] => {
                format!("{start_date} {start_time}{RANGE_SEPARATOR}{end_date} {end_time}")
            }
            other => other.join(" "),
        }
    }

    fn operand_text(&self, operand: &Operand) -> String {
        match operand {
            Operand::Value(value) => self.or_placeholder(value),
            Operand::Selection(values) if values.is_empty() => self.placeholder.clone(),
            Operand::Selection(values) => values.join(", "),
        }
    }

    fn or_placeholder(&self, value: &str) -> String {
        if value.is_empty() {
            self.placeholder.clone()
        } else {
            value.to_string()
        }
    }
}
