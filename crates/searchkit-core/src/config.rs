//! Configuration for formset synchronization.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dom::Element;
use crate::error::{Result, SyncError};

/// Markup conventions and heading options for one formset.
///
/// Every field has a default matching the searchkit admin templates, so an
/// empty TOML file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Id of the formset element replaced on every reload.
    pub formset_id: String,

    /// Class shared by every row fieldset.
    pub row_class: String,

    /// Class marking logic-group rows.
    pub logic_class: String,

    /// Class marking filter-rule rows.
    pub rule_class: String,

    /// Class of validation error lists stripped from reload responses.
    pub error_class: String,

    /// Render endpoint used when the formset root does not declare
    /// `data-url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_url: Option<String>,

    /// Reload trigger class used when the formset root does not declare
    /// `data-reload-css-class`.
    pub reload_class: String,

    /// Event type a trigger reacts to when it has no `data-reload-handler`.
    pub default_reload_handler: String,

    /// Marker shown in headings for unset values.
    pub placeholder: String,

    /// Quote single operands in filter-rule headings.
    pub quote_operands: bool,

    /// Operator value whose two operands are joined as a range.
    pub range_operator: String,

    /// Name of a hidden input persisting open row ids across page loads.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_state_field: Option<String>,

    /// Render request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            formset_id: "searchkit_formset".to_string(),
            row_class: "searchkit".to_string(),
            logic_class: "filter-logic".to_string(),
            rule_class: "filter-rule".to_string(),
            error_class: "errorlist".to_string(),
            render_url: None,
            reload_class: "searchkit-reload".to_string(),
            default_reload_handler: "change".to_string(),
            placeholder: "???".to_string(),
            quote_operands: false,
            range_operator: "range".to_string(),
            open_state_field: None,
            request_timeout_secs: 30,
        }
    }
}

impl SyncConfig {
    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Io`] if the file cannot be read and
    /// [`SyncError::Config`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| SyncError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents).map_err(|source| SyncError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded sync config");
        Ok(config)
    }

    /// Merge the `data-url` and `data-reload-css-class` attributes of a
    /// rendered formset root. Non-empty attributes win over configured values.
    #[must_use]
    pub fn with_formset_attrs(mut self, formset: &Element) -> Self {
        if let Some(url) = formset.attr("data-url").filter(|v| !v.is_empty()) {
            self.render_url = Some(url.to_string());
        }
        if let Some(class) = formset
            .attr("data-reload-css-class")
            .filter(|v| !v.is_empty())
        {
            self.reload_class = class.to_string();
        }
        self
    }

    /// Set the name of the hidden open-state input.
    #[must_use]
    pub fn with_open_state_field(mut self, name: impl Into<String>) -> Self {
        self.open_state_field = Some(name.into());
        self
    }

    /// Enable or disable quoting of single operands.
    #[must_use]
    pub fn with_quoted_operands(mut self, enable: bool) -> Self {
        self.quote_operands = enable;
        self
    }
}
