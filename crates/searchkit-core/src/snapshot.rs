//! Serialized form payload sent with a reload request.

use serde::Serialize;

use crate::dom::{self, Element};

/// Name/value pairs of every submitting control of a form, in document order.
///
/// Taken at the moment a reload is triggered and discarded once the request
/// completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormSnapshot {
    pairs: Vec<(String, String)>,
}

impl FormSnapshot {
    /// Serialize the controls below `form` the way a browser builds form data.
    #[must_use]
    pub fn capture(form: &Element) -> Self {
        let pairs = form
            .find_all(dom::is_form_control)
            .into_iter()
            .flat_map(|control| {
                let name = control.attr("name").unwrap_or_default().to_string();
                dom::control_values(control)
                    .into_iter()
                    .map(move |value| (name.clone(), value))
            })
            .collect();
        Self { pairs }
    }

    /// Pairs in document order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// First value submitted under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every value submitted under `name`.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the form submits nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
