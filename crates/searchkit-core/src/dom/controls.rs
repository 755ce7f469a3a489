//! Form control values.
//!
//! Mirrors what a browser reports for `input`, `select` and `textarea`
//! elements: the selected option of a single select falls back to the first
//! option, checkboxes only contribute when checked, and so on.

use super::Element;

/// Input types that never contribute a value to a submitted form.
const NON_SUBMITTING_INPUTS: &[&str] = &["submit", "button", "reset", "image", "file"];

/// A selected option: its submitted value and its visible label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Choice {
    /// Submitted value.
    pub value: String,
    /// Visible option text.
    pub label: String,
}

/// Whether the element is a form control (`input`, `select` or `textarea`).
pub fn is_form_control(element: &Element) -> bool {
    matches!(element.name(), "input" | "select" | "textarea")
}

/// Whether the element is a `select` accepting several options.
pub fn is_multi_select(element: &Element) -> bool {
    element.name() == "select" && element.has_attr("multiple")
}

fn input_type(element: &Element) -> String {
    element
        .attr("type")
        .unwrap_or("text")
        .to_ascii_lowercase()
}

/// Submitted value of an `<option>`: its `value` attribute, else its trimmed text.
pub fn option_value(option: &Element) -> String {
    match option.attr("value") {
        Some(value) => value.to_string(),
        None => option.text_content().trim().to_string(),
    }
}

fn options(select: &Element) -> Vec<&Element> {
    select.find_all(|e| e.name() == "option")
}

/// The effective selected option of a single `select`.
///
/// Returns `None` for selects without options.
pub fn selected_choice(select: &Element) -> Option<Choice> {
    let options = options(select);
    let option = options
        .iter()
        .find(|o| o.has_attr("selected"))
        .or_else(|| options.first())?;
    Some(Choice {
        value: option_value(option),
        label: option.text_content().trim().to_string(),
    })
}

/// Values a control contributes to a serialized form, in option order.
///
/// Disabled and unnamed controls, unchecked checkboxes and radios and
/// button-like inputs contribute nothing.
pub fn control_values(element: &Element) -> Vec<String> {
    if element.has_attr("disabled") || element.attr("name").is_none_or(str::is_empty) {
        return Vec::new();
    }
    match element.name() {
        "input" => {
            let kind = input_type(element);
            if NON_SUBMITTING_INPUTS.contains(&kind.as_str()) {
                return Vec::new();
            }
            if kind == "checkbox" || kind == "radio" {
                if !element.has_attr("checked") {
                    return Vec::new();
                }
                return vec![element.attr("value").unwrap_or("on").to_string()];
            }
            vec![element.attr("value").unwrap_or_default().to_string()]
        }
        "select" if is_multi_select(element) => options(element)
            .into_iter()
            .filter(|o| o.has_attr("selected"))
            .map(option_value)
            .collect(),
        "select" => selected_choice(element)
            .map(|choice| vec![choice.value])
            .unwrap_or_default(),
        "textarea" => vec![element.text_content()],
        _ => Vec::new(),
    }
}

/// Write a user-entered value into a control.
///
/// Multi-selects take a comma-separated list of option values. Checkboxes and
/// radios are checked for any value other than empty, `false` or `off`.
pub fn set_control_value(element: &mut Element, value: &str) {
    match element.name() {
        "input" => {
            let kind = input_type(element);
            if kind == "checkbox" || kind == "radio" {
                let checked = !matches!(value.to_ascii_lowercase().as_str(), "" | "false" | "off");
                element.set_flag("checked", checked);
            } else {
                element.set_attr("value", value);
            }
        }
        "select" => {
            let wanted: Vec<&str> = if is_multi_select(element) {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .collect()
            } else {
                vec![value]
            };
            for path in element.find_all_paths(|e| e.name() == "option") {
                if let Some(option) = element.at_mut(&path) {
                    let selected = wanted.contains(&option_value(option).as_str());
                    option.set_flag("selected", selected);
                }
            }
        }
        "textarea" => element.set_text(value),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_fragment;

    #[test]
    fn test_single_select_defaults_to_first_option() {
        let select = parse_fragment(
            r#"<select name="op"><option value="exact">is exact</option><option value="range">is between</option></select>"#,
        )
        .unwrap();
        let choice = selected_choice(&select).unwrap();
        assert_eq!(choice.value, "exact");
        assert_eq!(choice.label, "is exact");
        assert_eq!(control_values(&select), vec!["exact"]);
    }

    #[test]
    fn test_multi_select_values() {
        let mut select = parse_fragment(
            r#"<select name="v" multiple><option value="a">A</option><option value="b" selected>B</option><option value="c">C</option></select>"#,
        )
        .unwrap();
        assert_eq!(control_values(&select), vec!["b"]);
        set_control_value(&mut select, "a, c");
        assert_eq!(control_values(&select), vec!["a", "c"]);
        set_control_value(&mut select, "");
        assert!(control_values(&select).is_empty());
    }

    #[test]
    fn test_checkbox_values() {
        let mut checkbox =
            parse_fragment(r#"<input type="checkbox" name="negation">"#).unwrap();
        assert!(control_values(&checkbox).is_empty());
        set_control_value(&mut checkbox, "on");
        assert_eq!(control_values(&checkbox), vec!["on"]);
        set_control_value(&mut checkbox, "false");
        assert!(control_values(&checkbox).is_empty());
    }

    #[test]
    fn test_skipped_controls() {
        let disabled = parse_fragment(r#"<input name="a" value="1" disabled>"#).unwrap();
        let unnamed = parse_fragment(r#"<input value="1">"#).unwrap();
        let submit = parse_fragment(r#"<input type="submit" name="go" value="Go">"#).unwrap();
        assert!(control_values(&disabled).is_empty());
        assert!(control_values(&unnamed).is_empty());
        assert!(control_values(&submit).is_empty());
    }

    #[test]
    fn test_text_input_and_textarea() {
        let mut input = parse_fragment(r#"<input name="v">"#).unwrap();
        assert_eq!(control_values(&input), vec![""]);
        set_control_value(&mut input, "18");
        assert_eq!(input.attr("value"), Some("18"));

        let mut area = parse_fragment(r#"<textarea name="t">old</textarea>"#).unwrap();
        set_control_value(&mut area, "new");
        assert_eq!(control_values(&area), vec!["new"]);
    }
}
