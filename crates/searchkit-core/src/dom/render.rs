//! HTML serialization of the element tree.

use quick_xml::escape::escape;

use super::parse::{is_raw_text, is_void};
use super::{Element, Node};

impl Element {
    /// Serialize this element and its subtree as HTML.
    ///
    /// Void elements are written without an end tag and boolean attributes
    /// (empty value) without a value.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }
}

fn write_element(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(element.name());
    for (key, value) in element.attributes() {
        out.push(' ');
        out.push_str(key);
        if !value.is_empty() {
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
    }
    out.push('>');
    if is_void(element.name()) {
        return;
    }
    let raw = is_raw_text(element.name());
    for node in element.children() {
        match node {
            Node::Element(child) => write_element(child, out),
            Node::Text(text) if raw => out.push_str(text),
            Node::Text(text) => out.push_str(&escape(text.as_str())),
        }
    }
    out.push_str("</");
    out.push_str(element.name());
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_fragment;

    #[test]
    fn test_void_and_boolean_attributes() {
        let element = Element::new("details")
            .with_attr("open", "")
            .with_child(Element::new("input").with_attr("name", "a").with_attr("value", "x\"y"));
        assert_eq!(
            element.to_html(),
            r#"<details open><input name="a" value="x&quot;y"></details>"#
        );
    }

    #[test]
    fn test_text_is_escaped() {
        let element = Element::new("h2").with_text("a < b & c");
        assert_eq!(element.to_html(), "<h2>a &lt; b &amp; c</h2>");
    }

    #[test]
    fn test_reparse_preserves_tree() {
        let html = r#"<div id="searchkit_formset"><fieldset class="searchkit filter-rule"><details><summary><h2>x &amp; y</h2></summary><select name="f"><option value="1" selected>One</option></select></details></fieldset><script>a < b</script></div>"#;
        let first = parse_fragment(html).unwrap();
        let second = parse_fragment(&first.to_html()).unwrap();
        assert_eq!(first, second);
    }
}
