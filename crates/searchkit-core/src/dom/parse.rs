//! Tolerant HTML fragment parsing.
//!
//! Server-rendered form markup is HTML, not XML: void elements are never
//! closed, boolean attributes carry no value and script bodies contain raw
//! text. The reader is configured to accept mismatched end tags and the tree
//! builder closes elements the way a browser would for these cases.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::{BytesRef, BytesStart, Event};

use super::entities::{reference_len, resolve_named, unescape};
use super::{Element, Node};
use crate::error::{Result, SyncError};

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is raw text up to the matching end tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub(super) fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub(super) fn is_raw_text(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// Parse an HTML fragment and return its first top-level element.
///
/// Leading whitespace, comments and doctype declarations are skipped. Stray
/// `&` and `<` in text are taken literally, as a browser would.
///
/// # Errors
///
/// Returns [`SyncError::EmptyFragment`] when the fragment contains no element
/// and [`SyncError::Html`] when the markup cannot be tokenized.
pub fn parse_fragment(html: &str) -> Result<Element> {
    let html = escape_stray_markup(html);
    let mut reader = Reader::from_str(&html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    // Index 0 is a synthetic container that collects top-level nodes.
    let mut stack = vec![Element::new("#fragment")];

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let element = element_from_start(&start, &reader)?;
                if is_void(element.name()) {
                    attach(&mut stack, element);
                } else if is_raw_text(element.name()) {
                    let body = reader.read_text(start.name())?;
                    attach(&mut stack, element.with_text(&body));
                } else {
                    stack.push(element);
                }
            }
            Event::Empty(start) => {
                let element = element_from_start(&start, &reader)?;
                attach(&mut stack, element);
            }
            Event::End(end) => {
                let name = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                close_until(&mut stack, &name);
            }
            Event::Text(text) => {
                let decoded = text.decode().map_err(quick_xml::Error::from)?;
                push_text(&mut stack, &decoded);
            }
            Event::CData(data) => {
                let decoded = data.decode().map_err(quick_xml::Error::from)?;
                push_text(&mut stack, &decoded);
            }
            Event::GeneralRef(reference) => {
                let resolved = resolve_reference(&reference)?;
                push_text(&mut stack, &resolved);
            }
            Event::Eof => break,
            // Comments, declarations, processing instructions and doctypes.
            _ => {}
        }
    }

    while stack.len() > 1 {
        if let Some(open) = stack.pop() {
            attach(&mut stack, open);
        }
    }

    let fragment = stack.pop().ok_or(SyncError::EmptyFragment)?;
    fragment
        .child_elements()
        .next()
        .cloned()
        .ok_or(SyncError::EmptyFragment)
}

fn element_from_start(start: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attribute in start.html_attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let raw = reader
            .decoder()
            .decode(&attribute.value)
            .map_err(quick_xml::Error::from)?;
        element.set_attr(&key, &unescape(&raw));
    }
    Ok(element)
}

fn resolve_reference(reference: &BytesRef<'_>) -> Result<String> {
    if let Some(ch) = reference
        .resolve_char_ref()
        .map_err(quick_xml::Error::from)?
    {
        return Ok(ch.to_string());
    }
    let name = reference.decode().map_err(quick_xml::Error::from)?;
    Ok(match resolve_named(&name) {
        Some(text) => text.to_string(),
        None => format!("&{name};"),
    })
}

/// Escape `&` and `<` in text positions that do not start a reference or a
/// tag, so the XML tokenizer reads them as characters.
///
/// Tags, comments and raw-text element bodies are copied unchanged.
fn escape_stray_markup(html: &str) -> Cow<'_, str> {
    if !html.contains(['&', '<']) {
        return Cow::Borrowed(html);
    }
    let mut out = String::with_capacity(html.len() + 16);
    let mut rest = html;
    while let Some(at) = rest.find(['&', '<']) {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        if rest.starts_with('&') {
            match reference_len(rest) {
                Some(len) => {
                    out.push_str(&rest[..len]);
                    rest = &rest[len..];
                }
                None => {
                    out.push_str("&amp;");
                    rest = &rest[1..];
                }
            }
            continue;
        }
        let markup = markup_len(rest);
        if markup == 0 {
            out.push_str("&lt;");
            rest = &rest[1..];
            continue;
        }
        let (tag, after) = rest.split_at(markup);
        out.push_str(tag);
        rest = after;
        if let Some(name) = raw_text_start(tag) {
            let body = raw_text_len(rest, name);
            out.push_str(&rest[..body]);
            rest = &rest[body..];
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Length of the tag, comment or declaration at the start of `text` (which
/// begins with `<`), or 0 if the `<` is a plain character.
fn markup_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let Some(&next) = bytes.get(1) else {
        return 0;
    };
    if text.starts_with("<!--") {
        return text.find("-->").map_or(text.len(), |end| end + 3);
    }
    if text.starts_with("<![CDATA[") {
        return text.find("]]>").map_or(text.len(), |end| end + 3);
    }
    let is_end_tag = next == b'/' && bytes.get(2).is_some_and(u8::is_ascii_alphabetic);
    if !(next.is_ascii_alphabetic() || is_end_tag || next == b'!' || next == b'?') {
        return 0;
    }
    let mut quote = None;
    for (index, &byte) in bytes.iter().enumerate().skip(1) {
        match (quote, byte) {
            (Some(open), b) if b == open => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(byte),
            (None, b'>') => return index + 1,
            (None, _) => {}
        }
    }
    text.len()
}

/// Name of the raw-text element opened by `tag`, if any.
fn raw_text_start(tag: &str) -> Option<&'static str> {
    let body = tag.strip_prefix('<')?;
    if tag.ends_with("/>") {
        return None;
    }
    let end = body
        .find(|c: char| c.is_ascii_whitespace() || c == '>' || c == '/')
        .unwrap_or(body.len());
    let name = &body[..end];
    RAW_TEXT_ELEMENTS
        .iter()
        .copied()
        .find(|raw| raw.eq_ignore_ascii_case(name))
}

/// Length of a raw-text body up to (not including) its end tag.
fn raw_text_len(text: &str, name: &str) -> usize {
    let closing = format!("</{name}");
    text.to_ascii_lowercase().find(&closing).unwrap_or(text.len())
}

fn attach(stack: &mut [Element], element: Element) {
    if let Some(parent) = stack.last_mut() {
        parent.push(Node::Element(element));
    }
}

fn push_text(stack: &mut [Element], text: &str) {
    if text.is_empty() {
        return;
    }
    let Some(parent) = stack.last_mut() else {
        return;
    };
    // Entity references arrive as separate events; merge adjacent text.
    if let Some(Node::Text(previous)) = parent.children.last_mut() {
        previous.push_str(text);
    } else {
        parent.push(Node::Text(text.to_string()));
    }
}

/// Close open elements down to the nearest one named `name`.
///
/// End tags without a matching open element are ignored.
fn close_until(stack: &mut Vec<Element>, name: &str) {
    let Some(index) = stack.iter().skip(1).rposition(|e| e.name() == name) else {
        return;
    };
    let target = index + 1;
    while stack.len() > target {
        if let Some(open) = stack.pop() {
            attach(stack, open);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_first_element() {
        let root = parse_fragment("\n  <div id=\"a\"><span>x</span></div><p>ignored</p>").unwrap();
        assert_eq!(root.id(), Some("a"));
        assert_eq!(root.text_content(), "x");
    }

    #[test]
    fn test_void_elements_are_closed() {
        let root = parse_fragment(
            r#"<form><input type="text" name="a" value="1"><input name="b"></form>"#,
        )
        .unwrap();
        let inputs: Vec<_> = root.child_elements().collect();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].attr("value"), Some("1"));
        assert_eq!(inputs[1].attr("name"), Some("b"));
    }

    #[test]
    fn test_boolean_attributes() {
        let root = parse_fragment(
            r#"<select multiple><option value="a" selected>A</option><option value="b">B</option></select>"#,
        )
        .unwrap();
        assert!(root.has_attr("multiple"));
        let selected = root.find(|e| e.name() == "option" && e.has_attr("selected"));
        assert_eq!(selected.and_then(|e| e.attr("value")), Some("a"));
    }

    #[test]
    fn test_entities_are_resolved() {
        let root = parse_fragment("<h2>a &amp; b &lt;c&gt; &#65;&nbsp;</h2>").unwrap();
        assert_eq!(root.text_content(), "a & b <c> A\u{a0}");
    }

    #[test]
    fn test_unmatched_end_tags_are_tolerated() {
        let root = parse_fragment("<div><p>one</span></p><p>two</div>").unwrap();
        let paragraphs = root.find_all(|e| e.name() == "p");
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[1].text_content(), "two");
    }

    #[test]
    fn test_script_body_is_raw_text() {
        let root = parse_fragment("<div><script>if (a < b && c) {}</script><b>x</b></div>").unwrap();
        let script = root.find(|e| e.name() == "script").unwrap();
        assert_eq!(script.text_content(), "if (a < b && c) {}");
        assert!(root.find(|e| e.name() == "b").is_some());
    }

    #[test]
    fn test_bare_ampersand_is_text() {
        let root = parse_fragment("<div><h2>Tom & Jerry</h2><p>&copy 2024</p></div>").unwrap();
        let heading = root.find(|e| e.name() == "h2").unwrap();
        assert_eq!(heading.text_content(), "Tom & Jerry");
        assert_eq!(
            root.to_html(),
            "<div><h2>Tom &amp; Jerry</h2><p>&amp;copy 2024</p></div>"
        );
    }

    #[test]
    fn test_bare_less_than_is_text() {
        let root = parse_fragment("<div><p>a < b</p><span>x</span></div>").unwrap();
        let children: Vec<_> = root.child_elements().map(Element::name).collect();
        assert_eq!(children, vec!["p", "span"]);
        assert_eq!(root.to_html(), "<div><p>a &lt; b</p><span>x</span></div>");
    }

    #[test]
    fn test_html_named_entities_survive_rewrite() {
        let root = parse_fragment(
            r#"<div class="breadcrumbs" title="Home &rsaquo; Search"><a href="/?a=1&b=2">Home</a> &rsaquo; Search &hellip;</div>"#,
        )
        .unwrap();
        assert_eq!(root.attr("title"), Some("Home \u{203a} Search"));
        assert_eq!(root.find(|e| e.name() == "a").and_then(|a| a.attr("href")), Some("/?a=1&b=2"));
        assert_eq!(root.text_content(), "Home \u{203a} Search \u{2026}");
        let html = root.to_html();
        assert!(!html.contains("&amp;rsaquo;"));
        assert_eq!(parse_fragment(&html).unwrap(), root);
    }

    #[test]
    fn test_raw_text_is_not_escaped() {
        let root = parse_fragment("<div><style>a > b { }</style><script>x = a < b & c;</script></div>").unwrap();
        let script = root.find(|e| e.name() == "script").unwrap();
        assert_eq!(script.text_content(), "x = a < b & c;");
    }

    #[test]
    fn test_empty_fragment() {
        assert!(matches!(
            parse_fragment("  <!-- nothing -->  "),
            Err(SyncError::EmptyFragment)
        ));
    }
}
