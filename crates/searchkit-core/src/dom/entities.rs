//! HTML character references.
//!
//! The XML tokenizer only knows `amp`, `lt`, `gt`, `quot` and `apos`; Django
//! templates and admin pages use a handful of HTML named entities on top.

use std::borrow::Cow;

use quick_xml::escape::resolve_predefined_entity;

/// Named entities resolved in addition to the XML predefined ones.
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("nbsp", "\u{a0}"),
    ("ensp", "\u{2002}"),
    ("emsp", "\u{2003}"),
    ("thinsp", "\u{2009}"),
    ("zwnj", "\u{200c}"),
    ("zwj", "\u{200d}"),
    ("shy", "\u{ad}"),
    ("ndash", "\u{2013}"),
    ("mdash", "\u{2014}"),
    ("hellip", "\u{2026}"),
    ("middot", "\u{b7}"),
    ("bull", "\u{2022}"),
    ("lsaquo", "\u{2039}"),
    ("rsaquo", "\u{203a}"),
    ("laquo", "\u{ab}"),
    ("raquo", "\u{bb}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("sbquo", "\u{201a}"),
    ("ldquo", "\u{201c}"),
    ("rdquo", "\u{201d}"),
    ("bdquo", "\u{201e}"),
    ("prime", "\u{2032}"),
    ("Prime", "\u{2033}"),
    ("larr", "\u{2190}"),
    ("uarr", "\u{2191}"),
    ("rarr", "\u{2192}"),
    ("darr", "\u{2193}"),
    ("harr", "\u{2194}"),
    ("times", "\u{d7}"),
    ("divide", "\u{f7}"),
    ("plusmn", "\u{b1}"),
    ("minus", "\u{2212}"),
    ("le", "\u{2264}"),
    ("ge", "\u{2265}"),
    ("ne", "\u{2260}"),
    ("deg", "\u{b0}"),
    ("micro", "\u{b5}"),
    ("frac14", "\u{bc}"),
    ("frac12", "\u{bd}"),
    ("frac34", "\u{be}"),
    ("permil", "\u{2030}"),
    ("copy", "\u{a9}"),
    ("reg", "\u{ae}"),
    ("trade", "\u{2122}"),
    ("para", "\u{b6}"),
    ("sect", "\u{a7}"),
    ("dagger", "\u{2020}"),
    ("Dagger", "\u{2021}"),
    ("cent", "\u{a2}"),
    ("pound", "\u{a3}"),
    ("euro", "\u{20ac}"),
    ("yen", "\u{a5}"),
    ("iexcl", "\u{a1}"),
    ("iquest", "\u{bf}"),
    ("check", "\u{2713}"),
];

/// Resolve an entity name (without `&` and `;`).
pub(super) fn resolve_named(name: &str) -> Option<&'static str> {
    resolve_predefined_entity(name).or_else(|| {
        HTML_ENTITIES
            .iter()
            .find(|(entity, _)| *entity == name)
            .map(|(_, text)| *text)
    })
}

/// Resolve a numeric reference body such as `#65` or `#x41`.
fn resolve_numeric(body: &str) -> Option<char> {
    let digits = body.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}

/// Length of the well-formed reference at the start of `text` (which begins
/// with `&`), including the terminating `;`.
pub(super) fn reference_len(text: &str) -> Option<usize> {
    let body = text.strip_prefix('&')?;
    let end = body.find(';')?;
    let name = &body[..end];
    let valid = if let Some(digits) = name.strip_prefix('#') {
        match digits.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
        }
    } else {
        name.starts_with(|c: char| c.is_ascii_alphabetic())
            && name.chars().all(|c| c.is_ascii_alphanumeric())
    };
    valid.then_some(end + 2)
}

/// Resolve every known reference in `raw`. Unknown references and bare
/// ampersands are kept as written.
pub(super) fn unescape(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(at) = rest.find('&') {
        out.push_str(&rest[..at]);
        rest = &rest[at..];
        let Some(len) = reference_len(rest) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let name = &rest[1..len - 1];
        match resolve_numeric(name) {
            Some(ch) => out.push(ch),
            None => match resolve_named(name) {
                Some(text) => out.push_str(text),
                None => out.push_str(&rest[..len]),
            },
        }
        rest = &rest[len..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_len() {
        assert_eq!(reference_len("&amp; b"), Some(5));
        assert_eq!(reference_len("&#x41;"), Some(6));
        assert_eq!(reference_len("&#65;x"), Some(5));
        assert_eq!(reference_len("& Jerry"), None);
        assert_eq!(reference_len("&copy 2024"), None);
        assert_eq!(reference_len("&#x;"), None);
    }

    #[test]
    fn test_unescape_attribute_values() {
        assert_eq!(unescape("plain"), "plain");
        assert_eq!(unescape("a &amp; b &rsaquo; &#65;"), "a & b \u{203a} A");
        assert_eq!(unescape("Tom & Jerry"), "Tom & Jerry");
        assert_eq!(unescape("&bogus; &"), "&bogus; &");
    }
}
