//! Owned element tree for server-rendered formset markup.
//!
//! The formset is re-rendered by the server after every structural change, so
//! the tree is rebuilt from scratch on each reload. Nothing here holds onto
//! element identity across renders: callers address elements by predicate and
//! use [`ElementPath`] only for the duration of a single mutation.
//!
//! - `parse` - tolerant HTML fragment parsing on top of `quick-xml`
//! - `render` - serialization back to HTML
//! - `controls` - form control values (inputs, selects, textareas)
//! - `entities` - HTML character references

mod controls;
mod entities;
mod parse;
mod render;

pub use controls::{
    Choice, control_values, is_form_control, is_multi_select, option_value, selected_choice,
    set_control_value,
};
pub use parse::parse_fragment;

/// Child-index path from an element down to one of its descendants.
///
/// An empty path addresses the element itself. Paths are invalidated by any
/// structural mutation of the tree.
pub type ElementPath = Vec<usize>;

/// A node in the element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Decoded character data.
    Text(String),
}

/// An HTML element with ordered attributes and child nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Create an empty element. The tag name is stored lower-cased.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style child appender.
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Builder-style text appender.
    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(Node::Text(text.to_string()));
        self
    }

    /// Tag name (lower-case).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Value of an attribute, if present.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the attribute is present (boolean attributes carry no value).
    pub fn has_attr(&self, key: &str) -> bool {
        self.attr(key).is_some()
    }

    /// Set or overwrite an attribute, keeping its original position.
    pub fn set_attr(&mut self, key: &str, value: &str) {
        match self
            .attributes
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some((_, existing)) => *existing = value.to_string(),
            None => self
                .attributes
                .push((key.to_ascii_lowercase(), value.to_string())),
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, key: &str) -> Option<String> {
        let index = self
            .attributes
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))?;
        Some(self.attributes.remove(index).1)
    }

    /// Set or clear a boolean attribute such as `open`, `checked` or `selected`.
    pub fn set_flag(&mut self, key: &str, enabled: bool) {
        if enabled {
            if !self.has_attr(key) {
                self.set_attr(key, "");
            }
        } else {
            self.remove_attr(key);
        }
    }

    /// The `id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Whitespace-separated entries of the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Whether `class` contains the given entry.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// First element (this one included) with the given `id`.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        self.find(|e| e.id() == Some(id))
    }

    /// First form control (this one included) with the given `name`.
    pub fn find_by_name(&self, name: &str) -> Option<&Element> {
        self.find(|e| controls::is_form_control(e) && e.attr("name") == Some(name))
    }

    /// Child nodes.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Append a child node.
    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Direct child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of this element and all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: &str) {
        self.children.clear();
        self.children.push(Node::Text(text.to_string()));
    }

    /// First element in pre-order (this element included) matching `pred`.
    pub fn find(&self, pred: impl Fn(&Element) -> bool) -> Option<&Element> {
        self.find_path(pred).and_then(|path| self.at(&path))
    }

    /// All elements in pre-order (this element included) matching `pred`.
    pub fn find_all(&self, pred: impl Fn(&Element) -> bool) -> Vec<&Element> {
        let mut found = Vec::new();
        walk(self, &mut |element| {
            if pred(element) {
                found.push(element);
            }
        });
        found
    }

    /// Mutable access to the first element matching `pred`.
    pub fn find_mut(&mut self, pred: impl Fn(&Element) -> bool) -> Option<&mut Element> {
        let path = self.find_path(pred)?;
        self.at_mut(&path)
    }

    /// Path to the first element matching `pred`.
    pub fn find_path(&self, pred: impl Fn(&Element) -> bool) -> Option<ElementPath> {
        self.find_all_paths(pred).into_iter().next()
    }

    /// Paths to every element matching `pred`, in pre-order.
    pub fn find_all_paths(&self, pred: impl Fn(&Element) -> bool) -> Vec<ElementPath> {
        let mut paths = Vec::new();
        let mut cursor = Vec::new();
        walk_paths(self, &mut cursor, &mut |path, element| {
            if pred(element) {
                paths.push(path.to_vec());
            }
        });
        paths
    }

    /// Element at `path`, relative to this element.
    pub fn at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self;
        for &index in path {
            current = match current.children.get(index)? {
                Node::Element(element) => element,
                Node::Text(_) => return None,
            };
        }
        Some(current)
    }

    /// Mutable element at `path`, relative to this element.
    pub fn at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &index in path {
            current = match current.children.get_mut(index)? {
                Node::Element(element) => element,
                Node::Text(_) => return None,
            };
        }
        Some(current)
    }

    /// Remove every descendant matching `pred` together with its subtree.
    ///
    /// Returns the number of removed elements. This element itself is never
    /// removed.
    pub fn remove_where(&mut self, pred: &impl Fn(&Element) -> bool) -> usize {
        let before = self.children.len();
        self.children.retain(|node| match node {
            Node::Element(element) => !pred(element),
            Node::Text(_) => true,
        });
        let mut removed = before - self.children.len();
        for node in &mut self.children {
            if let Node::Element(element) = node {
                removed += element.remove_where(pred);
            }
        }
        removed
    }

    /// Replace the descendant with the given `id`.
    ///
    /// Returns the element that was swapped out, or `None` if no descendant
    /// carries the id.
    pub fn replace_by_id(&mut self, id: &str, replacement: Element) -> Option<Element> {
        self.replace_where(|e| e.id() == Some(id), replacement)
    }

    /// Replace the first descendant matching `pred` with `replacement`.
    ///
    /// Returns the element that was swapped out.
    pub fn replace_where(
        &mut self,
        pred: impl Fn(&Element) -> bool,
        replacement: Element,
    ) -> Option<Element> {
        let path = self.find_path(pred)?;
        let (last, parent_path) = path.split_last()?;
        let parent = self.at_mut(parent_path)?;
        match parent.children.get_mut(*last)? {
            Node::Element(slot) => Some(std::mem::replace(slot, replacement)),
            Node::Text(_) => None,
        }
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for node in &element.children {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(child) => collect_text(child, out),
        }
    }
}

fn walk<'a>(element: &'a Element, visit: &mut impl FnMut(&'a Element)) {
    visit(element);
    for child in element.child_elements() {
        walk(child, visit);
    }
}

fn walk_paths(
    element: &Element,
    cursor: &mut Vec<usize>,
    visit: &mut impl FnMut(&[usize], &Element),
) {
    visit(cursor, element);
    for (index, node) in element.children.iter().enumerate() {
        if let Node::Element(child) = node {
            cursor.push(index);
            walk_paths(child, cursor, visit);
            cursor.pop();
        }
    }
}
