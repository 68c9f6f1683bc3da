//! Minimal streaming XML writer used to build protocol responses.

use std::borrow::Cow;

use roxmltree::Node;

/// Escape character data for use in element content.
///
/// # Examples
/// ```
/// use oai_connector::xml::escape_text;
///
/// assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
/// assert_eq!(escape_text("plain"), "plain");
/// ```
pub fn escape_text(s: &str) -> Cow<'_, str> {
    escape(s, false)
}

/// Escape character data for use inside a double-quoted attribute value.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    escape(s, true)
}

/// Characters XML 1.0 does not allow anywhere in a document.
fn is_forbidden(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}')
}

/// Forbidden characters are dropped.
fn escape(s: &str, attr: bool) -> Cow<'_, str> {
    let needs = |c: char| {
        matches!(c, '<' | '>' | '&')
            || is_forbidden(c)
            || (attr && matches!(c, '"' | '\n' | '\t'))
    };
    if !s.chars().any(needs) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' if attr => out.push_str("&quot;"),
            '\n' if attr => out.push_str("&#10;"),
            '\t' if attr => out.push_str("&#9;"),
            c if is_forbidden(c) => {}
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Appends elements to an in-memory buffer, tracking open tags.
#[derive(Debug, Default)]
pub struct XmlWriter {
    out: String,
    open: Vec<String>,
}

impl XmlWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the XML declaration.
    pub fn declaration(&mut self) -> &mut Self {
        self.out
            .push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self
    }

    fn start_tag(&mut self, name: &str, attrs: &[(&str, &str)]) {
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attrs {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(value));
            self.out.push('"');
        }
    }

    /// Open an element that will contain children.
    pub fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.start_tag(name, attrs);
        self.out.push('>');
        self.open.push(name.to_string());
        self
    }

    /// Close the most recently opened element.
    pub fn close(&mut self) -> &mut Self {
        if let Some(name) = self.open.pop() {
            self.out.push_str("</");
            self.out.push_str(&name);
            self.out.push('>');
        }
        self
    }

    /// Write `<name attrs>text</name>`.
    pub fn leaf(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> &mut Self {
        self.start_tag(name, attrs);
        self.out.push('>');
        self.out.push_str(&escape_text(text));
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
        self
    }

    /// Write a self-closing element.
    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> &mut Self {
        self.start_tag(name, attrs);
        self.out.push_str("/>");
        self
    }

    /// Write escaped character data.
    pub fn text(&mut self, text: &str) -> &mut Self {
        self.out.push_str(&escape_text(text));
        self
    }

    /// Append an already serialized, well-formed fragment.
    pub fn raw(&mut self, xml: &str) -> &mut Self {
        self.out.push_str(xml);
        self
    }

    /// Re-serialize a parsed element and its subtree.
    ///
    /// Namespace declarations in scope at `node` are written on the copied
    /// root so the fragment stands on its own.
    pub fn copy_element(&mut self, node: Node<'_, '_>) -> &mut Self {
        self.copy_node(node, None);
        self
    }

    /// Re-serialize the children of a parsed element, without the element
    /// itself. Namespaces declared on `node` are assumed to be in scope.
    pub fn copy_children(&mut self, node: Node<'_, '_>) -> &mut Self {
        for child in node.children() {
            self.copy_node(child, Some(node));
        }
        self
    }

    fn copy_node(&mut self, node: Node<'_, '_>, parent: Option<Node<'_, '_>>) {
        if node.is_text() {
            if let Some(text) = node.text() {
                self.text(text);
            }
            return;
        }
        if !node.is_element() {
            return;
        }

        let name = qualified_name(node, node.tag_name().namespace(), node.tag_name().name());
        let mut attrs: Vec<(String, String)> = Vec::new();
        for ns in node.namespaces() {
            let declared_by_parent = parent.is_some_and(|p| {
                p.namespaces()
                    .any(|pns| pns.name() == ns.name() && pns.uri() == ns.uri())
            });
            if declared_by_parent || ns.name() == Some("xml") {
                continue;
            }
            let key = match ns.name() {
                Some(prefix) => format!("xmlns:{prefix}"),
                None => "xmlns".to_string(),
            };
            attrs.push((key, ns.uri().to_string()));
        }
        for attr in node.attributes() {
            attrs.push((
                qualified_name(node, attr.namespace(), attr.name()),
                attr.value().to_string(),
            ));
        }
        let attr_refs: Vec<(&str, &str)> = attrs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        if node.has_children() {
            self.open(&name, &attr_refs);
            for child in node.children() {
                self.copy_node(child, Some(node));
            }
            self.close();
        } else {
            self.empty(&name, &attr_refs);
        }
    }

    /// Close any elements still open and return the document.
    #[must_use]
    pub fn finish(mut self) -> String {
        while !self.open.is_empty() {
            self.close();
        }
        self.out
    }
}

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

fn qualified_name(node: Node<'_, '_>, namespace: Option<&str>, local: &str) -> String {
    if namespace == Some(XML_NAMESPACE) {
        return format!("xml:{local}");
    }
    match namespace.and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}
