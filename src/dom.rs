use std::collections::HashMap;

use crate::{Error, Result};

pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
    pub(crate) value: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
    id_index: HashMap<String, Vec<NodeId>>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    pub(crate) fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id).node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.node_mut(id).node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        if let NodeType::Element(element) = &node_type {
            if let Some(element_id) = element.attrs.get("id") {
                self.id_index.entry(element_id.clone()).or_default().push(id);
            }
        }
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: Option<NodeId>,
        tag_name: &str,
        attrs: &[(&str, &str)],
    ) -> NodeId {
        let mut element = Element {
            tag_name: tag_name.to_ascii_lowercase(),
            ..Element::default()
        };
        for (name, value) in attrs {
            element.attrs.insert((*name).to_string(), (*value).to_string());
        }
        element.value = element.attrs.get("value").cloned().unwrap_or_default();
        self.create_node(parent, NodeType::Element(element))
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text.to_string()))
    }

    /// Removes the node from its parent. The arena slot stays allocated, so
    /// existing `NodeId`s remain valid but queries from the root no longer
    /// reach the subtree.
    pub(crate) fn detach(&mut self, id: NodeId) {
        if let Some(parent_id) = self.node(id).parent {
            let parent = self.node_mut(parent_id);
            parent.children.retain(|child| *child != id);
        }
        self.node_mut(id).parent = None;
    }

    pub(crate) fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.node(current).parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    pub(crate) fn by_id(&self, element_id: &str) -> Option<NodeId> {
        self.id_index
            .get(element_id)?
            .iter()
            .copied()
            .find(|id| self.is_attached(*id))
    }

    /// Pre-order traversal of the element nodes under (and excluding) `scope`.
    pub(crate) fn descendant_elements(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(scope).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if matches!(self.node(id).node_type, NodeType::Element(_)) {
                out.push(id);
            }
            for child in self.node(id).children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    pub(crate) fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).node_type {
            NodeType::Text(text) => out.push_str(text),
            _ => {
                for child in &self.node(id).children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    pub(crate) fn set_text_content(&mut self, id: NodeId, text: &str) {
        let children: Vec<NodeId> = self.node(id).children.clone();
        for child in children {
            self.detach(child);
        }
        self.create_text(id, text);
    }

    pub(crate) fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attrs.get(name).map(String::as_str)
    }

    pub(crate) fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if name == "id" {
            if let Some(old) = self.attr(id, "id").map(ToOwned::to_owned) {
                if let Some(ids) = self.id_index.get_mut(&old) {
                    ids.retain(|existing| *existing != id);
                }
            }
            self.id_index.entry(value.to_string()).or_default().push(id);
        }
        if let Some(element) = self.element_mut(id) {
            element.attrs.insert(name.to_string(), value.to_string());
            if name == "value" {
                element.value = value.to_string();
            }
        }
    }

    /// Sets one inline style declaration, keeping the element's other
    /// declarations intact.
    pub(crate) fn set_style_property(&mut self, id: NodeId, property: &str, value: &str) {
        let mut decls: Vec<String> = self
            .attr(id, "style")
            .map(|style| {
                style
                    .split(';')
                    .map(str::trim)
                    .filter(|decl| !decl.is_empty())
                    .filter(|decl| {
                        decl.split(':')
                            .next()
                            .is_none_or(|name| !name.trim().eq_ignore_ascii_case(property))
                    })
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        decls.push(format!("{property}: {value}"));
        self.set_attr(id, "style", &decls.join("; "));
    }

    pub(crate) fn has_class(&self, id: NodeId, class_name: &str) -> bool {
        self.element(id).is_some_and(|element| {
            element
                .attrs
                .get("class")
                .map(|classes| classes.split_whitespace().any(|c| c == class_name))
                .unwrap_or(false)
        })
    }

    pub(crate) fn add_class(&mut self, id: NodeId, class_name: &str) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let mut classes = class_tokens(element.attrs.get("class").map(String::as_str));
        if !classes.iter().any(|c| c == class_name) {
            classes.push(class_name.to_string());
        }
        set_class_attr(element, &classes);
    }

    pub(crate) fn remove_class(&mut self, id: NodeId, class_name: &str) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let mut classes = class_tokens(element.attrs.get("class").map(String::as_str));
        classes.retain(|c| c != class_name);
        set_class_attr(element, &classes);
    }

    pub(crate) fn value(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.value.as_str())
    }

    pub(crate) fn set_value(&mut self, id: NodeId, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.value = value.to_string();
        }
    }

    fn first_element_by_tag(&self, tag_name: &str) -> Option<NodeId> {
        self.descendant_elements(self.root)
            .into_iter()
            .find(|id| self.element(*id).is_some_and(|e| e.tag_name == tag_name))
    }

    /// Insertion point for page-level UI such as the notification container.
    /// Test fixtures are usually fragments without an explicit `<body>`.
    pub(crate) fn body_or_root(&self) -> NodeId {
        self.first_element_by_tag("body").unwrap_or(self.root)
    }

    pub(crate) fn head_or_root(&self) -> NodeId {
        self.first_element_by_tag("head")
            .unwrap_or_else(|| self.body_or_root())
    }

    pub(crate) fn serialize(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(id, &mut out);
        out
    }

    fn serialize_into(&self, id: NodeId, out: &mut String) {
        match &self.node(id).node_type {
            NodeType::Document => {
                for child in &self.node(id).children {
                    self.serialize_into(*child, out);
                }
            }
            NodeType::Text(text) => out.push_str(&escape_html_text(text)),
            NodeType::Element(element) => {
                out.push('<');
                out.push_str(&element.tag_name);
                let mut names: Vec<&String> = element.attrs.keys().collect();
                names.sort();
                for name in names {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_html_attr(&element.attrs[name]));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.tag_name.as_str()) {
                    return;
                }
                for child in &self.node(id).children {
                    self.serialize_into(*child, out);
                }
                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
            }
        }
    }

    pub(crate) fn parse(html: &str) -> Result<Self> {
        Parser::new(html).parse()
    }
}

pub(crate) fn class_tokens(class_attr: Option<&str>) -> Vec<String> {
    class_attr
        .map(|value| {
            value
                .split_whitespace()
                .filter(|token| !token.is_empty())
                .map(ToOwned::to_owned)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
}

fn set_class_attr(element: &mut Element, classes: &[String]) {
    if classes.is_empty() {
        element.attrs.remove("class");
    } else {
        element.attrs.insert("class".to_string(), classes.join(" "));
    }
}

pub(crate) fn escape_html_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn escape_html_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn decode_entities(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let mut replaced = false;
        for (entity, ch) in [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&#39;", '\''),
        ] {
            if let Some(tail) = rest.strip_prefix(entity) {
                out.push(ch);
                rest = tail;
                replaced = true;
                break;
            }
        }
        if !replaced {
            out.push('&');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Dom> {
        let mut dom = Dom::new();
        let mut open_stack: Vec<(NodeId, String)> = Vec::new();

        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'<' {
                if self.starts_with("<!--") {
                    self.skip_comment()?;
                } else if self.starts_with("<!") {
                    self.skip_until(b'>')?;
                } else if self.starts_with("</") {
                    let tag = self.read_close_tag()?;
                    if let Some(found) = open_stack
                        .iter()
                        .rposition(|(_, open_tag)| *open_tag == tag)
                    {
                        open_stack.truncate(found);
                    }
                } else {
                    let (tag, attrs, self_closed) = self.read_open_tag()?;
                    let parent = open_stack
                        .last()
                        .map(|(id, _)| *id)
                        .unwrap_or_else(|| dom.root());
                    let attr_pairs: Vec<(&str, &str)> = attrs
                        .iter()
                        .map(|(name, value)| (name.as_str(), value.as_str()))
                        .collect();
                    let id = dom.create_element(Some(parent), &tag, &attr_pairs);
                    if !self_closed && !VOID_ELEMENTS.contains(&tag.as_str()) {
                        open_stack.push((id, tag));
                    }
                }
            } else {
                let start = self.pos;
                while self.pos < self.bytes.len() && self.bytes[self.pos] != b'<' {
                    self.pos += 1;
                }
                let raw = &self.src[start..self.pos];
                if !raw.trim().is_empty() {
                    let parent = open_stack
                        .last()
                        .map(|(id, _)| *id)
                        .unwrap_or_else(|| dom.root());
                    dom.create_text(parent, &decode_entities(raw));
                }
            }
        }

        Ok(dom)
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.src[self.pos..].starts_with(prefix)
    }

    fn skip_comment(&mut self) -> Result<()> {
        match self.src[self.pos..].find("-->") {
            Some(end) => {
                self.pos += end + 3;
                Ok(())
            }
            None => Err(Error::HtmlParse("unterminated comment".into())),
        }
    }

    fn skip_until(&mut self, byte: u8) -> Result<()> {
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == byte {
                self.pos += 1;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(Error::HtmlParse("unterminated tag".into()))
    }

    fn read_close_tag(&mut self) -> Result<String> {
        self.pos += 2;
        let tag = self.read_tag_name()?;
        self.skip_whitespace();
        if self.bytes.get(self.pos) != Some(&b'>') {
            return Err(Error::HtmlParse(format!("malformed close tag: {tag}")));
        }
        self.pos += 1;
        Ok(tag)
    }

    fn read_open_tag(&mut self) -> Result<(String, Vec<(String, String)>, bool)> {
        self.pos += 1;
        let tag = self.read_tag_name()?;
        let mut attrs = Vec::new();
        loop {
            self.skip_whitespace();
            match self.bytes.get(self.pos) {
                None => return Err(Error::HtmlParse(format!("unterminated tag: {tag}"))),
                Some(b'>') => {
                    self.pos += 1;
                    return Ok((tag, attrs, false));
                }
                Some(b'/') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    if self.bytes.get(self.pos) == Some(&b'>') {
                        self.pos += 1;
                        return Ok((tag, attrs, true));
                    }
                    return Err(Error::HtmlParse(format!("malformed tag: {tag}")));
                }
                Some(_) => {
                    let name = self.read_attr_name()?;
                    self.skip_whitespace();
                    let value = if self.bytes.get(self.pos) == Some(&b'=') {
                        self.pos += 1;
                        self.skip_whitespace();
                        self.read_attr_value()?
                    } else {
                        String::new()
                    };
                    attrs.push((name, value));
                }
            }
        }
    }

    fn read_tag_name(&mut self) -> Result<String> {
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'-')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(Error::HtmlParse("missing tag name".into()));
        }
        Ok(self.src[start..self.pos].to_ascii_lowercase())
    }

    fn read_attr_name(&mut self) -> Result<String> {
        let start = self.pos;
        while self
            .bytes
            .get(self.pos)
            .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/'))
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(Error::HtmlParse("missing attribute name".into()));
        }
        Ok(self.src[start..self.pos].to_ascii_lowercase())
    }

    fn read_attr_value(&mut self) -> Result<String> {
        match self.bytes.get(self.pos) {
            Some(&quote @ (b'"' | b'\'')) => {
                self.pos += 1;
                let start = self.pos;
                while self.bytes.get(self.pos).is_some_and(|b| *b != quote) {
                    self.pos += 1;
                }
                if self.pos >= self.bytes.len() {
                    return Err(Error::HtmlParse("unterminated attribute value".into()));
                }
                let raw = &self.src[start..self.pos];
                self.pos += 1;
                Ok(decode_entities(raw))
            }
            Some(_) => {
                let start = self.pos;
                while self
                    .bytes
                    .get(self.pos)
                    .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'>' | b'/'))
                {
                    self.pos += 1;
                }
                Ok(decode_entities(&self.src[start..self.pos]))
            }
            None => Err(Error::HtmlParse("unterminated attribute value".into())),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.bytes.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }
}

pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut it = value.chars();
    let mut out = String::new();
    for _ in 0..max_chars {
        let Some(ch) = it.next() else {
            return out;
        };
        out.push(ch);
    }
    if it.next().is_some() {
        out.push_str("...");
    }
    out
}
