//! Mutable, namespace-aware XML tree
//!
//! [`DocumentTree`] owns every node of one parsed XML part in an arena.
//! Nodes are addressed by [`NodeId`] handles, which stay valid for the life
//! of the tree: detaching a node removes it from its parent's child list but
//! never invalidates an id handed out earlier. That lets callers locate all
//! targets first and mutate afterwards without iterator invalidation.
//!
//! Element namespaces are resolved once, at parse time, from the `xmlns`
//! declarations in scope; queries match on (namespace URI, local name) so
//! they do not depend on which prefix a template happens to use.

use std::fmt;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{ParseError, SerializeError, TreeError};

/// Namespace bound to the `xml:` prefix
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Handle to a node inside a [`DocumentTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Qualified element name as written in the document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    prefix: Option<String>,
    local: String,
}

impl QName {
    /// Split `prefix:local` (or a bare local name)
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => Self {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            None => Self {
                prefix: None,
                local: raw.to_string(),
            },
        }
    }

    /// Build from parts
    #[must_use]
    pub fn new(prefix: Option<&str>, local: &str) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
        }
    }

    /// Prefix, if any
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Local part
    #[inline]
    #[must_use]
    pub fn local(&self) -> &str {
        &self.local
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Raw attribute (name as written, unescaped value)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name as written
    pub name: String,
    /// Unescaped value
    pub value: String,
}

/// Element node payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: QName,
    namespace: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<NodeId>,
}

impl Element {
    /// Qualified name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Resolved namespace URI
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Attributes in document order
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Attribute value by written name
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// True if the element is `{namespace}local`
    #[inline]
    #[must_use]
    pub fn is(&self, namespace: &str, local: &str) -> bool {
        self.name.local == local && self.namespace.as_deref() == Some(namespace)
    }
}

/// Node payloads
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Element with attributes and children
    Element(Element),
    /// Unescaped character data
    Text(String),
    /// CDATA section content
    CData(String),
    /// Comment body
    Comment(String),
    /// Processing instruction content (target and data)
    ProcessingInstruction(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Declaration {
    version: String,
    encoding: Option<String>,
    standalone: Option<String>,
}

/// One parsed XML part
#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: Vec<NodeData>,
    /// Root element plus any top-level comments / processing instructions, in order
    top_level: Vec<NodeId>,
    root: NodeId,
    declaration: Option<Declaration>,
}

fn utf8(bytes: &[u8], position: u64) -> Result<String, ParseError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| ParseError::malformed(position, e))
}

impl DocumentTree {
    /// Parse XML text into a tree
    ///
    /// Whitespace text between elements is kept so that an unmodified tree
    /// serializes back to equivalent markup.
    ///
    /// # Errors
    /// Returns `ParseError` for malformed input, unbalanced tags, or a
    /// document without exactly one root element
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut nodes: Vec<NodeData> = Vec::new();
        let mut top_level: Vec<NodeId> = Vec::new();
        let mut root: Option<NodeId> = None;
        let mut declaration = None;
        let mut open: Vec<NodeId> = Vec::new();
        // (prefix, uri) declarations, one frame per open element
        let mut scopes: Vec<Vec<(Option<String>, String)>> = Vec::new();

        loop {
            let position = reader.buffer_position();
            let event = reader
                .read_event()
                .map_err(|e| ParseError::malformed(position, e))?;

            match event {
                Event::Start(start) => {
                    let (element, frame) = read_element(&start, &scopes, position)?;
                    let id = attach(&mut nodes, &open, &mut top_level, &mut root, element)?;
                    open.push(id);
                    scopes.push(frame);
                }
                Event::Empty(start) => {
                    let (element, _) = read_element(&start, &scopes, position)?;
                    attach(&mut nodes, &open, &mut top_level, &mut root, element)?;
                }
                Event::End(end) => {
                    let found = utf8(end.name().as_ref(), position)?;
                    let Some(id) = open.pop() else {
                        return Err(ParseError::UnbalancedTag {
                            expected: String::new(),
                            found,
                        });
                    };
                    scopes.pop();
                    if let NodeKind::Element(element) = &nodes[id.0].kind {
                        let expected = element.name.to_string();
                        if expected != found {
                            return Err(ParseError::UnbalancedTag { expected, found });
                        }
                    }
                }
                Event::Text(text) => {
                    let value = text
                        .unescape()
                        .map_err(|e| ParseError::malformed(position, e))?
                        .into_owned();
                    if let Some(&parent) = open.last() {
                        push_child(&mut nodes, parent, NodeKind::Text(value));
                    } else if !value.trim().is_empty() {
                        return Err(ParseError::malformed(
                            position,
                            "text outside the root element",
                        ));
                    }
                }
                Event::CData(data) => {
                    let value = utf8(&data, position)?;
                    match open.last() {
                        Some(&parent) => {
                            push_child(&mut nodes, parent, NodeKind::CData(value));
                        }
                        None => {
                            return Err(ParseError::malformed(
                                position,
                                "cdata outside the root element",
                            ))
                        }
                    }
                }
                Event::Comment(comment) => {
                    let value = utf8(&comment, position)?;
                    add_misc(&mut nodes, &open, &mut top_level, NodeKind::Comment(value));
                }
                Event::PI(pi) => {
                    let value = utf8(&pi, position)?;
                    add_misc(
                        &mut nodes,
                        &open,
                        &mut top_level,
                        NodeKind::ProcessingInstruction(value),
                    );
                }
                Event::Decl(decl) => {
                    declaration = Some(read_declaration(&decl, position)?);
                }
                Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if let Some(&unclosed) = open.last() {
            let name = match &nodes[unclosed.0].kind {
                NodeKind::Element(element) => element.name.to_string(),
                _ => String::new(),
            };
            return Err(ParseError::UnexpectedEof(name));
        }
        let root = root.ok_or(ParseError::NoRootElement)?;

        tracing::trace!(nodes = nodes.len(), "parsed xml part");
        Ok(Self {
            nodes,
            top_level,
            root,
            declaration,
        })
    }

    /// Serialize the tree back to XML text
    ///
    /// Empty elements are written self-closing; text is re-escaped. Parsing
    /// the output and serializing again yields the same text.
    ///
    /// # Errors
    /// Returns `SerializeError` if the writer fails
    pub fn serialize(&self) -> Result<String, SerializeError> {
        let mut writer = Writer::new(Vec::new());

        if let Some(decl) = &self.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new(
                    &decl.version,
                    decl.encoding.as_deref(),
                    decl.standalone.as_deref(),
                )))
                .map_err(write_failed)?;
        }
        for &id in &self.top_level {
            self.write_node(&mut writer, id)?;
        }

        String::from_utf8(writer.into_inner()).map_err(|_| SerializeError::Encoding)
    }

    fn write_node(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<(), SerializeError> {
        let Some(data) = self.nodes.get(id.0) else {
            return Ok(());
        };
        match &data.kind {
            NodeKind::Element(element) => {
                let name = element.name.to_string();
                let mut start = BytesStart::new(name.as_str());
                for attr in &element.attributes {
                    start.push_attribute((attr.name.as_str(), attr.value.as_str()));
                }
                if element.children.is_empty() {
                    writer.write_event(Event::Empty(start)).map_err(write_failed)?;
                } else {
                    writer.write_event(Event::Start(start)).map_err(write_failed)?;
                    for &child in &element.children {
                        self.write_node(writer, child)?;
                    }
                    writer
                        .write_event(Event::End(BytesEnd::new(name.as_str())))
                        .map_err(write_failed)?;
                }
            }
            NodeKind::Text(text) => {
                writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(write_failed)?;
            }
            NodeKind::CData(data) => {
                writer
                    .write_event(Event::CData(BytesCData::new(data.as_str())))
                    .map_err(write_failed)?;
            }
            NodeKind::Comment(comment) => {
                writer
                    .write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))
                    .map_err(write_failed)?;
            }
            NodeKind::ProcessingInstruction(content) => {
                writer
                    .write_event(Event::PI(BytesPI::new(content.as_str())))
                    .map_err(write_failed)?;
            }
        }
        Ok(())
    }

    /// Root element
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever created in this tree (attached or not)
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Payload of a node, `None` for an id this tree never issued
    #[inline]
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|data| &data.kind)
    }

    /// Element payload, if the node is an element
    #[inline]
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id)? {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut Element, TreeError> {
        match self.nodes.get_mut(id.0).map(|data| &mut data.kind) {
            Some(NodeKind::Element(element)) => Ok(element),
            Some(_) => Err(TreeError::NotAnElement(id)),
            None => Err(TreeError::UnknownNode(id)),
        }
    }

    /// Parent, if attached
    #[inline]
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|data| data.parent)
    }

    /// Children in document order (empty for non-elements)
    #[inline]
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.element(id).map_or(&[], |element| element.children.as_slice())
    }

    /// Direct element children
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.element(child).is_some())
    }

    /// True if `id` is the element `{namespace}local`
    #[inline]
    #[must_use]
    pub fn is_element(&self, id: NodeId, namespace: &str, local: &str) -> bool {
        self.element(id)
            .is_some_and(|element| element.is(namespace, local))
    }

    /// All descendant elements named `{namespace}local`, in document order
    ///
    /// `id` itself is not included.
    #[must_use]
    pub fn descendants(&self, id: NodeId, namespace: &str, local: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if let Some(element) = self.element(next) {
                if element.is(namespace, local) {
                    found.push(next);
                }
                stack.extend(element.children.iter().rev().copied());
            }
        }
        found
    }

    /// Concatenated text of all descendant text and CDATA nodes, in document order
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            None => {}
            Some(NodeKind::Text(text) | NodeKind::CData(text)) => out.push_str(text),
            Some(NodeKind::Element(element)) => {
                for &child in &element.children {
                    self.collect_text(child, out);
                }
            }
            Some(NodeKind::Comment(_) | NodeKind::ProcessingInstruction(_)) => {}
        }
    }

    /// Prefix under which `namespace` is declared on the root element
    ///
    /// `Some(None)` means it is the root's default namespace.
    #[must_use]
    pub fn prefix_for(&self, namespace: &str) -> Option<Option<String>> {
        let root = self.element(self.root)?;
        if root.namespace.as_deref() == Some(namespace) {
            return Some(root.name.prefix.clone());
        }
        root.attributes.iter().find_map(|attr| {
            if attr.value != namespace {
                return None;
            }
            if attr.name == "xmlns" {
                Some(None)
            } else {
                attr.name
                    .strip_prefix("xmlns:")
                    .map(|prefix| Some(prefix.to_string()))
            }
        })
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: QName, namespace: Option<&str>) -> NodeId {
        self.push(NodeKind::Element(Element {
            name,
            namespace: namespace.map(str::to_string),
            attributes: Vec::new(),
            children: Vec::new(),
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData { parent: None, kind });
        id
    }

    /// Set (or overwrite) an attribute on an element
    ///
    /// # Errors
    /// `TreeError::NotAnElement` if `id` is not an element, `UnknownNode` if
    /// it belongs to another tree
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), TreeError> {
        let element = self.element_mut(id)?;
        let value = value.into();
        match element.attributes.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => element.attributes.push(Attribute {
                name: name.to_string(),
                value,
            }),
        }
        Ok(())
    }

    /// Append a detached node as the last child of `parent`
    ///
    /// # Errors
    /// - `TreeError::NotAnElement` if `parent` is not an element
    /// - `TreeError::UnknownNode` if either id belongs to another tree
    /// - `TreeError::AlreadyAttached` if `child` already has a parent
    /// - `TreeError::Cycle` if `child` is `parent` or one of its ancestors
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.element_mut(parent)?;
        let Some(child_data) = self.nodes.get(child.0) else {
            return Err(TreeError::UnknownNode(child));
        };
        if child_data.parent.is_some() || child == self.root {
            return Err(TreeError::AlreadyAttached(child));
        }
        let mut cursor = Some(parent);
        while let Some(ancestor) = cursor {
            if ancestor == child {
                return Err(TreeError::Cycle(child));
            }
            cursor = self.parent(ancestor);
        }

        self.element_mut(parent)?.children.push(child);
        if let Some(data) = self.nodes.get_mut(child.0) {
            data.parent = Some(parent);
        }
        Ok(())
    }

    /// Detach every child of `id`
    ///
    /// # Errors
    /// `TreeError::NotAnElement` if `id` is not an element, `UnknownNode` if
    /// it belongs to another tree
    pub fn remove_children(&mut self, id: NodeId) -> Result<(), TreeError> {
        let removed = std::mem::take(&mut self.element_mut(id)?.children);
        for child in removed {
            if let Some(data) = self.nodes.get_mut(child.0) {
                data.parent = None;
            }
        }
        Ok(())
    }
}

fn write_failed(e: impl fmt::Display) -> SerializeError {
    SerializeError::SerializationFailed(e.to_string())
}

fn read_element(
    start: &BytesStart<'_>,
    scopes: &[Vec<(Option<String>, String)>],
    position: u64,
) -> Result<(Element, Vec<(Option<String>, String)>), ParseError> {
    let name = QName::parse(&utf8(start.name().as_ref(), position)?);

    let mut attributes = Vec::new();
    let mut frame = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ParseError::malformed(position, e))?;
        let key = utf8(attr.key.as_ref(), position)?;
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::malformed(position, e))?
            .into_owned();
        if key == "xmlns" {
            frame.push((None, value.clone()));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            frame.push((Some(prefix.to_string()), value.clone()));
        }
        attributes.push(Attribute { name: key, value });
    }

    let namespace = resolve_namespace(name.prefix(), &frame, scopes);
    Ok((
        Element {
            name,
            namespace,
            attributes,
            children: Vec::new(),
        },
        frame,
    ))
}

fn resolve_namespace(
    prefix: Option<&str>,
    frame: &[(Option<String>, String)],
    scopes: &[Vec<(Option<String>, String)>],
) -> Option<String> {
    if prefix == Some("xml") {
        return Some(XML_NS.to_string());
    }
    std::iter::once(frame)
        .chain(scopes.iter().rev().map(Vec::as_slice))
        .flat_map(|declarations| declarations.iter().rev())
        .find(|(declared, _)| declared.as_deref() == prefix)
        .map(|(_, uri)| uri.clone())
        .filter(|uri| !uri.is_empty())
}

fn read_declaration(decl: &BytesDecl<'_>, position: u64) -> Result<Declaration, ParseError> {
    let field = |raw: std::borrow::Cow<'_, [u8]>| utf8(&raw, position);
    let version = field(decl.version().map_err(|e| ParseError::malformed(position, e))?)?;
    let encoding = match decl.encoding() {
        Some(raw) => Some(field(raw.map_err(|e| ParseError::malformed(position, e))?)?),
        None => None,
    };
    let standalone = match decl.standalone() {
        Some(raw) => Some(field(raw.map_err(|e| ParseError::malformed(position, e))?)?),
        None => None,
    };
    Ok(Declaration {
        version,
        encoding,
        standalone,
    })
}

fn push_child(nodes: &mut Vec<NodeData>, parent: NodeId, kind: NodeKind) -> NodeId {
    let id = NodeId(nodes.len());
    nodes.push(NodeData {
        parent: Some(parent),
        kind,
    });
    if let NodeKind::Element(element) = &mut nodes[parent.0].kind {
        element.children.push(id);
    }
    id
}

fn attach(
    nodes: &mut Vec<NodeData>,
    open: &[NodeId],
    top_level: &mut Vec<NodeId>,
    root: &mut Option<NodeId>,
    element: Element,
) -> Result<NodeId, ParseError> {
    if let Some(&parent) = open.last() {
        return Ok(push_child(nodes, parent, NodeKind::Element(element)));
    }
    if root.is_some() {
        return Err(ParseError::MultipleRoots(element.name.to_string()));
    }
    let id = NodeId(nodes.len());
    nodes.push(NodeData {
        parent: None,
        kind: NodeKind::Element(element),
    });
    *root = Some(id);
    top_level.push(id);
    Ok(id)
}

fn add_misc(nodes: &mut Vec<NodeData>, open: &[NodeId], top_level: &mut Vec<NodeId>, kind: NodeKind) {
    if let Some(&parent) = open.last() {
        push_child(nodes, parent, kind);
    } else {
        let id = NodeId(nodes.len());
        nodes.push(NodeData { parent: None, kind });
        top_level.push(id);
    }
}
