//! WordprocessingML vocabulary
//!
//! Element names and node builders for the `w:` namespace. Builders create
//! nodes under whatever prefix the document already binds to [`W_NS`]; if
//! the namespace is not declared on the root element, `w` is declared.

use crate::error::TreeError;
use crate::tree::{DocumentTree, NodeId, QName};

/// Main WordprocessingML namespace
pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// `w:body`
pub const BODY: &str = "body";
/// `w:p`, a paragraph
pub const PARAGRAPH: &str = "p";
/// `w:r`, a run of uniformly formatted content
pub const RUN: &str = "r";
/// `w:t`, the only element whose text is visible
pub const TEXT: &str = "t";
/// `w:br`, a line break inside a run
pub const BREAK: &str = "br";
/// `w:tbl`
pub const TABLE: &str = "tbl";
/// `w:tr`, a table row
pub const ROW: &str = "tr";
/// `w:tc`, a table cell
pub const CELL: &str = "tc";

/// Namespace URI the document root binds to the `w` prefix, or [`W_NS`]
#[must_use]
pub fn document_namespace(tree: &DocumentTree) -> String {
    tree.element(tree.root())
        .and_then(|root| root.attribute("xmlns:w"))
        .unwrap_or(W_NS)
        .to_string()
}

/// Node builder bound to one document's WordprocessingML namespace
#[derive(Debug, Clone)]
pub struct Wml {
    namespace: String,
    prefix: Option<String>,
}

impl Wml {
    /// Resolve the namespace and prefix for `tree`, declaring `xmlns:w` if needed
    ///
    /// # Errors
    /// `TreeError::NotAnElement` if the root cannot carry the declaration
    pub fn bind(tree: &mut DocumentTree) -> Result<Self, TreeError> {
        let namespace = document_namespace(tree);
        let prefix = match tree.prefix_for(&namespace) {
            Some(prefix) => prefix,
            None => {
                let root = tree.root();
                tree.set_attribute(root, "xmlns:w", namespace.as_str())?;
                Some("w".to_string())
            }
        };
        Ok(Self { namespace, prefix })
    }

    /// Namespace URI in use
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn element(&self, tree: &mut DocumentTree, local: &str) -> NodeId {
        tree.create_element(
            QName::new(self.prefix.as_deref(), local),
            Some(&self.namespace),
        )
    }

    /// Empty `w:p`
    pub fn paragraph(&self, tree: &mut DocumentTree) -> NodeId {
        self.element(tree, PARAGRAPH)
    }

    /// `w:r` holding one whitespace-preserving `w:t`
    ///
    /// An empty `text` leaves the `w:t` childless so it round-trips as a
    /// self-closing element.
    ///
    /// # Errors
    /// Propagates tree mutation errors
    pub fn text_run(&self, tree: &mut DocumentTree, text: &str) -> Result<NodeId, TreeError> {
        let run = self.element(tree, RUN);
        let t = self.element(tree, TEXT);
        tree.set_attribute(t, "xml:space", "preserve")?;
        if !text.is_empty() {
            let content = tree.create_text(text);
            tree.append_child(t, content)?;
        }
        tree.append_child(run, t)?;
        Ok(run)
    }

    /// `w:r` holding one `w:br`
    ///
    /// # Errors
    /// Propagates tree mutation errors
    pub fn break_run(&self, tree: &mut DocumentTree) -> Result<NodeId, TreeError> {
        let run = self.element(tree, RUN);
        let br = self.element(tree, BREAK);
        tree.append_child(run, br)?;
        Ok(run)
    }

    /// Append `text` to `paragraph` as text runs, with a break run at each `\n`
    ///
    /// # Errors
    /// Propagates tree mutation errors
    pub fn append_lines(
        &self,
        tree: &mut DocumentTree,
        paragraph: NodeId,
        text: &str,
    ) -> Result<(), TreeError> {
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                let br = self.break_run(tree)?;
                tree.append_child(paragraph, br)?;
            }
            let run = self.text_run(tree, line)?;
            tree.append_child(paragraph, run)?;
        }
        Ok(())
    }

    /// Is `node` the element `w:<local>` in this document's namespace
    #[inline]
    #[must_use]
    pub fn is(&self, tree: &DocumentTree, node: NodeId, local: &str) -> bool {
        tree.is_element(node, &self.namespace, local)
    }

    /// `w:<local>` descendants of `node`
    #[must_use]
    pub fn descendants(&self, tree: &DocumentTree, node: NodeId, local: &str) -> Vec<NodeId> {
        tree.descendants(node, &self.namespace, local)
    }

    /// First `w:body` in the document
    #[must_use]
    pub fn body(&self, tree: &DocumentTree) -> Option<NodeId> {
        self.descendants(tree, tree.root(), BODY).into_iter().next()
    }
}

/// Visible text of `node`: every `w:t` beneath it, concatenated
///
/// Field codes, deleted text and other non-`w:t` content do not count.
#[must_use]
pub fn visible_text(tree: &DocumentTree, node: NodeId) -> String {
    let namespace = document_namespace(tree);
    visible_text_in(tree, node, &namespace)
}

pub(crate) fn visible_text_in(tree: &DocumentTree, node: NodeId, namespace: &str) -> String {
    if tree.is_element(node, namespace, TEXT) {
        return tree.text_content(node);
    }
    tree.descendants(node, namespace, TEXT)
        .into_iter()
        .map(|t| tree.text_content(t))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(body: &str) -> DocumentTree {
        DocumentTree::parse(&format!(
            r#"<w:document xmlns:w="{W_NS}"><w:body>{body}</w:body></w:document>"#
        ))
        .unwrap()
    }

    #[test]
    fn visible_text_ignores_non_text_elements() {
        let tree = doc(
            "<w:p><w:r><w:t>Plan </w:t></w:r><w:r><w:instrText>PAGE</w:instrText></w:r>\
             <w:r><w:t>Name</w:t></w:r></w:p>",
        );
        assert_eq!(visible_text(&tree, tree.root()), "Plan Name");
    }

    #[test]
    fn text_run_uses_existing_prefix() {
        let mut tree = DocumentTree::parse(&format!(
            r#"<x:document xmlns:x="{W_NS}"><x:body><x:p/></x:body></x:document>"#
        ))
        .unwrap();
        let wml = Wml::bind(&mut tree).unwrap();
        let p = wml.descendants(&tree, tree.root(), PARAGRAPH)[0];
        let run = wml.text_run(&mut tree, "hi").unwrap();
        tree.append_child(p, run).unwrap();

        let xml = tree.serialize().unwrap();
        assert!(xml.contains(r#"<x:p><x:r><x:t xml:space="preserve">hi</x:t></x:r></x:p>"#), "{xml}");
    }

    #[test]
    fn bind_declares_missing_namespace() {
        let mut tree = DocumentTree::parse("<document><body/></document>").unwrap();
        let wml = Wml::bind(&mut tree).unwrap();
        assert_eq!(wml.namespace(), W_NS);
        assert_eq!(
            tree.element(tree.root()).unwrap().attribute("xmlns:w"),
            Some(W_NS)
        );
    }

    #[test]
    fn append_lines_inserts_breaks() {
        let mut tree = doc("<w:p/>");
        let wml = Wml::bind(&mut tree).unwrap();
        let p = wml.descendants(&tree, tree.root(), PARAGRAPH)[0];
        wml.append_lines(&mut tree, p, "a\nb").unwrap();

        let runs = wml.descendants(&tree, p, RUN);
        assert_eq!(runs.len(), 3);
        assert_eq!(wml.descendants(&tree, runs[1], BREAK).len(), 1);
        assert_eq!(visible_text(&tree, p), "ab");
    }

    #[test]
    fn trailing_newline_round_trips() {
        let mut tree = doc("<w:p/>");
        let wml = Wml::bind(&mut tree).unwrap();
        let p = wml.descendants(&tree, tree.root(), PARAGRAPH)[0];
        wml.append_lines(&mut tree, p, "a\n").unwrap();

        let once = tree.serialize().unwrap();
        let twice = DocumentTree::parse(&once).unwrap().serialize().unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn document_namespace_follows_root_declaration() {
        let tree = DocumentTree::parse(r#"<w:document xmlns:w="urn:custom"/>"#).unwrap();
        assert_eq!(document_namespace(&tree), "urn:custom");
    }
}
