//! Label locator
//!
//! Finds tables and cells in a WordprocessingML tree by the human-visible
//! text around them, never by position or bookmark. Every lookup is
//! read-only and answers with a [`LocatorResult`]: a miss carries the
//! reason string that ends up in the injection log.
//!
//! # Matching rules
//!
//! - Headings and table text: case-insensitive substring of visible text
//! - Cell labels: exact, case-sensitive match after [`normalize_label`]
//! - First match in document order wins

use std::fmt;

use crate::tree::{DocumentTree, NodeId};
use crate::wml::{self, document_namespace, visible_text_in};

/// Outcome of a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorResult {
    /// Matching table or cell
    Found(NodeId),
    /// Miss, with the reason recorded in the injection log
    NotFound(String),
}

impl LocatorResult {
    /// Node, if found
    #[inline]
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Found(node) => Some(*node),
            Self::NotFound(_) => None,
        }
    }

    /// Miss reason, if not found
    #[inline]
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Found(_) => None,
            Self::NotFound(reason) => Some(reason),
        }
    }

    /// True on a hit
    #[inline]
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Convert to `Result`, miss reason as the error
    ///
    /// # Errors
    /// The miss reason when nothing was found
    pub fn into_result(self) -> Result<NodeId, String> {
        match self {
            Self::Found(node) => Ok(node),
            Self::NotFound(reason) => Err(reason),
        }
    }
}

impl fmt::Display for LocatorResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(node) => write!(f, "found {node}"),
            Self::NotFound(reason) => f.write_str(reason),
        }
    }
}

/// Collapse whitespace runs to one space and trim
#[must_use]
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`normalize`], then drop one trailing colon
///
/// Whitespace before the dropped colon is kept: `"DOPT :"` becomes `"DOPT "`.
#[must_use]
pub fn normalize_label(text: &str) -> String {
    let mut normalized = normalize(text);
    if normalized.ends_with(':') {
        normalized.pop();
    }
    normalized
}

/// Read-only queries over one document tree
#[derive(Debug, Clone)]
pub struct Locator<'t> {
    tree: &'t DocumentTree,
    namespace: String,
}

impl<'t> Locator<'t> {
    /// Locator over `tree`, using the namespace its root binds to `w`
    #[must_use]
    pub fn new(tree: &'t DocumentTree) -> Self {
        Self {
            tree,
            namespace: document_namespace(tree),
        }
    }

    /// The tree being queried
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &'t DocumentTree {
        self.tree
    }

    /// Visible (`w:t`) text of a node
    #[must_use]
    pub fn visible_text(&self, node: NodeId) -> String {
        visible_text_in(self.tree, node, &self.namespace)
    }

    fn all(&self, scope: NodeId, local: &str) -> Vec<NodeId> {
        self.tree.descendants(scope, &self.namespace, local)
    }

    /// First table that directly follows a paragraph mentioning `heading`
    ///
    /// Only the body's direct children are walked. Once a paragraph whose
    /// visible text contains `heading` (case-insensitive) has been seen, the
    /// next table wins, even if other paragraphs come in between.
    #[must_use]
    pub fn find_table_after_heading(&self, heading: &str) -> Option<NodeId> {
        let needle = heading.to_lowercase();
        let body = self.all(self.tree.root(), wml::BODY).into_iter().next()?;

        let mut seen = false;
        for child in self.tree.element_children(body) {
            if self.tree.is_element(child, &self.namespace, wml::PARAGRAPH)
                && self.visible_text(child).to_lowercase().contains(&needle)
            {
                seen = true;
                continue;
            }
            if seen && self.tree.is_element(child, &self.namespace, wml::TABLE) {
                return Some(child);
            }
        }
        None
    }

    /// First table anywhere whose own visible text contains `needle`
    #[must_use]
    pub fn find_table_containing_text(&self, needle: &str) -> Option<NodeId> {
        let needle = needle.to_lowercase();
        self.all(self.tree.root(), wml::TABLE)
            .into_iter()
            .find(|&table| self.visible_text(table).to_lowercase().contains(&needle))
    }

    /// Table of a rates block: heading adjacency first, containment second
    #[must_use]
    pub fn find_rates_block_table(&self, heading: &str) -> LocatorResult {
        match self
            .find_table_after_heading(heading)
            .or_else(|| self.find_table_containing_text(heading))
        {
            Some(table) => LocatorResult::Found(table),
            None => {
                tracing::debug!(heading, "rates block table not found");
                LocatorResult::NotFound(format!("rates block not found: {heading}"))
            }
        }
    }

    fn find_cell_in(&self, scope: NodeId, label: &str) -> Option<NodeId> {
        let wanted = normalize_label(label);
        self.all(scope, wml::CELL)
            .into_iter()
            .find(|&cell| normalize_label(&self.visible_text(cell)) == wanted)
    }

    /// First cell of `table` whose label equals `label`
    #[must_use]
    pub fn find_cell_by_label(&self, table: NodeId, label: &str) -> LocatorResult {
        match self.find_cell_in(table, label) {
            Some(cell) => LocatorResult::Found(cell),
            None => LocatorResult::NotFound(format!("label not found in block: {label}")),
        }
    }

    /// First cell in the whole document whose label equals `label`
    #[must_use]
    pub fn find_cell_by_label_anywhere(&self, label: &str) -> LocatorResult {
        match self.find_cell_in(self.tree.root(), label) {
            Some(cell) => LocatorResult::Found(cell),
            None => LocatorResult::NotFound(format!("label not found: {label}")),
        }
    }

    /// First table whose visible text contains every label
    #[must_use]
    pub fn find_table_containing_all_labels(&self, labels: &[&str]) -> LocatorResult {
        let needles: Vec<String> = labels
            .iter()
            .map(|label| normalize_label(label).to_lowercase())
            .collect();

        self.all(self.tree.root(), wml::TABLE)
            .into_iter()
            .find(|&table| {
                let text = self.visible_text(table).to_lowercase();
                needles.iter().all(|needle| text.contains(needle.as_str()))
            })
            .map_or_else(
                || {
                    LocatorResult::NotFound(format!(
                        "no table contains all labels: {}",
                        labels.join(", ")
                    ))
                },
                LocatorResult::Found,
            )
    }

    /// Cell immediately to the right of the first cell labelled `label`
    ///
    /// Rows are scanned in order; within a row the first matching cell
    /// decides, and a label in the last column is a miss.
    #[must_use]
    pub fn find_cell_right_of_label(&self, table: NodeId, label: &str) -> LocatorResult {
        let wanted = normalize_label(label);
        for row in self.all(table, wml::ROW) {
            let cells = self.all(row, wml::CELL);
            let Some(index) = cells
                .iter()
                .position(|&cell| normalize_label(&self.visible_text(cell)) == wanted)
            else {
                continue;
            };
            return match cells.get(index + 1) {
                Some(&right) => LocatorResult::Found(right),
                None => LocatorResult::NotFound(format!("no value cell to right of '{label}'")),
            };
        }
        LocatorResult::NotFound(format!("label not found in metadata table: '{label}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wml::W_NS;
    use pretty_assertions::assert_eq;

    fn p(text: &str) -> String {
        format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
    }

    fn tbl(rows: &[&[&str]]) -> String {
        let mut xml = String::from("<w:tbl>");
        for row in rows {
            xml.push_str("<w:tr>");
            for cell in *row {
                xml.push_str("<w:tc>");
                xml.push_str(&p(cell));
                xml.push_str("</w:tc>");
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");
        xml
    }

    fn doc(blocks: &[String]) -> DocumentTree {
        DocumentTree::parse(&format!(
            r#"<w:document xmlns:w="{W_NS}"><w:body>{}</w:body></w:document>"#,
            blocks.concat()
        ))
        .unwrap()
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize("  Plan \t\n Name  "), "Plan Name");
        assert_eq!(normalize_label(" Case  Number: "), "Case Number");
        assert_eq!(normalize_label("Rate::"), "Rate:");
        assert_eq!(normalize_label("DOPT :"), "DOPT ");
        assert_eq!(normalize_label("\u{a0}BPD\u{a0}"), "BPD");
    }

    #[test]
    fn label_match_is_exact_not_substring() {
        let tree = doc(&[tbl(&[&["DOPT (Termination Date)", "x"], &["DOPT", "y"]])]);
        let locator = Locator::new(&tree);

        let cell = locator.find_cell_by_label_anywhere("DOPT").node().unwrap();
        assert_eq!(locator.visible_text(cell), "DOPT");
    }

    #[test]
    fn label_match_is_case_sensitive() {
        let tree = doc(&[tbl(&[&["Plan Name"]])]);
        let locator = Locator::new(&tree);
        assert_eq!(
            locator.find_cell_by_label_anywhere("plan name"),
            LocatorResult::NotFound("label not found: plan name".to_string())
        );
    }

    #[test]
    fn heading_adjacency_skips_intervening_paragraphs() {
        let tree = doc(&[
            tbl(&[&["unrelated"]]),
            p("PBGC Lump Sum Rates"),
            p("Rates as of the valuation date"),
            tbl(&[&["Immediate Rate", "Deferral Rate"]]),
            tbl(&[&["second"]]),
        ]);
        let locator = Locator::new(&tree);
        let table = locator.find_table_after_heading("pbgc lump sum rates").unwrap();
        assert_eq!(locator.visible_text(table), "Immediate RateDeferral Rate");
    }

    #[test]
    fn heading_adjacency_beats_containment() {
        let t1 = tbl(&[&["PBGC Lump Sum Rates", "Immediate Rate"]]);
        let t2 = tbl(&[&["Immediate Rate", "Deferral Rate"]]);
        let tree = doc(&[t1, p("PBGC Lump Sum Rates"), t2]);
        let locator = Locator::new(&tree);

        let table = locator.find_rates_block_table("PBGC Lump Sum Rates").node().unwrap();
        assert_eq!(locator.visible_text(table), "Immediate RateDeferral Rate");
    }

    #[test]
    fn containment_fallback_when_no_heading_paragraph() {
        let tree = doc(&[
            tbl(&[&["other"]]),
            tbl(&[&["PBGC Annuity Rates"], &["Immediate Rate", "Deferral Rate"]]),
        ]);
        let locator = Locator::new(&tree);
        let table = locator.find_rates_block_table("PBGC Annuity Rates").node().unwrap();
        assert!(locator.visible_text(table).starts_with("PBGC Annuity Rates"));
    }

    #[test]
    fn rates_block_miss_reason() {
        let tree = doc(&[p("nothing here")]);
        let locator = Locator::new(&tree);
        assert_eq!(
            locator.find_rates_block_table("PBGC Annuity Rates").reason(),
            Some("rates block not found: PBGC Annuity Rates")
        );
    }

    #[test]
    fn cell_by_label_is_scoped_to_table() {
        let tree = doc(&[tbl(&[&["Immediate Rate"]]), tbl(&[&["Deferral Rate"]])]);
        let locator = Locator::new(&tree);
        let first = locator.find_table_containing_text("immediate").unwrap();

        assert!(locator.find_cell_by_label(first, "Immediate Rate").is_found());
        assert_eq!(
            locator.find_cell_by_label(first, "Deferral Rate").reason(),
            Some("label not found in block: Deferral Rate")
        );
    }

    #[test]
    fn table_containing_all_labels() {
        let tree = doc(&[
            tbl(&[&["Plan Name:", "x"]]),
            tbl(&[&["Plan Name:", "x"], &["EIN", "y"]]),
        ]);
        let locator = Locator::new(&tree);
        let table = locator
            .find_table_containing_all_labels(&["plan name:", "EIN"])
            .node()
            .unwrap();
        assert_eq!(locator.visible_text(table), "Plan Name:xEINy");
        assert!(!locator
            .find_table_containing_all_labels(&["Plan Name", "Sponsor"])
            .is_found());
    }

    #[test]
    fn cell_right_of_label() {
        let tree = doc(&[tbl(&[&["Plan Name:", "old"], &["EIN"]])]);
        let locator = Locator::new(&tree);
        let table = locator.find_table_containing_text("plan name").unwrap();

        let right = locator.find_cell_right_of_label(table, "Plan Name").node().unwrap();
        assert_eq!(locator.visible_text(right), "old");
        assert_eq!(
            locator.find_cell_right_of_label(table, "EIN").reason(),
            Some("no value cell to right of 'EIN'")
        );
        assert_eq!(
            locator.find_cell_right_of_label(table, "Sponsor").reason(),
            Some("label not found in metadata table: 'Sponsor'")
        );
    }

    #[test]
    fn lookups_do_not_mutate() {
        let tree = doc(&[p("PBGC Lump Sum Rates"), tbl(&[&["Immediate Rate"]])]);
        let before = tree.serialize().unwrap();
        let locator = Locator::new(&tree);
        let _ = locator.find_rates_block_table("PBGC Lump Sum Rates");
        let _ = locator.find_cell_by_label_anywhere("Immediate Rate");
        assert_eq!(tree.serialize().unwrap(), before);
    }
}
