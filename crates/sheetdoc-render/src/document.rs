//! WordprocessingML view over a docx package.
//!
//! Only body-level paragraphs and tables are exposed; paragraphs nested in
//! tables, text boxes or headers are not visited.

use sheetdoc_core::{RenderError, TemplateError};

use crate::package::DocxPackage;
use crate::xml::{Element, Node, XmlDocument};

pub(crate) const W_BODY: &str = "w:body";
pub(crate) const W_P: &str = "w:p";
pub(crate) const W_PPR: &str = "w:pPr";
pub(crate) const W_R: &str = "w:r";
pub(crate) const W_T: &str = "w:t";
pub(crate) const W_TBL: &str = "w:tbl";
pub(crate) const W_TR: &str = "w:tr";
pub(crate) const W_TC: &str = "w:tc";
pub(crate) const W_TCPR: &str = "w:tcPr";

/// A docx package with its main document part parsed
#[derive(Clone, Debug)]
pub struct DocxDocument {
    package: DocxPackage,
    main_part: String,
    xml: XmlDocument,
}

impl DocxDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RenderError> {
        let package = DocxPackage::from_bytes(bytes)?;
        let main_part = package.main_part_name()?;
        let xml = match package.get(&main_part) {
            Some(data) => XmlDocument::parse(data)?,
            None => return Err(TemplateError::MissingPart(main_part).into()),
        };

        if xml.root.child(W_BODY).is_none() {
            return Err(TemplateError::MissingPart(format!("{main_part}#{W_BODY}")).into());
        }

        Ok(Self {
            package,
            main_part,
            xml,
        })
    }

    pub fn body(&self) -> &Element {
        self.xml
            .root
            .child(W_BODY)
            .unwrap_or(&self.xml.root)
    }

    pub fn body_mut(&mut self) -> &mut Element {
        let root = &mut self.xml.root;
        let position = root
            .children
            .iter()
            .position(|node| matches!(node, Node::Element(e) if e.is(W_BODY)));
        match position {
            Some(i) => match &mut root.children[i] {
                Node::Element(body) => body,
                _ => unreachable!("position matched an element"),
            },
            None => root,
        }
    }

    /// Body-level paragraphs
    pub fn paragraphs(&self) -> impl Iterator<Item = &Element> {
        self.body().children_named(W_P)
    }

    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.body_mut().children_named_mut(W_P)
    }

    /// Body-level tables
    pub fn tables(&self) -> impl Iterator<Item = &Element> {
        self.body().children_named(W_TBL)
    }

    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.body_mut().children_named_mut(W_TBL)
    }

    /// Text of every body-level paragraph
    pub fn paragraph_texts(&self) -> Vec<String> {
        self.paragraphs().map(paragraph_text).collect()
    }

    /// Cell texts of a body-level table, row by row
    pub fn table_texts(&self, index: usize) -> Option<Vec<Vec<String>>> {
        self.tables().nth(index).map(|tbl| {
            rows(tbl)
                .map(|tr| cells(tr).map(cell_text).collect())
                .collect()
        })
    }

    /// Serialize the package with the edited main part
    pub fn to_bytes(&self) -> Result<Vec<u8>, RenderError> {
        let mut package = self.package.clone();
        package.put(&self.main_part, self.xml.to_bytes()?);
        package.to_bytes()
    }
}

// ============================================================================
// Paragraphs
// ============================================================================

/// Visible text of a paragraph: runs and hyperlinked runs
pub fn paragraph_text(paragraph: &Element) -> String {
    let mut text = String::new();
    for child in paragraph.elements() {
        match child.name.as_str() {
            W_R => push_run_text(child, &mut text),
            "w:hyperlink" => {
                for run in child.children_named(W_R) {
                    push_run_text(run, &mut text);
                }
            }
            _ => {}
        }
    }
    text
}

fn push_run_text(run: &Element, out: &mut String) {
    for child in run.elements() {
        match child.name.as_str() {
            W_T => out.push_str(&child.text()),
            "w:tab" => out.push('\t'),
            "w:br" | "w:cr" => out.push('\n'),
            _ => {}
        }
    }
}

/// Replace all content except the paragraph properties with a single run
pub fn set_paragraph_text(paragraph: &mut Element, text: &str) {
    paragraph.retain_elements(&[W_PPR]);
    paragraph.children.push(Node::Element(run(text)));
}

/// A plain run; tabs and line breaks become `w:tab` and `w:br`
fn run(text: &str) -> Element {
    let mut run = Element::new(W_R);
    let mut piece = String::new();
    let flush = |piece: &mut String, run: &mut Element| {
        if !piece.is_empty() {
            run.children.push(Node::Element(
                Element::new(W_T)
                    .with_attr("xml:space", "preserve")
                    .with_text(std::mem::take(piece)),
            ));
        }
    };

    for ch in text.chars() {
        match ch {
            '\t' => {
                flush(&mut piece, &mut run);
                run.children.push(Node::Element(Element::new("w:tab")));
            }
            '\n' => {
                flush(&mut piece, &mut run);
                run.children.push(Node::Element(Element::new("w:br")));
            }
            _ => piece.push(ch),
        }
    }
    flush(&mut piece, &mut run);
    run
}

// ============================================================================
// Tables
// ============================================================================

pub fn rows(table: &Element) -> impl Iterator<Item = &Element> {
    table.children_named(W_TR)
}

pub fn cells(row: &Element) -> impl Iterator<Item = &Element> {
    row.children_named(W_TC)
}

/// Paragraph texts of a cell joined by newlines
pub fn cell_text(cell: &Element) -> String {
    cell.children_named(W_P)
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Replace a cell's content with one paragraph holding `text`
pub fn set_cell_text(cell: &mut Element, text: &str) {
    cell.retain_elements(&[W_TCPR]);
    cell.children
        .push(Node::Element(Element::new(W_P).with_child(run(text))));
}

/// Append an empty row with one cell per grid column; returns the new row
pub fn add_row(table: &mut Element) -> &mut Element {
    let widths: Vec<Option<String>> = table
        .child("w:tblGrid")
        .map(|grid| {
            grid.children_named("w:gridCol")
                .map(|col| col.attr("w:w").map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let mut row = Element::new(W_TR);
    for width in widths {
        let mut cell = Element::new(W_TC);
        if let Some(w) = width {
            cell.children.push(Node::Element(
                Element::new(W_TCPR).with_child(
                    Element::new("w:tcW")
                        .with_attr("w:w", w)
                        .with_attr("w:type", "dxa"),
                ),
            ));
        }
        cell.children.push(Node::Element(Element::new(W_P)));
        row.children.push(Node::Element(cell));
    }

    table.children.push(Node::Element(row));
    match table.children.last_mut() {
        Some(Node::Element(row)) => row,
        _ => unreachable!("row was just pushed"),
    }
}
