// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ZIP-based office documents (DOCX, PPTX, ODT, ODP) — text and page counts
// read straight from their XML parts with `zip` + `roxmltree`.

use std::io::{Cursor, Read};

use docwerk_core::error::{DocwerkError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use roxmltree::{Document, Node, NodeId};
use tracing::debug;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const TEXT_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:text:1.0";
const DRAW_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:drawing:1.0";
const META_NS: &str = "urn:oasis:names:tc:opendocument:xmlns:meta:1.0";

static SLIDE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").expect("valid regex"));

/// Read-only view over the parts of a ZIP-packaged document.
pub struct OfficeArchive<'a> {
    archive: zip::ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> OfficeArchive<'a> {
    pub fn open(bytes: &'a [u8]) -> Result<Self> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|err| DocwerkError::Malformed(format!("invalid ZIP container: {err}")))?;
        Ok(Self { archive })
    }

    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_owned).collect()
    }

    /// Read a part as UTF-8 text, `None` when the part does not exist.
    pub fn read_part(&mut self, name: &str) -> Result<Option<String>> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(err) => {
                return Err(DocwerkError::Malformed(format!("cannot open part {name}: {err}")));
            }
        };
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|err| DocwerkError::Malformed(format!("cannot read part {name}: {err}")))?;
        Ok(Some(content))
    }

    fn require_part(&mut self, name: &str) -> Result<String> {
        self.read_part(name)?
            .ok_or_else(|| DocwerkError::Malformed(format!("missing part {name}")))
    }

    /// Slide part names ordered by slide number.
    fn slide_parts(&self) -> Vec<String> {
        let mut slides: Vec<(u32, String)> = self
            .archive
            .file_names()
            .filter_map(|name| {
                let number = SLIDE_RE.captures(name)?.get(1)?.as_str().parse().ok()?;
                Some((number, name.to_owned()))
            })
            .collect();
        slides.sort();
        slides.into_iter().map(|(_, name)| name).collect()
    }
}

fn parse_xml(xml: &str) -> Result<Document<'_>> {
    Document::parse(xml).map_err(|err| DocwerkError::Malformed(format!("invalid XML: {err}")))
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Paragraph text of `word/document.xml`.
pub fn docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = OfficeArchive::open(bytes)?;
    let xml = archive.require_part("word/document.xml")?;
    let doc = parse_xml(&xml)?;
    Ok(ooxml_paragraphs(&doc, W_NS, "p", "t").join("\n"))
}

/// Slide text in slide order, slides separated by a blank line.
pub fn pptx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = OfficeArchive::open(bytes)?;
    let mut slides = Vec::new();
    for part in archive.slide_parts() {
        let xml = archive.require_part(&part)?;
        let doc = parse_xml(&xml)?;
        let lines = ooxml_paragraphs(&doc, A_NS, "p", "t");
        if !lines.is_empty() {
            slides.push(lines.join("\n"));
        }
    }
    debug!(slides = slides.len(), "presentation text collected");
    Ok(slides.join("\n\n"))
}

/// Paragraph and heading text of an OpenDocument `content.xml`.
pub fn odf_text(bytes: &[u8]) -> Result<String> {
    let mut archive = OfficeArchive::open(bytes)?;
    let xml = archive.require_part("content.xml")?;
    let doc = parse_xml(&xml)?;

    let lines: Vec<String> = doc
        .descendants()
        .filter(|n| is_odf_block(n) && !n.ancestors().skip(1).any(|a| is_odf_block(&a)))
        .map(|n| {
            let mut line = String::new();
            collect_odf_text(n, &mut line);
            line.trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect();
    Ok(lines.join("\n"))
}

/// Collect OOXML paragraphs: text runs grouped by their nearest paragraph
/// ancestor, tabs and breaks kept.
fn ooxml_paragraphs(doc: &Document<'_>, ns: &str, para: &str, text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current: Option<NodeId> = None;

    for node in doc.descendants().filter(|n| n.is_element()) {
        if node.tag_name().namespace() != Some(ns) {
            continue;
        }
        let piece = match node.tag_name().name() {
            name if name == text => node.text().unwrap_or(""),
            // Tab stops in paragraph properties are definitions, not content.
            "tab" if node.parent().is_some_and(|p| p.tag_name().name() != "tabs") => "\t",
            "br" | "cr" => "\n",
            _ => continue,
        };
        let owner = node
            .ancestors()
            .find(|a| a.has_tag_name((ns, para)))
            .map(|a| a.id());
        if owner != current || lines.is_empty() {
            lines.push(String::new());
            current = owner;
        }
        if let Some(line) = lines.last_mut() {
            line.push_str(piece);
        }
    }

    lines
        .into_iter()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.trim().is_empty())
        .collect()
}

fn is_odf_block(node: &Node<'_, '_>) -> bool {
    node.has_tag_name((TEXT_NS, "p")) || node.has_tag_name((TEXT_NS, "h"))
}

fn collect_odf_text(node: Node<'_, '_>, out: &mut String) {
    for child in node.children() {
        if child.is_text() {
            out.push_str(child.text().unwrap_or(""));
            continue;
        }
        if child.tag_name().namespace() != Some(TEXT_NS) {
            continue;
        }
        match child.tag_name().name() {
            "s" => {
                let count = child
                    .attribute((TEXT_NS, "c"))
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(1usize);
                out.extend(std::iter::repeat_n(' ', count));
            }
            "tab" => out.push('\t'),
            "line-break" => out.push('\n'),
            "note" | "annotation" => {}
            _ => collect_odf_text(child, out),
        }
    }
}

// ---------------------------------------------------------------------------
// Page counts
// ---------------------------------------------------------------------------

/// `<Pages>` from `docProps/app.xml`, as recorded by the authoring application.
pub fn docx_page_count(bytes: &[u8]) -> Option<u32> {
    let mut archive = OfficeArchive::open(bytes).ok()?;
    let xml = archive.read_part("docProps/app.xml").ok()??;
    let doc = Document::parse(&xml).ok()?;
    doc.descendants()
        .find(|n| n.tag_name().name() == "Pages")
        .and_then(|n| n.text())
        .and_then(|t| t.trim().parse().ok())
}

/// Number of `ppt/slides/slideN.xml` parts.
pub fn pptx_slide_count(bytes: &[u8]) -> Option<u32> {
    let archive = OfficeArchive::open(bytes).ok()?;
    Some(archive.slide_parts().len() as u32)
}

/// `meta:page-count` from `meta.xml`, falling back to counting
/// `draw:page` elements for presentations.
pub fn odf_page_count(bytes: &[u8]) -> Option<u32> {
    let mut archive = OfficeArchive::open(bytes).ok()?;

    if let Some(xml) = archive.read_part("meta.xml").ok().flatten()
        && let Ok(doc) = Document::parse(&xml)
    {
        let recorded = doc
            .descendants()
            .find(|n| n.has_tag_name((META_NS, "document-statistic")))
            .and_then(|n| n.attribute((META_NS, "page-count")))
            .and_then(|c| c.parse().ok());
        if recorded.is_some() {
            return recorded;
        }
    }

    let xml = archive.read_part("content.xml").ok()??;
    let doc = Document::parse(&xml).ok()?;
    let pages = doc
        .descendants()
        .filter(|n| n.has_tag_name((DRAW_NS, "page")))
        .count();
    (pages > 0).then_some(pages as u32)
}
