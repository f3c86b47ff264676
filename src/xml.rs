//! TEI document access.
//!
//! Reading goes through `roxmltree`. Writing never re-serializes a tree:
//! new documents are a fixed template with verbatim source ranges spliced in,
//! so the markup of extracted fragments is preserved byte for byte.

use crate::error::{MatchError, Result};
use roxmltree::{Document, Node, ParsingOptions, NS_XML_URI};
use std::fs;
use std::ops::Range;
use std::path::Path;

/// Read a document as text. Invalid UTF-8 is replaced rather than rejected.
pub fn read_document(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| MatchError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Parse a document. A DOCTYPE declaration is accepted; external DTDs are
/// not loaded.
pub fn parse<'a>(text: &'a str, path: &Path) -> Result<Document<'a>> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(text, options).map_err(|source| MatchError::XmlParse {
        path: path.to_path_buf(),
        source,
    })
}

fn missing(element: &str, path: &Path) -> MatchError {
    MatchError::MissingElement {
        element: element.to_string(),
        path: path.to_path_buf(),
    }
}

/// Concatenated text of all descendants.
pub fn text_content(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// First element with the given local name, in document order.
pub fn first_element<'a, 'input>(root: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    root.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// `id` or `xml:id` of an element.
pub fn element_id<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.attribute((NS_XML_URI, "id"))
        .or_else(|| node.attribute("id"))
}

/// Element whose `id` or `xml:id` equals `id`.
pub fn find_by_id<'a, 'input>(doc: &'a Document<'input>, id: &str) -> Option<Node<'a, 'input>> {
    doc.descendants()
        .find(|n| n.is_element() && element_id(*n) == Some(id))
}

/// Text of the first `<title>` anywhere in the document, trimmed.
pub fn title_text(text: &str, path: &Path) -> Result<String> {
    let doc = parse(text, path)?;
    first_element(doc.root(), "title")
        .map(|n| text_content(n).trim().to_string())
        .ok_or_else(|| missing("title", path))
}

/// Text of the first `<title>` inside `<teiHeader>`, trimmed.
pub fn tei_header_title(text: &str, path: &Path) -> Result<String> {
    let doc = parse(text, path)?;
    let header = first_element(doc.root(), "teiHeader").ok_or_else(|| missing("teiHeader", path))?;
    first_element(header, "title")
        .map(|n| text_content(n).trim().to_string())
        .ok_or_else(|| missing("title", path))
}

/// Verbatim source of the `<body>` element.
pub fn body_source<'a>(text: &'a str, path: &Path) -> Result<&'a str> {
    let doc = parse(text, path)?;
    let body = first_element(doc.root(), "body").ok_or_else(|| missing("body", path))?;
    Ok(&text[body.range()])
}

/// Source range covering an element's children, without its own tags.
/// Empty (and positioned at the element end) for childless elements.
pub fn inner_range(node: Node) -> Range<usize> {
    match (node.first_child(), node.last_child()) {
        (Some(first), Some(last)) => first.range().start..last.range().end,
        _ => node.range().end..node.range().end,
    }
}

/// Copy `outer` out of `text`, leaving out each range in `removed`.
/// Ranges outside `outer` or nested in an earlier removed range are ignored.
pub fn splice_out(text: &str, outer: Range<usize>, removed: &[Range<usize>]) -> String {
    let mut sorted: Vec<&Range<usize>> = removed
        .iter()
        .filter(|r| r.start >= outer.start && r.end <= outer.end)
        .collect();
    sorted.sort_by_key(|r| r.start);

    let mut out = String::with_capacity(outer.len());
    let mut cursor = outer.start;
    for range in sorted {
        if range.start < cursor {
            continue;
        }
        out.push_str(&text[cursor..range.start]);
        cursor = range.end;
    }
    out.push_str(&text[cursor..outer.end]);
    out
}

/// Escape text for use as element content.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// TEI TEMPLATES
// ============================================================================

const TEI_HEADER_START: &str = r#"<teiHeader>
<fileDesc>
  <titleStmt>
    <title>"#;

const TEI_HEADER_END: &str = r#"</title>
    <respStmt>
      <resp/>
      <name/>
    </respStmt>
  </titleStmt>
  <publicationStmt>
    <publisher>Zacharias Topelius Skrifter</publisher>
  </publicationStmt>
  <sourceDesc>
    <p/>
  </sourceDesc>
</fileDesc>
</teiHeader>"#;

const READING_TEXT_ROOT: &str = r#"<TEI xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns="http://www.tei-c.org/ns/1.0" xsi:schemaLocation="http://www.tei-c.org/ns/1.0 file:/T:/Instruktioner,%20manualer,%20scheman/TEI-scheman%20(AM)/tei_barnschema.xsd">"#;

const COMMENT_ROOT: &str = r#"<TEI xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.sls.fi/tei file:/T:/Instruktioner,%20manualer,%20scheman/TEI-scheman%20(AM)/tei_redtextschema.xsd" xmlns="http://www.tei-c.org/ns/1.0">"#;

fn header(title: &str) -> String {
    format!("{TEI_HEADER_START}{}{TEI_HEADER_END}", escape_text(title))
}

/// Reading-text document: `content` goes verbatim into `<div type="collection">`.
pub fn reading_text_document(title: &str, content: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{READING_TEXT_ROOT}\n{}\n<text>\n<body xml:space=\"preserve\">\n<div type=\"collection\">\n{content}\n</div>\n</body>\n</text>\n</TEI>\n",
        header(title)
    )
}

/// General-comment document with comment, notes and bibliography divisions.
pub fn comment_document(title: &str, comment: &str, bibliography: Option<&str>) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{COMMENT_ROOT}\n{}\n<text>\n<body xml:space=\"preserve\">\n<div type=\"comment\">\n<lb/>\n{comment}\n</div>\n<div type=\"notes\">\n</div>\n<div type=\"bibl\">\n{}\n</div>\n</body>\n</text>\n</TEI>\n",
        header(title),
        bibliography.unwrap_or("")
    )
}
