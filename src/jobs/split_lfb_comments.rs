//! `split-lfb-comments`: one general-comment file per Läsning för barn story.
//!
//! The comment source is a single XML file whose body holds one div per part.
//! Inside a part, each story comment is a div nested in another div and
//! starts with a `<head>` naming the story.

use super::{lfb_part_folder, publication_id_by_legacy_id, write_file};
use crate::config::Config;
use crate::lookup::{self, LfbEntry};
use crate::normalize::split_comment_file_name;
use crate::progress::JobProgress;
use crate::xml::{self, first_element, inner_range, splice_out, text_content};
use anyhow::{Context, Result};
use roxmltree::{Document, Node};
use rusqlite::{params, Connection};

/// Stored-path prefix of the split comments.
pub const COMMENT_TRUNK: &str = "documents/Redaktionella_texter/Kommentarer/Lasning_for_barn";

const BIBLIOGRAPHY_REND: &str = "Litteratur";

/// "Lasning_for_barn_3_komm/sampo_lappelill_komm.xml"
pub fn comment_relative_path(part: u32, name: &str) -> String {
    format!(
        "{}_komm/{}",
        lfb_part_folder(part),
        split_comment_file_name(name)
    )
}

fn is_div(node: &Node) -> bool {
    node.is_element() && node.tag_name().name() == "div"
}

/// Top-level divs of the body, one per part.
fn part_divs<'a, 'i>(doc: &'a Document<'i>) -> Vec<Node<'a, 'i>> {
    first_element(doc.root(), "body")
        .map(|body| body.children().filter(is_div).collect())
        .unwrap_or_default()
}

/// First nested div whose first `<head>` reads `name`, ignoring case and
/// surrounding whitespace.
fn find_comment<'a, 'i>(part: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    let wanted = name.trim().to_lowercase();
    part.descendants()
        .filter(|n| is_div(n) && n.parent_element().is_some_and(|p| is_div(&p)))
        .find(|c| {
            first_element(*c, "head")
                .is_some_and(|head| text_content(head).trim().to_lowercase() == wanted)
        })
}

/// Content of a comment div without its head and bibliography, and the
/// bibliography source if present.
pub fn extract_comment(text: &str, comment: Node) -> (String, Option<String>) {
    let head = first_element(comment, "head");
    let bibliography = comment
        .descendants()
        .find(|n| n.is_element() && n.attribute("rend") == Some(BIBLIOGRAPHY_REND));
    let removed: Vec<_> = head.iter().chain(bibliography.iter()).map(|n| n.range()).collect();
    let content = splice_out(text, inner_range(comment), &removed);
    (content, bibliography.map(|b| text[b.range()].to_string()))
}

/// A comment file written, with the publication it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitComment {
    pub legacy_id: String,
    pub path: String,
}

fn split_one(config: &Config, text: &str, parts: &[Node], entry: &LfbEntry) -> Result<Option<SplitComment>> {
    let Some(part) = entry.part().filter(|p| (1..=parts.len() as u32).contains(p)) else {
        eprintln!("Warning: no comment part for {} ({})", entry.name, entry.whole_id);
        return Ok(None);
    };
    let Some(comment) = find_comment(parts[part as usize - 1], &entry.name) else {
        eprintln!("Warning: no comment for {} in part {}", entry.name, part);
        return Ok(None);
    };

    let (content, bibliography) = extract_comment(text, comment);
    let relative = comment_relative_path(part, &entry.name);
    write_file(
        &config.lfb_comment_split_dir.join(&relative),
        &xml::comment_document(&entry.name, content.trim(), bibliography.as_deref()),
    )?;
    Ok(Some(SplitComment {
        legacy_id: entry.legacy_id.clone(),
        path: format!("{}/{}", COMMENT_TRUNK, relative),
    }))
}

fn insert_comments(target: &mut Connection, comments: &[SplitComment]) -> Result<usize> {
    let tx = target.transaction()?;
    let mut linked = 0;
    {
        let mut insert = tx.prepare(
            "INSERT INTO publication_comment (published, legacy_id, original_filename) VALUES (1, ?1, ?2)",
        )?;
        let mut link = tx.prepare("UPDATE publication SET publication_comment_id = ?1 WHERE id = ?2")?;
        for comment in comments {
            let Some(publication_id) = publication_id_by_legacy_id(&tx, &comment.legacy_id)? else {
                eprintln!("Warning: no publication with legacy id {}", comment.legacy_id);
                continue;
            };
            insert.execute(params![comment.legacy_id, comment.path])?;
            link.execute(params![tx.last_insert_rowid(), publication_id])?;
            linked += 1;
        }
    }
    tx.commit().context("Failed to commit Läsning för barn comments")?;
    Ok(linked)
}

pub fn run(target: &mut Connection, config: &Config) -> Result<Vec<SplitComment>> {
    let entries = lookup::read_lfb_split(&config.csv_path(lookup::LFB_SPLIT))?;
    let text = xml::read_document(&config.lfb_comment_source)?;
    let doc = xml::parse(&text, &config.lfb_comment_source)?;
    let parts = part_divs(&doc);

    let mut comments = Vec::new();
    let mut progress = JobProgress::new("Split comments", entries.len());
    for entry in &entries {
        progress.inc();
        if let Some(comment) = split_one(config, &text, &parts, entry)? {
            comments.push(comment);
        }
    }
    progress.finish(&format!("{} comments from {} parts", comments.len(), parts.len()));

    let rows: Vec<(String, String)> = comments
        .iter()
        .map(|c| (c.legacy_id.clone(), c.path.clone()))
        .collect();
    lookup::write_pairs(&config.csv_path(lookup::LFB_COMMENT_FILES), &rows)?;

    let linked = insert_comments(target, &comments)?;
    eprintln!("Linked {} of {} comments to publications", linked, comments.len());
    Ok(comments)
}
