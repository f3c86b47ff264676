//! Content disambiguation for version files.
//!
//! Versions of one publication live in a directory named after it, and their
//! `<title>` usually names the version. When several files still qualify, the
//! already migrated web copy decides: its body is compared with each
//! candidate body and the first one scoring at least `CONTENT_THRESHOLD` wins.

use crate::error::Result;
use crate::fuzzy::ratio;
use crate::matcher::{filter_by_directory, MatchResult};
use crate::scan::CandidatePath;
use crate::xml;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use std::path::Path;

/// Minimum whole-document similarity for a content match.
pub const CONTENT_THRESHOLD: u8 = 90;

static VOLATILE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(l|lg|p)(\s[^>]*?)?(/?)>").unwrap());
static LINE_NUMBER_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\s+n\s*=\s*("[^"]*"|'[^']*')"#).unwrap());
static XML_ID_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\s+xml:id\s*=\s*("[^"]*"|'[^']*')"#).unwrap());

/// How a candidate `<title>` is compared with the version name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleComparison {
    /// Version name (commas removed) occurs in the title (parentheses and
    /// commas removed).
    #[default]
    Contains,
    /// Trimmed title equals the trimmed version name.
    Exact,
}

/// Remove attributes added by the web pipeline: `n` on `<l>`, `xml:id` on
/// `<lg>` and `<p>`.
pub fn strip_volatile_attributes(body: &str) -> String {
    VOLATILE_TAG
        .replace_all(body, |caps: &Captures| {
            let tag = &caps[1];
            let attrs = caps.get(2).map_or("", |m| m.as_str());
            let attrs = match tag {
                "l" => LINE_NUMBER_ATTR.replace_all(attrs, ""),
                _ => XML_ID_ATTR.replace_all(attrs, ""),
            };
            format!("<{tag}{attrs}{}>", &caps[3])
        })
        .into_owned()
}

/// Whether a candidate title names the version.
pub fn title_matches(version_name: &str, title: &str, comparison: TitleComparison) -> bool {
    match comparison {
        TitleComparison::Exact => title.trim() == version_name.trim(),
        TitleComparison::Contains => {
            let needle = version_name.trim().replace(',', "");
            let haystack = title.trim().replace(['(', ')', ','], "");
            haystack.contains(&needle)
        }
    }
}

/// Access to the documents involved in disambiguation.
pub trait VersionDocuments {
    /// `<title>` text of a candidate.
    fn title(&self, path: &Path) -> Result<String>;
    /// `<body>` source of a candidate.
    fn body(&self, path: &Path) -> Result<String>;
    /// `<body>` source of the migrated web copy, volatile attributes stripped.
    fn reference_body(&self) -> Result<String>;
}

/// Files on disk; the reference is the web copy at `reference`.
pub struct FsDocuments<'a> {
    pub reference: &'a Path,
}

impl VersionDocuments for FsDocuments<'_> {
    fn title(&self, path: &Path) -> Result<String> {
        let text = xml::read_document(path)?;
        xml::title_text(&text, path)
    }

    fn body(&self, path: &Path) -> Result<String> {
        let text = xml::read_document(path)?;
        Ok(xml::body_source(&text, path)?.to_string())
    }

    fn reference_body(&self) -> Result<String> {
        let text = xml::read_document(self.reference)?;
        let body = xml::body_source(&text, self.reference)?;
        Ok(strip_volatile_attributes(body))
    }
}

/// Pick the first candidate whose body scores at least `CONTENT_THRESHOLD`
/// against the reference body. Unreadable candidates are skipped.
pub fn select_by_content<'a>(
    reference: &str,
    candidates: &[&'a CandidatePath],
    docs: &impl VersionDocuments,
) -> Option<&'a CandidatePath> {
    for candidate in candidates {
        let body = match docs.body(&candidate.path) {
            Ok(body) => body,
            Err(e) => {
                eprintln!("Warning: {}", e);
                continue;
            }
        };
        if ratio(reference, &body) >= CONTENT_THRESHOLD {
            return Some(*candidate);
        }
    }
    None
}

/// How a version was resolved, kept apart for the audit logs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionOutcome {
    /// No directory named after the publication.
    NoDirectory,
    /// Directory found; the files in it, with the final result.
    Searched {
        directory_hits: Vec<CandidatePath>,
        result: MatchResult,
    },
}

impl VersionOutcome {
    pub fn result(&self) -> MatchResult {
        match self {
            VersionOutcome::NoDirectory => MatchResult::NotFound,
            VersionOutcome::Searched { result, .. } => result.clone(),
        }
    }
}

/// Resolve one version to its source file.
///
/// Directory filter, then title filter; a single survivor is taken as is,
/// several go through `select_by_content`.
///
/// A file that cannot be read or parsed is warned about and dropped from the
/// title filter but stays among the directory hits. Without a readable
/// reference several survivors resolve to nothing.
pub fn resolve_version(
    publication_name: &str,
    version_name: &str,
    candidates: &[CandidatePath],
    comparison: TitleComparison,
    docs: &impl VersionDocuments,
) -> VersionOutcome {
    let in_directory = filter_by_directory(publication_name, candidates);
    if in_directory.is_empty() {
        return VersionOutcome::NoDirectory;
    }

    let mut titled = Vec::new();
    for candidate in &in_directory {
        match docs.title(&candidate.path) {
            Ok(title) if title_matches(version_name, &title, comparison) => titled.push(*candidate),
            Ok(_) => {}
            Err(e) => eprintln!("Warning: {}", e),
        }
    }

    let selected = match titled.as_slice() {
        [] => None,
        [only] => Some(*only),
        several => match docs.reference_body() {
            Ok(reference) => select_by_content(&reference, several, docs),
            Err(e) => {
                eprintln!("Warning: {}", e);
                None
            }
        },
    };

    VersionOutcome::Searched {
        directory_hits: in_directory.into_iter().cloned().collect(),
        result: selected.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct MemoryDocs {
        titles: HashMap<PathBuf, String>,
        bodies: HashMap<PathBuf, String>,
        reference: String,
    }

    impl MemoryDocs {
        fn new(reference: &str) -> Self {
            Self {
                titles: HashMap::new(),
                bodies: HashMap::new(),
                reference: reference.to_string(),
            }
        }

        fn add(&mut self, path: &str, title: &str, body: &str) -> CandidatePath {
            let path = PathBuf::from(path);
            self.titles.insert(path.clone(), title.to_string());
            self.bodies.insert(path.clone(), body.to_string());
            CandidatePath::new(path)
        }
    }

    impl VersionDocuments for MemoryDocs {
        fn title(&self, path: &Path) -> Result<String> {
            self.titles
                .get(path)
                .cloned()
                .ok_or_else(|| MatchError::MissingElement {
                    element: "title".into(),
                    path: path.to_path_buf(),
                })
        }

        fn body(&self, path: &Path) -> Result<String> {
            Ok(self.bodies.get(path).cloned().unwrap_or_default())
        }

        fn reference_body(&self) -> Result<String> {
            Ok(self.reference.clone())
        }
    }

    const REFERENCE: &str = "<body><lg><l>Det var en gång en liten gosse som hette Sampo</l></lg></body>";

    #[test]
    fn test_strip_volatile_attributes() {
        let web = r#"<body><lg xml:id="lg1" type="stanza"><l n="1">a</l><l rend="i" n='2'>b</l></lg><p xml:id="p3">c</p><lb n="4"/></body>"#;
        assert_eq!(
            strip_volatile_attributes(web),
            r#"<body><lg type="stanza"><l>a</l><l rend="i">b</l></lg><p>c</p><lb n="4"/></body>"#
        );
    }

    #[test]
    fn test_strip_leaves_other_tags_alone() {
        let web = r#"<label n="1"/><pb xml:id="x"/><p/>"#;
        assert_eq!(strip_volatile_attributes(web), web);
    }

    #[test]
    fn test_title_matches_contains() {
        assert!(title_matches(
            "Sampo Lappelill, version 2",
            "Sampo Lappelill version 2 (1860)",
            TitleComparison::Contains
        ));
        assert!(!title_matches(
            "Sampo Lappelill version 3",
            "Sampo Lappelill version 2",
            TitleComparison::Contains
        ));
    }

    #[test]
    fn test_title_matches_exact() {
        assert!(title_matches(" Version A ", "Version A", TitleComparison::Exact));
        assert!(!title_matches("Version A", "Version A (1860)", TitleComparison::Exact));
    }

    #[test]
    fn test_select_by_content_threshold() {
        let mut docs = MemoryDocs::new(REFERENCE);
        let low = docs.add("/v/Sampo/a.xml", "t", "<body><p>Helt annan text om något annat</p></body>");
        let high = docs.add(
            "/v/Sampo/b.xml",
            "t",
            "<body><lg><l>Det var en gång en liten gosse som hette Sampo.</l></lg></body>",
        );
        let picked = select_by_content(REFERENCE, &[&low, &high], &docs);
        assert_eq!(picked, Some(&high));

        let picked = select_by_content(REFERENCE, &[&low], &docs);
        assert_eq!(picked, None);
    }

    #[test]
    fn test_resolve_version_single_survivor() {
        let mut docs = MemoryDocs::new(REFERENCE);
        let a = docs.add("/v/Sampo_Lappelill/a.xml", "Sampo Lappelill 1860", "");
        let b = docs.add("/v/Sampo_Lappelill/b.xml", "Sampo Lappelill 1865", "");
        let other = docs.add("/v/Vinterqvallar/c.xml", "Sampo Lappelill 1860", "");
        let candidates = vec![a.clone(), b, other];

        let outcome = resolve_version(
            "Sampo Lappelill",
            "Sampo Lappelill 1860",
            &candidates,
            TitleComparison::Contains,
            &docs,
        );
        match outcome {
            VersionOutcome::Searched {
                directory_hits,
                result,
            } => {
                assert_eq!(directory_hits.len(), 2);
                assert_eq!(result, MatchResult::Found(a));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn test_resolve_version_no_directory() {
        let mut docs = MemoryDocs::new(REFERENCE);
        let c = docs.add("/v/Vinterqvallar/c.xml", "x", "");
        let outcome =
            resolve_version("Sampo Lappelill", "x", &[c], TitleComparison::Contains, &docs);
        assert_eq!(outcome, VersionOutcome::NoDirectory);
        assert_eq!(outcome.result(), MatchResult::NotFound);
    }

    #[test]
    fn test_resolve_version_ambiguous_uses_content() {
        let mut docs = MemoryDocs::new(REFERENCE);
        let a = docs.add("/v/Sampo_Lappelill/a.xml", "Sampo Lappelill", "<body><p>Annat innehåll helt och hållet</p></body>");
        let b = docs.add("/v/Sampo_Lappelill/b.xml", "Sampo Lappelill", REFERENCE);
        let outcome = resolve_version(
            "Sampo Lappelill",
            "Sampo Lappelill",
            &[a, b.clone()],
            TitleComparison::Contains,
            &docs,
        );
        assert_eq!(outcome.result(), MatchResult::Found(b));
    }

    #[test]
    fn test_resolve_version_ambiguous_below_threshold() {
        let mut docs = MemoryDocs::new(REFERENCE);
        let a = docs.add("/v/Sampo_Lappelill/a.xml", "Sampo Lappelill", "<body><p>Första</p></body>");
        let b = docs.add("/v/Sampo_Lappelill/b.xml", "Sampo Lappelill", "<body><p>Andra</p></body>");
        let outcome = resolve_version(
            "Sampo Lappelill",
            "Sampo Lappelill",
            &[a, b],
            TitleComparison::Contains,
            &docs,
        );
        assert_eq!(outcome.result(), MatchResult::NotFound);
    }

    #[test]
    fn test_resolve_version_skips_unreadable_sibling() {
        let mut docs = MemoryDocs::new(REFERENCE);
        let broken = CandidatePath::new(PathBuf::from("/v/Sampo_Lappelill/a_draft.xml"));
        let good = docs.add("/v/Sampo_Lappelill/b.xml", "Sampo Lappelill 1860", "");
        let outcome = resolve_version(
            "Sampo Lappelill",
            "1860",
            &[broken.clone(), good.clone()],
            TitleComparison::Contains,
            &docs,
        );
        assert_eq!(
            outcome,
            VersionOutcome::Searched {
                directory_hits: vec![broken, good.clone()],
                result: MatchResult::Found(good),
            }
        );
    }

    #[test]
    fn test_resolve_version_without_reference_keeps_hits() {
        struct NoReference(MemoryDocs);
        impl VersionDocuments for NoReference {
            fn title(&self, path: &Path) -> Result<String> {
                self.0.title(path)
            }
            fn body(&self, path: &Path) -> Result<String> {
                self.0.body(path)
            }
            fn reference_body(&self) -> Result<String> {
                Err(MatchError::MissingElement {
                    element: "body".into(),
                    path: PathBuf::from("/web/32_15_1860.xml"),
                })
            }
        }

        let mut docs = MemoryDocs::new(REFERENCE);
        let a = docs.add("/v/Sampo_Lappelill/a.xml", "Sampo Lappelill", REFERENCE);
        let b = docs.add("/v/Sampo_Lappelill/b.xml", "Sampo Lappelill", REFERENCE);
        let outcome = resolve_version(
            "Sampo Lappelill",
            "Sampo Lappelill",
            &[a, b],
            TitleComparison::Contains,
            &NoReference(docs),
        );
        match outcome {
            VersionOutcome::Searched {
                directory_hits,
                result,
            } => {
                assert_eq!(directory_hits.len(), 2);
                assert_eq!(result, MatchResult::NotFound);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
