//! Publication filename matching.
//!
//! Two strategies: fuzzy title matching for collections whose files are named
//! after the publication, and exact signum matching for letters whose files
//! end in an identifier such as `Br42`.

use crate::fuzzy::{partial_ratio, MAX_SCORE};
use crate::normalize::{normalize_filename, normalize_name};
use crate::scan::CandidatePath;
use once_cell::sync::Lazy;
use regex::Regex;

/// Letter signum at the end of a file stem: two letters and 1-4 digits.
static SIGNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]{2}\d{1,4}$").unwrap());

/// Outcome of matching one publication against a candidate list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchResult {
    Found(CandidatePath),
    NotFound,
}

impl MatchResult {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchResult::Found(_))
    }

    pub fn found(self) -> Option<CandidatePath> {
        match self {
            MatchResult::Found(c) => Some(c),
            MatchResult::NotFound => None,
        }
    }
}

impl From<Option<&CandidatePath>> for MatchResult {
    fn from(c: Option<&CandidatePath>) -> Self {
        c.cloned().map_or(MatchResult::NotFound, MatchResult::Found)
    }
}

/// Whether a normalized title key and a candidate stem are a name match.
pub fn is_name_match(title_key: &str, stem: &str) -> bool {
    partial_ratio(title_key, &normalize_filename(stem)) == MAX_SCORE
}

/// Match a title against candidate filenames; the first candidate (in the
/// given order) whose normalized stem scores 100 wins.
pub fn match_title(title: &str, candidates: &[CandidatePath]) -> MatchResult {
    let key = normalize_name(title);
    candidates
        .iter()
        .find(|c| is_name_match(&key, &c.stem))
        .into()
}

/// Signum token at the end of a stem, if any.
pub fn extract_signum(stem: &str) -> Option<&str> {
    SIGNUM.find(stem).map(|m| m.as_str())
}

/// Match a letter identifier against the signum token of each candidate.
/// Comparison is exact, so `Br42` never selects `Br420` or `Br7`.
pub fn match_by_signum(identifier: &str, candidates: &[CandidatePath]) -> MatchResult {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return MatchResult::NotFound;
    }
    candidates
        .iter()
        .find(|c| extract_signum(&c.stem) == Some(identifier))
        .into()
}

/// Candidates whose lowercased parent directory is a name match for the title.
pub fn filter_by_directory<'a>(
    title: &str,
    candidates: &'a [CandidatePath],
) -> Vec<&'a CandidatePath> {
    let key = normalize_name(title);
    candidates
        .iter()
        .filter(|c| partial_ratio(&key, &c.parent_dir.to_lowercase()) == MAX_SCORE)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn candidates(paths: &[&str]) -> Vec<CandidatePath> {
        paths
            .iter()
            .map(|p| CandidatePath::new(PathBuf::from(p)))
            .collect()
    }

    #[test]
    fn test_match_title_first_full_score_wins() {
        let list = candidates(&[
            "/svn/K/ljungblommor_andra_samlingen_komm.xml",
            "/svn/K/noveller_och_kortprosa.xml",
        ]);
        let result = match_title("Ljungblommor, andra samlingen", &list);
        assert_eq!(result, MatchResult::Found(list[0].clone()));
    }

    #[test]
    fn test_match_title_empty_list() {
        assert_eq!(match_title("Noveller", &[]), MatchResult::NotFound);
    }

    #[test]
    fn test_match_title_empty_title_never_matches() {
        let list = candidates(&["/svn/a.xml"]);
        assert_eq!(match_title("", &list), MatchResult::NotFound);
    }

    #[test]
    fn test_match_title_prefers_earlier_candidate() {
        let list = candidates(&["/svn/a/noveller_del_1.xml", "/svn/b/noveller.xml"]);
        let result = match_title("Noveller", &list).found().unwrap();
        assert_eq!(result.stem, "noveller_del_1");
    }

    #[test]
    fn test_match_title_editorial_prefix() {
        let list = candidates(&["/svn/K Vinterqvällar tg.xml"]);
        assert!(match_title("Vinterqvällar", &list).is_found());
    }

    #[test]
    fn test_match_title_rejects_near_miss() {
        let list = candidates(&["/svn/vintergvallar.xml"]);
        assert_eq!(match_title("Vinterqvällar", &list), MatchResult::NotFound);
    }

    #[test]
    fn test_match_by_signum_exact() {
        let list = candidates(&["/svn/Br/xx_Br420.xml", "/svn/Br/yy_Br7.xml", "/svn/Br/xx_Br42.xml"]);
        let result = match_by_signum("Br42", &list).found().unwrap();
        assert_eq!(result.stem, "xx_Br42");
    }

    #[test]
    fn test_match_by_signum_skips_stems_without_token() {
        let list = candidates(&["/svn/Br/register.xml", "/svn/Br/brev_Br7.xml"]);
        assert!(match_by_signum("Br7", &list).is_found());
        assert_eq!(match_by_signum("Br8", &list), MatchResult::NotFound);
        assert_eq!(match_by_signum("  ", &list), MatchResult::NotFound);
    }

    #[test]
    fn test_extract_signum() {
        assert_eq!(extract_signum("brev_komm_Br42"), Some("Br42"));
        assert_eq!(extract_signum("Fo12"), Some("Fo12"));
        assert_eq!(extract_signum("Br12345"), None);
        assert_eq!(extract_signum("Br42_kopia"), None);
    }

    #[test]
    fn test_filter_by_directory() {
        let list = candidates(&[
            "/svn/Varianter/Sampo_Lappelill/a.xml",
            "/svn/Varianter/Sampo_Lappelill/b.xml",
            "/svn/Varianter/Bjornjagarens_barn/c.xml",
        ]);
        let hits = filter_by_directory("Sampo Lappelill", &list);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|c| c.parent_dir == "Sampo_Lappelill"));
    }
}
