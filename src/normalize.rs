//! Name normalization shared by every matching job.
//!
//! Titles and filenames are reduced to a key over ASCII lowercase letters,
//! digits and underscores so that "Ljungblommor, andra samlingen" and
//! `ljungblommor_andra_samlingen_komm.xml` compare equal.
//!
//! CRITICAL: the split jobs also derive new filenames from `normalize_name`,
//! so changing a rule here renames files as well as changing matches.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// RULE TABLES
// ============================================================================

/// Punctuation removed from titles before anything else.
pub const STRIPPED_PUNCTUATION: [char; 13] = [
    ',', '.', '?', '!', '\u{2013}', '\u{2019}', '\u{00BB}', ':', '(', ')', '[', ']', '&',
];

/// Fixed fold table for the accented letters used in the archive.
pub const LETTER_FOLDS: [(char, &str); 6] = [
    ('ä', "a"),
    ('å', "a"),
    ('ö', "o"),
    ('é', "e"),
    ('ü', "u"),
    ('æ', "ae"),
];

/// Editorial prefix marker on comment files: "K Ljungblommor".
const EDITORIAL_PREFIX: &str = "K ";

/// Trailing marker on some reading-text files: "Ljungblommor tg".
const TRAILING_MARKER: &str = " tg";

/// Institutional suffix on Academica files.
const INSTITUTION_SUFFIX: &str = "_Academica";

/// Prefix used by letter comment files.
const LETTER_COMMENT_PREFIX: &str = "brev_komm_";

/// "with commentary" suffix and bracket leftovers.
static FILENAME_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"_komm$|\[|\]").unwrap());

// ============================================================================
// HELPERS
// ============================================================================

/// Recompose to NFC so decomposed input ("a" + U+0308) hits the fold table.
fn compose(s: &str) -> String {
    s.nfc().collect()
}

/// Fold the accented letters of `LETTER_FOLDS`, leaving everything else.
pub fn fold_letters(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match LETTER_FOLDS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

fn underscore_separators(s: &str) -> String {
    s.replace([' ', '-'], "_")
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Normalize a publication title into a matching key.
/// e.g. "Ljungblommor, andra samlingen" → "ljungblommor_andra_samlingen"
pub fn normalize_name(title: &str) -> String {
    let composed = compose(title);
    let stripped: String = composed
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();
    let key = underscore_separators(stripped.trim()).to_lowercase();
    fold_letters(&key)
}

/// Normalize a filename stem into a matching key.
///
/// Same fold as `normalize_name`, plus removal of the filename noise tokens.
/// Punctuation is left in place.
pub fn normalize_filename(stem: &str) -> String {
    let composed = compose(stem);
    let trimmed = composed
        .replace(EDITORIAL_PREFIX, "")
        .replace(TRAILING_MARKER, "");
    // Case-sensitive, so strip before lowercasing.
    let underscored = underscore_separators(&trimmed).replace(INSTITUTION_SUFFIX, "");
    let key = fold_letters(&underscored.to_lowercase());
    FILENAME_NOISE
        .replace_all(&key, "")
        .replace(LETTER_COMMENT_PREFIX, "")
}

/// Filename for a story split out of a larger file: "<key>.xml".
pub fn split_file_name(title: &str) -> String {
    format!("{}.xml", normalize_name(title))
}

/// Filename for a split general comment: "<key>_komm.xml".
pub fn split_comment_file_name(title: &str) -> String {
    format!("{}_komm.xml", normalize_name(title))
}

// ============================================================================
// TESTS
// ============================================================================
