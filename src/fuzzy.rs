//! Fuzzy similarity scores on a 0–100 scale.
//!
//! `ratio` compares whole strings; `partial_ratio` slides the shorter string
//! across the longer one and keeps the best window. Both are built on
//! normalized Levenshtein distance from `strsim`.

use strsim::normalized_levenshtein;

/// Highest possible score.
pub const MAX_SCORE: u8 = 100;

fn to_score(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Whole-string similarity (0–100).
/// Two empty strings score 0, as does any comparison with an empty string.
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return MAX_SCORE;
    }
    to_score(normalized_levenshtein(a, b))
}

/// Best-aligning substring similarity (0–100).
///
/// 100 when the shorter string occurs in the longer one, otherwise the best
/// `ratio` between the shorter string and any equally long window of the
/// longer one.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    if longer.contains(shorter) {
        return MAX_SCORE;
    }

    let window_len = shorter.chars().count();
    let longer_chars: Vec<char> = longer.chars().collect();

    let mut best = 0u8;
    for start in 0..=(longer_chars.len() - window_len) {
        let window: String = longer_chars[start..start + window_len].iter().collect();
        let score = ratio(shorter, &window);
        if score > best {
            best = score;
            if best == MAX_SCORE {
                break;
            }
        }
    }
    best
}
