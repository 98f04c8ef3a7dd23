//! String similarity primitives used by the candidate matcher.
//!
//! Scores are always in [0,1]. `fuzzy_match` returns 0.0 as an explicit
//! "no match" sentinel for anything below its threshold; a 0.0 is never a
//! legitimate low score.

pub mod plate;

pub use plate::parse_plate;

/// Lowercases and drops every non-alphanumeric character (whitespace,
/// hyphens, underscores, punctuation).
pub fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Classic Levenshtein distance over a full (|a|+1)×(|b|+1) DP table.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for (i, row) in table.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        table[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            table[i][j] = (table[i - 1][j] + 1)
                .min(table[i][j - 1] + 1)
                .min(table[i - 1][j - 1] + cost);
        }
    }

    table[a.len()][b.len()]
}

/// Jaro-Winkler similarity.
///
/// Identical strings score 1.0, either side empty scores 0.0. The Winkler
/// bonus boosts shared prefixes up to four characters.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (la, lb) = (a_chars.len(), b_chars.len());

    // Characters count as matching when within this window of each other.
    let window = (la.max(lb) / 2) as isize - 1;
    if window < 0 {
        return 0.0;
    }
    let window = window as usize;

    // Greedy match without reusing a target position.
    let mut b_used = vec![false; lb];
    let mut a_matched: Vec<char> = Vec::new();
    for (i, &ca) in a_chars.iter().enumerate() {
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(lb);
        for j in lo..hi {
            if !b_used[j] && b_chars[j] == ca {
                b_used[j] = true;
                a_matched.push(ca);
                break;
            }
        }
    }

    let matches = a_matched.len();
    if matches == 0 {
        return 0.0;
    }

    let b_matched: Vec<char> = b_chars
        .iter()
        .zip(b_used.iter())
        .filter(|(_, used)| **used)
        .map(|(c, _)| *c)
        .collect();

    // Transpositions: half the matched pairs that disagree in order.
    let mismatched = a_matched
        .iter()
        .zip(b_matched.iter())
        .filter(|(x, y)| x != y)
        .count();
    let transpositions = mismatched as f64 / 2.0;

    let m = matches as f64;
    let jaro = (m / la as f64 + m / lb as f64 + (m - transpositions) / m) / 3.0;

    let common_prefix = a_chars
        .iter()
        .zip(b_chars.iter())
        .take(4)
        .take_while(|(x, y)| x == y)
        .count();

    let bonus = common_prefix as f64 * 0.1 * (1.0 - jaro);
    (jaro + bonus).min(1.0)
}

/// Normalizes both sides, then scores them. Anything below `threshold`
/// collapses to the 0.0 sentinel.
pub fn fuzzy_match(input: &str, target: &str, threshold: f64) -> f64 {
    let a = normalize(input);
    let b = normalize(target);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let score = similarity(&a, &b);
    if score >= threshold {
        score
    } else {
        0.0
    }
}

/// A scored target from `rank_targets`.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTarget {
    pub target: String,
    pub score: f64,
}

/// Scores every target against the input, drops sentinel zeros, sorts
/// descending and truncates. The sort is stable so equal scores keep their
/// first-encountered order.
pub fn rank_targets(input: &str, targets: &[&str], threshold: f64, limit: usize) -> Vec<RankedTarget> {
    let mut ranked: Vec<RankedTarget> = targets
        .iter()
        .map(|t| RankedTarget {
            target: (*t).to_string(),
            score: fuzzy_match(input, t, threshold),
        })
        .filter(|r| r.score > 0.0)
        .collect();

    ranked.sort_by(|x, y| y.score.partial_cmp(&x.score).unwrap_or(std::cmp::Ordering::Equal));
    ranked.truncate(limit);
    ranked
}
