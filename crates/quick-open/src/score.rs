//! Fuzzy match scoring.
//!
//! A candidate matches when every query character appears in it, in order,
//! ignoring letter case. Contiguous occurrences always outrank scattered
//! ones: a contiguous match earns `CONTIGUOUS_CHAR` per query character while
//! a scattered match can earn at most
//! `SCATTERED_CHAR + BOUNDARY_BONUS + ADJACENT_BONUS` per character.

/// Match score; higher is better. Non-matches score [`NO_MATCH`].
pub type Score = i64;

pub const NO_MATCH: Score = 0;

const CONTIGUOUS_CHAR: Score = 30;
const START_BONUS: Score = 15;
const START_BOUNDARY_BONUS: Score = 10;
const END_BOUNDARY_BONUS: Score = 10;
const EXACT_BONUS: Score = 50;

const SCATTERED_CHAR: Score = 10;
const BOUNDARY_BONUS: Score = 8;
const ADJACENT_BONUS: Score = 5;

/// Scores `candidate` against `query`. Pure; safe to call from any thread.
pub fn score(candidate: &str, query: &str) -> Score {
    if query.is_empty() {
        return NO_MATCH;
    }

    let chars: Vec<char> = candidate.chars().collect();
    let folded: Vec<char> = chars.iter().copied().map(fold_case).collect();
    let needle: Vec<char> = query.chars().map(fold_case).collect();
    if needle.len() > folded.len() {
        return NO_MATCH;
    }

    if let Some(score) = contiguous_score(&chars, &folded, &needle) {
        return score;
    }
    scattered_score(&chars, &folded, &needle)
}

/// Best score among the places the query occurs as a substring.
fn contiguous_score(chars: &[char], folded: &[char], needle: &[char]) -> Option<Score> {
    let base = CONTIGUOUS_CHAR * needle.len() as Score;
    let exact = if folded == needle { EXACT_BONUS } else { 0 };

    folded
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(start, _)| {
            let end = start + needle.len();
            let mut score = base + exact;
            if start == 0 {
                score += START_BONUS;
            }
            if is_word_start(chars, start) {
                score += START_BOUNDARY_BONUS;
            }
            if is_word_end(chars, end) {
                score += END_BOUNDARY_BONUS;
            }
            score
        })
        .max()
}

/// Greedy in-order match; `NO_MATCH` if some query character is missing.
fn scattered_score(chars: &[char], folded: &[char], needle: &[char]) -> Score {
    let mut score = 0;
    let mut position = 0usize;
    let mut previous: Option<usize> = None;

    for wanted in needle {
        let Some(offset) = folded[position..].iter().position(|c| c == wanted) else {
            return NO_MATCH;
        };
        let index = position + offset;

        score += SCATTERED_CHAR;
        if is_word_start(chars, index) {
            score += BOUNDARY_BONUS;
        }
        if previous.is_some_and(|prev| prev + 1 == index) {
            score += ADJACENT_BONUS;
        }

        previous = Some(index);
        position = index + 1;
    }
    score
}

fn fold_case(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn is_separator(c: char) -> bool {
    matches!(c, '/' | '\\' | '.' | '_' | '-' | ' ')
}

fn is_word_start(chars: &[char], index: usize) -> bool {
    if index == 0 {
        return true;
    }
    let (prev, current) = (chars[index - 1], chars[index]);
    is_separator(prev) || (prev.is_lowercase() && current.is_uppercase())
}

fn is_word_end(chars: &[char], end: usize) -> bool {
    if end >= chars.len() {
        return true;
    }
    let (last, next) = (chars[end - 1], chars[end]);
    is_separator(next) || (last.is_lowercase() && next.is_uppercase())
}
