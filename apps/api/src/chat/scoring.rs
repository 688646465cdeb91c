//! Utterance-to-placeholder match scoring, shared by every resolver backend.
//!
//! | signal                                    | points |
//! |-------------------------------------------|--------|
//! | full placeholder name in the utterance    | 100    |
//! | each name word longer than 2 chars        | 25     |
//! | each keyword of the placeholder's type    | 15     |
//! | each description word longer than 3 chars | 5      |

use tracing::debug;

use crate::models::Placeholder;

const EXACT_NAME_POINTS: u32 = 100;
const NAME_PART_POINTS: u32 = 25;
const TYPE_KEYWORD_POINTS: u32 = 15;
const DESCRIPTION_WORD_POINTS: u32 = 5;

pub fn match_score(utterance: &str, placeholder: &Placeholder) -> u32 {
    let text = utterance.to_lowercase();
    let name = placeholder.name.to_lowercase();
    let mut score = 0;

    if text.contains(&name) {
        score += EXACT_NAME_POINTS;
    }

    score += name
        .split_whitespace()
        .filter(|part| part.chars().count() > 2 && text.contains(part))
        .count() as u32
        * NAME_PART_POINTS;

    score += placeholder
        .field_type
        .keywords()
        .iter()
        .filter(|keyword| text.contains(*keyword))
        .count() as u32
        * TYPE_KEYWORD_POINTS;

    if let Some(description) = &placeholder.description {
        let description = description.to_lowercase();
        score += description
            .split_whitespace()
            .filter(|word| word.chars().count() > 3 && text.contains(word))
            .count() as u32
            * DESCRIPTION_WORD_POINTS;
    }

    score
}

/// Picks the most likely target among `candidates`. A lone candidate always wins;
/// ties go to the earliest in document order. Returns the winner and its score.
pub fn best_match<'a>(
    utterance: &str,
    candidates: &[&'a Placeholder],
) -> Option<(&'a Placeholder, u32)> {
    if let [only] = candidates {
        return Some((*only, match_score(utterance, only)));
    }

    let mut best: Option<(&'a Placeholder, u32)> = None;
    for &candidate in candidates {
        let score = match_score(utterance, candidate);
        debug!("  {}: {score} points", candidate.name);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best
}
