//! Ranking response parsing.
//!
//! Extracts the `FINAL RANKING:` list and per-criterion scores from a
//! rater's free-form reply. Pure text matching; no I/O.

use super::entry::{PeerScore, RankingEntry};
use super::labels::ResponseLabels;
use crate::council::rubric::Rubric;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static FINAL_RANKING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)FINAL\s+RANKING\s*:?(.*)").expect("valid regex"));

static RANKED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\d+[.)]\s*\**\s*(?:(?i:response)\s+([A-Za-z])\b|([A-Z])\b)")
        .expect("valid regex")
});

/// Response letters in the order the rater listed them.
///
/// Reads the `FINAL RANKING` section when present, otherwise the whole
/// text. Duplicates keep their first position.
pub fn parse_final_ranking(text: &str) -> Vec<char> {
    let section = FINAL_RANKING
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str());

    let mut letters = Vec::new();
    for caps in RANKED_LINE.captures_iter(section) {
        let Some(letter) = caps
            .get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().chars().next())
            .map(|c| c.to_ascii_uppercase())
        else {
            continue;
        };
        if !letters.contains(&letter) {
            letters.push(letter);
        }
    }
    letters
}

/// Per-letter criterion scores from lines like `Accuracy - Response B: 8`.
pub fn parse_rubric_scores(text: &str, rubric: &Rubric) -> HashMap<char, HashMap<String, f64>> {
    let mut scores: HashMap<char, HashMap<String, f64>> = HashMap::new();
    for name in rubric.names() {
        let pattern = format!(
            r"(?i){}\s*[:\-–]\s*(?:response\s+)?([A-Z])\s*[:(]\s*(\d+(?:\.\d+)?)",
            regex::escape(name)
        );
        let Ok(re) = Regex::new(&pattern) else {
            continue;
        };
        for caps in re.captures_iter(text) {
            let Some(letter) = caps[1].chars().next().map(|c| c.to_ascii_uppercase()) else {
                continue;
            };
            if let Ok(score) = caps[2].parse::<f64>() {
                scores
                    .entry(letter)
                    .or_default()
                    .insert(name.to_string(), score.clamp(0.0, 10.0));
            }
        }
    }
    scores
}

/// Build a [`RankingEntry`] for `rater` from its reply.
///
/// Letters that do not belong to a peer of the rater (its own answer or an
/// unknown label) are ignored; positions are renumbered over the peers
/// that remain.
pub fn parse_ranking_entry(
    rater: &str,
    text: &str,
    labels: &ResponseLabels,
    rubric: &Rubric,
) -> RankingEntry {
    let peers: Vec<(char, &str)> = labels.peers_of(rater).collect();
    let is_peer = |letter: char| peers.iter().any(|(l, _)| *l == letter);

    let order: Vec<char> = parse_final_ranking(text)
        .into_iter()
        .filter(|letter| is_peer(*letter))
        .collect();
    let mut criterion_scores = parse_rubric_scores(text, rubric);

    let mut entries: Vec<PeerScore> = Vec::new();
    for (index, letter) in order.iter().enumerate() {
        if let Some(member) = labels.member_for(*letter) {
            let mut score = PeerScore::new(member).at_position(index + 1);
            score.criterion_scores = criterion_scores.remove(letter).unwrap_or_default();
            entries.push(score);
        }
    }
    for (letter, member) in &peers {
        if let Some(scores) = criterion_scores.remove(letter) {
            let mut score = PeerScore::new(*member);
            score.criterion_scores = scores;
            entries.push(score);
        }
    }

    RankingEntry::new(rater, entries)
}
