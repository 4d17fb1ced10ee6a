//! Disagreement analysis over peer rankings

use super::entry::RankingEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fraction of raters that must dissent for a minority opinion
const MINORITY_FRACTION: f64 = 0.3;
/// Distance from the mean position that counts as dissent
const DISSENT_DISTANCE: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// A notable disagreement between raters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// One member placed far apart by different raters
    PositionSpread {
        member_id: String,
        spread: usize,
        severity: Severity,
        high: Vec<String>,
        low: Vec<String>,
        description: String,
    },
    /// Two raters placing each other near the bottom
    MutualOpposition {
        members: Vec<String>,
        severity: Severity,
        description: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DissentDirection {
    Higher,
    Lower,
}

/// Raters who disagree with the consensus placement of a member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinorityOpinion {
    pub member_id: String,
    pub consensus_position: f64,
    pub direction: DissentDirection,
    pub dissenters: Vec<String>,
    pub description: String,
}

/// Positions each ranked member received, keyed by member, in rater order
fn positions_by_member(entries: &[RankingEntry]) -> BTreeMap<&str, Vec<(&str, usize)>> {
    let mut positions: BTreeMap<&str, Vec<(&str, usize)>> = BTreeMap::new();
    for entry in entries {
        for peer in &entry.peers {
            if let Some(position) = peer.position {
                positions
                    .entry(peer.peer.as_str())
                    .or_default()
                    .push((entry.rater.as_str(), position));
            }
        }
    }
    positions
}

/// Find position spreads and mutual opposition among raters.
pub fn detect_conflicts(entries: &[RankingEntry]) -> Vec<Conflict> {
    let ranked: Vec<&RankingEntry> = entries.iter().filter(|e| e.ranked_count() > 0).collect();
    if ranked.len() < 2 {
        return Vec::new();
    }

    let mut conflicts = Vec::new();
    for (member_id, positions) in positions_by_member(entries) {
        if positions.len() < 2 {
            continue;
        }
        let min = positions.iter().map(|(_, p)| *p).min().unwrap_or(0);
        let max = positions.iter().map(|(_, p)| *p).max().unwrap_or(0);
        let spread = max - min;
        if spread < 2 {
            continue;
        }
        let raters_at = |target: usize| -> Vec<String> {
            positions
                .iter()
                .filter(|(_, p)| *p == target)
                .map(|(r, _)| r.to_string())
                .collect()
        };
        let high = raters_at(min);
        let low = raters_at(max);
        let severity = match spread {
            s if s >= 4 => Severity::High,
            3 => Severity::Medium,
            _ => Severity::Low,
        };
        let description = if spread >= 3 {
            format!(
                "{} ranked #{} by {} but #{} by {}",
                member_id,
                min,
                high.first().map_or("", String::as_str),
                max,
                low.first().map_or("", String::as_str)
            )
        } else {
            format!(
                "{} has position spread of {} (#{} to #{})",
                member_id, spread, min, max
            )
        };
        conflicts.push(Conflict::PositionSpread {
            member_id: member_id.to_string(),
            spread,
            severity,
            high,
            low,
            description,
        });
    }

    for (i, a) in ranked.iter().enumerate() {
        for b in &ranked[i + 1..] {
            let (Some(b_by_a), Some(a_by_b)) = (a.position_of(&b.rater), b.position_of(&a.rater))
            else {
                continue;
            };
            let n = a.ranked_count().max(b.ranked_count());
            if n < 3 {
                continue;
            }
            let threshold = 3.max(n - 1);
            if b_by_a >= threshold && a_by_b >= threshold {
                conflicts.push(Conflict::MutualOpposition {
                    members: vec![a.rater.clone(), b.rater.clone()],
                    severity: Severity::High,
                    description: format!(
                        "{} and {} rank each other's responses low (#{} and #{})",
                        a.rater, b.rater, b_by_a, a_by_b
                    ),
                });
            }
        }
    }

    conflicts
}

/// Find groups of raters who place a member well away from the consensus.
///
/// Needs at least three raters; a minority must hold at least
/// `max(1, floor(0.3 × raters))` of them.
pub fn detect_minority_opinions(entries: &[RankingEntry]) -> Vec<MinorityOpinion> {
    let raters = entries.iter().filter(|e| e.ranked_count() > 0).count();
    if raters < 3 {
        return Vec::new();
    }
    let min_dissenters = ((raters as f64 * MINORITY_FRACTION).floor() as usize).max(1);

    let mut opinions = Vec::new();
    for (member_id, positions) in positions_by_member(entries) {
        if positions.len() < 2 {
            continue;
        }
        let consensus =
            positions.iter().map(|(_, p)| *p as f64).sum::<f64>() / positions.len() as f64;
        let consensus = (consensus * 10.0).round() / 10.0;

        let dissent = |direction: DissentDirection| -> Vec<String> {
            positions
                .iter()
                .filter(|(_, p)| {
                    let diff = *p as f64 - consensus;
                    match direction {
                        DissentDirection::Lower => diff >= DISSENT_DISTANCE,
                        DissentDirection::Higher => diff <= -DISSENT_DISTANCE,
                    }
                })
                .map(|(r, _)| r.to_string())
                .collect()
        };

        for direction in [DissentDirection::Higher, DissentDirection::Lower] {
            let dissenters = dissent(direction);
            if dissenters.len() >= min_dissenters {
                let wording = match direction {
                    DissentDirection::Higher => "higher",
                    DissentDirection::Lower => "lower",
                };
                opinions.push(MinorityOpinion {
                    member_id: member_id.to_string(),
                    consensus_position: consensus,
                    direction,
                    description: format!(
                        "{}/{} raters think {} deserves a {} ranking (consensus #{})",
                        dissenters.len(),
                        raters,
                        member_id,
                        wording,
                        consensus
                    ),
                    dissenters,
                });
            }
        }
    }
    opinions
}
