//! Peer ranking aggregation
//!
//! Each rater scores every other member against the weighted rubric. A
//! rater's score for a peer is the rubric's weighted mean of its criterion
//! scores; when only a position was given, the position is mapped onto the
//! same 0-10 scale. Members are ordered by mean score (descending), then by
//! lowest variance, then by panel order, so the result is deterministic for
//! identical input.

use super::analysis::{Conflict, MinorityOpinion, detect_conflicts, detect_minority_opinions};
use super::entry::{PeerScore, RankingEntry};
use crate::council::rubric::Rubric;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One member's aggregate standing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMember {
    pub member_id: String,
    pub mean_score: f64,
    pub variance: f64,
    pub raters: usize,
    pub rank: usize,
}

/// Aggregated result of a ranking stage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregateRanking {
    pub ranking: Vec<RankedMember>,
    pub winner: Option<String>,
    #[serde(default)]
    pub conflicts: Vec<Conflict>,
    #[serde(default)]
    pub minority_opinions: Vec<MinorityOpinion>,
}

impl AggregateRanking {
    /// Ranking for a lone member with nothing to compare against
    pub fn uncontested(member_id: impl Into<String>) -> Self {
        let member_id = member_id.into();
        Self {
            ranking: vec![RankedMember {
                member_id: member_id.clone(),
                mean_score: 0.0,
                variance: 0.0,
                raters: 0,
                rank: 1,
            }],
            winner: Some(member_id),
            conflicts: Vec::new(),
            minority_opinions: Vec::new(),
        }
    }

    pub fn member(&self, member_id: &str) -> Option<&RankedMember> {
        self.ranking.iter().find(|m| m.member_id == member_id)
    }
}

/// Convert a 1-based position among `peer_count` peers to a 0-10 score
pub fn position_score(position: usize, peer_count: usize) -> f64 {
    if peer_count <= 1 {
        return 10.0;
    }
    let position = position.clamp(1, peer_count);
    10.0 * (peer_count - position) as f64 / (peer_count - 1) as f64
}

/// Aggregates [`RankingEntry`]s into an [`AggregateRanking`]
pub struct RankingAggregator;

impl RankingAggregator {
    /// Aggregate rankings over `members` (the rankable members, in panel order).
    ///
    /// Raters and peers outside `members` are ignored, as are self-ratings.
    pub fn aggregate(entries: &[RankingEntry], members: &[String], rubric: &Rubric) -> AggregateRanking {
        let peer_count = members.len().saturating_sub(1);

        let mut stats: Vec<(usize, RankedMember)> = members
            .iter()
            .enumerate()
            .map(|(order, member_id)| {
                let scores: Vec<f64> = entries
                    .iter()
                    .filter(|e| e.rater != *member_id && members.contains(&e.rater))
                    .filter_map(|e| e.score_for(member_id))
                    .filter_map(|peer| rater_score(peer, peer_count, rubric))
                    .collect();
                let (mean_score, variance) = mean_and_variance(&scores);
                (
                    order,
                    RankedMember {
                        member_id: member_id.clone(),
                        mean_score,
                        variance,
                        raters: scores.len(),
                        rank: 0,
                    },
                )
            })
            .collect();

        stats.sort_by(|(order_a, a), (order_b, b)| compare(a, *order_a, b, *order_b));

        let ranking: Vec<RankedMember> = stats
            .into_iter()
            .enumerate()
            .map(|(index, (_, mut member))| {
                member.rank = index + 1;
                member
            })
            .collect();

        let relevant: Vec<RankingEntry> = entries
            .iter()
            .filter(|e| members.contains(&e.rater))
            .cloned()
            .collect();

        AggregateRanking {
            winner: ranking.first().map(|m| m.member_id.clone()),
            conflicts: detect_conflicts(&relevant),
            minority_opinions: detect_minority_opinions(&relevant),
            ranking,
        }
    }
}

fn rater_score(peer: &PeerScore, peer_count: usize, rubric: &Rubric) -> Option<f64> {
    rubric
        .weighted_score(&peer.criterion_scores)
        .or_else(|| peer.position.map(|pos| position_score(pos, peer_count)))
}

fn mean_and_variance(scores: &[f64]) -> (f64, f64) {
    if scores.is_empty() {
        return (0.0, 0.0);
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

fn compare(a: &RankedMember, order_a: usize, b: &RankedMember, order_b: usize) -> Ordering {
    // Unrated members always sort after rated ones.
    (b.raters > 0)
        .cmp(&(a.raters > 0))
        .then_with(|| b.mean_score.total_cmp(&a.mean_score))
        .then_with(|| a.variance.total_cmp(&b.variance))
        .then_with(|| order_a.cmp(&order_b))
}
