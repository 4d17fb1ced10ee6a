//! Per-council model standings built from finished deliberations

use super::aggregate::AggregateRanking;
use crate::core::model::Model;
use crate::council::panel::Panel;
use serde::{Deserialize, Serialize};

/// How many recent positions a standing remembers
pub const POSITION_HISTORY: usize = 50;

/// One member's result in a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberResult {
    pub member_id: String,
    pub model: Model,
    pub mean_score: f64,
    pub rank: usize,
}

/// What the leaderboard learns from one finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRecord {
    pub council_id: String,
    pub results: Vec<MemberResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
}

impl LeaderboardRecord {
    /// Join the aggregate ranking with the panel to attribute scores to models
    pub fn from_ranking(council_id: &str, ranking: &AggregateRanking, panel: &Panel) -> Self {
        let results = ranking
            .ranking
            .iter()
            .filter_map(|ranked| {
                panel.member(&ranked.member_id).map(|member| MemberResult {
                    member_id: ranked.member_id.clone(),
                    model: member.model.clone(),
                    mean_score: ranked.mean_score,
                    rank: ranked.rank,
                })
            })
            .collect();
        Self {
            council_id: council_id.to_string(),
            results,
            winner: ranking.winner.clone(),
        }
    }
}

/// Running performance of one model within one council
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub model: Model,
    pub wins: u64,
    pub participations: u64,
    pub total_score: f64,
    #[serde(default)]
    pub positions: Vec<usize>,
}

impl Standing {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            wins: 0,
            participations: 0,
            total_score: 0.0,
            positions: Vec::new(),
        }
    }

    /// Fold one run's result into this standing
    pub fn apply(&mut self, result: &MemberResult, won: bool) {
        self.participations += 1;
        self.total_score += result.mean_score;
        if won {
            self.wins += 1;
        }
        self.positions.push(result.rank);
        if self.positions.len() > POSITION_HISTORY {
            let excess = self.positions.len() - POSITION_HISTORY;
            self.positions.drain(..excess);
        }
    }

    pub fn win_rate(&self) -> f64 {
        if self.participations == 0 {
            return 0.0;
        }
        self.wins as f64 / self.participations as f64 * 100.0
    }

    pub fn avg_score(&self) -> f64 {
        if self.participations == 0 {
            return 0.0;
        }
        self.total_score / self.participations as f64
    }

    pub fn avg_position(&self) -> f64 {
        if self.positions.is_empty() {
            return 0.0;
        }
        self.positions.iter().sum::<usize>() as f64 / self.positions.len() as f64
    }
}

/// Fold a record into a council's standings, adding models as they appear
pub fn apply_record(standings: &mut Vec<Standing>, record: &LeaderboardRecord) {
    for result in &record.results {
        let won = record.winner.as_deref() == Some(result.member_id.as_str());
        let index = match standings.iter().position(|s| s.model == result.model) {
            Some(index) => index,
            None => {
                standings.push(Standing::new(result.model.clone()));
                standings.len() - 1
            }
        };
        standings[index].apply(result, won);
    }
}

/// Sort standings by win rate, then average score, then model id
pub fn sort_standings(standings: &mut [Standing]) {
    standings.sort_by(|a, b| {
        b.win_rate()
            .total_cmp(&a.win_rate())
            .then_with(|| b.avg_score().total_cmp(&a.avg_score()))
            .then_with(|| a.model.cmp(&b.model))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(member: &str, model: &str, score: f64, rank: usize) -> MemberResult {
        MemberResult {
            member_id: member.to_string(),
            model: Model::new(model),
            mean_score: score,
            rank,
        }
    }

    #[test]
    fn records_accumulate_per_model() {
        let mut standings = Vec::new();
        let record = LeaderboardRecord {
            council_id: "c".to_string(),
            results: vec![result("a", "m1", 8.0, 1), result("b", "m2", 6.0, 2)],
            winner: Some("a".to_string()),
        };
        apply_record(&mut standings, &record);
        apply_record(&mut standings, &record);

        let m1 = standings.iter().find(|s| s.model.as_str() == "m1").unwrap();
        assert_eq!(m1.wins, 2);
        assert_eq!(m1.participations, 2);
        assert_eq!(m1.win_rate(), 100.0);
        assert_eq!(m1.avg_score(), 8.0);

        let m2 = standings.iter().find(|s| s.model.as_str() == "m2").unwrap();
        assert_eq!(m2.wins, 0);
        assert_eq!(m2.avg_position(), 2.0);
    }

    #[test]
    fn position_history_is_capped() {
        let mut standing = Standing::new(Model::new("m"));
        for i in 0..60 {
            standing.apply(&result("a", "m", 5.0, i % 3 + 1), false);
        }
        assert_eq!(standing.positions.len(), POSITION_HISTORY);
        assert_eq!(standing.participations, 60);
    }

    #[test]
    fn sort_by_win_rate() {
        let mut standings = vec![Standing::new(Model::new("loser")), Standing::new(Model::new("winner"))];
        standings[1].apply(&result("a", "winner", 9.0, 1), true);
        standings[0].apply(&result("b", "loser", 3.0, 2), false);
        sort_standings(&mut standings);
        assert_eq!(standings[0].model.as_str(), "winner");
    }
}
