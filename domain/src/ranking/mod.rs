//! Peer ranking: anonymous labels, reply parsing, weighted aggregation and
//! disagreement analysis.

pub mod aggregate;
pub mod analysis;
pub mod entry;
pub mod labels;
pub mod leaderboard;
pub mod parsing;

pub use aggregate::{AggregateRanking, RankedMember, RankingAggregator, position_score};
pub use analysis::{Conflict, DissentDirection, MinorityOpinion, Severity};
pub use entry::{PeerScore, RankingEntry};
pub use labels::{ResponseLabels, response_label};
pub use leaderboard::{LeaderboardRecord, MemberResult, Standing};
pub use parsing::{parse_final_ranking, parse_ranking_entry, parse_rubric_scores};
