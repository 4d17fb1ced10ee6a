//! One rater's assessment of its peers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A rater's verdict on a single peer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PeerScore {
    pub peer: String,
    /// 1-based place in the rater's final ranking, if listed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(default)]
    pub criterion_scores: HashMap<String, f64>,
}

impl PeerScore {
    pub fn new(peer: impl Into<String>) -> Self {
        Self {
            peer: peer.into(),
            ..Default::default()
        }
    }

    pub fn at_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_score(mut self, criterion: impl Into<String>, score: f64) -> Self {
        self.criterion_scores.insert(criterion.into(), score);
        self
    }
}

/// One rater's ordered list of peers with their criterion scores
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RankingEntry {
    pub rater: String,
    pub peers: Vec<PeerScore>,
}

impl RankingEntry {
    pub fn new(rater: impl Into<String>, peers: Vec<PeerScore>) -> Self {
        Self {
            rater: rater.into(),
            peers,
        }
    }

    pub fn score_for(&self, peer: &str) -> Option<&PeerScore> {
        self.peers.iter().find(|p| p.peer == peer)
    }

    pub fn position_of(&self, peer: &str) -> Option<usize> {
        self.score_for(peer).and_then(|p| p.position)
    }

    /// Number of peers placed in the final ranking
    pub fn ranked_count(&self) -> usize {
        self.peers.iter().filter(|p| p.position.is_some()).count()
    }

    /// Peer ids in ranking order
    pub fn ordered_peers(&self) -> Vec<&str> {
        let mut ranked: Vec<_> = self
            .peers
            .iter()
            .filter_map(|p| p.position.map(|pos| (pos, p.peer.as_str())))
            .collect();
        ranked.sort_by_key(|(pos, _)| *pos);
        ranked.into_iter().map(|(_, peer)| peer).collect()
    }
}
