//! Long-term memory fast path.
//!
//! A memory store returns candidate facts with their age and a relevance
//! score. Confidence decays by half every `half_life_days` and drops to zero
//! past `max_age_days`; a fact at or above `threshold` answers the query
//! without any model call.

use serde::{Deserialize, Serialize};

/// A remembered fact returned by a memory search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryFact {
    pub fact: String,
    #[serde(default)]
    pub age_days: f64,
    pub relevance: f64,
}

impl MemoryFact {
    pub fn new(fact: impl Into<String>, age_days: f64, relevance: f64) -> Self {
        Self {
            fact: fact.into(),
            age_days,
            relevance,
        }
    }
}

/// The fact chosen to answer a query, with its decayed confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryHit {
    pub fact: String,
    pub confidence: f64,
}

/// Confidence decay settings for the memory fast path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryPolicy {
    pub threshold: f64,
    pub half_life_days: f64,
    pub max_age_days: f64,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            threshold: 0.85,
            half_life_days: 30.0,
            max_age_days: 90.0,
        }
    }
}

impl MemoryPolicy {
    /// Age-discounted confidence of a fact, in `[0, 1]`
    pub fn confidence(&self, fact: &MemoryFact) -> f64 {
        let age = fact.age_days.max(0.0);
        if age > self.max_age_days {
            return 0.0;
        }
        let relevance = fact.relevance.clamp(0.0, 1.0);
        if self.half_life_days <= 0.0 {
            return relevance;
        }
        relevance * 0.5_f64.powf(age / self.half_life_days)
    }

    /// Highest-confidence fact that clears the threshold
    pub fn best_match(&self, facts: &[MemoryFact]) -> Option<MemoryHit> {
        facts
            .iter()
            .filter(|f| !f.fact.trim().is_empty())
            .map(|f| (f, self.confidence(f)))
            .filter(|(_, confidence)| *confidence >= self.threshold)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(f, confidence)| MemoryHit {
                fact: f.fact.clone(),
                confidence,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_fact_keeps_its_relevance() {
        let policy = MemoryPolicy::default();
        let fact = MemoryFact::new("Paris is the capital of France", 0.0, 0.95);
        assert!((policy.confidence(&fact) - 0.95).abs() < 1e-9);
    }

    #[test]
    fn confidence_halves_every_half_life() {
        let policy = MemoryPolicy::default();
        let fact = MemoryFact::new("x", 30.0, 0.8);
        assert!((policy.confidence(&fact) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn decay_is_monotonic_in_age() {
        let policy = MemoryPolicy::default();
        let mut previous = f64::INFINITY;
        for age in 0..=120 {
            let c = policy.confidence(&MemoryFact::new("x", age as f64, 1.0));
            assert!(c <= previous, "confidence rose at age {}", age);
            previous = c;
        }
    }

    #[test]
    fn facts_past_max_age_have_zero_confidence() {
        let policy = MemoryPolicy::default();
        assert!(policy.confidence(&MemoryFact::new("x", 90.0, 1.0)) > 0.0);
        assert_eq!(policy.confidence(&MemoryFact::new("x", 90.5, 1.0)), 0.0);
    }

    #[test]
    fn best_match_requires_threshold() {
        let policy = MemoryPolicy::default();
        let facts = vec![
            MemoryFact::new("old", 20.0, 1.0),
            MemoryFact::new("fresh", 1.0, 0.9),
            MemoryFact::new("weak", 0.0, 0.5),
        ];
        let hit = policy.best_match(&facts).unwrap();
        assert_eq!(hit.fact, "fresh");
        assert!(hit.confidence >= 0.85);

        assert!(policy.best_match(&[MemoryFact::new("old", 20.0, 1.0)]).is_none());
    }
}
