//! Weighted scoring rubric used in peer ranking

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One weighted scoring criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricCriterion {
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub description: String,
}

impl RubricCriterion {
    pub fn new(name: impl Into<String>, weight: f64, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight,
            description: description.into(),
        }
    }
}

/// Ordered set of criteria a council ranks answers against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rubric(Vec<RubricCriterion>);

impl Rubric {
    pub fn new(criteria: Vec<RubricCriterion>) -> Self {
        Self(criteria)
    }

    pub fn criteria(&self) -> &[RubricCriterion] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|c| c.name.as_str())
    }

    /// Weighted mean of the given per-criterion scores.
    ///
    /// Criteria missing from `scores` are left out of both sums, and scores
    /// for names outside the rubric are ignored. Returns `None` when no
    /// rubric criterion was scored.
    pub fn weighted_score(&self, scores: &HashMap<String, f64>) -> Option<f64> {
        let mut weighted = 0.0;
        let mut weights = 0.0;
        for criterion in &self.0 {
            if let Some(score) = lookup_ignore_case(scores, &criterion.name) {
                weighted += score * criterion.weight;
                weights += criterion.weight;
            }
        }
        (weights > 0.0).then(|| weighted / weights)
    }
}

fn lookup_ignore_case(scores: &HashMap<String, f64>, name: &str) -> Option<f64> {
    scores.get(name).copied().or_else(|| {
        scores
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, score)| *score)
    })
}

impl Default for Rubric {
    fn default() -> Self {
        Self(vec![
            RubricCriterion::new("Accuracy", 2.0, "Factually correct and free of errors"),
            RubricCriterion::new("Insight", 1.5, "Goes beyond the obvious"),
            RubricCriterion::new("Clarity", 1.0, "Well organized and easy to follow"),
            RubricCriterion::new("Actionability", 1.0, "Gives the reader something to do"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn weighted_score_uses_weights() {
        let rubric = Rubric::new(vec![
            RubricCriterion::new("Accuracy", 3.0, ""),
            RubricCriterion::new("Clarity", 1.0, ""),
        ]);
        let score = rubric
            .weighted_score(&scores(&[("Accuracy", 8.0), ("Clarity", 4.0)]))
            .unwrap();
        assert!((score - 7.0).abs() < 1e-9);
    }

    #[test]
    fn missing_criteria_are_excluded_from_the_denominator() {
        let rubric = Rubric::new(vec![
            RubricCriterion::new("Accuracy", 3.0, ""),
            RubricCriterion::new("Clarity", 1.0, ""),
        ]);
        let score = rubric.weighted_score(&scores(&[("clarity", 6.0)])).unwrap();
        assert!((score - 6.0).abs() < 1e-9);
    }

    #[test]
    fn no_scores_yields_none() {
        assert!(Rubric::default().weighted_score(&HashMap::new()).is_none());
        assert!(
            Rubric::default()
                .weighted_score(&scores(&[("Humor", 9.0)]))
                .is_none()
        );
    }
}
