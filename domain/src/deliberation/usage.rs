//! Token usage accounting across every backend call of a run

use super::stage::Stage;
use crate::core::model::Model;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

/// Token and cost figures reported for one or more calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub cost: f64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            cost: 0.0,
        }
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.total_tokens == 0 && self.prompt_tokens == 0 && self.completion_tokens == 0
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            prompt_tokens: self.prompt_tokens + rhs.prompt_tokens,
            completion_tokens: self.completion_tokens + rhs.completion_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
            cost: self.cost + rhs.cost,
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Usage) {
        *self = *self + rhs;
    }
}

impl std::iter::Sum for Usage {
    fn sum<I: Iterator<Item = Usage>>(iter: I) -> Usage {
        iter.fold(Usage::default(), Add::add)
    }
}

/// Usage of a single call, attributed to its stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub stage: Stage,
    pub model: Model,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    pub usage: Usage,
}

/// Summed usage plus the number of calls it covers
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageUsage {
    #[serde(flatten)]
    pub usage: Usage,
    pub calls: usize,
}

/// Per-stage summaries and the run total, as sent in `done`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageBreakdown {
    pub by_stage: BTreeMap<Stage, StageUsage>,
    pub total: StageUsage,
}

/// Append-only list of every call's usage in a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageLedger {
    records: Vec<UsageRecord>,
}

impl UsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, model: &Model, member_id: Option<&str>, usage: Usage) {
        self.records.push(UsageRecord {
            stage,
            model: model.clone(),
            member_id: member_id.map(str::to_string),
            usage,
        });
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    pub fn stage_summary(&self, stage: Stage) -> StageUsage {
        summarize(self.records.iter().filter(|r| r.stage == stage))
    }

    pub fn total(&self) -> StageUsage {
        summarize(self.records.iter())
    }

    pub fn breakdown(&self) -> UsageBreakdown {
        let mut by_stage = BTreeMap::new();
        for record in &self.records {
            let entry: &mut StageUsage = by_stage.entry(record.stage).or_default();
            entry.usage += record.usage;
            entry.calls += 1;
        }
        UsageBreakdown {
            by_stage,
            total: self.total(),
        }
    }
}

fn summarize<'a>(records: impl Iterator<Item = &'a UsageRecord>) -> StageUsage {
    records.fold(StageUsage::default(), |mut acc, record| {
        acc.usage += record.usage;
        acc.calls += 1;
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_is_additive() {
        let total: Usage = [Usage::new(10, 5), Usage::new(1, 2).with_cost(0.5)]
            .into_iter()
            .sum();
        assert_eq!(total.prompt_tokens, 11);
        assert_eq!(total.completion_tokens, 7);
        assert_eq!(total.total_tokens, 18);
        assert!((total.cost - 0.5).abs() < 1e-9);
    }

    #[test]
    fn ledger_attributes_usage_per_stage() {
        let model = Model::new("m");
        let mut ledger = UsageLedger::new();
        ledger.record(Stage::Classification, &model, None, Usage::new(5, 1));
        ledger.record(Stage::Stage1, &model, Some("a"), Usage::new(10, 20));
        ledger.record(Stage::Stage1, &model, Some("b"), Usage::new(10, 30));

        let stage1 = ledger.stage_summary(Stage::Stage1);
        assert_eq!(stage1.calls, 2);
        assert_eq!(stage1.usage.completion_tokens, 50);

        let breakdown = ledger.breakdown();
        assert_eq!(breakdown.by_stage.len(), 2);
        assert_eq!(breakdown.total.calls, 3);
        assert_eq!(breakdown.total.usage.total_tokens, 76);
    }

    #[test]
    fn stage_usage_serializes_flat() {
        let value = serde_json::to_value(StageUsage {
            usage: Usage::new(1, 2),
            calls: 1,
        })
        .unwrap();
        assert_eq!(value["total_tokens"], 3);
        assert_eq!(value["calls"], 1);
    }
}
