//! Panel selection and validation

use super::snapshot::{CouncilSnapshot, RoutingBounds};
use crate::core::model::Model;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Reasoning attached to every member of a fallback panel
pub const FALLBACK_REASONING: &str = "fallback selection";

/// Why a proposed panel was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PanelError {
    #[error("panel has {got} members, at least {min} required")]
    TooSmall { got: usize, min: usize },

    #[error("panel has {got} members, at most {max} allowed")]
    TooLarge { got: usize, max: usize },

    #[error("advisor '{0}' appears more than once")]
    Duplicate(String),

    #[error("unknown advisor '{0}'")]
    UnknownAdvisor(String),
}

/// Raw panel proposal from the router or a caller override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSelection {
    pub advisor_id: String,
    #[serde(default)]
    pub model: Option<Model>,
    #[serde(default)]
    pub reasoning: String,
}

impl PanelSelection {
    pub fn new(advisor_id: impl Into<String>, model: Option<Model>) -> Self {
        Self {
            advisor_id: advisor_id.into(),
            model,
            reasoning: String::new(),
        }
    }
}

/// One seat on a validated panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelMember {
    pub advisor_id: String,
    pub name: String,
    pub role: String,
    pub model: Model,
    pub reasoning: String,
    #[serde(skip)]
    pub system_prompt: String,
}

impl PanelMember {
    /// Stable member identifier used in events; unique within a panel
    pub fn member_id(&self) -> &str {
        &self.advisor_id
    }
}

/// Ordered, validated set of panel members. Immutable once a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Panel(Vec<PanelMember>);

impl Panel {
    /// Validate selections against the council roster.
    ///
    /// Every advisor must exist, appear once, and the panel must hold
    /// between 3 and 5 members. A missing or unknown model is replaced
    /// round-robin from the council's model pool.
    pub fn resolve(
        selections: &[PanelSelection],
        council: &CouncilSnapshot,
    ) -> Result<Self, PanelError> {
        if selections.len() < RoutingBounds::PANEL_MIN {
            return Err(PanelError::TooSmall {
                got: selections.len(),
                min: RoutingBounds::PANEL_MIN,
            });
        }
        if selections.len() > RoutingBounds::PANEL_MAX {
            return Err(PanelError::TooLarge {
                got: selections.len(),
                max: RoutingBounds::PANEL_MAX,
            });
        }

        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(selections.len());
        for (index, selection) in selections.iter().enumerate() {
            let advisor = council
                .advisor(&selection.advisor_id)
                .ok_or_else(|| PanelError::UnknownAdvisor(selection.advisor_id.clone()))?;
            if !seen.insert(advisor.id.as_str()) {
                return Err(PanelError::Duplicate(advisor.id.clone()));
            }
            let model = match &selection.model {
                Some(model) if council.has_model(model) => model.clone(),
                _ => council.pool_model(index).clone(),
            };
            members.push(PanelMember {
                advisor_id: advisor.id.clone(),
                name: advisor.name.clone(),
                role: advisor.role.clone(),
                model,
                reasoning: selection.reasoning.clone(),
                system_prompt: advisor.system_prompt.clone(),
            });
        }
        Ok(Self(members))
    }

    /// Static default panel: the first N roster entries with models assigned
    /// round-robin from the pool.
    pub fn fallback(council: &CouncilSnapshot) -> Self {
        let size = council
            .bounds()
            .default_advisors
            .min(council.advisors().len());
        let members = council
            .advisors()
            .iter()
            .take(size)
            .enumerate()
            .map(|(index, advisor)| PanelMember {
                advisor_id: advisor.id.clone(),
                name: advisor.name.clone(),
                role: advisor.role.clone(),
                model: council.pool_model(index).clone(),
                reasoning: FALLBACK_REASONING.to_string(),
                system_prompt: advisor.system_prompt.clone(),
            })
            .collect();
        Self(members)
    }

    pub fn members(&self) -> &[PanelMember] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn member(&self, member_id: &str) -> Option<&PanelMember> {
        self.0.iter().find(|m| m.member_id() == member_id)
    }

    /// Position of a member in panel order
    pub fn position(&self, member_id: &str) -> Option<usize> {
        self.0.iter().position(|m| m.member_id() == member_id)
    }

    /// Turn a validated panel back into selections (for edits and overrides)
    pub fn to_selections(&self) -> Vec<PanelSelection> {
        self.0
            .iter()
            .map(|m| PanelSelection {
                advisor_id: m.advisor_id.clone(),
                model: Some(m.model.clone()),
                reasoning: m.reasoning.clone(),
            })
            .collect()
    }
}

/// Read the `panel` array out of a router reply.
///
/// Entries without an `advisor_id` are skipped; returns `None` when the
/// reply has no `panel` array at all.
pub fn parse_panel_selections(value: &Value) -> Option<Vec<PanelSelection>> {
    let entries = value.get("panel")?.as_array()?;
    let selections = entries
        .iter()
        .filter_map(|entry| {
            let advisor_id = entry.get("advisor_id")?.as_str()?.trim();
            if advisor_id.is_empty() {
                return None;
            }
            let model = entry
                .get("model")
                .and_then(Value::as_str)
                .map(Model::new)
                .filter(Model::is_valid);
            let reasoning = entry
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            Some(PanelSelection {
                advisor_id: advisor_id.to_string(),
                model,
                reasoning,
            })
        })
        .collect();
    Some(selections)
}

/// Parse a `advisor=model,advisor=model` override string.
///
/// A bare advisor id leaves the model to the pool.
pub fn parse_panel_override(spec: &str) -> Vec<PanelSelection> {
    spec.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((advisor, model)) => {
                let model = Model::new(model.trim());
                PanelSelection::new(advisor.trim(), model.is_valid().then_some(model))
            }
            None => PanelSelection::new(part, None),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::advisor::Advisor;
    use serde_json::json;

    fn council(n: usize) -> CouncilSnapshot {
        let advisors = (0..n)
            .map(|i| Advisor::new(format!("a{}", i), format!("Advisor {}", i)).with_role("role"))
            .collect();
        CouncilSnapshot::try_new("test", advisors, Model::new("chair"))
            .unwrap()
            .with_models(vec![Model::new("m1"), Model::new("m2")])
    }

    fn select(ids: &[&str]) -> Vec<PanelSelection> {
        ids.iter()
            .map(|id| PanelSelection::new(*id, Some(Model::new("m2"))))
            .collect()
    }

    #[test]
    fn resolve_accepts_valid_panel() {
        let panel = Panel::resolve(&select(&["a0", "a3", "a5"]), &council(7)).unwrap();
        assert_eq!(panel.len(), 3);
        assert_eq!(panel.members()[1].member_id(), "a3");
        assert_eq!(panel.members()[1].model.as_str(), "m2");
    }

    #[test]
    fn resolve_rejects_size_violations() {
        let c = council(7);
        assert_eq!(
            Panel::resolve(&select(&["a0", "a1"]), &c).unwrap_err(),
            PanelError::TooSmall { got: 2, min: 3 }
        );
        assert_eq!(
            Panel::resolve(&select(&["a0", "a1", "a2", "a3", "a4", "a5"]), &c).unwrap_err(),
            PanelError::TooLarge { got: 6, max: 5 }
        );
    }

    #[test]
    fn resolve_rejects_unknown_and_duplicate_advisors() {
        let c = council(5);
        assert_eq!(
            Panel::resolve(&select(&["a0", "zz", "a1"]), &c).unwrap_err(),
            PanelError::UnknownAdvisor("zz".to_string())
        );
        assert_eq!(
            Panel::resolve(&select(&["a0", "a1", "a0"]), &c).unwrap_err(),
            PanelError::Duplicate("a0".to_string())
        );
    }

    #[test]
    fn unknown_model_is_replaced_round_robin() {
        let selections = vec![
            PanelSelection::new("a0", Some(Model::new("nope"))),
            PanelSelection::new("a1", None),
            PanelSelection::new("a2", Some(Model::new("m1"))),
        ];
        let panel = Panel::resolve(&selections, &council(4)).unwrap();
        let models: Vec<_> = panel.members().iter().map(|m| m.model.as_str()).collect();
        assert_eq!(models, vec!["m1", "m2", "m1"]);
    }

    #[test]
    fn fallback_takes_first_n_with_round_robin_models() {
        let panel = Panel::fallback(&council(7));
        assert_eq!(panel.len(), 5);
        assert!(panel.members().iter().all(|m| m.reasoning == FALLBACK_REASONING));
        assert_eq!(panel.members()[0].member_id(), "a0");
        assert_eq!(panel.members()[2].model.as_str(), "m1");
        assert_eq!(panel.members()[3].model.as_str(), "m2");
    }

    #[test]
    fn fallback_is_capped_by_roster_size() {
        assert_eq!(Panel::fallback(&council(3)).len(), 3);
    }

    #[test]
    fn parse_router_reply() {
        let reply = json!({
            "panel": [
                {"advisor_id": "a1", "model": "m1", "reasoning": "money"},
                {"model": "m2"},
                {"advisor_id": "a2"}
            ]
        });
        let selections = parse_panel_selections(&reply).unwrap();
        assert_eq!(selections.len(), 2);
        assert_eq!(selections[0].reasoning, "money");
        assert_eq!(selections[1].model, None);
        assert!(parse_panel_selections(&json!({"advisors": []})).is_none());
    }

    #[test]
    fn parse_override_string() {
        let selections = parse_panel_override("a0=m1, a1 ,a2=");
        assert_eq!(selections.len(), 3);
        assert_eq!(selections[0].model, Some(Model::new("m1")));
        assert_eq!(selections[1].advisor_id, "a1");
        assert_eq!(selections[2].model, None);
    }
}
