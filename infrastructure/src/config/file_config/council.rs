//! Council configuration from TOML (`[councils.<id>]` tables)
//!
//! ```toml
//! [councils.product]
//! name = "Product Council"
//! chairman = "anthropic/claude-sonnet-4.5"
//! classifier_model = "openai/gpt-5-mini"
//! models = ["openai/gpt-5.1", "google/gemini-3-pro"]
//!
//! [councils.product.routing]
//! min_advisors = 3
//! max_advisors = 5
//!
//! [[councils.product.rubric]]
//! name = "Accuracy"
//! weight = 2.0
//!
//! [[councils.product.advisors]]
//! id = "cto"
//! name = "Dana"
//! role = "CTO"
//! tags = ["architecture", "hiring"]
//! system_prompt = "You are a pragmatic CTO."
//! ```

use super::ConfigValidationError;
use council_domain::{Advisor, CouncilSnapshot, Model, Rubric, RubricCriterion, RoutingBounds};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCouncilConfig {
    pub name: Option<String>,
    /// Synthesizer; `backend.default_model` when unset
    pub chairman: Option<String>,
    /// Classifier and router; the chairman when unset
    pub classifier_model: Option<String>,
    /// Pool the router assigns to advisors
    pub models: Vec<String>,
    /// Replaces the built-in rubric when non-empty
    pub rubric: Vec<FileCriterionConfig>,
    pub advisors: Vec<FileAdvisorConfig>,
    pub routing: FileRoutingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAdvisorConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub system_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCriterionConfig {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub description: String,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoutingConfig {
    pub min_advisors: usize,
    pub max_advisors: usize,
    pub default_advisors: usize,
}

impl Default for FileRoutingConfig {
    fn default() -> Self {
        let bounds = RoutingBounds::default();
        Self {
            min_advisors: bounds.min_advisors,
            max_advisors: bounds.max_advisors,
            default_advisors: bounds.default_advisors,
        }
    }
}

impl FileCouncilConfig {
    pub(super) fn validate(&self, id: &str) -> Result<(), ConfigValidationError> {
        if self.advisors.len() < RoutingBounds::PANEL_MIN {
            return Err(ConfigValidationError::TooFewAdvisors {
                council: id.to_string(),
                got: self.advisors.len(),
            });
        }

        let mut seen = HashSet::new();
        for advisor in &self.advisors {
            if !seen.insert(advisor.id.as_str()) {
                return Err(ConfigValidationError::DuplicateAdvisor {
                    council: id.to_string(),
                    advisor: advisor.id.clone(),
                });
            }
        }

        let named_models = self
            .chairman
            .iter()
            .map(|m| ("chairman", m))
            .chain(self.classifier_model.iter().map(|m| ("classifier_model", m)))
            .chain(self.models.iter().map(|m| ("models", m)));
        for (field, model) in named_models {
            if model.trim().is_empty() {
                return Err(ConfigValidationError::EmptyModelName {
                    field: format!("councils.{}.{}", id, field),
                });
            }
        }

        if let Some(criterion) = self
            .rubric
            .iter()
            .find(|c| !(c.weight.is_finite() && c.weight > 0.0))
        {
            return Err(ConfigValidationError::InvalidRubricWeight {
                council: id.to_string(),
                criterion: criterion.name.clone(),
            });
        }
        Ok(())
    }

    /// Build the immutable snapshot runs are given
    pub fn to_snapshot(
        &self,
        id: &str,
        default_model: &str,
    ) -> Result<CouncilSnapshot, ConfigValidationError> {
        self.validate(id)?;

        let advisors = self
            .advisors
            .iter()
            .map(|a| {
                Advisor::new(a.id.trim(), a.name.trim())
                    .with_role(a.role.trim())
                    .with_tags(a.tags.iter().map(|t| t.trim().to_string()))
                    .with_system_prompt(a.system_prompt.trim())
            })
            .collect();
        let chairman = Model::new(self.chairman.as_deref().unwrap_or(default_model).trim());

        let mut snapshot = CouncilSnapshot::try_new(id, advisors, chairman)
            .map_err(|e| ConfigValidationError::InvalidCouncil {
                council: id.to_string(),
                reason: e.to_string(),
            })?
            .with_models(self.models.iter().map(|m| Model::new(m.trim())).collect())
            .with_bounds(RoutingBounds {
                min_advisors: self.routing.min_advisors,
                max_advisors: self.routing.max_advisors,
                default_advisors: self.routing.default_advisors,
            });
        if let Some(name) = &self.name {
            snapshot = snapshot.with_name(name.trim());
        }
        if let Some(classifier) = &self.classifier_model {
            snapshot = snapshot.with_classifier_model(Model::new(classifier.trim()));
        }
        if !self.rubric.is_empty() {
            snapshot = snapshot.with_rubric(Rubric::new(
                self.rubric
                    .iter()
                    .map(|c| RubricCriterion::new(c.name.trim(), c.weight, c.description.trim()))
                    .collect(),
            ));
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advisor(id: &str) -> FileAdvisorConfig {
        FileAdvisorConfig {
            id: id.to_string(),
            name: id.to_uppercase(),
            role: format!("{} role", id),
            tags: Vec::new(),
            system_prompt: String::new(),
        }
    }

    fn council() -> FileCouncilConfig {
        FileCouncilConfig {
            advisors: vec![advisor("cto"), advisor("cfo"), advisor("pm")],
            ..Default::default()
        }
    }

    #[test]
    fn test_snapshot_uses_default_model_as_chairman() {
        let snapshot = council().to_snapshot("board", "openai/gpt-5.1").unwrap();
        assert_eq!(snapshot.chairman(), &Model::new("openai/gpt-5.1"));
        assert_eq!(snapshot.classifier_model(), snapshot.chairman());
        assert_eq!(snapshot.rubric(), &Rubric::default());
    }

    #[test]
    fn test_snapshot_applies_overrides() {
        let mut config = council();
        config.name = Some("Board".to_string());
        config.classifier_model = Some("openai/gpt-5-mini".to_string());
        config.rubric = vec![FileCriterionConfig {
            name: "Depth".to_string(),
            weight: 3.0,
            description: String::new(),
        }];

        let snapshot = config.to_snapshot("board", "openai/gpt-5.1").unwrap();
        assert_eq!(snapshot.name(), "Board");
        assert_eq!(snapshot.classifier_model(), &Model::new("openai/gpt-5-mini"));
        assert_eq!(snapshot.rubric().criteria()[0].name, "Depth");
    }

    #[test]
    fn test_too_few_advisors_rejected() {
        let mut config = council();
        config.advisors.pop();
        assert_eq!(
            config.validate("board"),
            Err(ConfigValidationError::TooFewAdvisors {
                council: "board".to_string(),
                got: 2
            })
        );
    }

    #[test]
    fn test_duplicate_advisor_rejected() {
        let mut config = council();
        config.advisors.push(advisor("cto"));
        assert!(matches!(
            config.validate("board"),
            Err(ConfigValidationError::DuplicateAdvisor { .. })
        ));
    }

    #[test]
    fn test_non_positive_weight_rejected() {
        let mut config = council();
        config.rubric = vec![FileCriterionConfig {
            name: "Accuracy".to_string(),
            weight: 0.0,
            description: String::new(),
        }];
        assert!(matches!(
            config.validate("board"),
            Err(ConfigValidationError::InvalidRubricWeight { .. })
        ));
    }

    #[test]
    fn test_empty_model_rejected() {
        let mut config = council();
        config.models = vec!["openai/gpt-5.1".to_string(), "".to_string()];
        assert_eq!(
            config.validate("board"),
            Err(ConfigValidationError::EmptyModelName {
                field: "councils.board.models".to_string()
            })
        );
    }
}
