//! Immutable council configuration captured at run start

use super::advisor::Advisor;
use super::rubric::Rubric;
use crate::core::error::DomainError;
use crate::core::model::Model;
use serde::{Deserialize, Serialize};

/// Panel size limits for per-query routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingBounds {
    pub min_advisors: usize,
    pub max_advisors: usize,
    pub default_advisors: usize,
}

impl RoutingBounds {
    /// Smallest panel the council can deliberate with
    pub const PANEL_MIN: usize = 3;
    /// Largest panel the council can deliberate with
    pub const PANEL_MAX: usize = 5;

    /// Clamp configured bounds into the supported panel range
    pub fn clamped(self) -> Self {
        let min = self.min_advisors.clamp(Self::PANEL_MIN, Self::PANEL_MAX);
        let max = self.max_advisors.clamp(min, Self::PANEL_MAX);
        let default = self.default_advisors.clamp(min, max);
        Self {
            min_advisors: min,
            max_advisors: max,
            default_advisors: default,
        }
    }
}

impl Default for RoutingBounds {
    fn default() -> Self {
        Self {
            min_advisors: 3,
            max_advisors: 5,
            default_advisors: 5,
        }
    }
}

/// Read-only view of one council: roster, rubric, model pool and chairman.
///
/// Built once from configuration and shared behind an `Arc` for the length
/// of a run, so edits to configuration never affect a run in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouncilSnapshot {
    id: String,
    name: String,
    advisors: Vec<Advisor>,
    rubric: Rubric,
    models: Vec<Model>,
    chairman: Model,
    classifier_model: Model,
    bounds: RoutingBounds,
}

impl CouncilSnapshot {
    /// Create a snapshot, rejecting rosters smaller than the minimum panel
    pub fn try_new(
        id: impl Into<String>,
        advisors: Vec<Advisor>,
        chairman: Model,
    ) -> Result<Self, DomainError> {
        let id = id.into();
        if advisors.len() < RoutingBounds::PANEL_MIN {
            return Err(DomainError::InvalidCouncil(format!(
                "council '{}' needs at least {} advisors, has {}",
                id,
                RoutingBounds::PANEL_MIN,
                advisors.len()
            )));
        }
        if !chairman.is_valid() {
            return Err(DomainError::InvalidCouncil(format!(
                "council '{}' has no chairman model",
                id
            )));
        }
        Ok(Self {
            name: id.clone(),
            id,
            advisors,
            rubric: Rubric::default(),
            models: Vec::new(),
            classifier_model: chairman.clone(),
            chairman,
            bounds: RoutingBounds::default(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_rubric(mut self, rubric: Rubric) -> Self {
        self.rubric = rubric;
        self
    }

    pub fn with_models(mut self, models: Vec<Model>) -> Self {
        self.models = models.into_iter().filter(Model::is_valid).collect();
        self
    }

    pub fn with_classifier_model(mut self, model: Model) -> Self {
        if model.is_valid() {
            self.classifier_model = model;
        }
        self
    }

    pub fn with_bounds(mut self, bounds: RoutingBounds) -> Self {
        self.bounds = bounds.clamped();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn advisors(&self) -> &[Advisor] {
        &self.advisors
    }

    pub fn advisor(&self, id: &str) -> Option<&Advisor> {
        self.advisors.iter().find(|a| a.id == id)
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    pub fn chairman(&self) -> &Model {
        &self.chairman
    }

    pub fn classifier_model(&self) -> &Model {
        &self.classifier_model
    }

    pub fn bounds(&self) -> RoutingBounds {
        self.bounds
    }

    /// Models available to panel members; the chairman alone when no pool is configured
    pub fn model_pool(&self) -> &[Model] {
        if self.models.is_empty() {
            std::slice::from_ref(&self.chairman)
        } else {
            &self.models
        }
    }

    pub fn has_model(&self, model: &Model) -> bool {
        self.model_pool().contains(model)
    }

    /// Round-robin pick from the model pool
    pub fn pool_model(&self, index: usize) -> &Model {
        let pool = self.model_pool();
        &pool[index % pool.len()]
    }

    /// Per-query routing is only meaningful when there is a choice to make
    pub fn supports_routing(&self) -> bool {
        self.advisors.len() > self.bounds.min_advisors
    }

    pub fn roster_text(&self) -> String {
        self.advisors
            .iter()
            .map(Advisor::roster_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
