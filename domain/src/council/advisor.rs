//! Advisor roster entries

use serde::{Deserialize, Serialize};

/// One advisor persona on a council roster (Entity)
///
/// An advisor is a role, not a model: the router pairs it with a model for
/// each run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub system_prompt: String,
}

impl Advisor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: String::new(),
            tags: Vec::new(),
            system_prompt: String::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Single roster line shown to the router
    pub fn roster_line(&self) -> String {
        format!(
            "- {}: {} ({}) [tags: {}]",
            self.id,
            self.name,
            self.role,
            self.tags.join(", ")
        )
    }
}
