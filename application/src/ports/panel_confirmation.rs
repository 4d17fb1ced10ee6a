//! Panel confirmation port.
//!
//! When `auto_accept_panel` is off, the orchestrator pauses after routing
//! and asks this port what to do with the proposed panel.
//!
//! ```text
//! routing_complete
//!        ↓
//! PanelConfirmation::confirm()
//!        ↓
//! Accept → stage 1 | Edit → re-validate → stage 1 | Reject → error + done
//! ```

use async_trait::async_trait;
use council_domain::{Panel, PanelSelection};

/// Caller's verdict on a proposed panel
#[derive(Debug, Clone, PartialEq)]
pub enum PanelDecision {
    Accept,
    /// Replacement panel; validated like any override
    Edit(Vec<PanelSelection>),
    Reject(String),
}

#[async_trait]
pub trait PanelConfirmation: Send + Sync {
    async fn confirm(&self, panel: &Panel) -> PanelDecision;
}

/// Accepts every panel as proposed
pub struct AutoAcceptPanel;

#[async_trait]
impl PanelConfirmation for AutoAcceptPanel {
    async fn confirm(&self, _panel: &Panel) -> PanelDecision {
        PanelDecision::Accept
    }
}
