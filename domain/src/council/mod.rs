//! Council configuration: advisor roster, rubric, and panel selection.
//!
//! A [`CouncilSnapshot`](snapshot::CouncilSnapshot) is captured once per
//! run. The router (or a caller override) turns it into a validated
//! [`Panel`](panel::Panel) of 3 to 5 members.

pub mod advisor;
pub mod panel;
pub mod rubric;
pub mod snapshot;
