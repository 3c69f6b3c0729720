//! Session tracking and module-access gating for the dashboard.

mod gate;
mod plan;

pub use gate::{AccessState, SessionGate, SessionPhase, SessionSnapshot};
pub use plan::{FeatureModule, Plan, PlanTier, Profile, Role};
