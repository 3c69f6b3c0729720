//! Subscription plans, feature modules, and the module-access invariant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscription tier of an identity. `Pro` is unrestricted and bypasses
/// module gating entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Telecom,
    Energia,
    Pro,
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Telecom => write!(f, "telecom"),
            Self::Energia => write!(f, "energia"),
            Self::Pro => write!(f, "pro"),
        }
    }
}

/// Gated feature areas of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureModule {
    #[serde(rename = "torres_5g")]
    Torres5g,
    #[serde(rename = "eletropostos")]
    Eletropostos,
    #[serde(rename = "cobertura")]
    Cobertura,
    #[serde(rename = "relatorios")]
    Relatorios,
}

impl std::fmt::Display for FeatureModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Torres5g => write!(f, "torres_5g"),
            Self::Eletropostos => write!(f, "eletropostos"),
            Self::Cobertura => write!(f, "cobertura"),
            Self::Relatorios => write!(f, "relatorios"),
        }
    }
}

/// Subscription record for one identity. Re-fetched on each session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan: PlanTier,
    #[serde(default)]
    pub modules_enabled: Vec<FeatureModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Plan {
    /// `pro` sees every module; every other tier only what its enabled
    /// set names.
    pub fn allows(&self, module: FeatureModule) -> bool {
        self.plan == PlanTier::Pro || self.modules_enabled.contains(&module)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at < now).unwrap_or(false)
    }
}

/// User metadata shown in the account area. All fields optional; the
/// backend row may be sparse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: Option<String>,
    pub organization: Option<String>,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
}

/// Administrative flag for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}
