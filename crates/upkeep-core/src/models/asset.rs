//! Asset domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UpkeepError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssetStatus {
    Available,
    InUse,
    Maintenance,
    Retired,
}

impl AssetStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetStatus::Available => "Available",
            AssetStatus::InUse => "InUse",
            AssetStatus::Maintenance => "Maintenance",
            AssetStatus::Retired => "Retired",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetStatus {
    type Err = UpkeepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Available" => Ok(AssetStatus::Available),
            "InUse" => Ok(AssetStatus::InUse),
            "Maintenance" => Ok(AssetStatus::Maintenance),
            "Retired" => Ok(AssetStatus::Retired),
            other => Err(UpkeepError::validation(format!(
                "unknown asset status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// Inventory tag, unique within the tenant.
    pub asset_tag: String,
    pub status: AssetStatus,
    /// User the asset is checked out to.
    pub assigned_to: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAsset {
    pub name: String,
    pub asset_tag: String,
    pub status: AssetStatus,
    pub assigned_to: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

/// `Some(None)` on an optional pointer clears it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAsset {
    pub name: Option<String>,
    pub asset_tag: Option<String>,
    pub status: Option<AssetStatus>,
    pub assigned_to: Option<Option<Uuid>>,
    pub location_id: Option<Option<Uuid>>,
    pub supplier_id: Option<Option<Uuid>>,
    pub metadata: Option<serde_json::Value>,
}

crate::impl_tenant_scoped!(Asset);
